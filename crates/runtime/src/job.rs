use crate::observable::{ContainerId, Observable};

/// A recompute step owned by the [`Scheduler`].
///
/// A job declares the containers it reads and the single container it writes.
/// It runs whenever any input changes; its rank (assigned on registration)
/// places it after every job producing one of its inputs.
///
/// [`Scheduler`]: crate::scheduler::Scheduler
pub struct Job {
    pub id: &'static str,
    pub inputs: Vec<ContainerId>,
    pub output: ContainerId,
    pub(crate) rank: u32,
    run: Box<dyn FnMut()>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("rank", &self.rank)
            .finish()
    }
}

impl Job {
    pub fn new(
        id: &'static str,
        inputs: Vec<ContainerId>,
        output: ContainerId,
        run: impl FnMut() + 'static,
    ) -> Self {
        Self {
            id,
            inputs,
            output,
            rank: 0,
            run: Box::new(run),
        }
    }

    /// Job that publishes the result of `compute` into `output`.
    pub fn derive<T: 'static>(
        id: &'static str,
        inputs: Vec<ContainerId>,
        output: &Observable<T>,
        mut compute: impl FnMut() -> T + 'static,
    ) -> Self {
        let target = output.clone();
        Self::new(id, inputs, output.id(), move || target.set(compute()))
    }

    pub fn rank(&self) -> u32 {
        self.rank
    }

    pub(crate) fn run(&mut self) {
        (self.run)();
    }

    pub(crate) fn reads(&self, container: ContainerId) -> bool {
        self.inputs.contains(&container)
    }

    pub(crate) fn reads_any(&self, changed: &std::collections::BTreeSet<ContainerId>) -> bool {
        self.inputs.iter().any(|id| changed.contains(id))
    }
}
