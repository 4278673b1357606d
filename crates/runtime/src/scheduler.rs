use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::event_bus::ChangeBus;
use crate::job::Job;
use crate::observable::ContainerId;

/// Upper bound on propagation passes per flush. Only reached when subscribers
/// keep writing source containers in response to each other.
pub const DEFAULT_MAX_PASSES: usize = 32;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct FlushSummary {
    pub ran_jobs: usize,
    pub passes: usize,
}

/// Dependency-ordered recompute of derived containers.
///
/// Jobs run in a total order `(rank, id, insertion_order)`; a job's rank is one
/// more than the highest rank among the jobs producing its inputs, so a single
/// ascending pass always sees fresh upstream values.
pub struct Scheduler {
    next_order: u64,
    jobs: Vec<(u64, Job)>,
    ranks: HashMap<ContainerId, u32>,
    bus: ChangeBus,
    max_passes: usize,
}

impl Scheduler {
    pub fn new(bus: ChangeBus) -> Self {
        Self {
            next_order: 0,
            jobs: Vec::new(),
            ranks: HashMap::new(),
            bus,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    pub fn add_job(&mut self, job: Job) {
        let order = self.next_order;
        self.next_order = self.next_order.wrapping_add(1);
        self.jobs.push((order, job));
        self.assign_ranks();
        self.jobs.sort_by(|(oa, a), (ob, b)| {
            a.rank
                .cmp(&b.rank)
                .then_with(|| a.id.cmp(b.id))
                .then_with(|| oa.cmp(ob))
        });
    }

    /// Longest-path layering over the job graph. Registration order does not
    /// matter; the iteration bound keeps a cyclic graph from spinning.
    fn assign_ranks(&mut self) {
        for _ in 0..=self.jobs.len() {
            let mut changed = false;
            for i in 0..self.jobs.len() {
                let job = &self.jobs[i].1;
                let rank = 1 + job
                    .inputs
                    .iter()
                    .map(|input| self.ranks.get(input).copied().unwrap_or(0))
                    .max()
                    .unwrap_or(0);
                if rank != job.rank {
                    let output = job.output;
                    self.jobs[i].1.rank = rank;
                    self.ranks.insert(output, rank);
                    changed = true;
                }
            }
            if !changed {
                return;
            }
        }
        warn!("job graph contains a cycle; ranks are approximate");
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Job ids in execution order.
    pub fn order(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|(_, job)| job.id).collect()
    }

    /// Runs every job once, then discards the changes that produced.
    pub fn run_all(&mut self) -> usize {
        for (_, job) in &mut self.jobs {
            job.run();
        }
        self.bus.borrow_mut().drain();
        self.jobs.len()
    }

    /// Propagates every pending change to the jobs that read it.
    ///
    /// Changes recorded while a pass is running (by a job or by a subscriber
    /// reacting to one) are seen by every job still ahead in that pass. Jobs
    /// already behind it get them in the next pass.
    pub fn flush(&mut self) -> FlushSummary {
        let mut summary = FlushSummary::default();
        let mut missed = BTreeSet::new();
        loop {
            let mut dirty = drain_changes(&self.bus);
            dirty.append(&mut missed);
            if dirty.is_empty() {
                break;
            }
            if summary.passes == self.max_passes {
                warn!(
                    passes = summary.passes,
                    pending = dirty.len(),
                    "change propagation did not settle; dropping pending changes"
                );
                break;
            }
            summary.passes += 1;

            for i in 0..self.jobs.len() {
                let fresh = drain_changes(&self.bus);
                for &container in &fresh {
                    if self.jobs[..i].iter().any(|(_, job)| job.reads(container)) {
                        missed.insert(container);
                    }
                }
                dirty.extend(fresh);

                let job = &mut self.jobs[i].1;
                if job.reads_any(&dirty) {
                    job.run();
                    summary.ran_jobs += 1;
                }
            }
        }
        if summary.ran_jobs > 0 {
            debug!(
                ran_jobs = summary.ran_jobs,
                passes = summary.passes,
                "recomputed derived views"
            );
        }
        summary
    }
}

fn drain_changes(bus: &ChangeBus) -> BTreeSet<ContainerId> {
    bus.borrow_mut()
        .drain()
        .into_iter()
        .map(|event| event.container)
        .collect()
}
