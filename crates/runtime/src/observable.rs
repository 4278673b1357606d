use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::event_bus::{ChangeBus, EventBus};

/// Stable address of a container within one state context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContainerId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber<T> = Box<dyn FnMut(&T)>;

struct Slot<T> {
    id: ContainerId,
    name: &'static str,
    value: RefCell<Rc<T>>,
    version: Cell<u64>,
    subscribers: RefCell<Vec<(SubscriptionId, Subscriber<T>)>>,
    /// Subscriptions taken out of `subscribers` for the running notification.
    notifying: RefCell<Vec<SubscriptionId>>,
    next_subscription: Cell<u64>,
    bus: ChangeBus,
}

/// Single-threaded mutable container with change notification.
///
/// Values are held behind an `Rc` so large datasets can be handed to readers
/// and recompute jobs without copying. Every replacement bumps the version,
/// records an event on the shared [`ChangeBus`] and notifies subscribers.
///
/// Subscribers may set other containers (or this one) while being notified; a
/// nested change to this container is not re-delivered to subscribers that
/// are still being notified of the outer change. A subscriber removed during a
/// notification is not called again, including later in that notification.
pub struct Observable<T> {
    slot: Rc<Slot<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.slot.id)
            .field("name", &self.slot.name)
            .field("version", &self.slot.version.get())
            .finish()
    }
}

impl<T: 'static> Observable<T> {
    pub fn new(id: ContainerId, name: &'static str, value: T, bus: ChangeBus) -> Self {
        Self {
            slot: Rc::new(Slot {
                id,
                name,
                value: RefCell::new(Rc::new(value)),
                version: Cell::new(0),
                subscribers: RefCell::new(Vec::new()),
                notifying: RefCell::new(Vec::new()),
                next_subscription: Cell::new(0),
                bus,
            }),
        }
    }

    pub fn id(&self) -> ContainerId {
        self.slot.id
    }

    pub fn name(&self) -> &'static str {
        self.slot.name
    }

    /// Number of replacements since construction.
    pub fn version(&self) -> u64 {
        self.slot.version.get()
    }

    pub fn get(&self) -> Rc<T> {
        Rc::clone(&self.slot.value.borrow())
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.get();
        f(&value)
    }

    pub fn set(&self, value: T) {
        self.replace(Rc::new(value));
    }

    /// Copy-on-write update of the current value.
    pub fn update(&self, f: impl FnOnce(&mut T))
    where
        T: Clone,
    {
        let mut value = self.get();
        f(Rc::make_mut(&mut value));
        self.replace(value);
    }

    /// Calls `f` with the current value now and with every later value.
    pub fn subscribe(&self, f: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.slot.next_subscription.get());
        self.slot.next_subscription.set(id.0 + 1);

        let mut f: Subscriber<T> = Box::new(f);
        let current = self.get();
        f(&current);
        self.slot.subscribers.borrow_mut().push((id, f));
        id
    }

    /// Returns `false` if the subscription was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.slot.subscribers.borrow_mut();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        if subs.len() != before {
            return true;
        }
        let mut notifying = self.slot.notifying.borrow_mut();
        let before = notifying.len();
        notifying.retain(|sid| *sid != id);
        notifying.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.slot.subscribers.borrow().len() + self.slot.notifying.borrow().len()
    }

    pub fn read_only(&self) -> ReadOnly<T> {
        ReadOnly {
            inner: self.clone(),
        }
    }

    fn replace(&self, value: Rc<T>) {
        *self.slot.value.borrow_mut() = value;
        let version = self.slot.version.get() + 1;
        self.slot.version.set(version);
        self.slot
            .bus
            .borrow_mut()
            .emit(self.slot.id, self.slot.name, version);
        self.notify();
    }

    fn notify(&self) {
        let mut active = std::mem::take(&mut *self.slot.subscribers.borrow_mut());
        if active.is_empty() {
            return;
        }
        let ids = active.iter().map(|(id, _)| *id).collect();
        let outer = std::mem::replace(&mut *self.slot.notifying.borrow_mut(), ids);
        let current = self.get();
        for (id, f) in active.iter_mut() {
            if self.slot.notifying.borrow().contains(id) {
                f(&current);
            }
        }
        let live = std::mem::replace(&mut *self.slot.notifying.borrow_mut(), outer);
        active.retain(|(id, _)| live.contains(id));

        // Keep subscriptions registered during notification, after the
        // existing ones.
        let mut slot_subs = self.slot.subscribers.borrow_mut();
        active.append(&mut slot_subs);
        *slot_subs = active;
    }
}

/// Read side of a container whose value is owned by a recompute job.
pub struct ReadOnly<T> {
    inner: Observable<T>,
}

impl<T> Clone for ReadOnly<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for ReadOnly<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadOnly").field(&self.inner).finish()
    }
}

impl<T: 'static> ReadOnly<T> {
    pub fn id(&self) -> ContainerId {
        self.inner.id()
    }

    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    pub fn version(&self) -> u64 {
        self.inner.version()
    }

    pub fn get(&self) -> Rc<T> {
        self.inner.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    pub fn subscribe(&self, f: impl FnMut(&T) + 'static) -> SubscriptionId {
        self.inner.subscribe(f)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.unsubscribe(id)
    }
}

/// Allocates containers that share one change bus.
#[derive(Debug)]
pub struct Registry {
    next_id: Cell<u32>,
    bus: ChangeBus,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            bus: EventBus::shared(),
        }
    }

    pub fn bus(&self) -> ChangeBus {
        Rc::clone(&self.bus)
    }

    pub fn container<T: 'static>(&self, name: &'static str, initial: T) -> Observable<T> {
        let id = ContainerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        Observable::new(id, name, initial, self.bus())
    }

    pub fn len(&self) -> usize {
        self.next_id.get() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
