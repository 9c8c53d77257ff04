// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The [`Signal`] event source and its per-subscriber job control blocks.

use super::connection::Connection;
use crate::{backend::BackendType, error::DispatchError, group::Group,
            priority::QueuePriority, queue::{Queue, global_queue}};
use smallvec::SmallVec;
use std::{fmt,
          sync::{Arc, Mutex, Weak,
                 atomic::{AtomicI64, AtomicU8, Ordering}}};

/// Per-subscriber policy on what happens when the signal fires again while that
/// subscriber's handler is still running (or its delivery is still queued).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationMode {
    /// Every fire schedules a delivery; none is ever dropped. Deliveries onto a serial
    /// queue run in fire order.
    #[default]
    SingleUpdates,
    /// Fires arriving while a delivery is in flight coalesce into at most one
    /// follow-up delivery. The follow-up carries the arguments of the fire that
    /// scheduled it; later coalesced fires' arguments are dropped.
    BatchUpdates,
}

/// `active` state of a job. Stored in an atomic so the delivery task can transition it
/// without taking the signal lock.
const ACTIVE_DISABLED: u8 = 0;
const ACTIVE_ENABLED: u8 = 1;
const ACTIVE_RUNNING: u8 = 2;

/// Control block for one subscription. The signal's job list holds the only long-lived
/// strong reference; [`Connection`]s identify it weakly.
pub(crate) struct JobState {
    pub(crate) queue: Queue,
    pub(crate) mode: NotificationMode,
    active: AtomicU8,
    pending: AtomicI64,
}

impl JobState {
    fn new(queue: Queue, mode: NotificationMode) -> Arc<Self> {
        Arc::new(Self {
            queue,
            mode,
            active: AtomicU8::new(ACTIVE_DISABLED),
            pending: AtomicI64::new(0),
        })
    }

    pub(crate) fn disable(&self) { self.active.store(ACTIVE_DISABLED, Ordering::SeqCst); }

    fn enable(&self) { self.active.store(ACTIVE_ENABLED, Ordering::SeqCst); }

    /// Claims the job for one handler run: `Enabled → Running`. Fails when the job was
    /// disabled or disconnected after this delivery was scheduled.
    fn try_enter(&self) -> bool {
        self.active
            .compare_exchange(
                ACTIVE_ENABLED,
                ACTIVE_RUNNING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Releases the claim taken by [`Self::try_enter()`].
    fn leave(&self) { self.active.store(ACTIVE_ENABLED, Ordering::SeqCst); }
}

/// One subscription: control block plus the typed handler.
struct Job<A> {
    state: Arc<JobState>,
    handler: Arc<dyn Fn(A) + Send + Sync + 'static>,
}

/// Type-erased view of a signal, giving [`Connection`]s a parent to talk to without
/// knowing the argument type.
pub(crate) trait SignalJobs: Send + Sync {
    /// Removes and disables the identified job. `false` when it was already gone.
    fn remove_job(&self, id: &Weak<JobState>) -> bool;

    /// Whether the identified job is still registered.
    fn contains_job(&self, id: &Weak<JobState>) -> bool;
}

struct SignalCore<A> {
    group: Group,
    jobs: Mutex<SmallVec<[Job<A>; 2]>>,
}

impl<A: Clone + Send + 'static> SignalJobs for SignalCore<A> {
    fn remove_job(&self, id: &Weak<JobState>) -> bool {
        let Some(target) = id.upgrade() else {
            return false;
        };
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.iter().position(|job| Arc::ptr_eq(&job.state, &target)) {
            Some(index) => {
                let job = jobs.remove(index);
                // A delivery already queued for this job must find the claim refused.
                job.state.disable();
                true
            }
            None => false,
        }
    }

    fn contains_job(&self, id: &Weak<JobState>) -> bool {
        let Some(target) = id.upgrade() else {
            return false;
        };
        let jobs = self.jobs.lock().unwrap();
        jobs.iter().any(|job| Arc::ptr_eq(&job.state, &target))
    }
}

/// An event source typed by its argument. Fires are multiplexed to every connected
/// handler via queued deliveries; see the [module docs] for the delivery model.
///
/// Multi-argument signals use a tuple for `A`:
///
/// ```
/// use r3bl_dispatch::Signal;
///
/// let file_progress: Signal<(String, u64)> = Signal::new();
/// let ticked: Signal<()> = Signal::new();
/// ```
///
/// Dropping the signal disconnects every job and then waits on the internal group, so
/// no handler is still executing against a signal that no longer exists.
///
/// [module docs]: super
pub struct Signal<A: Clone + Send + 'static> {
    core: Arc<SignalCore<A>>,
}

impl<A: Clone + Send + 'static> Signal<A> {
    /// Creates a signal whose deliveries are tracked by a fresh default-backend group.
    #[must_use]
    pub fn new() -> Self { Self::with_group(Group::new(BackendType::Naive)) }

    /// Creates a signal tracking its deliveries in `group`. The group's backend decides
    /// which queues handlers may be connected on.
    #[must_use]
    pub fn with_group(group: Group) -> Self {
        Self {
            core: Arc::new(SignalCore {
                group,
                jobs: Mutex::new(SmallVec::new()),
            }),
        }
    }

    /// Connects `handler` to run on `queue` whenever the signal fires.
    ///
    /// The job starts disabled; the first fire enables it as part of scheduling. The
    /// returned [`Connection`] identifies the job weakly - dropping it changes
    /// nothing (see [`ScopedConnection`] for scope-bound subscriptions).
    ///
    /// # Errors
    ///
    /// [`DispatchError::BackendMismatch`] when `queue` does not belong to the backend
    /// of this signal's group. Checked here so the misuse fails at the connect site;
    /// firing is infallible.
    ///
    /// [`ScopedConnection`]: super::ScopedConnection
    pub fn connect(
        &self,
        handler: impl Fn(A) + Send + Sync + 'static,
        queue: Queue,
        mode: NotificationMode,
    ) -> Result<Connection, DispatchError> {
        if queue.backend_type() != self.core.group.backend_type() {
            return Err(DispatchError::BackendMismatch {
                expected: self.core.group.backend_type(),
                found: queue.backend_type(),
            });
        }

        let job = Job {
            state: JobState::new(queue, mode),
            handler: Arc::new(handler),
        };
        let core_dyn = Arc::clone(&self.core) as Arc<dyn SignalJobs>;
        let parent: Weak<dyn SignalJobs> = Arc::downgrade(&core_dyn);
        let connection = Connection::new(Arc::downgrade(&job.state), parent);

        self.core.jobs.lock().unwrap().push(job);
        Ok(connection)
    }

    /// [`Self::connect()`] onto the default-priority global queue in
    /// [`NotificationMode::SingleUpdates`].
    ///
    /// # Errors
    ///
    /// [`DispatchError::BackendMismatch`] when this signal's group is not from the
    /// default backend.
    pub fn connect_default(
        &self,
        handler: impl Fn(A) + Send + Sync + 'static,
    ) -> Result<Connection, DispatchError> {
        self.connect(
            handler,
            global_queue(QueuePriority::Default),
            NotificationMode::SingleUpdates,
        )
    }

    /// Disconnects `connection`'s job from this signal. Idempotent: `true` at most
    /// once per job.
    pub fn disconnect(&self, connection: &mut Connection) -> bool { connection.disconnect() }

    /// Whether `connection` identifies a job registered on this signal.
    #[must_use]
    pub fn owns_connection(&self, connection: &Connection) -> bool {
        let core_dyn = Arc::clone(&self.core) as Arc<dyn SignalJobs>;
        let parent: Weak<dyn SignalJobs> = Arc::downgrade(&core_dyn);
        connection.is_child_of(&parent) && connection.connected()
    }

    /// Disables every currently-connected job without removing it. Handlers already
    /// mid-flight finish; deliveries still queued find their claim refused. The next
    /// fire re-enables jobs through its natural enable step.
    pub fn skip_all(&self) {
        let jobs = self.core.jobs.lock().unwrap();
        for job in jobs.iter() {
            job.state.disable();
        }
    }

    /// Fires the signal: every connected job receives `args` according to its
    /// [`NotificationMode`].
    ///
    /// Never blocks and never runs handlers inline; deliveries are queued through the
    /// signal's internal group onto each job's queue.
    pub fn emit(&self, args: A) {
        let jobs = self.core.jobs.lock().unwrap();
        for job in jobs.iter() {
            let previous_pending = job.state.pending.fetch_add(1, Ordering::SeqCst);

            // Schedule unless this job coalesces and a delivery is already in flight.
            if job.state.mode == NotificationMode::SingleUpdates || previous_pending < 1 {
                job.state.enable();

                let state = Arc::clone(&job.state);
                let handler = Arc::clone(&job.handler);
                let args = args.clone();
                let delivery = move || {
                    if state.try_enter() {
                        state.pending.fetch_sub(1, Ordering::SeqCst);
                        (*handler)(args);
                        state.leave();
                    }
                };

                if let Err(error) = self
                    .core
                    .group
                    .dispatch_async(delivery, &job.state.queue)
                {
                    // Unreachable through connect()'s backend check; trace and drop.
                    tracing::error!(%error, "signal delivery dropped");
                }
            } else {
                job.state.pending.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }
}

impl<A: Clone + Send + 'static> Default for Signal<A> {
    fn default() -> Self { Self::new() }
}

impl<A: Clone + Send + 'static> Drop for Signal<A> {
    /// Disconnects all jobs, then waits for in-flight deliveries to finish.
    fn drop(&mut self) {
        let mut jobs = self.core.jobs.lock().unwrap();
        for job in jobs.drain(..) {
            job.state.disable();
        }
        drop(jobs);
        self.core.group.wait_forever();
    }
}

impl<A: Clone + Send + 'static> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("jobs", &self.core.jobs.lock().unwrap().len())
            .field("backend_type", &self.core.group.backend_type())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{NotificationMode, Signal};
    use crate::{backend::BackendType,
                operation::Operation,
                pool::NaivePool,
                priority::QueuePriority,
                queue::{Queue, QueueImpl, serial_queue::create_serial_queue}};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Condvar, Mutex,
                    atomic::{AtomicUsize, Ordering}};
    use std::time::{Duration, Instant};

    fn wait_until(probe: impl Fn() -> bool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if probe() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        probe()
    }

    fn serial_queue(pool: &NaivePool, label: &str) -> Queue {
        create_serial_queue(
            label,
            Arc::new(pool.clone()),
            QueuePriority::Default,
            BackendType::Naive,
        )
    }

    #[test]
    fn test_single_updates_delivers_every_fire_in_order() {
        let pool = NaivePool::new();
        let queue = serial_queue(&pool, "signal-single");
        let signal: Signal<usize> = Signal::new();
        let observed = Arc::new(Mutex::new(Vec::new()));

        let observed_clone = observed.clone();
        let _connection = signal
            .connect(
                move |value| observed_clone.lock().unwrap().push(value),
                queue,
                NotificationMode::SingleUpdates,
            )
            .unwrap();

        for value in 0..20 {
            signal.emit(value);
        }

        assert!(wait_until(
            || observed.lock().unwrap().len() == 20,
            Duration::from_secs(5)
        ));
        assert_eq!(*observed.lock().unwrap(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_batch_updates_coalesce_while_handler_runs() {
        let pool = NaivePool::new();
        let queue = serial_queue(&pool, "signal-batch");
        let signal: Signal<usize> = Signal::new();

        let invocations = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new((Mutex::new(false), Condvar::new()));

        let invocations_clone = invocations.clone();
        let gate_clone = gate.clone();
        let _connection = signal
            .connect(
                move |_value| {
                    invocations_clone.fetch_add(1, Ordering::SeqCst);
                    let (open, signal_cv) = &*gate_clone;
                    let mut open = open.lock().unwrap();
                    while !*open {
                        open = signal_cv.wait(open).unwrap();
                    }
                },
                queue,
                NotificationMode::BatchUpdates,
            )
            .unwrap();

        signal.emit(0);
        assert!(wait_until(
            || invocations.load(Ordering::SeqCst) == 1,
            Duration::from_secs(5)
        ));

        // The handler is now stuck on the gate; these all coalesce into one follow-up.
        for value in 1..=8 {
            signal.emit(value);
        }

        {
            let (open, signal_cv) = &*gate;
            *open.lock().unwrap() = true;
            signal_cv.notify_all();
        }

        assert!(wait_until(
            || invocations.load(Ordering::SeqCst) == 2,
            Duration::from_secs(5)
        ));
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_skip_all_refuses_already_queued_deliveries() {
        let pool = NaivePool::new();
        let queue = serial_queue(&pool, "signal-skip");
        let signal: Signal<usize> = Signal::new();
        let invocations = Arc::new(AtomicUsize::new(0));

        let invocations_clone = invocations.clone();
        let _connection = signal
            .connect(
                move |_value| {
                    invocations_clone.fetch_add(1, Ordering::SeqCst);
                },
                queue.clone(),
                NotificationMode::SingleUpdates,
            )
            .unwrap();

        // Hold the serial queue hostage so deliveries pile up behind the blocker.
        let (blocker_sender, blocker_receiver) = std::sync::mpsc::channel::<()>();
        queue.dispatch_async(move || {
            blocker_receiver.recv_timeout(Duration::from_secs(5)).ok();
        });

        signal.emit(1);
        signal.emit(2);
        signal.skip_all();
        blocker_sender.send(()).unwrap();

        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(invocations.load(Ordering::SeqCst), 0);

        // The next fire re-enables the job through its natural enable step.
        signal.emit(3);
        assert!(wait_until(
            || invocations.load(Ordering::SeqCst) == 1,
            Duration::from_secs(5)
        ));
    }

    #[test]
    fn test_connect_rejects_foreign_queue() {
        struct ForeignQueueImpl;

        impl QueueImpl for ForeignQueueImpl {
            fn dispatch_async_operation(&self, _op: Operation) {
                unreachable!("a mismatched queue must never receive work");
            }

            fn label(&self) -> &str { "foreign" }

            fn priority(&self) -> QueuePriority { QueuePriority::Default }

            fn backend_type(&self) -> BackendType { BackendType::Libdispatch }
        }

        let signal: Signal<()> = Signal::new();
        let result = signal.connect(
            |()| {},
            Queue::new(Arc::new(ForeignQueueImpl)),
            NotificationMode::SingleUpdates,
        );
        assert!(matches!(
            result,
            Err(crate::error::DispatchError::BackendMismatch { .. })
        ));
    }

    #[test]
    fn test_emit_with_tuple_arguments_snapshots_per_fire() {
        let pool = NaivePool::new();
        let queue = serial_queue(&pool, "signal-tuple");
        let signal: Signal<(String, u64)> = Signal::new();
        let observed = Arc::new(Mutex::new(Vec::new()));

        let observed_clone = observed.clone();
        let _connection = signal
            .connect(
                move |(name, size)| observed_clone.lock().unwrap().push((name, size)),
                queue,
                NotificationMode::SingleUpdates,
            )
            .unwrap();

        signal.emit(("alpha".into(), 1));
        signal.emit(("beta".into(), 2));

        assert!(wait_until(
            || observed.lock().unwrap().len() == 2,
            Duration::from_secs(5)
        ));
        assert_eq!(
            *observed.lock().unwrap(),
            vec![("alpha".to_string(), 1), ("beta".to_string(), 2)]
        );
    }
}
