// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Repeating-operation driver built on a worker pool. See [`Timer`].

use crate::{backend::BackendType, operation::Operation, pool::WorkerPool, queue::Queue};
use std::{fmt,
          sync::{Arc, Mutex},
          thread,
          time::Duration};

/// Advisory hint for how precisely a timer should honor its interval.
///
/// Backends that batch or defer timer wakeups may trade precision for efficiency. The
/// naive backend always fires as precisely as a sleeping thread allows and ignores the
/// hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerPrecision {
    /// Considerable drift is acceptable.
    Coarse,
    /// Backend-default precision.
    #[default]
    Default,
    /// Fire as close to the interval as the backend can manage.
    Precise,
}

/// A repeating timer submitting its handler to a target queue.
///
/// The driver is a pool task that announces itself blocked (so it cannot starve the
/// pool), then alternates between dispatching the handler and sleeping for the
/// interval. Each iteration snapshots `interval` / `handler` / `target` under the
/// timer's lock and releases the lock before dispatching or sleeping, so mutations take
/// effect no later than the following iteration and no internal lock is ever held
/// across user-adjacent work.
///
/// [`stop()`] is a flag flip: it does not wait, and the final already-scheduled handler
/// iteration may still execute. Dropping the timer stops it the same way. [`start()`]
/// while running replaces the driver: the previous one observes a stale epoch at its
/// next iteration and exits, so at most one driver ticks durably.
///
/// [`start()`]: Self::start
/// [`stop()`]: Self::stop
pub struct Timer {
    state: Arc<TimerState>,
}

struct TimerState {
    backend_type: BackendType,
    pool: Arc<dyn WorkerPool>,
    inner: Mutex<TimerInner>,
}

struct TimerInner {
    interval: Duration,
    handler: Option<Arc<dyn Fn() + Send + Sync + 'static>>,
    target: Queue,
    running: bool,
    /// Incremented by every [`Timer::start_after()`]; a driver holding a stale epoch
    /// exits at its next iteration.
    epoch: u64,
}

impl Timer {
    /// Creates a stopped timer firing every `interval` onto `target`, driven by
    /// `pool`. Host backends pass their own pool proxy; in-crate callers go through
    /// [`create_timer()`] / [`create_timer_on()`].
    ///
    /// [`create_timer()`]: crate::create_timer
    /// [`create_timer_on()`]: crate::create_timer_on
    #[must_use]
    pub fn new(
        interval: Duration,
        target: Queue,
        pool: Arc<dyn WorkerPool>,
        backend_type: BackendType,
    ) -> Self {
        Self {
            state: Arc::new(TimerState {
                backend_type,
                pool,
                inner: Mutex::new(TimerInner {
                    interval,
                    handler: None,
                    target,
                    running: false,
                    epoch: 0,
                }),
            }),
        }
    }

    /// The backend family this timer belongs to.
    #[must_use]
    pub fn backend_type(&self) -> BackendType { self.state.backend_type }

    /// Changes the firing interval. Takes effect no later than the iteration after the
    /// current one.
    pub fn set_interval(&self, interval: Duration) {
        self.state.inner.lock().unwrap().interval = interval;
    }

    /// Installs the handler dispatched on every tick.
    pub fn set_handler(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.state.inner.lock().unwrap().handler = Some(Arc::new(handler));
    }

    /// Redirects future ticks to a different queue.
    pub fn set_target_queue(&self, target: Queue) {
        self.state.inner.lock().unwrap().target = target;
    }

    /// Advisory precision hint; the naive backend ignores it.
    pub fn set_latency(&self, _precision: TimerPrecision) {}

    /// Starts the timer; the first tick is dispatched immediately.
    pub fn start(&self) { self.start_after(Duration::ZERO); }

    /// Starts the timer; the first tick is dispatched once `delay` elapses, then the
    /// driver sleeps one interval between ticks.
    pub fn start_after(&self, delay: Duration) {
        let (epoch, priority) = {
            let mut inner = self.state.inner.lock().unwrap();
            inner.running = true;
            inner.epoch += 1;
            (inner.epoch, inner.target.priority())
        };

        let state = Arc::clone(&self.state);
        self.state
            .pool
            .execute(Operation::new(move || state.drive(epoch, delay)), priority);
    }

    /// Stops the timer. Does not wait: an already-scheduled handler iteration may
    /// still execute.
    pub fn stop(&self) { self.state.inner.lock().unwrap().running = false; }

    /// Whether the timer is currently started.
    #[must_use]
    pub fn is_running(&self) -> bool { self.state.inner.lock().unwrap().running }
}

impl Drop for Timer {
    fn drop(&mut self) { self.stop(); }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.state.inner.lock().unwrap();
        f.debug_struct("Timer")
            .field("interval", &inner.interval)
            .field("running", &inner.running)
            .field("target", &inner.target.label())
            .finish_non_exhaustive()
    }
}

impl TimerState {
    /// The driver task: runs on a pool worker for the timer's whole lifetime, hence
    /// the blocked-thread bracket around the loop.
    fn drive(self: Arc<Self>, epoch: u64, delay: Duration) {
        self.pool.notify_thread_blocked();
        thread::sleep(delay);

        loop {
            let snapshot = {
                let inner = self.inner.lock().unwrap();
                if inner.running && inner.epoch == epoch {
                    Some((inner.handler.clone(), inner.interval, inner.target.clone()))
                } else {
                    None
                }
            };
            let Some((handler, interval, target)) = snapshot else {
                break;
            };

            if let Some(handler) = handler {
                // Dispatch, don't wait: a slow handler delays nothing but itself.
                target.dispatch_async(move || (*handler)());
            }
            thread::sleep(interval);
        }

        self.pool.notify_thread_unblocked();
    }
}
