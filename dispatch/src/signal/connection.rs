// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Weak handles to signal subscriptions. See [`Connection`] and [`ScopedConnection`].

use super::signal_core::{JobState, SignalJobs};
use std::{fmt, sync::Weak};

/// Weak handle identifying one job inside a signal.
///
/// Holds a weak identity to the job's control block and a weak reference to the parent
/// signal - never an owning pointer, so a forgotten connection cannot keep a signal (or
/// its handlers' captures) alive.
///
/// Cloning yields another handle to the *same* job; disconnecting through any clone
/// disconnects them all.
#[derive(Clone)]
pub struct Connection {
    id: Weak<JobState>,
    parent: Weak<dyn SignalJobs>,
}

impl Connection {
    pub(crate) fn new(id: Weak<JobState>, parent: Weak<dyn SignalJobs>) -> Self {
        Self { id, parent }
    }

    /// Whether the job is still registered on its signal.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.parent
            .upgrade()
            .is_some_and(|signal| signal.contains_job(&self.id))
    }

    /// Removes the job from its signal. Idempotent: returns `true` at most once per
    /// job (across all clones of this connection); later calls, and calls after the
    /// signal itself was dropped, return `false`.
    ///
    /// A handler currently mid-flight finishes; no further deliveries reach it.
    pub fn disconnect(&mut self) -> bool {
        match self.parent.upgrade() {
            Some(signal) => signal.remove_job(&self.id),
            None => false,
        }
    }

    /// Whether this connection points into the signal identified by `parent`.
    pub(crate) fn is_child_of(&self, parent: &Weak<dyn SignalJobs>) -> bool {
        Weak::ptr_eq(&self.parent, parent)
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.id, &other.id) && Weak::ptr_eq(&self.parent, &other.parent)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.connected())
            .finish()
    }
}

/// A [`Connection`] that disconnects when it goes out of scope.
///
/// This is the cycle-breaker recommended for objects whose handlers capture a strong
/// reference back to the object: the object owns the scoped connection, so dropping the
/// object severs the subscription and with it the reference cycle.
pub struct ScopedConnection {
    connection: Option<Connection>,
}

impl ScopedConnection {
    /// Releases the connection without disconnecting it.
    #[must_use]
    pub fn take(mut self) -> Connection {
        self.connection
            .take()
            .unwrap_or_else(|| unreachable!("connection is only vacated by take()"))
    }

    /// Whether the owned job is still registered.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(Connection::connected)
    }

    pub(crate) fn connection(&self) -> Option<&Connection> { self.connection.as_ref() }
}

impl From<Connection> for ScopedConnection {
    fn from(connection: Connection) -> Self {
        Self {
            connection: Some(connection),
        }
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.disconnect();
        }
    }
}

impl fmt::Debug for ScopedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedConnection")
            .field("connected", &self.connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::ScopedConnection;
    use crate::{backend::BackendType,
                pool::NaivePool,
                priority::QueuePriority,
                queue::{Queue, serial_queue::create_serial_queue},
                signal::signal_core::{NotificationMode, Signal}};
    use std::sync::{Arc,
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
    fn test_disconnect_is_idempotent() {
        let pool = NaivePool::new();
        let queue = serial_queue(&pool, "conn-idempotent");
        let signal: Signal<()> = Signal::new();

        let mut connection = signal
            .connect(|()| {}, queue, NotificationMode::SingleUpdates)
            .unwrap();
        assert!(connection.connected());

        assert!(connection.disconnect());
        assert!(!connection.connected());
        assert!(!connection.disconnect());
        assert!(!connection.disconnect());
    }

    #[test]
    fn test_disconnect_stops_further_deliveries() {
        let pool = NaivePool::new();
        let queue = serial_queue(&pool, "conn-stop");
        let signal: Signal<()> = Signal::new();
        let invocations = Arc::new(AtomicUsize::new(0));

        let invocations_clone = invocations.clone();
        let mut connection = signal
            .connect(
                move |()| {
                    invocations_clone.fetch_add(1, Ordering::SeqCst);
                },
                queue,
                NotificationMode::SingleUpdates,
            )
            .unwrap();

        signal.emit(());
        assert!(wait_until(
            || invocations.load(Ordering::SeqCst) == 1,
            Duration::from_secs(5)
        ));

        assert!(connection.disconnect());
        signal.emit(());
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_connected_goes_false_when_signal_drops() {
        let pool = NaivePool::new();
        let queue = serial_queue(&pool, "conn-signal-drop");
        let signal: Signal<()> = Signal::new();

        let mut connection = signal
            .connect(|()| {}, queue, NotificationMode::SingleUpdates)
            .unwrap();
        assert!(connection.connected());

        drop(signal);
        assert!(!connection.connected());
        assert!(!connection.disconnect());
    }

    #[test]
    fn test_scoped_connection_disconnects_on_drop() {
        let pool = NaivePool::new();
        let queue = serial_queue(&pool, "conn-scoped");
        let signal: Signal<()> = Signal::new();
        let invocations = Arc::new(AtomicUsize::new(0));

        let invocations_clone = invocations.clone();
        let scoped: ScopedConnection = signal
            .connect(
                move |()| {
                    invocations_clone.fetch_add(1, Ordering::SeqCst);
                },
                queue,
                NotificationMode::SingleUpdates,
            )
            .unwrap()
            .into();

        signal.emit(());
        assert!(wait_until(
            || invocations.load(Ordering::SeqCst) == 1,
            Duration::from_secs(5)
        ));

        drop(scoped);
        signal.emit(());
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scoped_connection_take_keeps_the_job_alive() {
        let pool = NaivePool::new();
        let queue = serial_queue(&pool, "conn-take");
        let signal: Signal<()> = Signal::new();

        let scoped: ScopedConnection = signal
            .connect(|()| {}, queue, NotificationMode::SingleUpdates)
            .unwrap()
            .into();

        let connection = scoped.take();
        assert!(connection.connected());
    }
}
