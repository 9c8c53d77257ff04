// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Batch ownership of scoped connections. See [`ConnectionManager`].

use super::{connection::{Connection, ScopedConnection},
            signal_core::Signal};
use std::{fmt, ops::AddAssign, sync::Mutex};

/// Owns a set of scoped connections and disconnects them together.
///
/// The typical holder is an object that connects several of its methods to signals:
/// the manager lives as a field, [`add()`] collects each connection, and dropping the
/// object (or calling [`reset_connections()`]) severs them all - including any
/// reference cycles formed by handlers capturing the object.
///
/// [`add()`]: Self::add
/// [`reset_connections()`]: Self::reset_connections
#[derive(Default)]
pub struct ConnectionManager {
    connections: Mutex<Vec<ScopedConnection>>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Takes ownership of `connection`, disconnecting it when the manager is reset or
    /// dropped.
    pub fn add(&self, connection: Connection) {
        self.connections.lock().unwrap().push(connection.into());
    }

    /// Disconnects and releases every owned connection.
    pub fn reset_connections(&self) {
        self.connections.lock().unwrap().clear();
    }

    /// Disconnects and releases only the owned connections bound to `signal`.
    pub fn reset_connections_with<A: Clone + Send + 'static>(&self, signal: &Signal<A>) {
        self.connections
            .lock()
            .unwrap()
            .retain(|scoped| {
                !scoped
                    .connection()
                    .is_some_and(|connection| signal.owns_connection(connection))
            });
    }

    /// Number of currently-owned connections.
    #[must_use]
    pub fn len(&self) -> usize { self.connections.lock().unwrap().len() }

    /// Whether the manager currently owns no connections.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl AddAssign<Connection> for ConnectionManager {
    fn add_assign(&mut self, connection: Connection) { self.add(connection); }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.len())
            .finish()
    }
}
