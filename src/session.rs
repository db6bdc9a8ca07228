//! Session table
//!
//! Maps a live connection to at most one authenticated user. Purely
//! ephemeral: bindings are never persisted, never shared across
//! connections, and never outlive the connection they belong to.

use rustc_hash::FxHashMap;

use crate::core_types::ConnId;

#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: FxHashMap<ConnId, String>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection to a username. A second login on the same
    /// connection rebinds it.
    pub fn bind(&mut self, conn_id: ConnId, username: impl Into<String>) {
        self.sessions.insert(conn_id, username.into());
    }

    /// Username bound to this connection, if any.
    pub fn resolve(&self, conn_id: ConnId) -> Option<&str> {
        self.sessions.get(&conn_id).map(String::as_str)
    }

    /// Drop the binding, returning the username that was bound.
    pub fn unbind(&mut self, conn_id: ConnId) -> Option<String> {
        self.sessions.remove(&conn_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_resolve_unbind() {
        let mut sessions = SessionTable::new();
        assert!(sessions.resolve(1).is_none());

        sessions.bind(1, "alice");
        assert_eq!(sessions.resolve(1), Some("alice"));
        assert_eq!(sessions.len(), 1);

        assert_eq!(sessions.unbind(1), Some("alice".to_string()));
        assert!(sessions.resolve(1).is_none());
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_rebind_replaces_user() {
        let mut sessions = SessionTable::new();
        sessions.bind(1, "alice");
        sessions.bind(1, "bob");
        assert_eq!(sessions.resolve(1), Some("bob"));
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_connections_are_independent() {
        let mut sessions = SessionTable::new();
        sessions.bind(1, "alice");
        sessions.bind(2, "bob");

        sessions.unbind(1);
        assert!(sessions.resolve(1).is_none());
        assert_eq!(sessions.resolve(2), Some("bob"));
    }
}
