use dashmap::DashMap;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use super::connection::{ConnectionHandle, ConnectionId};

const MAX_ROOM_ID_LEN: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid room id '{0}'")]
    InvalidRoomId(String),
    #[error("unknown connection '{0}'")]
    UnknownConnection(ConnectionId),
}

struct Member {
    handle: ConnectionHandle,
    rooms: HashSet<String>,
}

/// Tracks live connections and the rooms they joined.
///
/// Both directions of the membership live in sharded maps. Mutations lock the
/// connection entry first and the room entry second; reads never hold a room
/// entry while touching the connection map, so the two orders cannot deadlock.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Member>,
    rooms: DashMap<String, HashSet<ConnectionId>>,
}

pub fn validate_room_id(room_id: &str) -> Result<(), RegistryError> {
    if room_id.trim().is_empty()
        || room_id.len() > MAX_ROOM_ID_LEN
        || room_id.chars().any(char::is_control)
    {
        return Err(RegistryError::InvalidRoomId(room_id.escape_debug().to_string()));
    }
    Ok(())
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly opened connection with an empty room set.
    /// Re-registering an id replaces the previous entry.
    pub fn register(&self, handle: ConnectionHandle) {
        let id = handle.id().clone();
        self.remove(&id);
        self.connections.insert(id.clone(), Member { handle, rooms: HashSet::new() });
        debug!("Registered connection {}", id);
    }

    /// Returns true if the connection was not in the room yet.
    pub fn join(&self, connection_id: &ConnectionId, room_id: &str) -> Result<bool, RegistryError> {
        validate_room_id(room_id)?;
        let mut member = self
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| RegistryError::UnknownConnection(connection_id.clone()))?;
        if !member.rooms.insert(room_id.to_string()) {
            return Ok(false);
        }
        self.rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(connection_id.clone());
        Ok(true)
    }

    /// Returns true if the connection was in the room. Unknown connections are a no-op.
    pub fn leave(&self, connection_id: &ConnectionId, room_id: &str) -> bool {
        let Some(mut member) = self.connections.get_mut(connection_id) else {
            return false;
        };
        if !member.rooms.remove(room_id) {
            return false;
        }
        self.detach(connection_id, room_id);
        true
    }

    /// Leave every room but keep the connection registered.
    pub fn leave_all(&self, connection_id: &ConnectionId) -> Vec<String> {
        let Some(mut member) = self.connections.get_mut(connection_id) else {
            return Vec::new();
        };
        let rooms: Vec<String> = member.rooms.drain().collect();
        for room_id in &rooms {
            self.detach(connection_id, room_id);
        }
        rooms
    }

    /// Purge the connection from the registry and from all its rooms.
    /// Returns the handle if the connection was still tracked.
    pub fn remove(&self, connection_id: &ConnectionId) -> Option<ConnectionHandle> {
        let (_, member) = self.connections.remove(connection_id)?;
        for room_id in &member.rooms {
            self.detach(connection_id, room_id);
        }
        debug!("Removed connection {} from {} room(s)", connection_id, member.rooms.len());
        Some(member.handle)
    }

    /// Point-in-time copy of the room's member handles.
    pub fn members_of(&self, room_id: &str) -> Result<Vec<ConnectionHandle>, RegistryError> {
        validate_room_id(room_id)?;
        let ids: Vec<ConnectionId> = match self.rooms.get(room_id) {
            Some(members) => members.iter().cloned().collect(),
            None => return Ok(Vec::new()),
        };
        // A connection being removed concurrently may still be listed in the
        // room; it is skipped once its own entry is gone.
        Ok(ids
            .iter()
            .filter_map(|id| self.connections.get(id).map(|m| m.handle.clone()))
            .collect())
    }

    pub fn rooms_of(&self, connection_id: &ConnectionId) -> Vec<String> {
        let mut rooms: Vec<String> = self
            .connections
            .get(connection_id)
            .map(|m| m.rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Signal every tracked connection to close, e.g. on server shutdown.
    pub fn close_all(&self) -> usize {
        let handles: Vec<ConnectionHandle> = self
            .connections
            .iter()
            .map(|m| m.handle.clone())
            .collect();
        for handle in &handles {
            handle.close();
        }
        handles.len()
    }

    fn detach(&self, connection_id: &ConnectionId, room_id: &str) {
        if let Some(mut members) = self.rooms.get_mut(room_id) {
            members.remove(connection_id);
        }
        self.rooms.remove_if(room_id, |_, members| members.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::connection::testing::FakeConnection;
    use crate::fanout::connection::Connection;
    use std::sync::Arc;

    fn ids(handles: &[ConnectionHandle]) -> Vec<String> {
        let mut ids: Vec<String> = handles.iter().map(|h| h.id().to_string()).collect();
        ids.sort();
        ids
    }

    fn registry_with(conns: &[&str]) -> ConnectionRegistry {
        let registry = ConnectionRegistry::new();
        for id in conns {
            registry.register(FakeConnection::open(id));
        }
        registry
    }

    #[test]
    fn join_is_bidirectional_and_idempotent() {
        let registry = registry_with(&["c1"]);
        let c1 = ConnectionId::from("c1");

        assert_eq!(registry.join(&c1, "r1"), Ok(true));
        assert_eq!(registry.join(&c1, "r1"), Ok(false));
        assert_eq!(ids(&registry.members_of("r1").unwrap()), vec!["c1"]);
        assert_eq!(registry.rooms_of(&c1), vec!["r1"]);
    }

    #[test]
    fn join_requires_a_registered_connection() {
        let registry = ConnectionRegistry::new();
        let ghost = ConnectionId::from("ghost");
        assert_eq!(
            registry.join(&ghost, "r1"),
            Err(RegistryError::UnknownConnection(ghost.clone()))
        );
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn leave_on_unknown_connection_is_a_noop() {
        let registry = ConnectionRegistry::new();
        let ghost = ConnectionId::from("ghost");
        assert!(!registry.leave(&ghost, "r1"));
        assert!(registry.leave_all(&ghost).is_empty());
        assert!(registry.remove(&ghost).is_none());
    }

    #[test]
    fn leave_drops_membership_and_empty_rooms() {
        let registry = registry_with(&["c1", "c2"]);
        let (c1, c2) = (ConnectionId::from("c1"), ConnectionId::from("c2"));
        registry.join(&c1, "r1").unwrap();
        registry.join(&c2, "r1").unwrap();

        assert!(registry.leave(&c2, "r1"));
        assert_eq!(ids(&registry.members_of("r1").unwrap()), vec!["c1"]);
        assert!(registry.rooms_of(&c2).is_empty());

        assert!(registry.leave(&c1, "r1"));
        assert_eq!(registry.room_count(), 0);
        assert!(registry.members_of("r1").unwrap().is_empty());
    }

    #[test]
    fn remove_purges_every_room() {
        let registry = registry_with(&["c1", "c2"]);
        let (c1, c2) = (ConnectionId::from("c1"), ConnectionId::from("c2"));
        for room in ["r1", "r2", "r3"] {
            registry.join(&c1, room).unwrap();
        }
        registry.join(&c2, "r2").unwrap();

        assert!(registry.remove(&c1).is_some());
        assert!(!registry.contains(&c1));
        assert!(registry.members_of("r1").unwrap().is_empty());
        assert_eq!(ids(&registry.members_of("r2").unwrap()), vec!["c2"]);
        assert_eq!(registry.room_count(), 1);
    }

    #[test]
    fn leave_all_keeps_the_connection_registered() {
        let registry = registry_with(&["c1"]);
        let c1 = ConnectionId::from("c1");
        registry.join(&c1, "r1").unwrap();
        registry.join(&c1, "r2").unwrap();

        let mut left = registry.leave_all(&c1);
        left.sort();
        assert_eq!(left, vec!["r1", "r2"]);
        assert!(registry.contains(&c1));
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn snapshot_is_not_a_live_view() {
        let registry = registry_with(&["c1", "c2"]);
        let (c1, c2) = (ConnectionId::from("c1"), ConnectionId::from("c2"));
        registry.join(&c1, "r1").unwrap();
        let snapshot = registry.members_of("r1").unwrap();

        registry.join(&c2, "r1").unwrap();
        registry.remove(&c1);
        assert_eq!(ids(&snapshot), vec!["c1"]);
        assert_eq!(ids(&registry.members_of("r1").unwrap()), vec!["c2"]);
    }

    #[test]
    fn rejects_malformed_room_ids() {
        let registry = registry_with(&["c1"]);
        let c1 = ConnectionId::from("c1");
        assert!(matches!(registry.members_of(""), Err(RegistryError::InvalidRoomId(_))));
        assert!(matches!(registry.members_of("r\n1"), Err(RegistryError::InvalidRoomId(_))));
        assert!(matches!(registry.join(&c1, &"x".repeat(300)), Err(RegistryError::InvalidRoomId(_))));
    }

    #[test]
    fn close_all_closes_every_handle() {
        let registry = ConnectionRegistry::new();
        let c1 = FakeConnection::open("c1");
        let c2 = FakeConnection::open("c2");
        registry.register(c1.clone());
        registry.register(c2.clone());

        assert_eq!(registry.close_all(), 2);
        assert!(!c1.is_open());
        assert!(!c2.is_open());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_join_leave_has_no_lost_updates() {
        let registry = Arc::new(ConnectionRegistry::new());
        for i in 0..200 {
            registry.register(FakeConnection::open(&format!("c{i}")));
        }

        let mut tasks = Vec::new();
        for i in 0..200 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let id = ConnectionId::from(format!("c{i}").as_str());
                for _ in 0..10 {
                    registry.join(&id, "lobby").unwrap();
                    registry.join(&id, "side").unwrap();
                    registry.leave(&id, "side");
                    tokio::task::yield_now().await;
                    if i % 2 == 1 {
                        registry.leave(&id, "lobby");
                    }
                }
                if i % 5 == 0 {
                    registry.remove(&id);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let expected: Vec<String> = {
            let mut v: Vec<String> = (0..200)
                .filter(|i| i % 2 == 0 && i % 5 != 0)
                .map(|i| format!("c{i}"))
                .collect();
            v.sort();
            v
        };
        assert_eq!(ids(&registry.members_of("lobby").unwrap()), expected);
        assert!(registry.members_of("side").unwrap().is_empty());
        assert_eq!(registry.room_count(), 1);
    }
}
