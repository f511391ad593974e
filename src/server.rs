//! Backend servers and the per-backend connection state.

use crate::keep_alive::KeepAliveLedger;
use ahash::AHashSet;
use std::{
    collections::VecDeque,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

/// A backend server known to the proxy, with the players it currently hosts.
#[derive(Debug)]
pub struct ServerInfo {
    name: String,
    address: String,
    players: Mutex<AHashSet<String>>,
}

pub type ServerRef = Arc<ServerInfo>;

impl ServerInfo {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            players: Mutex::new(AHashSet::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn add_player(&self, player: &str) {
        self.players
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(player.to_owned());
    }

    /// Returns whether the player was on this server.
    pub fn remove_player(&self, player: &str) -> bool {
        self.players
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(player)
    }

    pub fn has_player(&self, player: &str) -> bool {
        self.players
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(player)
    }
}

impl fmt::Display for ServerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The link to the backend a bridge is currently serving.
#[derive(Debug)]
pub struct ServerConnection {
    server: ServerRef,
    obsolete: Arc<AtomicBool>,
    keep_alives: KeepAliveLedger,
}

impl ServerConnection {
    pub fn new(server: ServerRef, keep_alives: KeepAliveLedger) -> Self {
        Self {
            server,
            obsolete: Arc::new(AtomicBool::new(false)),
            keep_alives,
        }
    }

    pub fn server(&self) -> &ServerRef {
        &self.server
    }

    pub fn is_obsolete(&self) -> bool {
        self.obsolete.load(Ordering::Acquire)
    }

    /// Marks the connection as superseded. Returns whether it already was.
    pub fn mark_obsolete(&self) -> bool {
        self.obsolete.swap(true, Ordering::AcqRel)
    }

    /// A handle other tasks can use to observe or set obsolescence.
    pub fn obsolete_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.obsolete)
    }

    pub fn keep_alives(&self) -> &KeepAliveLedger {
        &self.keep_alives
    }

    pub fn keep_alives_mut(&mut self) -> &mut KeepAliveLedger {
        &mut self.keep_alives
    }
}

/// Picks the server a player moves to when their backend goes away.
pub trait ServerSelector: Send {
    fn next_candidate(&mut self, current: &ServerRef) -> Option<ServerRef>;
}

/// Tries the configured servers in priority order, each at most once,
/// skipping whichever server the player is leaving.
#[derive(Debug, Default)]
pub struct JoinQueue {
    queue: VecDeque<ServerRef>,
}

impl JoinQueue {
    pub fn new(servers: Vec<ServerRef>) -> Self {
        Self {
            queue: servers.into(),
        }
    }

    pub fn remaining(&self) -> impl Iterator<Item = &ServerRef> {
        self.queue.iter()
    }
}

impl ServerSelector for JoinQueue {
    fn next_candidate(&mut self, current: &ServerRef) -> Option<ServerRef> {
        while let Some(candidate) = self.queue.pop_front() {
            if candidate.name() != current.name() {
                return Some(candidate);
            }
        }
        None
    }
}

/// Remembers which server a player was last on, for their next login.
pub trait ReconnectHandler: Send + Sync {
    fn set_server(&self, player: &str, server: &ServerRef);
}

/// Forgets everything.
#[derive(Debug, Default)]
pub struct NoReconnect;

impl ReconnectHandler for NoReconnect {
    fn set_server(&self, _player: &str, _server: &ServerRef) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(name: &str) -> ServerRef {
        Arc::new(ServerInfo::new(name, "127.0.0.1:25565"))
    }

    #[test]
    fn join_queue_skips_current_and_never_repeats() {
        let lobby = server("lobby");
        let mut queue = JoinQueue::new(vec![server("lobby"), server("hub"), server("pvp")]);
        assert_eq!(queue.next_candidate(&lobby).unwrap().name(), "hub");
        assert_eq!(queue.next_candidate(&lobby).unwrap().name(), "pvp");
        assert!(queue.next_candidate(&lobby).is_none());
    }

    #[test]
    fn obsolete_flag_is_sticky() {
        let connection = ServerConnection::new(server("lobby"), KeepAliveLedger::with_timeout_ms(0));
        let flag = connection.obsolete_flag();
        assert!(!connection.is_obsolete());
        assert!(!connection.mark_obsolete());
        assert!(connection.mark_obsolete());
        assert!(flag.load(Ordering::Acquire));
    }

    #[test]
    fn roster_tracks_players() {
        let lobby = server("lobby");
        lobby.add_player("Steve");
        assert!(lobby.has_player("Steve"));
        assert!(lobby.remove_player("Steve"));
        assert!(!lobby.remove_player("Steve"));
    }
}
