//! Tab-list handling: identity rewriting and the per-session strategy that
//! decides what the client's player list shows.

use crate::{
    protocol::packet::{
        player_info::{PlayerInfoActions, ProfileProperty},
        Packet, PlayerInfoRemove, PlayerInfoUpdate,
    },
    session::ClientConnection,
};
use ahash::AHashSet;

/// How a player is known to clients, as opposed to how a backend in
/// offline mode knows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyIdentity {
    pub unique_id: u128,
    pub properties: Vec<ProfileProperty>,
}

/// Resolves backend-side player uuids to proxy-side identities.
pub trait PlayerDirectory: Send + Sync {
    fn resolve(&self, backend_id: u128) -> Option<ProxyIdentity>;
}

/// Knows nobody; every entry passes through with its backend identity.
#[derive(Debug, Default)]
pub struct EmptyDirectory;

impl PlayerDirectory for EmptyDirectory {
    fn resolve(&self, _backend_id: u128) -> Option<ProxyIdentity> {
        None
    }
}

/// Replaces backend identities with proxy-side ones. Added players also
/// get the proxy-side profile properties.
pub fn rewrite_update(update: &mut PlayerInfoUpdate, directory: &dyn PlayerDirectory) {
    for entry in &mut update.entries {
        let Some(identity) = directory.resolve(entry.uuid) else {
            continue;
        };
        entry.uuid = identity.unique_id;
        if update.actions.contains(PlayerInfoActions::ADD_PLAYER) {
            if let Some(profile) = &mut entry.profile {
                profile.properties = identity.properties;
            }
        }
    }
}

pub fn rewrite_remove(remove: &mut PlayerInfoRemove, directory: &dyn PlayerDirectory) {
    for uuid in &mut remove.uuids {
        if let Some(identity) = directory.resolve(*uuid) {
            *uuid = identity.unique_id;
        }
    }
}

/// Decides what tab-list changes reach the client.
///
/// Receives packets whose identities are already rewritten.
pub trait TabList: Send {
    fn on_update(&mut self, update: PlayerInfoUpdate, client: &dyn ClientConnection);

    fn on_remove(&mut self, remove: PlayerInfoRemove, client: &dyn ClientConnection);

    /// The player is leaving the current backend.
    fn on_server_change(&mut self, client: &dyn ClientConnection);
}

/// Shows whatever the current backend lists, and nothing from earlier
/// backends.
#[derive(Debug, Default)]
pub struct ServerUnique {
    listed: AHashSet<u128>,
}

impl ServerUnique {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listed(&self) -> &AHashSet<u128> {
        &self.listed
    }
}

impl TabList for ServerUnique {
    fn on_update(&mut self, update: PlayerInfoUpdate, client: &dyn ClientConnection) {
        if update.actions.contains(PlayerInfoActions::ADD_PLAYER) {
            self.listed
                .extend(update.entries.iter().map(|entry| entry.uuid));
        }
        client.send_packet(Packet::from(update));
    }

    fn on_remove(&mut self, remove: PlayerInfoRemove, client: &dyn ClientConnection) {
        for uuid in &remove.uuids {
            self.listed.remove(uuid);
        }
        client.send_packet(Packet::from(remove));
    }

    fn on_server_change(&mut self, client: &dyn ClientConnection) {
        if self.listed.is_empty() {
            return;
        }
        let uuids = self.listed.drain().collect();
        client.send_packet(Packet::from(PlayerInfoRemove { uuids }));
    }
}
