use crate::protocol::packet::RawPacket;
use serde::{Deserialize, Serialize};

/// Wrapper for a Minecraft network entity ID.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(i32);

impl EntityId {
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn as_i32(self) -> i32 {
        self.0
    }
}

/// The id the player's own entity has on each side of the proxy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EntityIdPair {
    /// Assigned by the first backend; the client keeps it for the session.
    pub client: EntityId,
    /// Assigned by the current backend.
    pub server: EntityId,
}

/// Rewrites references to the player's entity inside clientbound packets.
///
/// Swaps `server_id` for `client_id` (and back) in place, wherever the
/// packet layout for `protocol_version` carries an entity id.
pub trait EntityRewriter: Send + Sync {
    fn rewrite_clientbound(
        &self,
        packet: &mut RawPacket,
        server_id: EntityId,
        client_id: EntityId,
        protocol_version: i32,
    );
}
