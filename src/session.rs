//! The client side of a bridged session and the state it owns.

use crate::{
    entity_id::{EntityIdPair, EntityRewriter},
    protocol::packet::{play::BOSS_BAR_REMOVE, BossBar, Packet, RawPacket},
    scoreboard::Scoreboard,
    server::{ServerRef, ServerSelector},
    tab_list::TabList,
};
use ahash::AHashSet;
use std::sync::Arc;

/// Why the proxy moves a player to another server.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectReason {
    ServerDownRedirect,
    KickRedirect,
}

/// The path toward the player's client.
///
/// Every method only enqueues work for the connection's own writer and
/// must not block.
pub trait ClientConnection: Send {
    fn send_packet(&self, packet: Packet);

    fn send_raw(&self, packet: RawPacket);

    /// Sends a chat message.
    fn send_message(&self, message: String);

    /// Ends the session with the given message.
    fn disconnect(&self, reason: String);

    /// Starts moving the player to `server`.
    fn connect_now(&self, server: ServerRef, reason: ConnectReason);
}

/// Work queued by a [`ChannelClient`].
#[derive(Debug, Clone)]
pub enum ClientAction {
    Send(RawPacket),
    Message(String),
    Disconnect(String),
    Connect {
        server: ServerRef,
        reason: ConnectReason,
    },
}

/// A [`ClientConnection`] that queues every action onto a channel drained
/// by the task owning the client socket.
#[derive(Debug, Clone)]
pub struct ChannelClient {
    player: String,
    actions: flume::Sender<ClientAction>,
}

impl ChannelClient {
    pub fn new(player: impl Into<String>) -> (Self, flume::Receiver<ClientAction>) {
        let (actions, receiver) = flume::unbounded();
        (
            Self {
                player: player.into(),
                actions,
            },
            receiver,
        )
    }

    fn push(&self, action: ClientAction) {
        if self.actions.send(action).is_err() {
            tracing::debug!("Client connection of {} is already gone", self.player);
        }
    }
}

impl ClientConnection for ChannelClient {
    fn send_packet(&self, packet: Packet) {
        self.push(ClientAction::Send(RawPacket::from_packet(&packet)));
    }

    fn send_raw(&self, packet: RawPacket) {
        self.push(ClientAction::Send(packet));
    }

    fn send_message(&self, message: String) {
        self.push(ClientAction::Message(message));
    }

    fn disconnect(&self, reason: String) {
        self.push(ClientAction::Disconnect(reason));
    }

    fn connect_now(&self, server: ServerRef, reason: ConnectReason) {
        self.push(ClientAction::Connect { server, reason });
    }
}

/// One player's session, owned by the worker that handles its packets.
pub struct Session {
    name: String,
    unique_id: u128,
    protocol_version: i32,
    permissions: AHashSet<String>,
    pub(crate) entity_ids: Option<EntityIdPair>,
    pub(crate) entity_rewrite: Option<Arc<dyn EntityRewriter>>,
    pub(crate) dimension: Option<String>,
    pub(crate) boss_bars: AHashSet<u128>,
    pub(crate) scoreboard: Scoreboard,
    pub(crate) tab_list: Box<dyn TabList>,
    pub(crate) client: Box<dyn ClientConnection>,
    pub(crate) server_selector: Box<dyn ServerSelector>,
}

impl Session {
    pub fn new(
        name: impl Into<String>,
        unique_id: u128,
        protocol_version: i32,
        client: Box<dyn ClientConnection>,
        tab_list: Box<dyn TabList>,
        server_selector: Box<dyn ServerSelector>,
    ) -> Self {
        Self {
            name: name.into(),
            unique_id,
            protocol_version,
            permissions: AHashSet::new(),
            entity_ids: None,
            entity_rewrite: None,
            dimension: None,
            boss_bars: AHashSet::new(),
            scoreboard: Scoreboard::new(),
            tab_list,
            client,
            server_selector,
        }
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = String>) -> Self {
        self.permissions.extend(permissions);
        self
    }

    /// Enables entity id rewriting for forwarded packets.
    pub fn with_entity_rewrite(
        mut self,
        ids: EntityIdPair,
        rewriter: Arc<dyn EntityRewriter>,
    ) -> Self {
        self.entity_ids = Some(ids);
        self.entity_rewrite = Some(rewriter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_id(&self) -> u128 {
        self.unique_id
    }

    pub fn protocol_version(&self) -> i32 {
        self.protocol_version
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    pub fn dimension(&self) -> Option<&str> {
        self.dimension.as_deref()
    }

    pub fn boss_bars(&self) -> &AHashSet<u128> {
        &self.boss_bars
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn client(&self) -> &dyn ClientConnection {
        &*self.client
    }

    /// Takes down everything the previous backend put on the client:
    /// scoreboard objectives and teams, boss bars and tab-list entries.
    pub fn reset_for_server_switch(&mut self) {
        for packet in self.scoreboard.take_teardown() {
            self.client.send_packet(packet);
        }
        for uuid in self.boss_bars.drain() {
            self.client.send_packet(Packet::from(BossBar {
                uuid,
                action: BOSS_BAR_REMOVE,
                ignored_data: Vec::new(),
            }));
        }
        self.tab_list.on_server_change(&*self.client);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("protocol_version", &self.protocol_version)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}
