//! Extension points the bridge consults before deciding what reaches the client.
//!
//! Hooks run synchronously on the session's worker. Whatever they change in
//! an event takes effect before the bridge decides what to forward.

use crate::server::ServerRef;

#[derive(Debug, Clone)]
pub struct PluginMessageEvent {
    pub player: String,
    pub server: ServerRef,
    pub channel: String,
    /// A copy of the payload; changing it does not alter the packet.
    pub data: Vec<u8>,
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct ServerKickEvent {
    pub player: String,
    pub server: ServerRef,
    /// JSON chat component.
    pub reason: String,
    /// Where the player goes if the kick is cancelled.
    pub cancel_server: Option<ServerRef>,
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct ServerDisconnectEvent {
    pub player: String,
    pub server: ServerRef,
}

#[derive(Debug, Clone)]
pub struct TabCompleteResponseEvent {
    pub player: String,
    pub server: ServerRef,
    pub suggestions: Vec<String>,
    pub cancelled: bool,
}

pub trait EventHooks: Send + Sync {
    fn on_plugin_message(&self, _event: &mut PluginMessageEvent) {}

    fn on_server_kick(&self, _event: &mut ServerKickEvent) {}

    fn on_server_disconnect(&self, _event: &ServerDisconnectEvent) {}

    fn on_tab_complete_response(&self, _event: &mut TabCompleteResponseEvent) {}
}

/// Leaves every event untouched.
#[derive(Debug, Default)]
pub struct NoHooks;

impl EventHooks for NoHooks {}
