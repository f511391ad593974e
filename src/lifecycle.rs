//! What happens to the player when their backend goes away.
//!
//! Every path marks the bridge obsolete before acting toward the client, and
//! either redirects once to the next candidate server or ends the session.

use crate::{
    bridge::DownstreamBridge,
    events::{ServerDisconnectEvent, ServerKickEvent},
    protocol::packet::Disconnect,
    server::ServerRef,
    session::{ConnectReason, Session},
};

impl DownstreamBridge {
    /// The backend connection failed.
    pub fn exception(&mut self, session: &mut Session, error: &anyhow::Error) {
        if self.server.is_obsolete() {
            tracing::debug!("{}: ignoring error after obsolescence: {error:#}", self);
            return;
        }
        tracing::warn!("{}: backend connection failed: {error:#}", self);

        let fallback = session.server_selector.next_candidate(self.server.server());
        self.server.mark_obsolete();
        match fallback {
            Some(fallback) => {
                let message = self
                    .context
                    .translations
                    .translate("server_went_down", &[&fallback.name()]);
                tracing::info!("{}: redirecting to {fallback}", self);
                session
                    .client
                    .connect_now(fallback, ConnectReason::ServerDownRedirect);
                session.client.send_message(message);
            }
            None => {
                session.client.disconnect(
                    self.context
                        .translations
                        .translate("fallback_kick", &[&format!("{error:#}")]),
                );
            }
        }
    }

    /// The backend closed the connection.
    pub fn disconnected(&mut self, session: &mut Session) {
        let server = ServerRef::clone(self.server.server());
        server.remove_player(session.name());
        self.context.reconnect.set_server(session.name(), &server);

        if !self.server.mark_obsolete() {
            tracing::info!("{}: backend closed the connection", self);
            session
                .client
                .disconnect(self.context.translations.translate("lost_connection", &[]));
        }

        self.context
            .hooks
            .on_server_disconnect(&ServerDisconnectEvent {
                player: session.name().to_owned(),
                server,
            });
    }

    /// The backend kicked the player.
    pub(crate) fn kicked(&mut self, session: &mut Session, kick: Disconnect) {
        let cancel_server = session.server_selector.next_candidate(self.server.server());
        let mut event = ServerKickEvent {
            player: session.name().to_owned(),
            server: ServerRef::clone(self.server.server()),
            reason: kick.reason,
            cancel_server,
            cancelled: false,
        };
        self.context.hooks.on_server_kick(&mut event);

        self.server.mark_obsolete();
        match event {
            ServerKickEvent {
                cancelled: true,
                cancel_server: Some(server),
                ..
            } => {
                tracing::info!("{}: kick redirected to {server}", self);
                session.client.connect_now(server, ConnectReason::KickRedirect);
            }
            ServerKickEvent { reason, .. } => {
                tracing::info!("{}: kicked: {reason}", self);
                session.client.disconnect(reason);
            }
        }
    }
}
