//! The downstream bridge: decides, for every packet a backend sends, whether
//! the client gets it as sent, rewritten, or not at all.

use crate::{
    channels::{ChannelInterceptor, Interception},
    command_tree::{CommandMerger, CommandRegistry, CommandTemplate},
    config::BridgeConfig,
    error::Result,
    events::{EventHooks, NoHooks, PluginMessageEvent},
    protocol::packet::{
        play::{BOSS_BAR_ADD, BOSS_BAR_REMOVE},
        Packet, RawPacket,
    },
    server::{NoReconnect, ReconnectHandler, ServerConnection, ServerRef},
    session::Session,
    suggestions,
    tab_list::{self, EmptyDirectory, PlayerDirectory},
    translations::Translations,
};
use ahash::AHashSet;
use std::{fmt, sync::Arc};

/// Decides whether a team packet from `server` about `team` reaches the
/// client. Called as `policy(server_name, team_name)`.
pub type TeamForwardPolicy = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Outcome of handling one backend packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Forwarding {
    /// Send the original packet on to the client.
    Forward(RawPacket),
    /// The bridge already sent whatever the client should see, if anything.
    Drop,
}

/// Read-only state shared by every bridge of a proxy.
pub struct ProxyContext {
    pub channels: ChannelInterceptor,
    pub commands: CommandRegistry,
    pub command_template: CommandTemplate,
    pub disabled_commands: AHashSet<String>,
    pub translations: Translations,
    pub timeout_ms: i64,
    pub hooks: Arc<dyn EventHooks>,
    pub reconnect: Arc<dyn ReconnectHandler>,
    pub directory: Arc<dyn PlayerDirectory>,
    pub team_policy: TeamForwardPolicy,
}

impl ProxyContext {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            channels: ChannelInterceptor::new(
                config.proxy_name.clone(),
                config.proxy_version.clone(),
                config.internal_channel.clone(),
            ),
            commands: CommandRegistry::new(),
            command_template: CommandTemplate::default(),
            disabled_commands: config.disabled_commands.iter().cloned().collect(),
            translations: Translations::with_overrides(config.translations.clone()),
            timeout_ms: config.timeout_ms,
            hooks: Arc::new(NoHooks),
            reconnect: Arc::new(NoReconnect),
            directory: Arc::new(EmptyDirectory),
            team_policy: config.team_passthrough.clone().into_policy(),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn EventHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_reconnect_handler(mut self, reconnect: Arc<dyn ReconnectHandler>) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn PlayerDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_team_policy(mut self, policy: TeamForwardPolicy) -> Self {
        self.team_policy = policy;
        self
    }

    pub fn with_commands(mut self, commands: CommandRegistry) -> Self {
        self.commands = commands;
        self
    }
}

impl Default for ProxyContext {
    fn default() -> Self {
        Self::from_config(&BridgeConfig::default())
    }
}

/// Handles packets from one backend for one player.
///
/// Superseded once the player leaves this backend; from then on every
/// packet it is handed is ignored.
pub struct DownstreamBridge {
    pub(crate) player: String,
    pub(crate) server: ServerConnection,
    pub(crate) context: Arc<ProxyContext>,
}

impl DownstreamBridge {
    pub fn new(session: &Session, server: ServerRef, context: Arc<ProxyContext>) -> Self {
        server.add_player(session.name());
        let keep_alives = crate::keep_alive::KeepAliveLedger::with_timeout_ms(context.timeout_ms);
        Self {
            player: session.name().to_owned(),
            server: ServerConnection::new(server, keep_alives),
            context,
        }
    }

    pub fn server(&self) -> &ServerConnection {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut ServerConnection {
        &mut self.server
    }

    /// Handles one packet and sends the client whatever it should get.
    ///
    /// An error is fatal to the session.
    pub fn process(&mut self, session: &mut Session, packet: RawPacket) -> Result<()> {
        match self.handle(session, packet)? {
            Forwarding::Forward(mut packet) => {
                if let (Some(rewriter), Some(ids)) = (&session.entity_rewrite, session.entity_ids) {
                    rewriter.rewrite_clientbound(
                        &mut packet,
                        ids.server,
                        ids.client,
                        session.protocol_version(),
                    );
                }
                session.client.send_raw(packet);
            }
            Forwarding::Drop => {}
        }
        Ok(())
    }

    /// Decides what happens to one packet from the backend.
    pub fn handle(&mut self, session: &mut Session, packet: RawPacket) -> Result<Forwarding> {
        if self.server.is_obsolete() {
            tracing::trace!("{}: ignoring packet after obsolescence", self);
            return Ok(Forwarding::Drop);
        }

        let decoded = packet.decode(session.protocol_version())?;
        tracing::trace!("{}: handling {}", self, decoded.as_ref());

        let forwarding = match decoded {
            Packet::KeepAlive(keep_alive) => {
                if !self.server.keep_alives_mut().record(keep_alive.id) {
                    tracing::debug!(
                        "{}: keep-alive ledger full, not recording {}",
                        self,
                        keep_alive.id
                    );
                }
                Forwarding::Forward(packet)
            }
            Packet::BossBar(boss_bar) => {
                match boss_bar.action {
                    BOSS_BAR_ADD => {
                        session.boss_bars.insert(boss_bar.uuid);
                    }
                    BOSS_BAR_REMOVE => {
                        session.boss_bars.remove(&boss_bar.uuid);
                    }
                    _ => {}
                }
                Forwarding::Forward(packet)
            }
            Packet::Respawn(respawn) => {
                session.dimension = Some(respawn.dimension_name);
                Forwarding::Forward(packet)
            }
            Packet::ServerData(_) => Forwarding::Drop,
            Packet::UpdateObjectives(objective) => {
                session.scoreboard.handle_objective(&objective)?;
                Forwarding::Forward(packet)
            }
            Packet::UpdateScore(score) => {
                session.scoreboard.handle_score(&score)?;
                Forwarding::Forward(packet)
            }
            Packet::DisplayObjective(display) => {
                session.scoreboard.handle_display(&display)?;
                Forwarding::Forward(packet)
            }
            Packet::UpdateTeams(team) => {
                session.scoreboard.handle_team(&team)?;
                if (self.context.team_policy)(self.server.server().name(), &team.name) {
                    Forwarding::Forward(packet)
                } else {
                    Forwarding::Drop
                }
            }
            Packet::PlayerInfoUpdate(mut update) => {
                tab_list::rewrite_update(&mut update, &*self.context.directory);
                session.tab_list.on_update(update, &*session.client);
                Forwarding::Drop
            }
            Packet::PlayerInfoRemove(mut remove) => {
                tab_list::rewrite_remove(&mut remove, &*self.context.directory);
                session.tab_list.on_remove(remove, &*session.client);
                Forwarding::Drop
            }
            Packet::PluginMessage(message) => {
                let mut event = PluginMessageEvent {
                    player: self.player.clone(),
                    server: ServerRef::clone(self.server.server()),
                    channel: message.channel.clone(),
                    data: message.data.clone(),
                    cancelled: false,
                };
                self.context.hooks.on_plugin_message(&mut event);
                if event.cancelled {
                    return Ok(Forwarding::Drop);
                }
                match self
                    .context
                    .channels
                    .intercept(&message, session.protocol_version())?
                {
                    Interception::Pass => Forwarding::Forward(packet),
                    Interception::Swallow => Forwarding::Drop,
                    Interception::Rewritten(message) => {
                        session.client.send_packet(Packet::from(message));
                        Forwarding::Drop
                    }
                }
            }
            Packet::Disconnect(kick) => {
                self.kicked(session, kick);
                Forwarding::Drop
            }
            Packet::CommandSuggestions(response) => {
                if let Some(response) = suggestions::relay(
                    response,
                    &self.player,
                    self.server.server(),
                    &*self.context.hooks,
                ) {
                    session.client.send_packet(Packet::from(response));
                }
                Forwarding::Drop
            }
            Packet::Commands(mut commands) => {
                let merger = CommandMerger {
                    registry: &self.context.commands,
                    template: &self.context.command_template,
                    disabled: &self.context.disabled_commands,
                };
                let added = merger
                    .merge(&mut commands, |permission| session.has_permission(permission))
                    .map_err(crate::protocol::DecodeError::Other)?;
                if added > 0 {
                    tracing::debug!("{}: added {added} proxy commands", self);
                    session.client.send_packet(Packet::from(commands));
                    Forwarding::Drop
                } else {
                    Forwarding::Forward(packet)
                }
            }
            Packet::Unhandled(_) => Forwarding::Forward(packet),
        };
        Ok(forwarding)
    }
}

impl fmt::Display for DownstreamBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] <-> DownstreamBridge <-> [{}]",
            self.player,
            self.server.server().name()
        )
    }
}

impl fmt::Debug for DownstreamBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownstreamBridge")
            .field("player", &self.player)
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}
