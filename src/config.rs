//! Bridge configuration, read from TOML.

use crate::{
    bridge::TeamForwardPolicy,
    server::{JoinQueue, ServerInfo, ServerRef},
};
use ahash::AHashMap;
use anyhow::Context;
use serde::Deserialize;
use std::{path::Path, sync::Arc};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Name the proxy announces in the rewritten server brand.
    pub proxy_name: String,
    pub proxy_version: String,
    /// Read timeout toward clients. Also bounds the keep-alive ledger.
    pub timeout_ms: i64,
    /// Proxy commands that are never injected into backend command trees.
    pub disabled_commands: Vec<String>,
    pub internal_channel: InternalChannel,
    pub team_passthrough: TeamPassthrough,
    /// Fallback order used when a backend fails or kicks.
    pub priorities: Vec<String>,
    pub servers: AHashMap<String, String>,
    pub translations: AHashMap<String, String>,
    pub logging: LoggingSection,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            proxy_name: "Bridge".into(),
            proxy_version: env!("CARGO_PKG_VERSION").into(),
            timeout_ms: 30_000,
            disabled_commands: Vec::new(),
            internal_channel: InternalChannel::default(),
            team_passthrough: TeamPassthrough::default(),
            priorities: Vec::new(),
            servers: AHashMap::new(),
            translations: AHashMap::new(),
            logging: LoggingSection::default(),
        }
    }
}

/// The proxy's own plugin channel, under its legacy and namespaced names.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InternalChannel {
    pub legacy: String,
    pub modern: String,
}

impl Default for InternalChannel {
    fn default() -> Self {
        Self {
            legacy: "BungeeCord".into(),
            modern: "bungeecord:main".into(),
        }
    }
}

impl InternalChannel {
    pub fn matches(&self, channel: &str) -> bool {
        channel == self.legacy || channel == self.modern
    }
}

/// Team packets that reach the client as sent.
///
/// A team packet passes when its server is listed (ignoring ASCII case) or
/// its team name starts with one of the prefixes. Both lists empty swallows
/// every team packet.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeamPassthrough {
    pub servers: Vec<String>,
    pub team_prefixes: Vec<String>,
}

impl TeamPassthrough {
    pub fn into_policy(self) -> TeamForwardPolicy {
        Arc::new(move |server: &str, team: &str| {
            self.servers.iter().any(|s| s.eq_ignore_ascii_case(server))
                || self
                    .team_prefixes
                    .iter()
                    .any(|prefix| team.starts_with(prefix.as_str()))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl BridgeConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = fs_err::read_to_string(path.as_ref())?;
        Self::parse(&contents).with_context(|| format!("in {}", path.as_ref().display()))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        for name in &config.priorities {
            if !config.servers.contains_key(name) {
                anyhow::bail!("priority server '{name}' is not in the servers table");
            }
        }
        Ok(config)
    }

    /// Looks up a configured server by name.
    pub fn server(&self, name: &str) -> Option<ServerRef> {
        self.servers
            .get(name)
            .map(|address| Arc::new(ServerInfo::new(name, address)))
    }

    /// Builds the fallback queue for a player, in priority order.
    pub fn join_queue(&self) -> JoinQueue {
        JoinQueue::new(
            self.priorities
                .iter()
                .filter_map(|name| self.server(name))
                .collect(),
        )
    }
}
