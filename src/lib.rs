//! The downstream half of a Minecraft reverse proxy: the part that sits
//! between a backend server and a connected client and decides what the
//! client gets to see of everything the backend sends.
//!
//! The proxied connection looks like this:
//! Minecraft client => upstream half (login, client packets) => this bridge <= backend server
//!
//! # Bridging process
//! Every clientbound packet of a session enters [`bridge::DownstreamBridge::handle`],
//! which decodes only the packet kinds it has rules for and answers with a
//! [`bridge::Forwarding`]: forward the original bytes (after entity id
//! rewriting), or drop it because the bridge already sent whatever the client
//! should get instead.
//!
//! On the way the bridge keeps a mirror of client-visible state (scoreboard,
//! tab list, boss bars, dimension) in the [`session::Session`], so the proxy
//! can take it down again when the player switches servers.
//!
//! When the backend fails, closes or kicks, the bridge is marked obsolete and
//! the player is either redirected once to the next candidate server or
//! disconnected. Packets an obsolete bridge receives are ignored.

pub mod bridge;
pub mod channels;
pub mod command_tree;
pub mod config;
pub mod entity_id;
pub mod error;
pub mod events;
pub mod keep_alive;
mod lifecycle;
pub mod protocol;
pub mod scoreboard;
pub mod server;
pub mod session;
pub mod suggestions;
pub mod tab_list;
pub mod translations;

pub use bridge::{DownstreamBridge, Forwarding, ProxyContext};
pub use error::BridgeError;
