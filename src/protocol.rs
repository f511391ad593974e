//! The slice of the Minecraft protocol the bridge needs to read and rewrite.

/// Protocol version whose clientbound play packet ids and layouts are
/// modelled by [`packet::Packet`] (1.20.1).
pub const PROTOCOL_VERSION: i32 = 763;

/// First version with namespaced plugin channels and brigadier-style
/// command suggestions.
pub const MINECRAFT_1_13: i32 = 393;

pub mod commands;
mod decoder;
mod encoder;
pub mod packet;
pub mod vanilla_codec;

pub use decoder::{Decode, DecodeError, DecodeOther, Decoder};
pub use encoder::{Encode, Encoder};

/// Limit to avoid out-of-memory DOS.
const BUFFER_LIMIT: usize = 2 * 1024 * 1024; // 2 MiB
