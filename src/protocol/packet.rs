//! Clientbound play packets the bridge interprets.
//!
//! Only packets the bridge reads or rewrites are decoded. Every other packet
//! id decodes to [`Unhandled`], which keeps the body verbatim so the bridge
//! never has to understand it to forward it. Ids and layouts follow
//! [`PROTOCOL_VERSION`](crate::protocol::PROTOCOL_VERSION).

use crate::protocol::{
    decoder, Decode, DecodeError, DecodeOther, Decoder, Encode, Encoder,
};
use minecraft_downstream_bridge_macros::{Decode, Encode, FromVariants};

pub mod play;
pub mod player_info;
pub mod scoreboard;

pub use crate::protocol::commands::Commands;
pub use play::{BossBar, CommandSuggestions, Disconnect, KeepAlive, PluginMessage, Respawn, ServerData};
pub use player_info::{PlayerInfoRemove, PlayerInfoUpdate};
pub use scoreboard::{DisplayObjective, UpdateObjectives, UpdateScore, UpdateTeams};

#[derive(Debug, Clone, Encode, Decode, FromVariants, strum::AsRefStr)]
#[encoding(discriminant = "varint")]
pub enum Packet {
    #[encoding(id = 0x0b)]
    BossBar(BossBar),
    #[encoding(id = 0x0f)]
    CommandSuggestions(CommandSuggestions),
    #[encoding(id = 0x10)]
    Commands(Commands),
    #[encoding(id = 0x17)]
    PluginMessage(PluginMessage),
    #[encoding(id = 0x1a)]
    Disconnect(Disconnect),
    #[encoding(id = 0x23)]
    KeepAlive(KeepAlive),
    #[encoding(id = 0x39)]
    PlayerInfoRemove(PlayerInfoRemove),
    #[encoding(id = 0x3a)]
    PlayerInfoUpdate(PlayerInfoUpdate),
    #[encoding(id = 0x41)]
    Respawn(Respawn),
    #[encoding(id = 0x45)]
    ServerData(ServerData),
    #[encoding(id = 0x51)]
    DisplayObjective(DisplayObjective),
    #[encoding(id = 0x58)]
    UpdateObjectives(UpdateObjectives),
    #[encoding(id = 0x5a)]
    UpdateTeams(UpdateTeams),
    #[encoding(id = 0x5b)]
    UpdateScore(UpdateScore),
    #[encoding(other)]
    Unhandled(Unhandled),
}

/// A packet the bridge passes through without interpreting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unhandled {
    pub id: i32,
    pub body: Vec<u8>,
}

impl Encode for Unhandled {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_var_int(self.id);
        encoder.write_slice(&self.body);
    }
}

impl DecodeOther for Unhandled {
    fn decode_other(discriminant: i64, decoder: &mut Decoder) -> decoder::Result<Self> {
        Ok(Self {
            id: i32::try_from(discriminant)?,
            body: decoder.consume_remaining().to_vec(),
        })
    }
}

/// One complete, uncompressed packet as it came off the wire:
/// the VarInt packet id followed by the body.
///
/// This is the representation that gets forwarded, so anything that
/// must reach the client byte-for-byte stays in this form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    bytes: Vec<u8>,
}

impl RawPacket {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Encodes a typed packet.
    pub fn from_packet(packet: &Packet) -> Self {
        Self::new(packet.to_bytes())
    }

    /// Reads the packet id.
    pub fn id(&self) -> Result<i32, DecodeError> {
        Decoder::new(&self.bytes).read_var_int()
    }

    /// Decodes the typed packet, using `protocol_version` for
    /// version-dependent layouts.
    pub fn decode(&self, protocol_version: i32) -> Result<Packet, DecodeError> {
        Packet::decode(&mut Decoder::with_version(&self.bytes, protocol_version))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable access for in-place rewriting. Rewriters may change the length.
    pub fn bytes_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
