//! Tab-list packets (1.19.3+ layout).

use crate::protocol::{decoder, Decode, Decoder, Encode, Encoder};
use bitflags::bitflags;
use minecraft_downstream_bridge_macros::{Decode, Encode};

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct PlayerInfoRemove {
    #[encoding(length_prefix = "varint")]
    pub uuids: Vec<u128>,
}

bitflags! {
    /// Which fields each entry of a [`PlayerInfoUpdate`] carries.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct PlayerInfoActions: u8 {
        const ADD_PLAYER = 0x01;
        const INITIALIZE_CHAT = 0x02;
        const UPDATE_GAME_MODE = 0x04;
        const UPDATE_LISTED = 0x08;
        const UPDATE_LATENCY = 0x10;
        const UPDATE_DISPLAY_NAME = 0x20;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfoUpdate {
    pub actions: PlayerInfoActions,
    pub entries: Vec<PlayerInfoEntry>,
}

/// One tab-list entry. A field is only meaningful (and only written) when
/// the corresponding action is set on the packet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerInfoEntry {
    pub uuid: u128,
    pub profile: Option<GameProfile>,
    pub chat_session: Option<RemoteChatSession>,
    pub game_mode: i32,
    pub listed: bool,
    pub latency: i32,
    /// JSON chat component.
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Encode, Decode)]
pub struct GameProfile {
    pub name: String,
    #[encoding(length_prefix = "varint")]
    pub properties: Vec<ProfileProperty>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ProfileProperty {
    pub name: String,
    pub value: String,
    #[encoding(bool_prefixed)]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteChatSession {
    pub session_id: u128,
    pub expires_at: i64,
    pub public_key: Vec<u8>,
    pub key_signature: Vec<u8>,
}

impl Encode for RemoteChatSession {
    fn encode(&self, encoder: &mut Encoder) {
        self.session_id.encode(encoder);
        encoder.write_i64(self.expires_at);
        encoder.write_byte_array(&self.public_key);
        encoder.write_byte_array(&self.key_signature);
    }
}

impl Decode for RemoteChatSession {
    fn decode(decoder: &mut Decoder) -> decoder::Result<Self> {
        Ok(Self {
            session_id: u128::decode(decoder)?,
            expires_at: decoder.read_i64()?,
            public_key: decoder.read_byte_array()?.to_vec(),
            key_signature: decoder.read_byte_array()?.to_vec(),
        })
    }
}

impl Encode for PlayerInfoUpdate {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_u8(self.actions.bits());
        encoder.write_var_int(self.entries.len().try_into().unwrap_or(i32::MAX));
        for entry in &self.entries {
            entry.uuid.encode(encoder);
            if self.actions.contains(PlayerInfoActions::ADD_PLAYER) {
                entry.profile.clone().unwrap_or_default().encode(encoder);
            }
            if self.actions.contains(PlayerInfoActions::INITIALIZE_CHAT) {
                encoder.write_bool(entry.chat_session.is_some());
                if let Some(session) = &entry.chat_session {
                    session.encode(encoder);
                }
            }
            if self.actions.contains(PlayerInfoActions::UPDATE_GAME_MODE) {
                encoder.write_var_int(entry.game_mode);
            }
            if self.actions.contains(PlayerInfoActions::UPDATE_LISTED) {
                encoder.write_bool(entry.listed);
            }
            if self.actions.contains(PlayerInfoActions::UPDATE_LATENCY) {
                encoder.write_var_int(entry.latency);
            }
            if self.actions.contains(PlayerInfoActions::UPDATE_DISPLAY_NAME) {
                encoder.write_bool(entry.display_name.is_some());
                if let Some(display_name) = &entry.display_name {
                    encoder.write_string(display_name);
                }
            }
        }
    }
}

impl Decode for PlayerInfoUpdate {
    fn decode(decoder: &mut Decoder) -> decoder::Result<Self> {
        let actions = PlayerInfoActions::from_bits_retain(decoder.read_u8()?);
        let length = decoder.read_var_int()?;
        let mut entries = Vec::new();
        for _ in 0..length {
            let mut entry = PlayerInfoEntry {
                uuid: u128::decode(decoder)?,
                ..Default::default()
            };
            if actions.contains(PlayerInfoActions::ADD_PLAYER) {
                entry.profile = Some(GameProfile::decode(decoder)?);
            }
            if actions.contains(PlayerInfoActions::INITIALIZE_CHAT) && decoder.read_bool()? {
                entry.chat_session = Some(RemoteChatSession::decode(decoder)?);
            }
            if actions.contains(PlayerInfoActions::UPDATE_GAME_MODE) {
                entry.game_mode = decoder.read_var_int()?;
            }
            if actions.contains(PlayerInfoActions::UPDATE_LISTED) {
                entry.listed = decoder.read_bool()?;
            }
            if actions.contains(PlayerInfoActions::UPDATE_LATENCY) {
                entry.latency = decoder.read_var_int()?;
            }
            if actions.contains(PlayerInfoActions::UPDATE_DISPLAY_NAME) && decoder.read_bool()? {
                entry.display_name = Some(decoder.read_string()?.to_owned());
            }
            entries.push(entry);
        }
        Ok(Self { actions, entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_flagged_fields_are_read() {
        let update = PlayerInfoUpdate {
            actions: PlayerInfoActions::ADD_PLAYER
                | PlayerInfoActions::UPDATE_LISTED
                | PlayerInfoActions::UPDATE_DISPLAY_NAME,
            entries: vec![PlayerInfoEntry {
                uuid: 0x1234,
                profile: Some(GameProfile {
                    name: "Notch".into(),
                    properties: vec![ProfileProperty {
                        name: "textures".into(),
                        value: "e30=".into(),
                        signature: None,
                    }],
                }),
                listed: true,
                display_name: Some(r#"{"text":"Notch"}"#.into()),
                ..Default::default()
            }],
        };
        let bytes = update.to_bytes();
        let decoded = PlayerInfoUpdate::decode(&mut Decoder::new(&bytes)).unwrap();
        assert_eq!(decoded, update);
    }

    #[test]
    fn latency_only_update_is_compact() {
        let update = PlayerInfoUpdate {
            actions: PlayerInfoActions::UPDATE_LATENCY,
            entries: vec![PlayerInfoEntry {
                uuid: 1,
                latency: 3,
                ..Default::default()
            }],
        };
        // actions + count + uuid + latency
        assert_eq!(update.to_bytes().len(), 1 + 1 + 16 + 1);
    }
}
