//! Scoreboard packets.
//!
//! Action and mode codes are kept as raw integers: interpreting them is the
//! scoreboard mirror's job, which rejects codes outside the protocol.

use crate::protocol::{decoder, Decode, Decoder, Encode, Encoder};
use minecraft_downstream_bridge_macros::{Decode, Encode};

pub const OBJECTIVE_CREATE: u8 = 0;
pub const OBJECTIVE_REMOVE: u8 = 1;
pub const OBJECTIVE_UPDATE: u8 = 2;

pub const SCORE_SET: i32 = 0;
pub const SCORE_REMOVE: i32 = 1;

pub const TEAM_CREATE: u8 = 0;
pub const TEAM_REMOVE: u8 = 1;
pub const TEAM_UPDATE_INFO: u8 = 2;
pub const TEAM_ADD_MEMBERS: u8 = 3;
pub const TEAM_REMOVE_MEMBERS: u8 = 4;

#[derive(Debug, Clone, Encode, Decode)]
pub struct DisplayObjective {
    pub position: u8,
    pub objective_name: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Encode, Decode, strum::Display)]
#[encoding(discriminant = "varint")]
#[strum(serialize_all = "lowercase")]
pub enum ObjectiveKind {
    #[encoding(id = 0)]
    Integer,
    #[encoding(id = 1)]
    Hearts,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ObjectiveValue {
    /// JSON chat component.
    pub display_text: String,
    pub kind: ObjectiveKind,
}

#[derive(Debug, Clone)]
pub struct UpdateObjectives {
    pub name: String,
    pub action: u8,
    /// Present for create and update.
    pub value: Option<ObjectiveValue>,
}

impl Encode for UpdateObjectives {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_string(&self.name);
        encoder.write_u8(self.action);
        if let Some(value) = &self.value {
            value.encode(encoder);
        }
    }
}

impl Decode for UpdateObjectives {
    fn decode(decoder: &mut Decoder) -> decoder::Result<Self> {
        let name = decoder.read_string()?.to_owned();
        let action = decoder.read_u8()?;
        let value = match action {
            OBJECTIVE_CREATE | OBJECTIVE_UPDATE => Some(ObjectiveValue::decode(decoder)?),
            _ => None,
        };
        Ok(Self {
            name,
            action,
            value,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UpdateScore {
    pub holder: String,
    pub action: i32,
    /// Empty on removal means every objective.
    pub objective_name: String,
    /// Absent on removal.
    pub value: Option<i32>,
}

impl Encode for UpdateScore {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_string(&self.holder);
        encoder.write_var_int(self.action);
        encoder.write_string(&self.objective_name);
        if let Some(value) = self.value {
            encoder.write_var_int(value);
        }
    }
}

impl Decode for UpdateScore {
    fn decode(decoder: &mut Decoder) -> decoder::Result<Self> {
        let holder = decoder.read_string()?.to_owned();
        let action = decoder.read_var_int()?;
        let objective_name = decoder.read_string()?.to_owned();
        let value = if action == SCORE_REMOVE {
            None
        } else {
            Some(decoder.read_var_int()?)
        };
        Ok(Self {
            holder,
            action,
            objective_name,
            value,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct TeamInfo {
    /// JSON chat component.
    pub display_name: String,
    /// Bit 0x01 allows friendly fire, 0x02 shows invisible teammates.
    pub friendly_flags: u8,
    pub name_tag_visibility: String,
    pub collision_rule: String,
    #[encoding(varint)]
    pub color: i32,
    /// JSON chat component.
    pub prefix: String,
    /// JSON chat component.
    pub suffix: String,
}

#[derive(Debug, Clone)]
pub struct UpdateTeams {
    pub name: String,
    pub mode: u8,
    /// Present for create and update-info.
    pub info: Option<TeamInfo>,
    /// Present for create, add-members and remove-members.
    pub members: Option<Vec<String>>,
}

impl Encode for UpdateTeams {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_string(&self.name);
        encoder.write_u8(self.mode);
        if let Some(info) = &self.info {
            info.encode(encoder);
        }
        if let Some(members) = &self.members {
            encoder.write_var_int(members.len().try_into().unwrap_or(i32::MAX));
            for member in members {
                encoder.write_string(member);
            }
        }
    }
}

impl Decode for UpdateTeams {
    fn decode(decoder: &mut Decoder) -> decoder::Result<Self> {
        let name = decoder.read_string()?.to_owned();
        let mode = decoder.read_u8()?;
        let info = match mode {
            TEAM_CREATE | TEAM_UPDATE_INFO => Some(TeamInfo::decode(decoder)?),
            _ => None,
        };
        let members = match mode {
            TEAM_CREATE | TEAM_ADD_MEMBERS | TEAM_REMOVE_MEMBERS => {
                let length = decoder.read_var_int()?;
                let mut members = Vec::new();
                for _ in 0..length {
                    members.push(decoder.read_string()?.to_owned());
                }
                Some(members)
            }
            _ => None,
        };
        Ok(Self {
            name,
            mode,
            info,
            members,
        })
    }
}
