//! Proxy-side mirror of the scoreboard the client has been shown.
//!
//! The mirror follows exactly what was pushed toward the client, so that
//! the session can take it down again when the player switches servers.

use crate::{
    error::{BridgeError, Result},
    protocol::packet::{
        scoreboard::{
            ObjectiveKind, ObjectiveValue, TeamInfo, OBJECTIVE_CREATE, OBJECTIVE_REMOVE,
            OBJECTIVE_UPDATE, SCORE_REMOVE, SCORE_SET, TEAM_ADD_MEMBERS, TEAM_CREATE,
            TEAM_REMOVE, TEAM_REMOVE_MEMBERS, TEAM_UPDATE_INFO,
        },
        DisplayObjective, Packet, UpdateObjectives, UpdateScore, UpdateTeams,
    },
};
use ahash::{AHashMap, AHashSet};
use std::collections::hash_map::Entry;

/// Where an objective is displayed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DisplaySlot {
    List,
    Sidebar,
    BelowName,
    /// Sidebar shown only to members of teams with the given color (0..16).
    TeamSidebar(u8),
}

impl DisplaySlot {
    const TEAM_SIDEBAR_START: u8 = 3;
    const TEAM_COLORS: u8 = 16;

    pub fn from_position(position: u8) -> Result<Self> {
        match position {
            0 => Ok(Self::List),
            1 => Ok(Self::Sidebar),
            2 => Ok(Self::BelowName),
            x if (Self::TEAM_SIDEBAR_START..Self::TEAM_SIDEBAR_START + Self::TEAM_COLORS)
                .contains(&x) =>
            {
                Ok(Self::TeamSidebar(x - Self::TEAM_SIDEBAR_START))
            }
            x => Err(BridgeError::UnknownDisplayPosition(x)),
        }
    }

    pub fn position(self) -> u8 {
        match self {
            Self::List => 0,
            Self::Sidebar => 1,
            Self::BelowName => 2,
            Self::TeamSidebar(color) => Self::TEAM_SIDEBAR_START + color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Objective {
    pub name: String,
    /// JSON chat component.
    pub display_text: String,
    pub kind: ObjectiveKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    pub holder: String,
    pub objective: String,
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub name: String,
    pub info: TeamInfo,
    pub members: AHashSet<String>,
}

impl Team {
    fn new(name: String) -> Self {
        Self {
            name,
            info: TeamInfo {
                display_name: String::new(),
                friendly_flags: 0,
                name_tag_visibility: "always".into(),
                collision_rule: "always".into(),
                color: 0,
                prefix: String::new(),
                suffix: String::new(),
            },
            members: AHashSet::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Scoreboard {
    objectives: AHashMap<String, Objective>,
    scores: AHashMap<(String, String), Score>,
    teams: AHashMap<String, Team>,
    display: Option<(DisplaySlot, String)>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_objective(&mut self, packet: &UpdateObjectives) -> Result<()> {
        match packet.action {
            OBJECTIVE_CREATE => {
                let ObjectiveValue { display_text, kind } = value_of(packet)?;
                self.objectives.insert(
                    packet.name.clone(),
                    Objective {
                        name: packet.name.clone(),
                        display_text,
                        kind,
                    },
                );
            }
            OBJECTIVE_REMOVE => {
                self.objectives.remove(&packet.name);
            }
            OBJECTIVE_UPDATE => {
                if let Some(objective) = self.objectives.get_mut(&packet.name) {
                    let ObjectiveValue { display_text, kind } = value_of(packet)?;
                    objective.display_text = display_text;
                    objective.kind = kind;
                }
            }
            x => return Err(BridgeError::UnknownObjectiveAction(x)),
        }
        Ok(())
    }

    pub fn handle_score(&mut self, packet: &UpdateScore) -> Result<()> {
        match packet.action {
            SCORE_SET => {
                let key = (packet.holder.clone(), packet.objective_name.clone());
                self.scores.remove(&key);
                self.scores.insert(
                    key,
                    Score {
                        holder: packet.holder.clone(),
                        objective: packet.objective_name.clone(),
                        value: packet.value.unwrap_or_default(),
                    },
                );
            }
            SCORE_REMOVE if packet.objective_name.is_empty() => {
                self.scores.retain(|(holder, _), _| *holder != packet.holder);
            }
            SCORE_REMOVE => {
                self.scores
                    .remove(&(packet.holder.clone(), packet.objective_name.clone()));
            }
            x => return Err(BridgeError::UnknownScoreAction(x)),
        }
        Ok(())
    }

    pub fn handle_display(&mut self, packet: &DisplayObjective) -> Result<()> {
        let slot = DisplaySlot::from_position(packet.position)?;
        self.display = Some((slot, packet.objective_name.clone()));
        Ok(())
    }

    /// Applies a team packet. Updates naming a team the mirror does not
    /// hold are ignored, since they may race the team's removal.
    pub fn handle_team(&mut self, packet: &UpdateTeams) -> Result<()> {
        let team = match packet.mode {
            TEAM_REMOVE => {
                self.teams.remove(&packet.name);
                return Ok(());
            }
            TEAM_CREATE => {
                let team = Team::new(packet.name.clone());
                match self.teams.entry(packet.name.clone()) {
                    Entry::Occupied(mut entry) => {
                        entry.insert(team);
                        entry.into_mut()
                    }
                    Entry::Vacant(entry) => entry.insert(team),
                }
            }
            TEAM_UPDATE_INFO | TEAM_ADD_MEMBERS | TEAM_REMOVE_MEMBERS => {
                match self.teams.get_mut(&packet.name) {
                    Some(team) => team,
                    None => {
                        tracing::debug!("Ignoring update for absent team '{}'", packet.name);
                        return Ok(());
                    }
                }
            }
            x => return Err(BridgeError::UnknownTeamMode(x)),
        };

        if let Some(info) = &packet.info {
            team.info = info.clone();
        }
        if let Some(members) = &packet.members {
            if packet.mode == TEAM_REMOVE_MEMBERS {
                for member in members {
                    team.members.remove(member);
                }
            } else {
                team.members.extend(members.iter().cloned());
            }
        }
        Ok(())
    }

    pub fn objective(&self, name: &str) -> Option<&Objective> {
        self.objectives.get(name)
    }

    pub fn objectives(&self) -> impl Iterator<Item = &Objective> {
        self.objectives.values()
    }

    pub fn score(&self, holder: &str, objective: &str) -> Option<&Score> {
        self.scores.get(&(holder.to_owned(), objective.to_owned()))
    }

    pub fn scores(&self) -> impl Iterator<Item = &Score> {
        self.scores.values()
    }

    pub fn team(&self, name: &str) -> Option<&Team> {
        self.teams.get(name)
    }

    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    pub fn display(&self) -> Option<(DisplaySlot, &str)> {
        self.display
            .as_ref()
            .map(|(slot, name)| (*slot, name.as_str()))
    }

    /// Empties the mirror, returning the packets that remove every
    /// objective and team from the client.
    pub fn take_teardown(&mut self) -> Vec<Packet> {
        let objectives = self.objectives.drain().map(|(name, _)| {
            Packet::from(UpdateObjectives {
                name,
                action: OBJECTIVE_REMOVE,
                value: None,
            })
        });
        let teams = self.teams.drain().map(|(name, _)| {
            Packet::from(UpdateTeams {
                name,
                mode: TEAM_REMOVE,
                info: None,
                members: None,
            })
        });
        let packets = objectives.chain(teams).collect();
        self.scores.clear();
        self.display = None;
        packets
    }
}

fn value_of(packet: &UpdateObjectives) -> Result<ObjectiveValue> {
    packet.value.clone().ok_or_else(|| {
        BridgeError::Decode(crate::protocol::DecodeError::Other(anyhow::anyhow!(
            "objective '{}' carries no value",
            packet.name
        )))
    })
}
