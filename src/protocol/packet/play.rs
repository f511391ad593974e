use crate::protocol::{decoder, Decode, Decoder, Encode, Encoder, MINECRAFT_1_13};
use minecraft_downstream_bridge_macros::{Decode, Encode};

#[derive(Debug, Clone, Encode, Decode)]
pub struct KeepAlive {
    pub id: i64,
}

/// Boss bar action that shows a new bar.
pub const BOSS_BAR_ADD: i32 = 0;
/// Boss bar action that removes a bar.
pub const BOSS_BAR_REMOVE: i32 = 1;

#[derive(Debug, Clone, Encode, Decode)]
pub struct BossBar {
    pub uuid: u128,
    #[encoding(varint)]
    pub action: i32,
    #[encoding(length_prefix = "inferred")]
    pub ignored_data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct PluginMessage {
    pub channel: String,
    #[encoding(length_prefix = "inferred")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Disconnect {
    /// JSON chat component.
    pub reason: String,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Respawn {
    pub dimension_type: String,
    pub dimension_name: String,
    #[encoding(length_prefix = "inferred")]
    pub ignored_data: Vec<u8>,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct ServerData {
    #[encoding(length_prefix = "inferred")]
    pub ignored_data: Vec<u8>,
}

/// Response to a tab-completion request.
///
/// Clients older than 1.13 expect a flat list of completions; newer ones
/// expect brigadier suggestions over a replacement range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSuggestions {
    Flat(Vec<String>),
    Structured(StructuredSuggestions),
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct StructuredSuggestions {
    #[encoding(varint)]
    pub transaction_id: i32,
    pub range: SuggestionRange,
    #[encoding(length_prefix = "varint")]
    pub suggestions: Vec<Suggestion>,
}

/// Span of the typed command the suggestions replace.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SuggestionRange {
    #[encoding(varint)]
    pub start: i32,
    #[encoding(varint)]
    pub length: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Suggestion {
    pub text: String,
    /// JSON chat component.
    #[encoding(bool_prefixed)]
    pub tooltip: Option<String>,
}

impl CommandSuggestions {
    /// The suggested strings in order, whichever shape carries them.
    pub fn texts(&self) -> Vec<String> {
        match self {
            Self::Flat(commands) => commands.clone(),
            Self::Structured(structured) => structured
                .suggestions
                .iter()
                .map(|suggestion| suggestion.text.clone())
                .collect(),
        }
    }

    /// Replaces the suggested strings, keeping the shape. A structured
    /// response keeps its transaction id and range; the new suggestions
    /// carry no tooltips.
    pub fn replace_texts(&mut self, texts: Vec<String>) {
        match self {
            Self::Flat(commands) => *commands = texts,
            Self::Structured(structured) => {
                structured.suggestions = texts
                    .into_iter()
                    .map(|text| Suggestion {
                        text,
                        tooltip: None,
                    })
                    .collect();
            }
        }
    }
}

impl Encode for CommandSuggestions {
    fn encode(&self, encoder: &mut Encoder) {
        match self {
            Self::Flat(commands) => {
                encoder.write_var_int(commands.len().try_into().unwrap_or(i32::MAX));
                for command in commands {
                    encoder.write_string(command);
                }
            }
            Self::Structured(structured) => structured.encode(encoder),
        }
    }
}

impl Decode for CommandSuggestions {
    fn decode(decoder: &mut Decoder) -> decoder::Result<Self> {
        if decoder.protocol_version() < MINECRAFT_1_13 {
            let length = decoder.read_var_int()?;
            let mut commands = Vec::new();
            for _ in 0..length {
                commands.push(decoder.read_string()?.to_owned());
            }
            Ok(Self::Flat(commands))
        } else {
            StructuredSuggestions::decode(decoder).map(Self::Structured)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_clients_get_flat_suggestions() {
        let bytes = CommandSuggestions::Flat(vec!["a".into(), "b".into()]).to_bytes();
        let decoded =
            CommandSuggestions::decode(&mut Decoder::with_version(&bytes, MINECRAFT_1_13 - 1))
                .unwrap();
        assert_eq!(decoded.texts(), ["a", "b"]);
        assert!(matches!(decoded, CommandSuggestions::Flat(_)));
    }

    #[test]
    fn structured_suggestions_keep_tooltips() {
        let original = CommandSuggestions::Structured(StructuredSuggestions {
            transaction_id: 7,
            range: SuggestionRange {
                start: 5,
                length: 2,
            },
            suggestions: vec![
                Suggestion {
                    text: "alpha".into(),
                    tooltip: Some(r#"{"text":"first"}"#.into()),
                },
                Suggestion {
                    text: "beta".into(),
                    tooltip: None,
                },
            ],
        });
        let bytes = original.to_bytes();
        let decoded = CommandSuggestions::decode(&mut Decoder::new(&bytes)).unwrap();
        assert_eq!(decoded, original);
    }
}
