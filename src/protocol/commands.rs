//! The declared command graph sent in the `Commands` packet.
//!
//! Nodes reference each other by index into a flat array. Argument nodes
//! carry a parser id whose properties have parser-specific layouts, so every
//! parser with properties has to be known to skip over it.

use crate::protocol::{decoder, Decode, DecodeError, Decoder, Encode, Encoder};
use anyhow::anyhow;
use bitflags::bitflags;

/// Suggestion provider asking the server to complete the argument.
pub const ASK_SERVER: &str = "minecraft:ask_server";

const PARSER_FLOAT: i32 = 1;
const PARSER_DOUBLE: i32 = 2;
const PARSER_INTEGER: i32 = 3;
const PARSER_LONG: i32 = 4;
const PARSER_STRING: i32 = 5;
const PARSER_ENTITY: i32 = 6;
const PARSER_SCORE_HOLDER: i32 = 29;
const PARSER_TIME: i32 = 40;
const PARSER_RESOURCE_OR_TAG: i32 = 41;
const PARSER_RESOURCE_OR_TAG_KEY: i32 = 42;
const PARSER_RESOURCE: i32 = 43;
const PARSER_RESOURCE_KEY: i32 = 44;
const PARSER_UUID: i32 = 48;

const NODE_TYPE_MASK: u8 = 0x03;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        const EXECUTABLE = 0x04;
        const REDIRECT = 0x08;
        const HAS_SUGGESTIONS = 0x10;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Literal,
    Argument,
}

impl NodeKind {
    fn bits(self) -> u8 {
        match self {
            NodeKind::Root => 0,
            NodeKind::Literal => 1,
            NodeKind::Argument => 2,
        }
    }

    fn from_bits(bits: u8) -> decoder::Result<Self> {
        match bits & NODE_TYPE_MASK {
            0 => Ok(NodeKind::Root),
            1 => Ok(NodeKind::Literal),
            2 => Ok(NodeKind::Argument),
            x => Err(DecodeError::Other(anyhow!("invalid command node type {x}"))),
        }
    }
}

/// Bounds of a numeric argument.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: Encode> Bounds<T> {
    fn encode(&self, encoder: &mut Encoder) {
        let flags = self.min.is_some() as u8 | (self.max.is_some() as u8) << 1;
        encoder.write_u8(flags);
        if let Some(min) = &self.min {
            min.encode(encoder);
        }
        if let Some(max) = &self.max {
            max.encode(encoder);
        }
    }
}

impl<T: Decode> Bounds<T> {
    fn decode(decoder: &mut Decoder) -> decoder::Result<Self> {
        let flags = decoder.read_u8()?;
        let min = if flags & 0x01 != 0 {
            Some(T::decode(decoder)?)
        } else {
            None
        };
        let max = if flags & 0x02 != 0 {
            Some(T::decode(decoder)?)
        } else {
            None
        };
        Ok(Self { min, max })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StringKind {
    SingleWord,
    QuotablePhrase,
    /// Consumes the rest of the input.
    GreedyPhrase,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParserProperties {
    None,
    Float(Bounds<f32>),
    Double(Bounds<f64>),
    Integer(Bounds<i32>),
    Long(Bounds<i64>),
    String(StringKind),
    /// Entity and score holder selectors.
    SelectorFlags(u8),
    Time { min: i32 },
    Registry(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentParser {
    pub id: i32,
    pub properties: ParserProperties,
}

impl ArgumentParser {
    pub fn greedy_string() -> Self {
        Self {
            id: PARSER_STRING,
            properties: ParserProperties::String(StringKind::GreedyPhrase),
        }
    }
}

impl Encode for ArgumentParser {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_var_int(self.id);
        match &self.properties {
            ParserProperties::None => {}
            ParserProperties::Float(bounds) => bounds.encode(encoder),
            ParserProperties::Double(bounds) => bounds.encode(encoder),
            ParserProperties::Integer(bounds) => bounds.encode(encoder),
            ParserProperties::Long(bounds) => bounds.encode(encoder),
            ParserProperties::String(kind) => {
                encoder.write_var_int(match kind {
                    StringKind::SingleWord => 0,
                    StringKind::QuotablePhrase => 1,
                    StringKind::GreedyPhrase => 2,
                });
            }
            ParserProperties::SelectorFlags(flags) => encoder.write_u8(*flags),
            ParserProperties::Time { min } => encoder.write_i32(*min),
            ParserProperties::Registry(registry) => encoder.write_string(registry),
        }
    }
}

impl Decode for ArgumentParser {
    fn decode(decoder: &mut Decoder) -> decoder::Result<Self> {
        let id = decoder.read_var_int()?;
        let properties = match id {
            PARSER_FLOAT => ParserProperties::Float(Bounds::decode(decoder)?),
            PARSER_DOUBLE => ParserProperties::Double(Bounds::decode(decoder)?),
            PARSER_INTEGER => ParserProperties::Integer(Bounds::decode(decoder)?),
            PARSER_LONG => ParserProperties::Long(Bounds::decode(decoder)?),
            PARSER_STRING => ParserProperties::String(match decoder.read_var_int()? {
                0 => StringKind::SingleWord,
                1 => StringKind::QuotablePhrase,
                2 => StringKind::GreedyPhrase,
                x => return Err(DecodeError::Other(anyhow!("invalid string argument kind {x}"))),
            }),
            PARSER_ENTITY | PARSER_SCORE_HOLDER => {
                ParserProperties::SelectorFlags(decoder.read_u8()?)
            }
            PARSER_TIME => ParserProperties::Time {
                min: decoder.read_i32()?,
            },
            PARSER_RESOURCE_OR_TAG
            | PARSER_RESOURCE_OR_TAG_KEY
            | PARSER_RESOURCE
            | PARSER_RESOURCE_KEY => {
                ParserProperties::Registry(decoder.read_string()?.to_owned())
            }
            0..=PARSER_UUID => ParserProperties::None,
            x => return Err(DecodeError::Other(anyhow!("unknown argument parser {x}"))),
        };
        Ok(Self { id, properties })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandNode {
    pub kind: NodeKind,
    /// Never holds `REDIRECT` or `HAS_SUGGESTIONS`; those are written from
    /// `redirect` and `suggestions`.
    pub flags: NodeFlags,
    pub children: Vec<i32>,
    pub redirect: Option<i32>,
    /// Literal text or argument name. Absent for the root.
    pub name: Option<String>,
    /// Present for argument nodes only.
    pub parser: Option<ArgumentParser>,
    /// Suggestion provider, for arguments with `HAS_SUGGESTIONS`.
    pub suggestions: Option<String>,
}

impl CommandNode {
    pub fn is_literal_named(&self, name: &str) -> bool {
        self.kind == NodeKind::Literal && self.name.as_deref() == Some(name)
    }
}

impl Encode for CommandNode {
    fn encode(&self, encoder: &mut Encoder) {
        let mut flags = self.flags;
        flags.set(NodeFlags::REDIRECT, self.redirect.is_some());
        flags.set(NodeFlags::HAS_SUGGESTIONS, self.suggestions.is_some());
        encoder.write_u8(self.kind.bits() | flags.bits());

        encoder.write_var_int(self.children.len().try_into().unwrap_or(i32::MAX));
        for &child in &self.children {
            encoder.write_var_int(child);
        }
        if let Some(redirect) = self.redirect {
            encoder.write_var_int(redirect);
        }
        if let Some(name) = &self.name {
            encoder.write_string(name);
        }
        if let Some(parser) = &self.parser {
            parser.encode(encoder);
        }
        if let Some(suggestions) = &self.suggestions {
            encoder.write_string(suggestions);
        }
    }
}

impl Decode for CommandNode {
    fn decode(decoder: &mut Decoder) -> decoder::Result<Self> {
        let bits = decoder.read_u8()?;
        let kind = NodeKind::from_bits(bits)?;
        let flags = NodeFlags::from_bits_retain(bits & !NODE_TYPE_MASK);

        let length = decoder.read_var_int()?;
        let mut children = Vec::new();
        for _ in 0..length {
            children.push(decoder.read_var_int()?);
        }
        let redirect = if flags.contains(NodeFlags::REDIRECT) {
            Some(decoder.read_var_int()?)
        } else {
            None
        };
        let name = match kind {
            NodeKind::Root => None,
            NodeKind::Literal | NodeKind::Argument => Some(decoder.read_string()?.to_owned()),
        };
        let parser = match kind {
            NodeKind::Argument => Some(ArgumentParser::decode(decoder)?),
            _ => None,
        };
        let suggestions = if kind == NodeKind::Argument && flags.contains(NodeFlags::HAS_SUGGESTIONS)
        {
            Some(decoder.read_string()?.to_owned())
        } else {
            None
        };

        Ok(Self {
            kind,
            flags: flags - (NodeFlags::REDIRECT | NodeFlags::HAS_SUGGESTIONS),
            children,
            redirect,
            name,
            parser,
            suggestions,
        })
    }
}

/// The `Commands` packet: every node plus the index of the root.
#[derive(Debug, Clone, PartialEq)]
pub struct Commands {
    pub nodes: Vec<CommandNode>,
    pub root_index: i32,
}

impl Commands {
    fn root(&self) -> Option<&CommandNode> {
        usize::try_from(self.root_index)
            .ok()
            .and_then(|index| self.nodes.get(index))
    }

    /// Finds the top-level literal with the given name.
    pub fn top_level_literal(&self, name: &str) -> Option<&CommandNode> {
        self.root()?
            .children
            .iter()
            .filter_map(|&child| usize::try_from(child).ok())
            .filter_map(|child| self.nodes.get(child))
            .find(|node| node.is_literal_named(name))
    }

    /// Names of all top-level literals, in declaration order.
    pub fn top_level_literals(&self) -> Vec<&str> {
        let Some(root) = self.root() else {
            return Vec::new();
        };
        root.children
            .iter()
            .filter_map(|&child| usize::try_from(child).ok())
            .filter_map(|child| self.nodes.get(child))
            .filter(|node| node.kind == NodeKind::Literal)
            .filter_map(|node| node.name.as_deref())
            .collect()
    }

    /// Appends a node to the graph, returning its index.
    pub fn push_node(&mut self, node: CommandNode) -> i32 {
        self.nodes.push(node);
        i32::try_from(self.nodes.len() - 1).unwrap_or(i32::MAX)
    }

    /// Attaches `child` under the root.
    pub fn add_root_child(&mut self, child: i32) -> anyhow::Result<()> {
        let root = usize::try_from(self.root_index)
            .ok()
            .and_then(|index| self.nodes.get_mut(index))
            .ok_or_else(|| anyhow!("command graph has no root node"))?;
        root.children.push(child);
        Ok(())
    }
}

impl Encode for Commands {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_var_int(self.nodes.len().try_into().unwrap_or(i32::MAX));
        for node in &self.nodes {
            node.encode(encoder);
        }
        encoder.write_var_int(self.root_index);
    }
}

impl Decode for Commands {
    fn decode(decoder: &mut Decoder) -> decoder::Result<Self> {
        let length = decoder.read_var_int()?;
        let mut nodes = Vec::new();
        for _ in 0..length {
            nodes.push(CommandNode::decode(decoder)?);
        }
        let root_index = decoder.read_var_int()?;
        Ok(Self { nodes, root_index })
    }
}
