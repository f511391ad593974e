//! Merges proxy commands into the command tree a backend declares, so the
//! client offers them too.

use crate::protocol::commands::{
    ArgumentParser, CommandNode, Commands, NodeFlags, NodeKind, ASK_SERVER,
};
use ahash::AHashSet;

/// A command the proxy handles itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCommand {
    pub name: String,
    /// Needed to see the command. `None` means everyone may.
    pub permission: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: Vec<ProxyCommand>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, permission: Option<String>) {
        self.commands.push(ProxyCommand {
            name: name.into(),
            permission,
        });
    }

    pub fn commands(&self) -> &[ProxyCommand] {
        &self.commands
    }
}

/// Shape of the nodes injected for each proxy command: an executable
/// literal with one greedy argument completed by the backend.
#[derive(Debug, Clone)]
pub struct CommandTemplate {
    argument_name: String,
}

impl Default for CommandTemplate {
    fn default() -> Self {
        Self {
            argument_name: "args".into(),
        }
    }
}

impl CommandTemplate {
    fn argument(&self) -> CommandNode {
        CommandNode {
            kind: NodeKind::Argument,
            flags: NodeFlags::EXECUTABLE,
            children: Vec::new(),
            redirect: None,
            name: Some(self.argument_name.clone()),
            parser: Some(ArgumentParser::greedy_string()),
            suggestions: Some(ASK_SERVER.into()),
        }
    }

    fn literal(&self, name: &str, argument: i32) -> CommandNode {
        CommandNode {
            kind: NodeKind::Literal,
            flags: NodeFlags::EXECUTABLE,
            children: vec![argument],
            redirect: None,
            name: Some(name.to_owned()),
            parser: None,
            suggestions: None,
        }
    }
}

pub struct CommandMerger<'a> {
    pub registry: &'a CommandRegistry,
    pub template: &'a CommandTemplate,
    pub disabled: &'a AHashSet<String>,
}

impl CommandMerger<'_> {
    /// Adds every proxy command the player may use and the tree lacks.
    /// Returns how many were added.
    pub fn merge(
        &self,
        commands: &mut Commands,
        has_permission: impl Fn(&str) -> bool,
    ) -> anyhow::Result<usize> {
        let mut added = 0;
        for command in self.registry.commands() {
            if self.disabled.contains(&command.name)
                || commands.top_level_literal(&command.name).is_some()
                || !command
                    .permission
                    .as_deref()
                    .map_or(true, |permission| has_permission(permission))
            {
                continue;
            }

            let argument = commands.push_node(self.template.argument());
            let literal = commands.push_node(self.template.literal(&command.name, argument));
            commands.add_root_child(literal)?;
            added += 1;
        }
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::commands::{tests::sample_commands, ParserProperties, StringKind};

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register("foo", None);
        registry.register("tp", None);
        registry.register("admin", Some("proxy.admin".into()));
        registry.register("glist", None);
        registry
    }

    fn disabled() -> AHashSet<String> {
        ["glist".to_owned()].into_iter().collect()
    }

    #[test]
    fn adds_missing_permitted_commands_once() {
        let registry = registry();
        let template = CommandTemplate::default();
        let disabled = disabled();
        let merger = CommandMerger {
            registry: &registry,
            template: &template,
            disabled: &disabled,
        };

        let mut commands = sample_commands();
        assert_eq!(merger.merge(&mut commands, |_| false).unwrap(), 1);
        assert_eq!(commands.top_level_literals(), ["tp", "time", "foo"]);

        let foo = commands.top_level_literal("foo").unwrap();
        assert!(foo.flags.contains(NodeFlags::EXECUTABLE));
        let argument = &commands.nodes[foo.children[0] as usize];
        assert_eq!(
            argument.parser.as_ref().unwrap().properties,
            ParserProperties::String(StringKind::GreedyPhrase)
        );
        assert_eq!(argument.suggestions.as_deref(), Some(ASK_SERVER));

        assert_eq!(merger.merge(&mut commands, |_| false).unwrap(), 0);
        assert_eq!(commands.top_level_literals(), ["tp", "time", "foo"]);
    }

    #[test]
    fn permission_gates_commands() {
        let registry = registry();
        let template = CommandTemplate::default();
        let disabled = disabled();
        let merger = CommandMerger {
            registry: &registry,
            template: &template,
            disabled: &disabled,
        };

        let mut commands = sample_commands();
        merger
            .merge(&mut commands, |permission| permission == "proxy.admin")
            .unwrap();
        assert!(commands.top_level_literal("admin").is_some());
        assert!(commands.top_level_literal("glist").is_none());
    }
}
