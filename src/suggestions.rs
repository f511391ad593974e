//! Relays tab-completion responses through the event hooks.

use crate::{
    events::{EventHooks, TabCompleteResponseEvent},
    protocol::packet::CommandSuggestions,
    server::ServerRef,
};

/// Offers the suggested strings to the hooks. Returns the response to send,
/// or `None` if a hook vetoed it.
///
/// The response is rebuilt only when a hook changed the list, keeping the
/// wire shape the backend used.
pub fn relay(
    mut response: CommandSuggestions,
    player: &str,
    server: &ServerRef,
    hooks: &dyn EventHooks,
) -> Option<CommandSuggestions> {
    let original = response.texts();
    let mut event = TabCompleteResponseEvent {
        player: player.to_owned(),
        server: ServerRef::clone(server),
        suggestions: original.clone(),
        cancelled: false,
    };
    hooks.on_tab_complete_response(&mut event);

    if event.cancelled {
        tracing::debug!("Tab completion for {player} was vetoed");
        return None;
    }
    if event.suggestions != original {
        response.replace_texts(event.suggestions);
    }
    Some(response)
}
