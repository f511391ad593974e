//! User-facing messages, with `{0}`-style argument substitution.

use ahash::AHashMap;

const DEFAULTS: &[(&str, &str)] = &[
    ("server_went_down", "The server you were on went down, you have been connected to a fallback server"),
    ("lost_connection", "[Proxy] Lost connection to server."),
    ("fallback_kick", "Could not connect to a default or fallback server, please try again later: {0}"),
];

#[derive(Debug, Clone)]
pub struct Translations {
    messages: AHashMap<String, String>,
}

impl Default for Translations {
    fn default() -> Self {
        Self::with_overrides(AHashMap::new())
    }
}

impl Translations {
    /// Built-in messages with `overrides` replacing them by key.
    pub fn with_overrides(overrides: AHashMap<String, String>) -> Self {
        let mut messages: AHashMap<String, String> = DEFAULTS
            .iter()
            .map(|&(key, message)| (key.to_owned(), message.to_owned()))
            .collect();
        messages.extend(overrides);
        Self { messages }
    }

    /// Looks up `key` and substitutes `{n}` with the n-th argument.
    /// Unknown keys yield the key itself.
    pub fn translate(&self, key: &str, args: &[&dyn std::fmt::Display]) -> String {
        let Some(template) = self.messages.get(key) else {
            tracing::debug!("No translation for '{key}'");
            return key.to_owned();
        };
        let mut message = template.clone();
        for (i, arg) in args.iter().enumerate() {
            message = message.replace(&format!("{{{i}}}"), &arg.to_string());
        }
        message
    }
}
