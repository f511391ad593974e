//! Plugin channels the proxy reserves for itself.

use crate::{
    config::InternalChannel,
    error::{BridgeError, Result},
    protocol::{packet::PluginMessage, Decoder, Encoder, MINECRAFT_1_13},
};

const LEGACY_BRAND_CHANNEL: &str = "MC|Brand";
const BRAND_CHANNEL: &str = "minecraft:brand";

/// The brand channel name clients of `protocol_version` use.
pub fn brand_channel(protocol_version: i32) -> &'static str {
    if protocol_version >= MINECRAFT_1_13 {
        BRAND_CHANNEL
    } else {
        LEGACY_BRAND_CHANNEL
    }
}

/// What happens to a plugin message after interception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Not a reserved channel.
    Pass,
    /// Internal traffic that must not reach the client.
    Swallow,
    /// Send this instead of the original.
    Rewritten(PluginMessage),
}

#[derive(Debug, Clone)]
pub struct ChannelInterceptor {
    proxy_name: String,
    proxy_version: String,
    internal: InternalChannel,
}

impl ChannelInterceptor {
    pub fn new(
        proxy_name: impl Into<String>,
        proxy_version: impl Into<String>,
        internal: InternalChannel,
    ) -> Self {
        Self {
            proxy_name: proxy_name.into(),
            proxy_version: proxy_version.into(),
            internal,
        }
    }

    pub fn intercept(&self, message: &PluginMessage, protocol_version: i32) -> Result<Interception> {
        if message.channel == brand_channel(protocol_version) {
            let brand = Decoder::new(&message.data).read_string()?;
            let data = self.rewrite_brand(brand)?;
            return Ok(Interception::Rewritten(PluginMessage {
                channel: message.channel.clone(),
                data,
            }));
        }
        if self.internal.matches(&message.channel) {
            return Ok(Interception::Swallow);
        }
        Ok(Interception::Pass)
    }

    /// Prefixes the backend's brand with the proxy's, as an encoded string.
    ///
    /// A brand already naming this proxy means the proxy reached itself.
    pub fn rewrite_brand(&self, server_brand: &str) -> Result<Vec<u8>> {
        if server_brand.contains(&self.proxy_name) {
            return Err(BridgeError::SelfConnection {
                brand: server_brand.to_owned(),
            });
        }
        let brand = format!(
            "{} ({}) <- {server_brand}",
            self.proxy_name, self.proxy_version
        );
        let mut data = Vec::new();
        Encoder::new(&mut data).write_string(&brand);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PROTOCOL_VERSION;

    fn interceptor() -> ChannelInterceptor {
        ChannelInterceptor::new("Sample", "1.0", InternalChannel::default())
    }

    fn brand(channel: &str, brand: &str) -> PluginMessage {
        let mut data = Vec::new();
        Encoder::new(&mut data).write_string(brand);
        PluginMessage {
            channel: channel.into(),
            data,
        }
    }

    #[test]
    fn brand_gets_proxy_prefix() {
        let result = interceptor()
            .intercept(&brand(BRAND_CHANNEL, "Paper"), PROTOCOL_VERSION)
            .unwrap();
        let Interception::Rewritten(message) = result else {
            panic!("brand was not rewritten: {result:?}");
        };
        assert_eq!(message.channel, BRAND_CHANNEL);
        assert_eq!(
            Decoder::new(&message.data).read_string().unwrap(),
            "Sample (1.0) <- Paper"
        );
    }

    #[test]
    fn legacy_clients_use_legacy_brand_channel() {
        let legacy = MINECRAFT_1_13 - 1;
        assert!(matches!(
            interceptor().intercept(&brand(LEGACY_BRAND_CHANNEL, "Spigot"), legacy),
            Ok(Interception::Rewritten(_))
        ));
        assert_eq!(
            interceptor()
                .intercept(&brand(BRAND_CHANNEL, "Spigot"), legacy)
                .unwrap(),
            Interception::Pass
        );
    }

    #[test]
    fn own_brand_is_a_self_connection() {
        assert!(matches!(
            interceptor().intercept(&brand(BRAND_CHANNEL, "Sample (1.0) <- Paper"), PROTOCOL_VERSION),
            Err(BridgeError::SelfConnection { .. })
        ));
    }

    #[test]
    fn internal_channel_is_swallowed() {
        for channel in ["BungeeCord", "bungeecord:main"] {
            let message = PluginMessage {
                channel: channel.into(),
                data: vec![1, 2, 3],
            };
            assert_eq!(
                interceptor().intercept(&message, PROTOCOL_VERSION).unwrap(),
                Interception::Swallow
            );
        }
    }
}
