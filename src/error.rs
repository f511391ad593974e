use crate::protocol::DecodeError;

/// A fault that ends the bridged session.
///
/// Suppressing a packet is never an error: rules report that through
/// [`Forwarding::Drop`](crate::bridge::Forwarding::Drop).
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("unknown scoreboard objective action {0}")]
    UnknownObjectiveAction(u8),
    #[error("unknown score action {0}")]
    UnknownScoreAction(i32),
    #[error("unknown team mode {0}")]
    UnknownTeamMode(u8),
    #[error("unknown scoreboard display position {0}")]
    UnknownDisplayPosition(u8),
    #[error("backend brand '{brand}' names this proxy; it is connected to itself")]
    SelfConnection { brand: String },
    #[error("malformed packet from backend: {0}")]
    Decode(#[from] DecodeError),
}

impl BridgeError {
    /// Returns whether the backend broke the wire contract, as opposed to
    /// a configuration fault on the proxy side.
    pub fn is_protocol_violation(&self) -> bool {
        !matches!(self, Self::SelfConnection { .. })
    }
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
