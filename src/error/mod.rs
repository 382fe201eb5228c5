use thiserror::Error;

/// Errors produced while handling a client command.
///
/// Every variant is reported only to the originating connection as an ERROR
/// frame; none of them abort other connections or the process. The message
/// strings on the client-facing variants are part of the wire contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LobbyError {
    #[error("Lobby not found")]
    LobbyNotFound,

    #[error("Invalid lobby or player")]
    InvalidReference,

    #[error("Invalid message format")]
    MalformedRequest,

    #[error("lobby code space exhausted after {0} attempts")]
    CodeSpaceExhausted(usize),
}

impl LobbyError {
    /// Message carried by the ERROR frame sent back to the client.
    ///
    /// Internal faults are surfaced generically; the detailed message is
    /// logged server-side instead.
    pub fn client_message(&self) -> String {
        match self {
            Self::CodeSpaceExhausted(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::CodeSpaceExhausted(_))
    }
}

pub type Result<T> = std::result::Result<T, LobbyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages_match_wire_contract() {
        assert_eq!(LobbyError::LobbyNotFound.client_message(), "Lobby not found");
        assert_eq!(
            LobbyError::InvalidReference.client_message(),
            "Invalid lobby or player"
        );
        assert_eq!(
            LobbyError::MalformedRequest.client_message(),
            "Invalid message format"
        );
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let err = LobbyError::CodeSpaceExhausted(32);
        assert!(err.is_internal());
        assert_eq!(err.client_message(), "Internal server error");
        // the detailed message still exists for logging
        assert!(err.to_string().contains("32"));
    }
}
