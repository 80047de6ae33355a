use thiserror::Error;

#[derive(Debug, Error)]
pub enum SystemError {
    /// A single message could not be decoded. The message is dropped.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("bulk payload of {len} bytes exceeds cap of {cap} bytes")]
    PayloadTooLarge { len: u64, cap: u64 },

    #[error("peer unreachable: {0}")]
    PeerUnreachable(#[from] std::io::Error),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl SystemError {
    /// Whether the fault ends the session it occurred on.
    pub fn is_session_fatal(&self) -> bool {
        match self {
            Self::MalformedEvent(_) | Self::PayloadTooLarge { .. } => false,
            Self::PeerUnreachable(_) | Self::ProtocolViolation(_) => true,
        }
    }

    pub(crate) fn unexpected_eof(context: &str) -> Self {
        Self::PeerUnreachable(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            context.to_string(),
        ))
    }
}

pub type Result<T, E = SystemError> = std::result::Result<T, E>;
