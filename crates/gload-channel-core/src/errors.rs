use std::error::Error;
use std::fmt;

use gload_common::ConfigError;

pub type ChannelResult<T> = Result<T, ChannelError>;

#[derive(Debug, Clone)]
pub enum ChannelError {
    /// Resolution yielded no upstream for the channel.
    NoUpstream { channel: String },
    UnsupportedChannelType(String),
    InvalidConfig(String),
    Client(String),
    DuplicateChannelType(String),
    RegistryInstalled,
    Other(String),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::NoUpstream { channel } => {
                write!(f, "no upstream configured for channel {channel}")
            }
            ChannelError::UnsupportedChannelType(kind) => {
                write!(f, "unsupported channel type: {kind}")
            }
            ChannelError::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            ChannelError::Client(msg) => write!(f, "http client: {msg}"),
            ChannelError::DuplicateChannelType(kind) => {
                write!(f, "channel type registered twice: {kind}")
            }
            ChannelError::RegistryInstalled => write!(f, "channel registry already installed"),
            ChannelError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl Error for ChannelError {}

impl From<ConfigError> for ChannelError {
    fn from(value: ConfigError) -> Self {
        ChannelError::InvalidConfig(value.to_string())
    }
}

/// Outcome categories of a credential health check.
///
/// `Rejected` means the upstream answered and refused the key; `Transport`
/// means it never answered. Callers treat them differently, so they never
/// share a variant.
#[derive(Debug, Clone)]
pub enum ValidationError {
    Config(ChannelError),
    /// Request construction or payload marshalling failed before any IO.
    Request(String),
    Transport(String),
    Rejected { status: u16, message: String },
    Cancelled,
    DeadlineExceeded,
}

impl ValidationError {
    pub fn is_rejected(&self) -> bool {
        matches!(self, ValidationError::Rejected { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ValidationError::Transport(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ValidationError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Config(err) => write!(f, "{err}"),
            ValidationError::Request(msg) => write!(f, "failed to build validation request: {msg}"),
            ValidationError::Transport(msg) => write!(f, "upstream unreachable: {msg}"),
            ValidationError::Rejected { status, message } => write!(f, "[status {status}] {message}"),
            ValidationError::Cancelled => write!(f, "validation cancelled"),
            ValidationError::DeadlineExceeded => write!(f, "validation deadline exceeded"),
        }
    }
}

impl Error for ValidationError {}

impl From<ChannelError> for ValidationError {
    fn from(value: ChannelError) -> Self {
        ValidationError::Config(value)
    }
}
