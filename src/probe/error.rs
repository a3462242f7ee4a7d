use std::io;

use thiserror::Error;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::probe::types::{Reply, Stage};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("could not resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("connection timeout")]
    Timeout { stage: Stage },
    #[error("connection refused; verify the SMTP server is running")]
    ConnectionRefused,
    #[error("connection closed by server during {stage}")]
    ConnectionClosed { stage: Stage },
    #[error("I/O error during {stage}: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: io::Error,
    },
    #[error("{stage} reply is not valid UTF-8: {source}")]
    Decode {
        stage: Stage,
        #[source]
        source: std::string::FromUtf8Error,
    },
    #[error("{stage} reply exceeds {limit} bytes")]
    ReplyTooLong { stage: Stage, limit: usize },
    #[error("{stage} rejected: {reply}")]
    Rejected { stage: Stage, reply: Reply },
}

impl ProbeError {
    pub fn invalid_target<T: std::fmt::Display>(reason: T) -> Self {
        Self::InvalidTarget(reason.to_string())
    }

    pub fn invalid_options<T: std::fmt::Display>(reason: T) -> Self {
        Self::InvalidOptions(reason.to_string())
    }

    /// Classifies a socket error raised while working on `stage`.
    ///
    /// Read timeouts surface as `WouldBlock` on Unix and `TimedOut` on
    /// Windows; both count as a timeout.
    pub fn from_io(stage: Stage, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout { stage },
            io::ErrorKind::ConnectionRefused => Self::ConnectionRefused,
            _ => Self::Io { stage, source: err },
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::ConnectionRefused => FailureKind::ConnectionRefused,
            Self::Rejected { .. } => FailureKind::Rejected,
            _ => FailureKind::Other,
        }
    }
}

/// Coarse failure category reported alongside the message.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    ConnectionRefused,
    Rejected,
    Other,
}
