use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::probe::error::{FailureKind, ProbeError};

/// Host, port and recipient of a single probe run.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub host: String,
    pub port: u16,
    pub recipient: String,
}

impl ProbeTarget {
    /// Builds a target, rejecting values that cannot produce a well-formed
    /// SMTP dialogue (empty host, port 0, recipient with line breaks).
    pub fn new(
        host: impl Into<String>,
        port: u16,
        recipient: impl Into<String>,
    ) -> Result<Self, ProbeError> {
        let host = host.into();
        let recipient = recipient.into();
        if host.trim().is_empty() {
            return Err(ProbeError::invalid_target("host is empty"));
        }
        if port == 0 {
            return Err(ProbeError::invalid_target("port must be in 1..=65535"));
        }
        if recipient.trim().is_empty() {
            return Err(ProbeError::invalid_target("recipient is empty"));
        }
        if recipient.contains(['\r', '\n']) {
            return Err(ProbeError::invalid_target(
                "recipient must not contain line breaks",
            ));
        }
        Ok(Self {
            host,
            port,
            recipient,
        })
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Step of the fixed probe sequence.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Greeting,
    Ehlo,
    MailFrom,
    RcptTo,
    Data,
    Message,
    Quit,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Connect => "Connect",
            Self::Greeting => "Greeting",
            Self::Ehlo => "EHLO",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Data => "DATA",
            Self::Message => "Message",
            Self::Quit => "QUIT",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Server reply exactly as decoded from the wire.
///
/// Nothing is reassembled or validated here: depending on the read mode the
/// text may hold a single chunk of a longer multi-line reply.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
}

impl Reply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Leading three-digit status code, if the reply starts with one.
    pub fn code(&self) -> Option<u16> {
        let prefix = self.text.get(..3)?;
        if !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        prefix.parse().ok()
    }

    pub fn starts_with_code(&self, code: &str) -> bool {
        self.text.starts_with(code)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text.trim())
    }
}

/// One command/reply step of the transcript. The greeting has no command.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub stage: Stage,
    pub command: Option<String>,
    pub reply: Reply,
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Status code of the reply that caused a rejection.
    pub code: Option<u16>,
}

impl From<&ProbeError> for ProbeFailure {
    fn from(err: &ProbeError) -> Self {
        let code = match err {
            ProbeError::Rejected { reply, .. } => reply.code(),
            _ => None,
        };
        Self {
            kind: err.kind(),
            message: err.to_string(),
            code,
        }
    }
}

/// Final report produced by [`probe_smtp`](crate::probe_smtp).
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub target: ProbeTarget,
    pub success: bool,
    pub exchanges: Vec<Exchange>,
    pub failure: Option<ProbeFailure>,
}

impl ProbeReport {
    pub fn reply_for(&self, stage: Stage) -> Option<&Reply> {
        self.exchanges
            .iter()
            .find(|exchange| exchange.stage == stage)
            .map(|exchange| &exchange.reply)
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.exchanges.iter().map(|exchange| exchange.stage).collect()
    }
}
