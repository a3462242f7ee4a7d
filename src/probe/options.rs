use std::borrow::Cow;
use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::probe::error::ProbeError;

pub const DEFAULT_HELO: &str = "test";
pub const DEFAULT_MAIL_FROM: &str = "test@example.com";
pub const DEFAULT_SUBJECT: &str = "Test Message";

/// What to do when `MAIL FROM` or `RCPT TO` is not answered with `250`.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyCheck {
    /// Abort the probe (after a best-effort `QUIT`).
    #[default]
    Enforce,
    /// Log the reply and carry on with the dialogue.
    Ignore,
}

/// How much of a server reply a single step reads.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// One receive of at most `read_buffer` bytes. Multi-line replies split
    /// across packets are shown partially.
    #[default]
    SingleChunk,
    /// Keep receiving until the final line of the reply has arrived.
    FullReply,
}

/// Configuration knobs for [`probe_smtp`](crate::probe_smtp).
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub helo_domain: String,
    pub mail_from: String,
    pub subject: String,
    pub timeout_ms: u64,
    pub read_buffer: usize,
    pub read_mode: ReadMode,
    pub reply_check: ReplyCheck,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            helo_domain: DEFAULT_HELO.to_string(),
            mail_from: DEFAULT_MAIL_FROM.to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            timeout_ms: 5_000,
            read_buffer: 1024,
            read_mode: ReadMode::SingleChunk,
            reply_check: ReplyCheck::Enforce,
        }
    }
}

impl ProbeOptions {
    /// Return the timeout as a [`Duration`]. A zero timeout disables the
    /// connection/read deadline.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_ms))
        }
    }

    pub fn helo_name(&self) -> Cow<'_, str> {
        if self.helo_domain.trim().is_empty() {
            Cow::Borrowed(DEFAULT_HELO)
        } else {
            Cow::Borrowed(self.helo_domain.trim())
        }
    }

    pub fn sender(&self) -> Cow<'_, str> {
        if self.mail_from.trim().is_empty() {
            Cow::Borrowed(DEFAULT_MAIL_FROM)
        } else {
            Cow::Borrowed(self.mail_from.trim())
        }
    }

    /// Rejects values that would leak line breaks into the SMTP stream: a
    /// CR/LF in `EHLO`, `MAIL FROM` or the `Subject:` header injects extra
    /// commands or ends `DATA` early.
    pub fn validate(&self) -> Result<(), ProbeError> {
        let fields = [
            ("helo", &self.helo_domain),
            ("from", &self.mail_from),
            ("subject", &self.subject),
        ];
        for (name, value) in fields {
            if value.contains(['\r', '\n']) {
                return Err(ProbeError::invalid_options(format!(
                    "{name} must not contain line breaks"
                )));
            }
        }
        Ok(())
    }

    /// Receive buffer size, never below the 3 bytes of a status code.
    pub fn buffer_size(&self) -> usize {
        self.read_buffer.max(3)
    }
}
