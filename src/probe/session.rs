use std::io::Write;

use tracing::debug;

use crate::probe::error::ProbeError;
use crate::probe::options::{ProbeOptions, ReadMode};
use crate::probe::transport::Transport;
use crate::probe::types::{Exchange, Reply, Stage};

/// Upper bound for a reassembled reply in [`ReadMode::FullReply`].
pub const MAX_REPLY_BYTES: usize = 64 * 1024;

/// One live SMTP connection plus the transcript it produces.
///
/// Every reply is echoed to `out` as `<stage>: <reply>` and appended to the
/// transcript. Dropping the session drops the transport, which closes it.
pub struct ProbeSession<'a, T: Transport> {
    transport: T,
    read_mode: ReadMode,
    buffer_size: usize,
    out: &'a mut dyn Write,
    transcript: &'a mut Vec<Exchange>,
}

impl<'a, T: Transport> ProbeSession<'a, T> {
    pub fn new(
        transport: T,
        options: &ProbeOptions,
        out: &'a mut dyn Write,
        transcript: &'a mut Vec<Exchange>,
    ) -> Self {
        Self {
            transport,
            read_mode: options.read_mode,
            buffer_size: options.buffer_size(),
            out,
            transcript,
        }
    }

    pub fn read_greeting(&mut self) -> Result<Reply, ProbeError> {
        let reply = self.read_reply(Stage::Greeting)?;
        self.record(Stage::Greeting, None, &reply);
        Ok(reply)
    }

    /// Sends `command` followed by CRLF and reads the reply.
    pub fn send_command(&mut self, stage: Stage, command: &str) -> Result<Reply, ProbeError> {
        debug!(%stage, command, "sending");
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.transport
            .send(&line)
            .map_err(|err| ProbeError::from_io(stage, err))?;
        let reply = self.read_reply(stage)?;
        self.record(stage, Some(command.to_string()), &reply);
        Ok(reply)
    }

    /// Sends a pre-formatted payload (message body and terminator) verbatim.
    pub fn send_payload(&mut self, stage: Stage, payload: &str) -> Result<Reply, ProbeError> {
        debug!(%stage, bytes = payload.len(), "sending payload");
        self.transport
            .send(payload.as_bytes())
            .map_err(|err| ProbeError::from_io(stage, err))?;
        let reply = self.read_reply(stage)?;
        self.record(stage, None, &reply);
        Ok(reply)
    }

    /// Best-effort `QUIT` on an early exit path.
    pub fn quit(&mut self) -> Result<Reply, ProbeError> {
        self.send_command(Stage::Quit, "QUIT")
    }

    fn read_reply(&mut self, stage: Stage) -> Result<Reply, ProbeError> {
        let raw = match self.read_mode {
            ReadMode::SingleChunk => self.read_chunk(stage)?,
            ReadMode::FullReply => {
                let mut raw = Vec::new();
                while !is_complete_reply(&raw) {
                    raw.extend_from_slice(&self.read_chunk(stage)?);
                    if raw.len() > MAX_REPLY_BYTES {
                        return Err(ProbeError::ReplyTooLong {
                            stage,
                            limit: MAX_REPLY_BYTES,
                        });
                    }
                }
                raw
            }
        };
        let text = String::from_utf8(raw).map_err(|source| ProbeError::Decode { stage, source })?;
        debug!(%stage, reply = text.trim_end(), "received");
        Ok(Reply::new(text))
    }

    fn read_chunk(&mut self, stage: Stage) -> Result<Vec<u8>, ProbeError> {
        let mut buf = vec![0u8; self.buffer_size];
        let read = self
            .transport
            .receive(&mut buf)
            .map_err(|err| ProbeError::from_io(stage, err))?;
        if read == 0 {
            return Err(ProbeError::ConnectionClosed { stage });
        }
        buf.truncate(read);
        Ok(buf)
    }

    fn record(&mut self, stage: Stage, command: Option<String>, reply: &Reply) {
        // a closed stdout must not abort the dialogue
        writeln!(self.out, "{}: {reply}", stage.label()).ok();
        self.transcript.push(Exchange {
            stage,
            command,
            reply: reply.clone(),
        });
    }
}

/// True once `raw` ends with the final line of an SMTP reply
/// (`ddd<SP>text CRLF` or a bare `ddd CRLF`).
pub fn is_complete_reply(raw: &[u8]) -> bool {
    if !raw.ends_with(b"\n") {
        return false;
    }
    let body = &raw[..raw.len() - 1];
    let start = body
        .iter()
        .rposition(|byte| *byte == b'\n')
        .map_or(0, |pos| pos + 1);
    let last = &body[start..];
    let last = last.strip_suffix(b"\r").unwrap_or(last);
    last.len() >= 3
        && last[..3].iter().all(u8::is_ascii_digit)
        && last.get(3).is_none_or(|sep| *sep != b'-')
}
