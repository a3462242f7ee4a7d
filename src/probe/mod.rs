//! Minimal synchronous SMTP probe.
//!
//! [`probe_smtp`] opens one TCP connection, walks the fixed
//! `EHLO` / `MAIL FROM` / `RCPT TO` / `DATA` / `QUIT` sequence with a test
//! message, echoes every server reply to a writer and reports whether the
//! server accepted the message. [`probe_smtp_with`] takes any [`Connector`]
//! so the dialogue can run over an in-memory transport.

mod error;
mod message;
mod options;
mod session;
mod transport;
mod types;

use std::io::Write;

use chrono::Local;
use tracing::{info, warn};

pub use error::{FailureKind, ProbeError};
pub use message::{END_OF_DATA, compose_message, mail_from_command, rcpt_to_command};
pub use options::{ProbeOptions, ReadMode, ReplyCheck};
pub use session::{ProbeSession, is_complete_reply};
pub use transport::{Connector, TcpConnector, TcpTransport, Transport};
pub use types::{Exchange, ProbeFailure, ProbeReport, ProbeTarget, Reply, Stage};

const ACCEPTED: &str = "250";

/// Runs the probe over plain TCP.
pub fn probe_smtp(target: &ProbeTarget, options: &ProbeOptions, out: &mut dyn Write) -> ProbeReport {
    probe_smtp_with(&TcpConnector, target, options, out)
}

/// Runs the probe over connections opened by `connector`.
///
/// Never fails: every error is printed as `Error: ...` and recorded in the
/// report's `failure`.
pub fn probe_smtp_with<C: Connector>(
    connector: &C,
    target: &ProbeTarget,
    options: &ProbeOptions,
    out: &mut dyn Write,
) -> ProbeReport {
    writeln!(out, "Connecting to SMTP server {target}...").ok();
    let mut exchanges = Vec::new();
    let result = converse(connector, target, options, out, &mut exchanges);

    let failure = match &result {
        Ok(()) => {
            info!(%target, "message accepted");
            writeln!(out).ok();
            writeln!(out, "✓ Message sent successfully!").ok();
            writeln!(out, "Check the server logs to confirm delivery").ok();
            None
        }
        Err(err) => {
            warn!(%target, error = %err, "probe failed");
            writeln!(out, "Error: {err}").ok();
            Some(ProbeFailure::from(err))
        }
    };

    ProbeReport {
        target: target.clone(),
        success: failure.is_none(),
        exchanges,
        failure,
    }
}

fn converse<C: Connector>(
    connector: &C,
    target: &ProbeTarget,
    options: &ProbeOptions,
    out: &mut dyn Write,
    exchanges: &mut Vec<Exchange>,
) -> Result<(), ProbeError> {
    options.validate()?;
    let transport = connector.connect(&target.host, target.port, options.timeout())?;
    writeln!(out, "✓ Connected").ok();
    let mut session = ProbeSession::new(transport, options, out, exchanges);

    session.read_greeting()?;
    session.send_command(Stage::Ehlo, &format!("EHLO {}", options.helo_name()))?;

    let sender = options.sender();
    let reply = session.send_command(Stage::MailFrom, &mail_from_command(&sender))?;
    check_accepted(&mut session, options, Stage::MailFrom, reply)?;

    let reply = session.send_command(Stage::RcptTo, &rcpt_to_command(&target.recipient))?;
    check_accepted(&mut session, options, Stage::RcptTo, reply)?;

    session.send_command(Stage::Data, "DATA")?;
    let message = compose_message(
        &sender,
        &target.recipient,
        &options.subject,
        Local::now().naive_local(),
    );
    session.send_payload(Stage::Message, &message)?;
    session.send_command(Stage::Quit, "QUIT")?;
    Ok(())
}

fn check_accepted<T: Transport>(
    session: &mut ProbeSession<'_, T>,
    options: &ProbeOptions,
    stage: Stage,
    reply: Reply,
) -> Result<(), ProbeError> {
    if reply.starts_with_code(ACCEPTED) {
        return Ok(());
    }
    match options.reply_check {
        ReplyCheck::Ignore => {
            warn!(%stage, reply = %reply, "reply not accepted, continuing");
            Ok(())
        }
        ReplyCheck::Enforce => {
            session.quit().ok();
            Err(ProbeError::Rejected { stage, reply })
        }
    }
}
