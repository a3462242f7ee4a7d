#![forbid(unsafe_code)]
//! smtp_probe — sonde SMTP minimale (EHLO, MAIL FROM, RCPT TO, DATA, QUIT)

pub mod probe;
pub use probe::{
    Connector,
    Exchange,
    FailureKind,
    ProbeError,
    ProbeFailure,
    ProbeOptions,
    ProbeReport,
    ProbeTarget,
    ReadMode,
    Reply,
    ReplyCheck,
    Stage,
    TcpConnector,
    Transport,
    probe_smtp,
    probe_smtp_with, // << entrée testable
};
