use chrono::NaiveDateTime;

/// End-of-data marker line, including its CRLF.
pub const END_OF_DATA: &str = ".\r\n";

pub fn mail_from_command(sender: &str) -> String {
    format!("MAIL FROM:<{sender}>")
}

pub fn rcpt_to_command(recipient: &str) -> String {
    format!("RCPT TO:<{recipient}>")
}

/// Fixed-template test message sent after `DATA`, terminator included.
///
/// The body text is a single line, so no dot-stuffing is needed: the only
/// line made of a lone period is the terminator right after it.
pub fn compose_message(
    sender: &str,
    recipient: &str,
    subject: &str,
    sent_at: NaiveDateTime,
) -> String {
    format!(
        "From: {sender}\r\n\
         To: {recipient}\r\n\
         Subject: {subject}\r\n\
         \r\n\
         This is a test message sent at {}\r\n\
         {END_OF_DATA}",
        sent_at.format("%Y-%m-%d %H:%M:%S"),
    )
}
