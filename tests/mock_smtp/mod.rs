//! Scripted single-connection SMTP server on loopback.
#![allow(dead_code)]

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;

/// What the mock server reads before answering with a reply.
pub enum Expect {
    /// One command line starting with the given prefix.
    Command(&'static str),
    /// Message lines up to and including the lone `.` terminator.
    Message,
}

pub struct MockServer {
    pub port: u16,
    handle: thread::JoinHandle<Vec<String>>,
}

impl MockServer {
    /// Starts a server that sends `greeting`, then for each step reads what
    /// `Expect` describes and writes the paired reply.
    pub fn start(greeting: &'static str, script: Vec<(Expect, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let port = listener.local_addr().expect("addr").port();
        let (ready_tx, ready_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            ready_tx.send(()).ok();
            let mut received = Vec::new();
            if let Ok((mut stream, _)) = listener.accept() {
                let _ = handle_session(&mut stream, greeting, script, &mut received);
            }
            received
        });
        ready_rx.recv().expect("server ready");
        Self { port, handle }
    }

    /// Every line the client sent, CRLF stripped.
    pub fn received(self) -> Vec<String> {
        self.handle.join().expect("mock server thread")
    }
}

fn handle_session(
    stream: &mut TcpStream,
    greeting: &str,
    script: Vec<(Expect, &'static str)>,
    received: &mut Vec<String>,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    stream.write_all(greeting.as_bytes())?;
    stream.flush()?;
    for (expect, reply) in script {
        match expect {
            Expect::Command(prefix) => {
                let line = read_line(&mut reader)?;
                assert!(
                    line.starts_with(prefix),
                    "expected command starting with '{prefix}', got '{line}'"
                );
                received.push(line);
            }
            Expect::Message => loop {
                let line = read_line(&mut reader)?;
                let done = line == ".";
                received.push(line);
                if done {
                    break;
                }
            },
        }
        stream.write_all(reply.as_bytes())?;
        stream.flush()?;
    }
    Ok(())
}

fn read_line(reader: &mut BufReader<TcpStream>) -> io::Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "client hung up"));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub fn accepting_script() -> Vec<(Expect, &'static str)> {
    vec![
        (Expect::Command("EHLO "), "250 mock.smtp.test\r\n"),
        (Expect::Command("MAIL FROM:<"), "250 2.1.0 Ok\r\n"),
        (Expect::Command("RCPT TO:<"), "250 2.1.5 Ok\r\n"),
        (Expect::Command("DATA"), "354 End data with <CR><LF>.<CR><LF>\r\n"),
        (Expect::Message, "250 2.0.0 Ok: queued as 42\r\n"),
        (Expect::Command("QUIT"), "221 2.0.0 Bye\r\n"),
    ]
}

/// Port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    port
}
