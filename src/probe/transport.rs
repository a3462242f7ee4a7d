use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::probe::error::ProbeError;
use crate::probe::types::Stage;

/// Byte pipe the probe talks SMTP over.
///
/// The connection is released when the value is dropped.
pub trait Transport {
    fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Single receive into `buf`; `Ok(0)` means the peer closed the stream.
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Opens the one connection a probe runs on.
pub trait Connector {
    type Transport: Transport;

    fn connect(
        &self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<Self::Transport, ProbeError>;
}

/// Plain-TCP connector used by [`probe_smtp`](crate::probe_smtp).
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    fn connect(
        &self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<TcpTransport, ProbeError> {
        let addrs = resolve(host, port)?;
        if addrs.is_empty() {
            return Err(ProbeError::Resolve {
                host: host.to_string(),
                source: io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    "no socket address available",
                ),
            });
        }
        connect_first(&addrs, timeout.map(|t| Instant::now() + t), timeout)
    }
}

/// Tries each address in turn. All attempts share one deadline so a host
/// with many addresses still gives up after a single timeout.
fn connect_first(
    addrs: &[SocketAddr],
    deadline: Option<Instant>,
    io_timeout: Option<Duration>,
) -> Result<TcpTransport, ProbeError> {
    let mut last_err = ProbeError::Timeout {
        stage: Stage::Connect,
    };
    for addr in addrs {
        let budget = remaining(deadline, Instant::now())?;
        match TcpTransport::open(addr, budget, io_timeout) {
            Ok(transport) => return Ok(transport),
            Err(err) => {
                debug!(%addr, error = %err, "connect attempt failed");
                last_err = err;
            }
        }
    }
    Err(last_err)
}

/// Time left before `deadline`, or a connect timeout once it has passed.
fn remaining(deadline: Option<Instant>, now: Instant) -> Result<Option<Duration>, ProbeError> {
    match deadline {
        None => Ok(None),
        Some(deadline) if deadline > now => Ok(Some(deadline - now)),
        Some(_) => Err(ProbeError::Timeout {
            stage: Stage::Connect,
        }),
    }
}

fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>, ProbeError> {
    (host, port)
        .to_socket_addrs()
        .map(|addrs| addrs.collect())
        .map_err(|err| ProbeError::Resolve {
            host: host.to_string(),
            source: err,
        })
}

#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpTransport {
    pub fn connect(addr: &SocketAddr, timeout: Option<Duration>) -> Result<Self, ProbeError> {
        Self::open(addr, timeout, timeout)
    }

    /// `connect_timeout` bounds the handshake only; reads and writes on the
    /// open stream use `io_timeout`.
    fn open(
        addr: &SocketAddr,
        connect_timeout: Option<Duration>,
        io_timeout: Option<Duration>,
    ) -> Result<Self, ProbeError> {
        let stream = if let Some(timeout) = connect_timeout {
            TcpStream::connect_timeout(addr, timeout)
        } else {
            TcpStream::connect(addr)
        }
        .map_err(|err| ProbeError::from_io(Stage::Connect, err))?;
        stream
            .set_read_timeout(io_timeout)
            .map_err(|err| ProbeError::from_io(Stage::Connect, err))?;
        stream
            .set_write_timeout(io_timeout)
            .map_err(|err| ProbeError::from_io(Stage::Connect, err))?;
        debug!(peer = %addr, "connected");
        Ok(Self {
            stream,
            peer: *addr,
        })
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data)?;
        self.stream.flush()
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        // the peer may already have hung up
        let _ = self.stream.shutdown(Shutdown::Both);
        trace!(peer = %self.peer, "connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn refused_connection_is_classified() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let err = TcpConnector
            .connect("127.0.0.1", port, Some(Duration::from_secs(5)))
            .expect_err("nothing listens");
        assert!(
            matches!(err, ProbeError::ConnectionRefused | ProbeError::Timeout { .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn unresolvable_host_is_a_resolve_error() {
        let err = TcpConnector
            .connect("host.invalid", 25, Some(Duration::from_secs(1)))
            .expect_err("reserved TLD never resolves");
        assert!(matches!(err, ProbeError::Resolve { .. }), "got {err}");
    }

    #[test]
    fn transport_round_trips_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut buf = [0u8; 6];
            stream.read_exact(&mut buf).expect("read");
            stream.write_all(b"221 Bye\r\n").expect("write");
            buf
        });

        let mut transport =
            TcpTransport::connect(&addr, Some(Duration::from_secs(5))).expect("connect");
        transport.send(b"QUIT\r\n").expect("send");
        let mut buf = [0u8; 64];
        let n = transport.receive(&mut buf).expect("receive");
        assert_eq!(&buf[..n], b"221 Bye\r\n");
        assert_eq!(&server.join().expect("server thread"), b"QUIT\r\n");
    }

    #[test]
    fn remaining_budget_shrinks_toward_deadline() {
        let now = Instant::now();
        let deadline = now + Duration::from_secs(5);
        assert_eq!(remaining(None, now).expect("no deadline"), None);
        assert_eq!(
            remaining(Some(deadline), now).expect("budget left"),
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            remaining(Some(deadline), now + Duration::from_secs(2)).expect("budget left"),
            Some(Duration::from_secs(3))
        );

        let err = remaining(Some(deadline), deadline).expect_err("deadline reached");
        assert!(matches!(err, ProbeError::Timeout { stage: Stage::Connect }));
        let err = remaining(Some(deadline), deadline + Duration::from_millis(1))
            .expect_err("deadline passed");
        assert_eq!(err.to_string(), "connection timeout");
    }

    #[test]
    fn expired_deadline_stops_before_any_attempt() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.set_nonblocking(true).expect("nonblocking");
        let addr = listener.local_addr().expect("addr");

        let deadline = Instant::now();
        let err = connect_first(&[addr, addr], Some(deadline), Some(Duration::from_secs(5)))
            .expect_err("no budget left");
        assert!(matches!(err, ProbeError::Timeout { stage: Stage::Connect }), "got {err}");
        let accepted = listener.accept();
        assert!(
            matches!(&accepted, Err(err) if err.kind() == io::ErrorKind::WouldBlock),
            "no connection should have been opened"
        );
    }

    #[test]
    fn later_address_is_tried_within_the_shared_deadline() {
        let closed = TcpListener::bind("127.0.0.1:0").expect("bind");
        let closed_addr = closed.local_addr().expect("addr");
        drop(closed);
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");

        let deadline = Instant::now() + Duration::from_secs(5);
        let transport = connect_first(&[closed_addr, addr], Some(deadline), None)
            .expect("second address accepts");
        drop(transport);
        listener.accept().expect("connection reached the listener");
    }
}
