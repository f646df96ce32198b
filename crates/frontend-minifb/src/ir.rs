//! Infrared bridge over TCP.
//!
//! Bytes the walker transmits through SCI3 are written to the peer, and bytes
//! read from the peer are queued on the SCI3 receive side. Sockets are
//! non-blocking and polled once per host loop iteration. A dropped peer is
//! logged; `--ir-connect` dials again after [`RECONNECT_DELAY`], `--ir-listen`
//! accepts the next client.

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use walker_core::Board;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const CONNECT_TIMEOUT: Duration = Duration::from_millis(250);

enum Endpoint {
    Connect(String),
    Listen(TcpListener),
}

pub struct IrBridge {
    endpoint: Endpoint,
    stream: Option<TcpStream>,
    last_attempt: Option<Instant>,
    /// Transmitted bytes the socket has not taken yet.
    outgoing: Vec<u8>,
}

impl IrBridge {
    /// Dial `addr` (`host:port`) lazily from [`IrBridge::poll`].
    pub fn connect(addr: &str) -> Self {
        IrBridge {
            endpoint: Endpoint::Connect(addr.to_string()),
            stream: None,
            last_attempt: None,
            outgoing: Vec::new(),
        }
    }

    /// Accept peers on `port` on all interfaces.
    pub fn listen(port: u16) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        listener.set_nonblocking(true)?;
        info!("IR bridge listening on {}", listener.local_addr()?);
        Ok(IrBridge {
            endpoint: Endpoint::Listen(listener),
            stream: None,
            last_attempt: None,
            outgoing: Vec::new(),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.endpoint {
            Endpoint::Listen(listener) => listener.local_addr().ok(),
            Endpoint::Connect(_) => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Exchange pending bytes between the board and the peer.
    pub fn poll(&mut self, board: &mut Board) {
        self.outgoing.extend(board.sci3.take_transmitted());
        for packet in board.sci3.take_packets() {
            debug!("IR packet ({} bytes): {:02X?}", packet.len(), packet);
        }

        if self.stream.is_none() {
            self.establish();
        }
        let Some(stream) = self.stream.as_mut() else {
            // Nobody is listening; the walker just sees no answer.
            self.outgoing.clear();
            return;
        };

        let mut buf = [0u8; 512];
        let mut alive = true;
        loop {
            match stream.read(&mut buf) {
                Ok(0) => {
                    alive = false;
                    break;
                }
                Ok(n) => board.sci3.receive(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("IR bridge read failed: {}", e);
                    alive = false;
                    break;
                }
            }
        }

        while alive && !self.outgoing.is_empty() {
            match stream.write(&self.outgoing) {
                Ok(0) => alive = false,
                Ok(n) => {
                    self.outgoing.drain(..n);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("IR bridge write failed: {}", e);
                    alive = false;
                }
            }
        }

        if !alive {
            info!("IR peer disconnected");
            self.stream = None;
            self.outgoing.clear();
        }
    }

    fn establish(&mut self) {
        let stream = match &self.endpoint {
            Endpoint::Listen(listener) => match listener.accept() {
                Ok((stream, peer)) => {
                    info!("IR peer connected from {}", peer);
                    stream
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) => {
                    warn!("IR bridge accept failed: {}", e);
                    return;
                }
            },
            Endpoint::Connect(addr) => {
                if self.last_attempt.is_some_and(|t| t.elapsed() < RECONNECT_DELAY) {
                    return;
                }
                self.last_attempt = Some(Instant::now());
                match dial(addr) {
                    Ok(stream) => {
                        info!("IR bridge connected to {}", addr);
                        stream
                    }
                    Err(e) => {
                        debug!("IR bridge connect to {} failed: {}", addr, e);
                        return;
                    }
                }
            }
        };
        if let Err(e) = stream.set_nonblocking(true).and_then(|_| stream.set_nodelay(true)) {
            warn!("IR bridge socket setup failed: {}", e);
            return;
        }
        self.stream = Some(stream);
    }
}

fn dial(addr: &str) -> std::io::Result<TcpStream> {
    let mut last_err = std::io::Error::new(ErrorKind::NotFound, "address resolved to nothing");
    for sock in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&sock, CONNECT_TIMEOUT) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}
