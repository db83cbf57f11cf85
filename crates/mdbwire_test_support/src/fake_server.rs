use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use mdbwire_core::{ConnectionConfig, Scheme};
use mdbwire_protocol::{DRIVER_PREAMBLE, SERVER_PREAMBLE};

/// What the fake server does once its scripted bytes are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterReply {
    /// Record everything the client sends until it closes.
    Capture,
    /// Close the socket immediately.
    Close,
}

/// Scripted single-connection server for transport tests.
///
/// Accepts one client, reads its 8-byte preamble, writes the handshake reply
/// followed by any scripted response bytes (each after an optional delay),
/// then either closes or captures the client's traffic until EOF.
#[derive(Debug, Clone)]
pub struct FakeServer {
    handshake_reply: Vec<u8>,
    response: Vec<u8>,
    handshake_delay: Duration,
    response_delay: Duration,
    after_reply: AfterReply,
}

impl Default for FakeServer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            handshake_reply: SERVER_PREAMBLE.to_vec(),
            response: Vec::new(),
            handshake_delay: Duration::ZERO,
            response_delay: Duration::ZERO,
            after_reply: AfterReply::Capture,
        }
    }

    pub fn with_handshake_reply(mut self, reply: &[u8]) -> Self {
        self.handshake_reply = reply.to_vec();
        self
    }

    /// Bytes written right after the handshake reply.
    pub fn with_response(mut self, response: &[u8]) -> Self {
        self.response = response.to_vec();
        self
    }

    /// Waits this long after reading the client preamble before replying.
    pub fn with_handshake_delay(mut self, delay: Duration) -> Self {
        self.handshake_delay = delay;
        self
    }

    /// Waits this long between the handshake reply and the response bytes.
    pub fn with_response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }

    pub fn close_after_reply(mut self) -> Self {
        self.after_reply = AfterReply::Close;
        self
    }

    pub fn spawn(self) -> RunningFakeServer {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake server");
        let addr = listener.local_addr().expect("fake server address");

        let handle = thread::spawn(move || self.serve(listener));

        RunningFakeServer { addr, handle }
    }

    fn serve(self, listener: TcpListener) -> io::Result<FakeServerCapture> {
        let (mut stream, peer) = listener.accept()?;
        log::debug!("Fake server accepted {peer}");

        let mut preamble = vec![0u8; DRIVER_PREAMBLE.len()];
        stream.read_exact(&mut preamble)?;

        thread::sleep(self.handshake_delay);
        stream.write_all(&self.handshake_reply)?;
        stream.flush()?;

        thread::sleep(self.response_delay);
        stream.write_all(&self.response)?;
        stream.flush()?;

        let mut received = Vec::new();
        if self.after_reply == AfterReply::Capture {
            stream.read_to_end(&mut received)?;
        }

        Ok(FakeServerCapture { preamble, received })
    }
}

/// Traffic the fake server saw from its client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeServerCapture {
    pub preamble: Vec<u8>,
    pub received: Vec<u8>,
}

pub struct RunningFakeServer {
    addr: SocketAddr,
    handle: JoinHandle<io::Result<FakeServerCapture>>,
}

impl RunningFakeServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("tcp://{}", self.addr)
    }

    pub fn config(&self) -> ConnectionConfig {
        self.config_with_scheme(Scheme::Tcp)
    }

    pub fn config_with_scheme(&self, scheme: Scheme) -> ConnectionConfig {
        ConnectionConfig::new(self.addr.ip().to_string(), self.addr.port(), scheme)
            .with_connection_timeout(Duration::from_secs(5))
    }

    /// Client settings with a custom connection timeout.
    pub fn config_with_timeout(&self, timeout: Duration) -> ConnectionConfig {
        self.config().with_connection_timeout(timeout)
    }

    /// Waits for the server thread. The client must have closed its side
    /// first when the server is capturing.
    pub fn join(self) -> FakeServerCapture {
        self.handle
            .join()
            .expect("fake server thread panicked")
            .expect("fake server I/O failed")
    }
}
