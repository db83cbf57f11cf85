use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use mdbwire_core::{ConnectionConfig, DriverError};
use mdbwire_protocol::{DRIVER_PREAMBLE, FrameSink, IoBuffer, SERVER_PREAMBLE};

/// Lifecycle of a [`SocketConnection`]. Only `Ready` carries request traffic.
///
/// A connection exists only once [`SocketConnection::open`] starts dialing, so
/// the first observable state is `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    HandshakeInProgress,
    Ready,
    Closed,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::HandshakeInProgress => "handshaking",
            ConnectionState::Ready => "ready",
            ConnectionState::Closed => "closed",
        }
    }
}

/// One blocking stream-socket connection to a server.
///
/// The connection timeout bounds establishment and the preamble exchange;
/// once `Ready`, reads and writes block for as long as the server takes.
/// A socket failure after the handshake closes the connection, and every
/// later call fails fast without touching the socket.
pub struct SocketConnection {
    stream: Option<TcpStream>,
    address: String,
    connection_timeout: Duration,
    state: ConnectionState,
}

impl SocketConnection {
    /// Opens the socket and performs the handshake.
    pub fn connect(config: &ConnectionConfig) -> Result<Self, DriverError> {
        let mut connection = Self::open(config)?;
        connection.handshake()?;
        Ok(connection)
    }

    /// Opens the socket, leaving the connection waiting for [`handshake`](Self::handshake).
    pub fn open(config: &ConnectionConfig) -> Result<Self, DriverError> {
        let mut connection = Self {
            stream: None,
            address: config.address(),
            connection_timeout: config.connection_timeout,
            state: ConnectionState::Connecting,
        };

        if config.scheme.is_secure() {
            log::warn!(
                "{} is not supported yet; establishing a plaintext TCP connection to {}",
                config.scheme.as_str().to_uppercase(),
                connection.address
            );
        }

        let start = Instant::now();
        let stream = match establish(config, &connection.address) {
            Ok(stream) => stream,
            Err(e) => {
                connection.state = ConnectionState::Closed;
                return Err(e);
            }
        };
        stream.set_nodelay(true).ok();

        log::info!(
            "Connected to {} in {:.2}ms",
            connection.address,
            start.elapsed().as_secs_f64() * 1000.0
        );

        connection.stream = Some(stream);
        connection.state = ConnectionState::HandshakeInProgress;
        Ok(connection)
    }

    /// Sends the driver preamble and checks the server's 8-byte reply.
    ///
    /// Runs once per connection. Any failure closes the connection.
    pub fn handshake(&mut self) -> Result<(), DriverError> {
        let address = self.address.clone();
        let timeout = self.connection_timeout;
        let stream = self.stream_in(ConnectionState::HandshakeInProgress, "handshake")?;
        let result = exchange_preambles(stream, &address, timeout);

        match result {
            Ok(()) => {
                self.state = ConnectionState::Ready;
                log::debug!("Handshake with {} complete", self.address);
                Ok(())
            }
            Err(e) => {
                log::warn!("Handshake with {} failed: {}", self.address, e);
                self.close();
                Err(e)
            }
        }
    }

    /// Writes every byte of `bytes`, looping over partial writes.
    pub fn send_all(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        let result = self.ready_stream("send")?.write_all(bytes);

        match result {
            Ok(()) => {
                log::trace!("Sent {} bytes to {}", bytes.len(), self.address);
                Ok(())
            }
            Err(source) => Err(self.fail(source)),
        }
    }

    /// Reads exactly `count` bytes into `buffer` past its used region.
    ///
    /// On success `buffer.used_len()` grows by exactly `count`. On failure the
    /// used length is restored and the connection is closed; a peer that
    /// closes early is an error, never "no data yet".
    pub fn receive_exactly_into(
        &mut self,
        buffer: &mut IoBuffer,
        count: usize,
    ) -> Result<(), DriverError> {
        let result = fill_exact(self.ready_stream("receive")?, buffer, count);

        match result {
            Ok(()) => {
                log::trace!("Received {} bytes from {}", count, self.address);
                Ok(())
            }
            Err(source) => Err(self.fail(source)),
        }
    }

    /// Shuts down both directions and releases the socket. Errors are
    /// ignored; calling this again is a no-op.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            log::debug!("Closed connection to {}", self.address);
        }
        self.state = ConnectionState::Closed;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn ready_stream(&mut self, operation: &'static str) -> Result<&mut TcpStream, DriverError> {
        self.stream_in(ConnectionState::Ready, operation)
    }

    fn stream_in(
        &mut self,
        expected: ConnectionState,
        operation: &'static str,
    ) -> Result<&mut TcpStream, DriverError> {
        match self.stream.as_mut() {
            Some(stream) if self.state == expected => Ok(stream),
            _ => Err(DriverError::InvalidState {
                address: self.address.clone(),
                state: self.state.as_str(),
                operation,
            }),
        }
    }

    fn fail(&mut self, source: io::Error) -> DriverError {
        log::warn!("Transport error on {}: {}", self.address, source);
        self.close();
        DriverError::Transport {
            address: self.address.clone(),
            source,
        }
    }
}

impl FrameSink for SocketConnection {
    fn send_all(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        SocketConnection::send_all(self, bytes)
    }
}

impl Drop for SocketConnection {
    fn drop(&mut self) {
        self.close();
    }
}

fn establish(config: &ConnectionConfig, address: &str) -> Result<TcpStream, DriverError> {
    let addrs: Vec<SocketAddr> = (config.host.as_str(), config.port)
        .to_socket_addrs()
        .map_err(|source| DriverError::ConnectionFailed {
            address: address.to_string(),
            source,
        })?
        .collect();

    let mut last_error = None;
    for addr in addrs {
        log::debug!("Trying {addr} for {address}");
        match TcpStream::connect_timeout(&addr, config.connection_timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }

    Err(connect_error(address, config.connection_timeout, last_error))
}

/// Maps the last failed connect attempt to a driver error.
fn connect_error(address: &str, timeout: Duration, last_error: Option<io::Error>) -> DriverError {
    match last_error {
        Some(e) if e.kind() == io::ErrorKind::TimedOut => DriverError::ConnectTimeout {
            address: address.to_string(),
            timeout,
        },
        Some(source) => DriverError::ConnectionFailed {
            address: address.to_string(),
            source,
        },
        None => DriverError::ConnectionFailed {
            address: address.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses"),
        },
    }
}

fn exchange_preambles(
    stream: &mut TcpStream,
    address: &str,
    timeout: Duration,
) -> Result<(), DriverError> {
    let handshake_io = |source: io::Error| DriverError::HandshakeIo {
        address: address.to_string(),
        source,
    };

    stream.set_read_timeout(Some(timeout)).map_err(handshake_io)?;
    stream.set_write_timeout(Some(timeout)).map_err(handshake_io)?;

    stream.write_all(&DRIVER_PREAMBLE).map_err(handshake_io)?;

    let mut response = [0u8; SERVER_PREAMBLE.len()];
    let mut filled = 0;
    while filled < response.len() {
        match stream.read(&mut response[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(handshake_io(e)),
        }
    }

    if response[..filled] != SERVER_PREAMBLE {
        return Err(DriverError::HandshakeMismatch {
            address: address.to_string(),
            expected: SERVER_PREAMBLE.to_vec(),
            actual: response[..filled].to_vec(),
        });
    }

    stream.set_read_timeout(None).map_err(handshake_io)?;
    stream.set_write_timeout(None).map_err(handshake_io)?;
    Ok(())
}

/// Reads until `count` more bytes are in `buffer`, restoring its used length
/// on failure.
fn fill_exact<R: Read>(reader: &mut R, buffer: &mut IoBuffer, count: usize) -> io::Result<()> {
    let start = buffer.used_len();
    buffer.reserve(count);

    let mut received = 0;
    while received < count {
        match buffer.read_from(reader, count - received) {
            Ok(0) => {
                buffer.truncate(start);
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("no data received after {received} of {count} bytes"),
                ));
            }
            Ok(n) => received += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                buffer.truncate(start);
                return Err(e);
            }
        }
    }
    Ok(())
}
