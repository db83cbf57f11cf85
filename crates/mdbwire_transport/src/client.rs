use mdbwire_core::{ConnectionConfig, DriverError, Parameters, Request};
use mdbwire_protocol::{FrameBuffer, IoBuffer, RequestWriter, encode_request};

use crate::connection::SocketConnection;

/// A ready connection plus the buffer its requests are encoded into.
///
/// This is the surface the session layer drives: one request out, then as
/// many exact-length reads as the response decoder asks for.
pub struct DriverClient {
    connection: SocketConnection,
    requests: FrameBuffer,
}

impl DriverClient {
    pub fn connect(config: &ConnectionConfig) -> Result<Self, DriverError> {
        Ok(Self::from_connection(SocketConnection::connect(config)?))
    }

    pub fn connect_url(url: &str) -> Result<Self, DriverError> {
        Self::connect(&ConnectionConfig::from_url(url)?)
    }

    pub fn from_connection(connection: SocketConnection) -> Self {
        Self {
            connection,
            requests: FrameBuffer::new(),
        }
    }

    pub fn run(&mut self, query: &str, parameters: &Parameters) -> Result<(), DriverError> {
        RequestWriter::new(&mut self.requests).write_run(query, parameters)?;
        self.flush()
    }

    pub fn catalog(&mut self) -> Result<(), DriverError> {
        RequestWriter::new(&mut self.requests).write_catalog();
        self.flush()
    }

    pub fn cancel(&mut self, worker_index: u32, token: &str) -> Result<(), DriverError> {
        RequestWriter::new(&mut self.requests).write_cancel(worker_index, token)?;
        self.flush()
    }

    pub fn send(&mut self, request: &Request) -> Result<(), DriverError> {
        encode_request(request, &mut self.requests)?;
        self.flush()
    }

    /// Reads exactly `count` response bytes into `buffer`.
    pub fn receive_into(&mut self, buffer: &mut IoBuffer, count: usize) -> Result<(), DriverError> {
        self.connection.receive_exactly_into(buffer, count)
    }

    pub fn connection(&self) -> &SocketConnection {
        &self.connection
    }

    pub fn close(&mut self) {
        self.requests.discard();
        self.connection.close();
    }

    fn flush(&mut self) -> Result<(), DriverError> {
        let result = self.requests.flush(&mut self.connection);
        if result.is_err() {
            self.requests.discard();
        }
        result
    }
}
