pub mod client;
pub mod connection;

pub use client::DriverClient;
pub use connection::{ConnectionState, SocketConnection};
