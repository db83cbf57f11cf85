mod config;
mod error;
mod request;
mod value;

pub use config::{ConnectionConfig, DEFAULT_CONNECTION_TIMEOUT, Scheme};
pub use error::{DriverError, EncodeError, ErrorKind};
pub use request::Request;
pub use value::{Parameters, Value};
