pub mod buffer;
pub mod frame;
pub mod protocol;
pub mod writer;

pub use buffer::IoBuffer;
pub use frame::{FrameBuffer, FrameSink};
pub use protocol::{DRIVER_PREAMBLE, DataType, RequestType, SERVER_PREAMBLE, UnknownTag};
pub use writer::{RequestWriter, encode_request};
