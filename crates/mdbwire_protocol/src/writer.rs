use mdbwire_core::{EncodeError, Parameters, Request, Value};

use crate::frame::FrameBuffer;
use crate::protocol::{DataType, RequestType};

/// Encodes `request` into `buffer` and seals it as one frame.
pub fn encode_request(request: &Request, buffer: &mut FrameBuffer) -> Result<(), EncodeError> {
    RequestWriter::new(buffer).write_request(request)
}

/// Appends wire-format requests to a caller-supplied [`FrameBuffer`].
///
/// Every request is checked in full before its first byte is appended, so a
/// rejected request leaves the buffer exactly as it was.
pub struct RequestWriter<'a> {
    buffer: &'a mut FrameBuffer,
}

impl<'a> RequestWriter<'a> {
    pub fn new(buffer: &'a mut FrameBuffer) -> Self {
        Self { buffer }
    }

    pub fn write_request(&mut self, request: &Request) -> Result<(), EncodeError> {
        match request {
            Request::Query { text, parameters } => self.write_run(text, parameters),
            Request::Catalog => {
                self.write_catalog();
                Ok(())
            }
            Request::Cancel {
                worker_index,
                token,
            } => self.write_cancel(*worker_index, token),
        }
    }

    pub fn write_run(&mut self, query: &str, parameters: &Parameters) -> Result<(), EncodeError> {
        encoded_size(query.len())?;
        validate_parameters(parameters)?;

        let start = self.buffer.used_len();
        self.write_uint8(RequestType::Query.as_u8());
        self.write_string(query)?;
        self.write_parameters(parameters)?;
        self.buffer.seal();

        log::debug!(
            "Encoded query request with {} parameter(s), {} bytes",
            parameters.len(),
            self.buffer.used_len() - start
        );
        Ok(())
    }

    pub fn write_catalog(&mut self) {
        self.write_uint8(RequestType::Catalog.as_u8());
        self.buffer.seal();
        log::debug!("Encoded catalog request");
    }

    pub fn write_cancel(&mut self, worker_index: u32, token: &str) -> Result<(), EncodeError> {
        encoded_size(token.len())?;

        self.write_uint8(RequestType::Cancel.as_u8());
        self.write_uint32(worker_index);
        self.write_string(token)?;
        self.buffer.seal();

        log::debug!("Encoded cancel request for worker {worker_index}");
        Ok(())
    }

    fn write_parameters(&mut self, parameters: &Parameters) -> Result<(), EncodeError> {
        self.write_uint8(DataType::Map.as_u8());
        self.write_uint32(encoded_size(parameters.len())?);

        for (key, value) in parameters.iter() {
            self.write_string(key)?;
            self.write_value(key, value)?;
        }
        Ok(())
    }

    fn write_value(&mut self, key: &str, value: &Value) -> Result<(), EncodeError> {
        match value {
            Value::Null => self.write_uint8(DataType::Null.as_u8()),
            Value::Bool(true) => self.write_uint8(DataType::BoolTrue.as_u8()),
            Value::Bool(false) => self.write_uint8(DataType::BoolFalse.as_u8()),
            Value::String(s) => self.write_string(s)?,
            Value::Int64(i) => {
                self.write_uint8(DataType::Int64.as_u8());
                self.buffer.append(&i.to_be_bytes());
            }
            Value::Float(f) => {
                self.write_uint8(DataType::Float.as_u8());
                self.buffer.append(&f.to_be_bytes());
            }
            Value::List(_) | Value::Map(_) => {
                return Err(EncodeError::UnsupportedParameterType {
                    key: key.to_string(),
                    type_name: value.type_name(),
                });
            }
        }
        Ok(())
    }

    fn write_uint8(&mut self, value: u8) {
        self.buffer.append(&[value]);
    }

    fn write_uint32(&mut self, value: u32) {
        self.buffer.append(&value.to_be_bytes());
    }

    fn write_string(&mut self, value: &str) -> Result<(), EncodeError> {
        let size = encoded_size(value.len())?;
        self.write_uint8(DataType::String.as_u8());
        self.write_uint32(size);
        self.buffer.append(value.as_bytes());
        Ok(())
    }
}

fn encoded_size(len: usize) -> Result<u32, EncodeError> {
    u32::try_from(len).map_err(|_| EncodeError::LengthOverflow { len })
}

fn validate_parameters(parameters: &Parameters) -> Result<(), EncodeError> {
    if let Some(type_name) = parameters.non_string_key() {
        return Err(EncodeError::NonStringParameterKey { type_name });
    }
    encoded_size(parameters.len())?;

    for (key, value) in parameters.iter() {
        encoded_size(key.len())?;

        match value {
            Value::Null | Value::Bool(_) | Value::Int64(_) | Value::Float(_) => {}
            Value::String(s) => {
                encoded_size(s.len())?;
            }
            Value::List(_) | Value::Map(_) => {
                return Err(EncodeError::UnsupportedParameterType {
                    key: key.to_string(),
                    type_name: value.type_name(),
                });
            }
        }
    }
    Ok(())
}
