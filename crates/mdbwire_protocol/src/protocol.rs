//! Protocol constant table shared by the request encoder and the response
//! decoder. Tag values must match the server's protocol definition byte for
//! byte; nothing else in the workspace hard-codes them.

use thiserror::Error;

/// Sent by the driver as the first bytes of every connection.
pub const DRIVER_PREAMBLE: [u8; 8] = *b"MDB_DRVR";

/// Expected reply to [`DRIVER_PREAMBLE`].
pub const SERVER_PREAMBLE: [u8; 8] = *b"MDB_SRVR";

/// Width of every length and count prefix on the wire.
pub const SIZE_PREFIX_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unknown {kind} tag byte 0x{tag:02x}")]
pub struct UnknownTag {
    pub kind: &'static str,
    pub tag: u8,
}

/// First byte of every request message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestType {
    Query = 0,
    Catalog = 1,
    Cancel = 2,
}

impl RequestType {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for RequestType {
    type Error = UnknownTag;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(RequestType::Query),
            1 => Ok(RequestType::Catalog),
            2 => Ok(RequestType::Cancel),
            tag => Err(UnknownTag {
                kind: "request type",
                tag,
            }),
        }
    }
}

/// Type tag preceding every encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    Null = 0,
    BoolFalse = 1,
    BoolTrue = 2,
    Int64 = 3,
    Uint64 = 4,
    Float = 5,
    Double = 6,
    Decimal = 7,
    String = 8,
    StringLang = 9,
    StringDatatype = 10,
    Iri = 11,
    List = 12,
    Map = 13,
}

impl DataType {
    const ALL: [DataType; 14] = [
        DataType::Null,
        DataType::BoolFalse,
        DataType::BoolTrue,
        DataType::Int64,
        DataType::Uint64,
        DataType::Float,
        DataType::Double,
        DataType::Decimal,
        DataType::String,
        DataType::StringLang,
        DataType::StringDatatype,
        DataType::Iri,
        DataType::List,
        DataType::Map,
    ];

    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for DataType {
    type Error = UnknownTag;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        DataType::ALL
            .get(usize::from(tag))
            .copied()
            .ok_or(UnknownTag {
                kind: "data type",
                tag,
            })
    }
}
