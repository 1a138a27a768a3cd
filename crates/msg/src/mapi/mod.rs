//! ## [MAPI Property Layer](https://learn.microsoft.com/en-us/openspecs/exchange_server_protocols/ms-oxmsg/b046868c-9fbf-41ae-9ffb-8de2bd4eec82)

use std::io;
use thiserror::Error;

pub mod key;
pub mod named_prop;
pub mod prop_type;
pub mod store;
pub mod value;

pub(crate) mod tags;

#[derive(Error, Debug)]
pub enum MapiError {
    #[error("Invalid property type: 0x{0:04X}")]
    InvalidPropertyType(u16),
    #[error("Directory entry 0x{0:08X} is not a storage")]
    NotAStorage(u32),
    #[error("Missing directory entry: 0x{0:08X}")]
    MissingStorageEntry(u32),
    #[error("Compressed RTF body is not a binary property")]
    InvalidRtfBody,
    #[error("RTF decompression failed: {0}")]
    RtfDecompression(#[from] compressed_rtf::Error),
}

impl From<MapiError> for io::Error {
    fn from(err: MapiError) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}

pub type MapiResult<T> = Result<T, MapiError>;
