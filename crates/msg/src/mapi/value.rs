//! Decoded property values.

use byteorder::{LittleEndian, ReadBytesExt};
use std::{
    fmt::Debug,
    io::{self, Cursor, Read},
};

/// Seconds between the FILETIME epoch (1601-01-01) and the Unix epoch.
const FILETIME_UNIX_OFFSET: i64 = 11_644_473_600;

/// Converts a FILETIME tick count (100ns intervals since 1601) to Unix
/// seconds.
pub fn filetime_to_unix(ticks: i64) -> i64 {
    ticks / 10_000_000 - FILETIME_UNIX_OFFSET
}

/// A GUID with Data1, Data2, and Data3 fields in little-endian format.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GuidValue {
    data1: u32,
    data2: u16,
    data3: u16,
    data4: [u8; 8],
}

impl GuidValue {
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    pub fn read(f: &mut dyn Read) -> io::Result<Self> {
        let data1 = f.read_u32::<LittleEndian>()?;
        let data2 = f.read_u16::<LittleEndian>()?;
        let data3 = f.read_u16::<LittleEndian>()?;
        let mut data4 = [0_u8; 8];
        f.read_exact(&mut data4)?;
        Ok(Self {
            data1,
            data2,
            data3,
            data4,
        })
    }

    pub fn data1(&self) -> u32 {
        self.data1
    }

    pub fn data2(&self) -> u16 {
        self.data2
    }

    pub fn data3(&self) -> u16 {
        self.data3
    }

    pub fn data4(&self) -> &[u8; 8] {
        &self.data4
    }
}

impl Debug for GuidValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7]
        )
    }
}

/// Decodes a UTF-16LE byte buffer, dropping one trailing NUL pair if
/// present.
pub(crate) fn decode_utf16(data: &[u8]) -> String {
    let mut cursor = Cursor::new(data);
    let mut units = Vec::with_capacity(data.len() / 2);
    for _ in 0..data.len() / 2 {
        units.push(cursor.read_u16::<LittleEndian>().unwrap_or_default());
    }
    if units.last() == Some(&0) {
        units.pop();
    }
    String::from_utf16_lossy(&units)
}

/// A decoded property value: the tagged union behind every entry in a
/// property map. Unknown encodings are preserved as raw bytes so callers
/// can still inspect them.
#[derive(Clone, Default, PartialEq)]
pub enum PropertyValue {
    #[default]
    Null,
    /// `PtypInteger16`
    Integer16(i16),
    /// `PtypInteger32`
    Integer32(i32),
    /// `PtypBoolean`: decoded permissively, any non-zero payload is true
    Boolean(bool),
    /// `PtypInteger64`
    Integer64(i64),
    /// `PtypTime`: raw 100ns ticks since the 1601 epoch
    Time(i64),
    /// `PtypString`: transcoded from UTF-16LE
    String(String),
    /// `PtypString8`: raw bytes in an externally specified codepage, one
    /// trailing NUL trimmed
    String8(Vec<u8>),
    /// `PtypBinary`
    Binary(Vec<u8>),
    /// `PtypGuid`
    Guid(GuidValue),
    /// `PtypObject`: the directory entry index of a nested storage
    Storage(u32),
    /// A multivalue property: positions are written sparsely from the
    /// per-value stream offsets, missing slots stay [`PropertyValue::Null`]
    Multiple(Vec<PropertyValue>),
    /// Identity fallback for an unrecognized type code.
    Unknown { type_code: u16, data: Vec<u8> },
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PropertyValue::Binary(value) | PropertyValue::String8(value) => Some(value),
            PropertyValue::Unknown { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            PropertyValue::Integer32(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer64(value) => Some(*value),
            PropertyValue::Integer32(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Raw FILETIME ticks for time values.
    pub fn as_time(&self) -> Option<i64> {
        match self {
            PropertyValue::Time(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_guid(&self) -> Option<&GuidValue> {
        match self {
            PropertyValue::Guid(value) => Some(value),
            _ => None,
        }
    }

    /// Directory entry index of a nested storage value.
    pub fn as_storage(&self) -> Option<u32> {
        match self {
            PropertyValue::Storage(index) => Some(*index),
            _ => None,
        }
    }

    pub fn as_multiple(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::Multiple(values) => Some(values),
            _ => None,
        }
    }
}

impl Debug for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Null => write!(f, "Null"),
            PropertyValue::Integer16(value) => write!(f, "Integer16({value})"),
            PropertyValue::Integer32(value) => write!(f, "Integer32({value})"),
            PropertyValue::Boolean(value) => write!(f, "Boolean({value})"),
            PropertyValue::Integer64(value) => write!(f, "Integer64({value})"),
            PropertyValue::Time(value) => write!(f, "Time(0x{value:016X})"),
            PropertyValue::String(value) => write!(f, "String({value:?})"),
            PropertyValue::String8(value) => write!(f, "String8({} bytes)", value.len()),
            PropertyValue::Binary(value) => write!(f, "Binary({} bytes)", value.len()),
            PropertyValue::Guid(value) => write!(f, "Guid({value:?})"),
            PropertyValue::Storage(index) => write!(f, "Storage(0x{index:08X})"),
            PropertyValue::Multiple(values) => f.debug_list().entries(values.iter()).finish(),
            PropertyValue::Unknown { type_code, data } => {
                write!(f, "Unknown(0x{type_code:04X}, {} bytes)", data.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filetime_epoch() {
        assert_eq!(filetime_to_unix(0), -FILETIME_UNIX_OFFSET);
        // 2004-04-01T00:00:00Z
        assert_eq!(filetime_to_unix(127_252_512_000_000_000), 1_080_777_600);
    }

    #[test]
    fn test_decode_utf16_trims_one_nul_pair() {
        let data = [b'h', 0, b'i', 0, 0, 0];
        assert_eq!(decode_utf16(&data), "hi");
        let data = [b'h', 0, b'i', 0];
        assert_eq!(decode_utf16(&data), "hi");
    }

    #[test]
    fn test_guid_debug_format() {
        let guid = GuidValue::new(
            0x00020328,
            0x0000,
            0x0000,
            [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
        );
        assert_eq!(
            format!("{guid:?}"),
            "{00020328-0000-0000-C000-000000000046}"
        );
    }

    #[test]
    fn test_guid_read_little_endian() {
        let data = [
            0x28, 0x03, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x46,
        ];
        let guid = GuidValue::read(&mut Cursor::new(data)).unwrap();
        assert_eq!(guid.data1(), 0x00020328);
        assert_eq!(guid.data4()[7], 0x46);
    }
}
