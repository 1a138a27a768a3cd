//! ## [Property Data Types](https://learn.microsoft.com/en-us/openspecs/exchange_server_protocols/MS-OXCDATA/0c77892e-288e-435a-9c49-be1c20c7afdb)

use super::MapiError;

/// The type codes that appear in property stream names and legacy
/// fixed-record blocks. Codes outside this table decode through the
/// permissive identity fallback instead of failing.
#[repr(u16)]
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub enum PropertyType {
    /// `PtypUnspecified`: reserved placeholder records.
    Unspecified = 0x0000,
    /// `PtypNull`: None: This property is a placeholder.
    #[default]
    Null = 0x0001,
    /// `PtypInteger16`: 2 bytes; a 16-bit integer
    Integer16 = 0x0002,
    /// `PtypInteger32`: 4 bytes; a 32-bit integer
    Integer32 = 0x0003,
    /// `PtypErrorCode`: 4 bytes; a 32-bit integer encoding error information
    ErrorCode = 0x000A,
    /// `PtypBoolean`: 1 byte; restricted to 1 or 0 on paper, anything
    /// non-zero in the wild
    Boolean = 0x000B,
    /// `PtypObject`: a nested storage (embedded message or OLE object)
    Object = 0x000D,
    /// `PtypInteger64`: 8 bytes; a 64-bit integer
    Integer64 = 0x0014,
    /// `PtypString8`: a string of multibyte characters in externally
    /// specified encoding with terminating null character (single 0 byte)
    String8 = 0x001E,
    /// `PtypString`: a string of Unicode characters in UTF-16LE format
    /// encoding with terminating null character (0x0000)
    Unicode = 0x001F,
    /// `PtypTime`: 8 bytes; a 64-bit integer representing the number of
    /// 100-nanosecond intervals since January 1, 1601
    Time = 0x0040,
    /// `PtypGuid`: 16 bytes; a GUID with Data1, Data2, and Data3 fields in
    /// little-endian format
    Guid = 0x0048,
    /// `PtypBinary`: opaque bytes
    Binary = 0x0102,

    /// `PtypMultipleInteger16`
    MultipleInteger16 = 0x1002,
    /// `PtypMultipleInteger32`
    MultipleInteger32 = 0x1003,
    /// `PtypMultipleInteger64`
    MultipleInteger64 = 0x1014,
    /// `PtypMultipleString8`
    MultipleString8 = 0x101E,
    /// `PtypMultipleString`
    MultipleUnicode = 0x101F,
    /// `PtypMultipleTime`
    MultipleTime = 0x1040,
    /// `PtypMultipleGuid`
    MultipleGuid = 0x1048,
    /// `PtypMultipleBinary`
    MultipleBinary = 0x1102,
}

/// `MV_FLAG`: set on the type code of every multivalue property.
pub const MULTIVALUE_FLAG: u16 = 0x1000;

impl PropertyType {
    pub fn is_multivalue(self) -> bool {
        self as u16 & MULTIVALUE_FLAG != 0
    }

    /// The element type of a multivalue code, `None` for scalar codes.
    pub fn element_type(self) -> Option<PropertyType> {
        if self.is_multivalue() {
            PropertyType::try_from(self as u16 & !MULTIVALUE_FLAG).ok()
        } else {
            None
        }
    }
}

impl TryFrom<u16> for PropertyType {
    type Error = MapiError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x0000 => Ok(Self::Unspecified),
            0x0001 => Ok(Self::Null),
            0x0002 => Ok(Self::Integer16),
            0x0003 => Ok(Self::Integer32),
            0x000A => Ok(Self::ErrorCode),
            0x000B => Ok(Self::Boolean),
            0x000D => Ok(Self::Object),
            0x0014 => Ok(Self::Integer64),
            0x001E => Ok(Self::String8),
            0x001F => Ok(Self::Unicode),
            0x0040 => Ok(Self::Time),
            0x0048 => Ok(Self::Guid),
            0x0102 => Ok(Self::Binary),

            0x1002 => Ok(Self::MultipleInteger16),
            0x1003 => Ok(Self::MultipleInteger32),
            0x1014 => Ok(Self::MultipleInteger64),
            0x101E => Ok(Self::MultipleString8),
            0x101F => Ok(Self::MultipleUnicode),
            0x1040 => Ok(Self::MultipleTime),
            0x1048 => Ok(Self::MultipleGuid),
            0x1102 => Ok(Self::MultipleBinary),

            invalid => Err(MapiError::InvalidPropertyType(invalid)),
        }
    }
}

impl From<PropertyType> for u16 {
    fn from(value: PropertyType) -> Self {
        value as u16
    }
}
