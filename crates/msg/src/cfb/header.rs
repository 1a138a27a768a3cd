//! ## [Compound File Header](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-cfb/05060311-bfce-4b12-874d-c32269d9932e)

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

use super::CfbError;
use crate::IntegrityWarning;

/// `abSig`
///
/// ### See also
/// [Header]
const HEADER_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// `uByteOrder`: only little-endian files exist in practice.
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0xFFFE;

/// `csectFat` entries stored directly in the header before the DIFAT chain
/// takes over.
pub const HEADER_DIFAT_ENTRIES: usize = 109;

/// [Compound File Header](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-cfb/05060311-bfce-4b12-874d-c32269d9932e)
#[derive(Clone, Debug)]
pub struct Header {
    minor_version: u16,
    major_version: u16,
    sector_shift: u16,
    mini_sector_shift: u16,
    directory_sector_count: u32,
    fat_sector_count: u32,
    first_directory_sector: u32,
    transaction_signature: u32,
    mini_stream_cutoff: u32,
    first_mini_fat_sector: u32,
    mini_fat_sector_count: u32,
    first_difat_sector: u32,
    difat_sector_count: u32,
    difat: [u32; HEADER_DIFAT_ENTRIES],
}

impl Header {
    pub fn read(f: &mut dyn Read, warnings: &mut Vec<IntegrityWarning>) -> io::Result<Self> {
        // abSig
        let mut signature = [0_u8; 8];
        f.read_exact(&mut signature)?;
        if signature != HEADER_SIGNATURE {
            return Err(CfbError::InvalidHeaderSignature(signature).into());
        }

        // clsid: reserved, must be all zeroes
        let mut clsid = [0_u8; 16];
        f.read_exact(&mut clsid)?;
        if clsid != [0; 16] {
            let warning = IntegrityWarning::HeaderClassId(clsid);
            tracing::warn!("{warning}");
            warnings.push(warning);
        }

        // uMinorVersion
        let minor_version = f.read_u16::<LittleEndian>()?;

        // uMajorVersion
        let major_version = f.read_u16::<LittleEndian>()?;

        // uByteOrder
        let byte_order = f.read_u16::<LittleEndian>()?;
        if byte_order != BYTE_ORDER_LITTLE_ENDIAN {
            return Err(CfbError::InvalidByteOrder(byte_order).into());
        }

        // uSectorShift
        let sector_shift = f.read_u16::<LittleEndian>()?;
        if !(7..31).contains(&sector_shift) {
            return Err(CfbError::InvalidSectorShift(sector_shift).into());
        }

        // uMiniSectorShift
        let mini_sector_shift = f.read_u16::<LittleEndian>()?;
        if mini_sector_shift > sector_shift {
            return Err(CfbError::InvalidMiniSectorShift(mini_sector_shift).into());
        }

        // usReserved, usReserved1
        let mut reserved = [0_u8; 6];
        f.read_exact(&mut reserved)?;

        // csectDir: only meaningful for 4096-byte-sector files
        let directory_sector_count = f.read_u32::<LittleEndian>()?;

        // csectFat
        let fat_sector_count = f.read_u32::<LittleEndian>()?;

        // sectDirStart
        let first_directory_sector = f.read_u32::<LittleEndian>()?;

        // signature: non-zero transacting signatures show up in the wild
        let transaction_signature = f.read_u32::<LittleEndian>()?;
        if transaction_signature != 0 {
            let warning = IntegrityWarning::TransactionSignature(transaction_signature);
            tracing::warn!("{warning}");
            warnings.push(warning);
        }

        // ulMiniSectorCutoff
        let mini_stream_cutoff = f.read_u32::<LittleEndian>()?;

        // sectMiniFatStart
        let first_mini_fat_sector = f.read_u32::<LittleEndian>()?;

        // csectMiniFat
        let mini_fat_sector_count = f.read_u32::<LittleEndian>()?;

        // sectDifStart
        let first_difat_sector = f.read_u32::<LittleEndian>()?;

        // csectDif
        let difat_sector_count = f.read_u32::<LittleEndian>()?;

        // sectFat
        let mut difat = [0_u32; HEADER_DIFAT_ENTRIES];
        for entry in difat.iter_mut() {
            *entry = f.read_u32::<LittleEndian>()?;
        }

        Ok(Self {
            minor_version,
            major_version,
            sector_shift,
            mini_sector_shift,
            directory_sector_count,
            fat_sector_count,
            first_directory_sector,
            transaction_signature,
            mini_stream_cutoff,
            first_mini_fat_sector,
            mini_fat_sector_count,
            first_difat_sector,
            difat_sector_count,
            difat,
        })
    }

    pub fn minor_version(&self) -> u16 {
        self.minor_version
    }

    pub fn major_version(&self) -> u16 {
        self.major_version
    }

    pub fn sector_size(&self) -> usize {
        1 << self.sector_shift
    }

    pub fn mini_sector_size(&self) -> usize {
        1 << self.mini_sector_shift
    }

    pub fn sector_shift(&self) -> u16 {
        self.sector_shift
    }

    pub fn mini_sector_shift(&self) -> u16 {
        self.mini_sector_shift
    }

    pub fn directory_sector_count(&self) -> u32 {
        self.directory_sector_count
    }

    pub fn fat_sector_count(&self) -> u32 {
        self.fat_sector_count
    }

    pub fn first_directory_sector(&self) -> u32 {
        self.first_directory_sector
    }

    pub fn transaction_signature(&self) -> u32 {
        self.transaction_signature
    }

    pub fn mini_stream_cutoff(&self) -> u32 {
        self.mini_stream_cutoff
    }

    pub fn first_mini_fat_sector(&self) -> u32 {
        self.first_mini_fat_sector
    }

    pub fn mini_fat_sector_count(&self) -> u32 {
        self.mini_fat_sector_count
    }

    pub fn first_difat_sector(&self) -> u32 {
        self.first_difat_sector
    }

    pub fn difat_sector_count(&self) -> u32 {
        self.difat_sector_count
    }

    pub fn difat(&self) -> &[u32; HEADER_DIFAT_ENTRIES] {
        &self.difat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfb::alloc::{END_OF_CHAIN, FREE_SECTOR};
    use byteorder::WriteBytesExt;
    use std::io::{Cursor, Write};

    fn valid_header_bytes() -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_all(&HEADER_SIGNATURE).unwrap();
        cursor.write_all(&[0; 16]).unwrap();
        cursor.write_u16::<LittleEndian>(0x003E).unwrap();
        cursor.write_u16::<LittleEndian>(3).unwrap();
        cursor.write_u16::<LittleEndian>(BYTE_ORDER_LITTLE_ENDIAN).unwrap();
        cursor.write_u16::<LittleEndian>(9).unwrap();
        cursor.write_u16::<LittleEndian>(6).unwrap();
        cursor.write_all(&[0; 6]).unwrap();
        cursor.write_u32::<LittleEndian>(0).unwrap();
        cursor.write_u32::<LittleEndian>(1).unwrap();
        cursor.write_u32::<LittleEndian>(1).unwrap();
        cursor.write_u32::<LittleEndian>(0).unwrap();
        cursor.write_u32::<LittleEndian>(4096).unwrap();
        cursor.write_u32::<LittleEndian>(END_OF_CHAIN).unwrap();
        cursor.write_u32::<LittleEndian>(0).unwrap();
        cursor.write_u32::<LittleEndian>(END_OF_CHAIN).unwrap();
        cursor.write_u32::<LittleEndian>(0).unwrap();
        cursor.write_u32::<LittleEndian>(0).unwrap();
        for _ in 1..HEADER_DIFAT_ENTRIES {
            cursor.write_u32::<LittleEndian>(FREE_SECTOR).unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_signature_value() {
        assert_eq!(
            u64::from_be_bytes(HEADER_SIGNATURE),
            0xD0CF11E0A1B11AE1_u64
        );
    }

    #[test]
    fn test_read_valid_header() {
        let data = valid_header_bytes();
        let mut warnings = Vec::new();
        let header = Header::read(&mut Cursor::new(data), &mut warnings).unwrap();
        assert_eq!(header.sector_size(), 512);
        assert_eq!(header.mini_sector_size(), 64);
        assert_eq!(header.mini_stream_cutoff(), 4096);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_bad_signature() {
        let mut data = valid_header_bytes();
        data[0] = 0xFF;
        let mut warnings = Vec::new();
        let err = Header::read(&mut Cursor::new(data), &mut warnings).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_bad_sector_shift() {
        let mut data = valid_header_bytes();
        // uSectorShift = 6 is below the minimum
        data[30] = 6;
        let mut warnings = Vec::new();
        let err = Header::read(&mut Cursor::new(data), &mut warnings).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_mini_shift_above_sector_shift() {
        let mut data = valid_header_bytes();
        data[32] = 10;
        let mut warnings = Vec::new();
        assert!(Header::read(&mut Cursor::new(data), &mut warnings).is_err());
    }

    #[test]
    fn test_transaction_signature_warns() {
        let mut data = valid_header_bytes();
        data[52] = 1;
        let mut warnings = Vec::new();
        let header = Header::read(&mut Cursor::new(data), &mut warnings).unwrap();
        assert_eq!(header.transaction_signature(), 1);
        assert!(matches!(
            warnings.as_slice(),
            [IntegrityWarning::TransactionSignature(1)]
        ));
    }
}
