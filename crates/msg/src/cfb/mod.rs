//! ## [Compound File Binary (CFB) Layer](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-cfb/53989ce4-7b05-4f8d-829b-d08d6148375b)

use std::io;
use thiserror::Error;

pub mod alloc;
pub mod directory;
pub mod header;
pub mod sector;

use alloc::SectorPointer;

#[derive(Error, Debug)]
pub enum CfbError {
    #[error("Invalid HEADER abSig: {0:02X?}")]
    InvalidHeaderSignature([u8; 8]),
    #[error("Invalid HEADER uByteOrder: 0x{0:04X}")]
    InvalidByteOrder(u16),
    #[error("Invalid HEADER uSectorShift: {0}")]
    InvalidSectorShift(u16),
    #[error("Invalid HEADER uMiniSectorShift: {0}")]
    InvalidMiniSectorShift(u16),
    #[error("Allocation chain cycle at sector 0x{0:08X}")]
    AllocationChainCycle(u32),
    #[error("Sector index out of range: 0x{0:08X}")]
    SectorIndexOutOfRange(u32),
    #[error("Invalid allocation entry for sector 0x{0:08X}: {1:?}")]
    InvalidChainEntry(u32, SectorPointer),
    #[error("Invalid DIFAT entry: {0:?}")]
    InvalidDifatEntry(SectorPointer),
    #[error("Invalid directory entry object type: 0x{0:02X}")]
    InvalidDirectoryEntryKind(u8),
    #[error("Invalid directory entry name length: 0x{0:04X}")]
    InvalidDirectoryNameLength(u16),
    #[error("Directory entry 0x{0:08X} linked twice in the sibling tree")]
    DirectoryEntryUsedTwice(u32),
    #[error("Directory sibling link out of range: 0x{0:08X}")]
    DirectoryLinkOutOfRange(u32),
    #[error("Missing root directory entry")]
    MissingRootEntry,
    #[error("Failed to lock byte source")]
    FailedToLockReader,
}

impl From<CfbError> for io::Error {
    fn from(err: CfbError) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}

pub type CfbResult<T> = Result<T, CfbError>;
