//! ## [Compound File Sector Allocation](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-cfb/30e1013a-a0ff-4404-9ccf-d75d835ff404)

use byteorder::{LittleEndian, ReadBytesExt};
use std::{
    fmt::Debug,
    io::{self, Cursor, Read, Seek},
};

use super::{header::Header, sector, CfbError, CfbResult};

/// `FREESECT`
pub const FREE_SECTOR: u32 = 0xFFFFFFFF;
/// `ENDOFCHAIN`
pub const END_OF_CHAIN: u32 = 0xFFFFFFFE;
/// `FATSECT`
pub const FAT_SECTOR: u32 = 0xFFFFFFFD;
/// `DIFSECT`
pub const DIFAT_SECTOR: u32 = 0xFFFFFFFC;

/// One 32-bit allocation table entry: either the index of the next sector in
/// a chain or one of the reserved sentinel values.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum SectorPointer {
    Regular(u32),
    Free,
    EndOfChain,
    Fat,
    Difat,
}

impl From<u32> for SectorPointer {
    fn from(value: u32) -> Self {
        match value {
            FREE_SECTOR => Self::Free,
            END_OF_CHAIN => Self::EndOfChain,
            FAT_SECTOR => Self::Fat,
            DIFAT_SECTOR => Self::Difat,
            index => Self::Regular(index),
        }
    }
}

impl From<SectorPointer> for u32 {
    fn from(value: SectorPointer) -> Self {
        match value {
            SectorPointer::Regular(index) => index,
            SectorPointer::Free => FREE_SECTOR,
            SectorPointer::EndOfChain => END_OF_CHAIN,
            SectorPointer::Fat => FAT_SECTOR,
            SectorPointer::Difat => DIFAT_SECTOR,
        }
    }
}

impl Debug for SectorPointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectorPointer::Regular(index) => write!(f, "Regular(0x{index:08X})"),
            SectorPointer::Free => write!(f, "FREESECT"),
            SectorPointer::EndOfChain => write!(f, "ENDOFCHAIN"),
            SectorPointer::Fat => write!(f, "FATSECT"),
            SectorPointer::Difat => write!(f, "DIFSECT"),
        }
    }
}

/// One sector-chain table: the FAT for big sectors or the mini FAT for
/// sectors inside the root entry's mini stream.
#[derive(Clone, Debug, Default)]
pub struct AllocationTable {
    entries: Vec<SectorPointer>,
}

impl AllocationTable {
    /// Unpacks concatenated table sector contents into 32-bit entries.
    pub fn load(data: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(data);
        let mut entries = Vec::with_capacity(data.len() / 4);
        for _ in 0..data.len() / 4 {
            entries.push(SectorPointer::from(cursor.read_u32::<LittleEndian>()?));
        }
        Ok(Self { entries })
    }

    /// Reads the big-sector FAT: the first [`HEADER_DIFAT_ENTRIES`] FAT
    /// sector locations come from the header, the rest from the DIFAT
    /// sector chain.
    ///
    /// [`HEADER_DIFAT_ENTRIES`]: super::header::HEADER_DIFAT_ENTRIES
    pub fn read_fat<R: Read + Seek>(f: &mut R, header: &Header) -> io::Result<Self> {
        let mut fat_sectors = Vec::with_capacity(header.fat_sector_count() as usize);
        for &entry in header.difat() {
            match SectorPointer::from(entry) {
                SectorPointer::Regular(index) => fat_sectors.push(index),
                SectorPointer::Free => {}
                other => return Err(CfbError::InvalidDifatEntry(other).into()),
            }
        }

        // Each DIFAT sector holds further FAT sector locations plus a final
        // pointer to the next DIFAT sector. Traversal is bounded by the
        // header's DIFAT sector count.
        let entries_per_sector = header.sector_size() / 4 - 1;
        let mut budget = header.difat_sector_count();
        let mut next = SectorPointer::from(header.first_difat_sector());
        while let SectorPointer::Regular(index) = next {
            if budget == 0 {
                return Err(CfbError::AllocationChainCycle(index).into());
            }
            budget -= 1;

            let data = sector::read_big(f, header, &[index], None)?;
            let mut cursor = Cursor::new(data);
            for _ in 0..entries_per_sector {
                match SectorPointer::from(cursor.read_u32::<LittleEndian>()?) {
                    SectorPointer::Regular(index) => fat_sectors.push(index),
                    SectorPointer::Free => {}
                    other => return Err(CfbError::InvalidDifatEntry(other).into()),
                }
            }
            next = SectorPointer::from(cursor.read_u32::<LittleEndian>()?);
        }

        let data = sector::read_big(f, header, &fat_sectors, None)?;
        Self::load(&data)
    }

    /// Reads the mini FAT through its own big-sector chain.
    pub fn read_mini_fat<R: Read + Seek>(
        f: &mut R,
        header: &Header,
        fat: &AllocationTable,
    ) -> io::Result<Self> {
        let chain = fat.chain(header.first_mini_fat_sector())?;
        let data = sector::read_big(f, header, &chain, None)?;
        Self::load(&data)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<SectorPointer> {
        self.entries.get(index as usize).copied()
    }

    /// Resolves `start` into the ordered sequence of sector indices in its
    /// chain. A terminal or free `start` yields an empty chain; a cycle or
    /// out-of-range index is fatal.
    pub fn chain(&self, start: u32) -> CfbResult<Vec<u32>> {
        let mut chain = Vec::new();
        let mut budget = self.entries.len();
        let mut next = SectorPointer::from(start);
        while let SectorPointer::Regular(index) = next {
            if budget == 0 {
                return Err(CfbError::AllocationChainCycle(index));
            }
            budget -= 1;

            let entry = self
                .get(index)
                .ok_or(CfbError::SectorIndexOutOfRange(index))?;
            chain.push(index);
            next = match entry {
                SectorPointer::Regular(_) | SectorPointer::EndOfChain => entry,
                other => return Err(CfbError::InvalidChainEntry(index, other)),
            };
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn table(entries: &[u32]) -> AllocationTable {
        let mut data = Vec::new();
        for &entry in entries {
            data.write_u32::<LittleEndian>(entry).unwrap();
        }
        AllocationTable::load(&data).unwrap()
    }

    #[test]
    fn test_sentinel_values() {
        assert_eq!(u32::from(SectorPointer::EndOfChain), 0xFFFFFFFE);
        assert_eq!(u32::from(SectorPointer::Free), 0xFFFFFFFF);
        assert_eq!(u32::from(SectorPointer::Fat), 0xFFFFFFFD);
        assert_eq!(SectorPointer::from(0x1234), SectorPointer::Regular(0x1234));
    }

    #[test]
    fn test_chain_follows_links() {
        let table = table(&[2, END_OF_CHAIN, 1, FREE_SECTOR]);
        assert_eq!(table.chain(0).unwrap(), vec![0, 2, 1]);
    }

    #[test]
    fn test_chain_from_sentinel_is_empty() {
        let table = table(&[END_OF_CHAIN]);
        assert!(table.chain(END_OF_CHAIN).unwrap().is_empty());
        assert!(table.chain(FREE_SECTOR).unwrap().is_empty());
    }

    #[test]
    fn test_chain_cycle_is_fatal() {
        let table = table(&[1, 0]);
        let Err(CfbError::AllocationChainCycle(_)) = table.chain(0) else {
            panic!("cycle should be detected");
        };
    }

    #[test]
    fn test_chain_out_of_range_is_fatal() {
        let table = table(&[5, END_OF_CHAIN]);
        let Err(CfbError::SectorIndexOutOfRange(index)) = table.chain(4) else {
            panic!("index should be out of range");
        };
        assert_eq!(index, 4);
    }

    #[test]
    fn test_chain_into_free_entry_is_fatal() {
        let table = table(&[1, FREE_SECTOR]);
        let Err(CfbError::InvalidChainEntry(1, SectorPointer::Free)) = table.chain(0) else {
            panic!("free entry inside a chain should be fatal");
        };
    }
}
