//! ## [Compound File Directory Sectors](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-cfb/60fe8611-66c3-496b-b70d-a504c94c9ace)

use byteorder::{LittleEndian, ReadBytesExt};
use std::{
    io::{self, Cursor, Read},
    mem,
};

use super::{CfbError, CfbResult};
use crate::IntegrityWarning;

/// Size of one directory entry record.
pub const DIRECTORY_ENTRY_SIZE: usize = 128;

/// `NOSTREAM`: terminal sentinel for sibling and child links.
const NO_STREAM: u32 = 0xFFFFFFFF;

/// Conventional name of the root storage entry. Nested and embedded
/// containers are known to deviate; a mismatch warns but never fails.
pub const ROOT_ENTRY_NAME: &str = "Root Entry";

/// `mse`: directory entry object type.
#[repr(u8)]
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub enum EntryKind {
    #[default]
    Empty = 0x00,
    Storage = 0x01,
    Stream = 0x02,
    Root = 0x05,
}

impl TryFrom<u8> for EntryKind {
    type Error = CfbError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(EntryKind::Empty),
            0x01 => Ok(EntryKind::Storage),
            0x02 => Ok(EntryKind::Stream),
            0x05 => Ok(EntryKind::Root),
            _ => Err(CfbError::InvalidDirectoryEntryKind(value)),
        }
    }
}

/// One fixed-size, little-endian directory entry record.
#[derive(Clone, Debug)]
pub struct DirectoryEntry {
    name: String,
    kind: EntryKind,
    color: u8,
    left: Option<u32>,
    right: Option<u32>,
    child: Option<u32>,
    clsid: [u8; 16],
    state_bits: u32,
    created: u64,
    modified: u64,
    start_sector: u32,
    size: u32,
}

fn link(value: u32) -> Option<u32> {
    if value == NO_STREAM {
        None
    } else {
        Some(value)
    }
}

impl DirectoryEntry {
    pub fn read(f: &mut dyn Read) -> io::Result<Self> {
        // ab: UTF-16 name, fixed 64-byte field
        let mut name_units = [0_u16; 32];
        for unit in name_units.iter_mut() {
            *unit = f.read_u16::<LittleEndian>()?;
        }

        // cb: name length in bytes, including the terminating NUL pair
        let name_length = f.read_u16::<LittleEndian>()?;
        if name_length > 64 || name_length % 2 != 0 {
            return Err(CfbError::InvalidDirectoryNameLength(name_length).into());
        }
        let unit_count = (name_length as usize / 2).saturating_sub(1);
        let name = String::from_utf16_lossy(&name_units[..unit_count]);

        // mse
        let kind = EntryKind::try_from(f.read_u8()?)?;

        // bflags: red/black tree color
        let color = f.read_u8()?;

        // sidLeftSib
        let left = link(f.read_u32::<LittleEndian>()?);

        // sidRightSib
        let right = link(f.read_u32::<LittleEndian>()?);

        // sidChild
        let child = link(f.read_u32::<LittleEndian>()?);

        // clsId
        let mut clsid = [0_u8; 16];
        f.read_exact(&mut clsid)?;

        // dwUserFlags
        let state_bits = f.read_u32::<LittleEndian>()?;

        // time: creation and modification FILETIME pairs
        let created = f.read_u64::<LittleEndian>()?;
        let modified = f.read_u64::<LittleEndian>()?;

        // sectStart
        let start_sector = f.read_u32::<LittleEndian>()?;

        // ulSize
        let size = f.read_u32::<LittleEndian>()?;

        // dptPropType: reserved padding
        let _ = f.read_u32::<LittleEndian>()?;

        Ok(Self {
            name,
            kind,
            color,
            left,
            right,
            child,
            clsid,
            state_bits,
            created,
            modified,
            start_sector,
            size,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn color(&self) -> u8 {
        self.color
    }

    pub fn left(&self) -> Option<u32> {
        self.left
    }

    pub fn right(&self) -> Option<u32> {
        self.right
    }

    pub fn child(&self) -> Option<u32> {
        self.child
    }

    pub fn clsid(&self) -> &[u8; 16] {
        &self.clsid
    }

    pub fn state_bits(&self) -> u32 {
        self.state_bits
    }

    /// Creation FILETIME: 100ns ticks since the 1601 epoch.
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Modification FILETIME: 100ns ticks since the 1601 epoch.
    pub fn modified(&self) -> u64 {
        self.modified
    }

    pub fn start_sector(&self) -> u32 {
        self.start_sector
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

/// The reconstructed directory: a flat arena of entries plus an owning tree
/// of arena indices rebuilt from the sibling-tree links.
#[derive(Clone, Debug)]
pub struct Directory {
    entries: Vec<DirectoryEntry>,
    children: Vec<Vec<u32>>,
}

struct TreeBuilder<'a> {
    entries: &'a [DirectoryEntry],
    visited: Vec<bool>,
    children: Vec<Vec<u32>>,
}

impl TreeBuilder<'_> {
    /// In-order walk of one sibling tree, producing the owned child list of
    /// a storage node.
    fn siblings(&mut self, root: Option<u32>) -> CfbResult<Vec<u32>> {
        let mut out = Vec::new();
        self.visit(root, &mut out)?;
        Ok(out)
    }

    fn visit(&mut self, node: Option<u32>, out: &mut Vec<u32>) -> CfbResult<()> {
        let Some(index) = node else {
            return Ok(());
        };
        let entry = self
            .entries
            .get(index as usize)
            .ok_or(CfbError::DirectoryLinkOutOfRange(index))?;
        if mem::replace(&mut self.visited[index as usize], true) {
            return Err(CfbError::DirectoryEntryUsedTwice(index));
        }

        self.visit(entry.left, out)?;
        match entry.kind {
            EntryKind::Empty => {}
            EntryKind::Stream => out.push(index),
            EntryKind::Storage | EntryKind::Root => {
                out.push(index);
                let grandchildren = self.siblings(entry.child)?;
                self.children[index as usize] = grandchildren;
            }
        }
        self.visit(entry.right, out)
    }
}

impl Directory {
    /// Decodes the concatenated directory sector chain and rebuilds the
    /// storage tree. Entry 0 is the root storage entry.
    pub fn read(data: &[u8], warnings: &mut Vec<IntegrityWarning>) -> io::Result<Self> {
        let mut cursor = Cursor::new(data);
        let mut entries = Vec::with_capacity(data.len() / DIRECTORY_ENTRY_SIZE);
        for _ in 0..data.len() / DIRECTORY_ENTRY_SIZE {
            entries.push(DirectoryEntry::read(&mut cursor)?);
        }
        if entries.is_empty() {
            return Err(CfbError::MissingRootEntry.into());
        }

        let mut builder = TreeBuilder {
            entries: &entries,
            visited: vec![false; entries.len()],
            children: vec![Vec::new(); entries.len()],
        };
        builder.visited[0] = true;
        builder.children[0] = builder.siblings(entries[0].child)?;

        let mut children = mem::take(&mut builder.children);
        for (index, visited) in builder.visited.iter().enumerate() {
            if !visited && entries[index].kind != EntryKind::Empty {
                let warning = IntegrityWarning::UnreachableDirectoryEntry(index as u32);
                tracing::warn!("{warning}");
                warnings.push(warning);
            }
        }
        if entries[0].name != ROOT_ENTRY_NAME {
            let warning = IntegrityWarning::RootEntryName(entries[0].name.clone());
            tracing::warn!("{warning}");
            warnings.push(warning);
        }
        children.shrink_to_fit();

        Ok(Self { entries, children })
    }

    /// Arena index of the root storage entry.
    pub fn root(&self) -> u32 {
        0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: u32) -> Option<&DirectoryEntry> {
        self.entries.get(index as usize)
    }

    /// The owned, in-order child list of a storage entry. Empty for stream
    /// entries.
    pub fn children(&self, index: u32) -> &[u32] {
        self.children
            .get(index as usize)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn find_child(&self, parent: u32, name: &str) -> Option<u32> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| self.entry(child).map(DirectoryEntry::name) == Some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Write;

    fn record(
        name: &str,
        kind: u8,
        left: u32,
        right: u32,
        child: u32,
        start: u32,
        size: u32,
    ) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let units = name.encode_utf16().collect::<Vec<_>>();
        for i in 0..32 {
            let unit = units.get(i).copied().unwrap_or_default();
            cursor.write_u16::<LittleEndian>(unit).unwrap();
        }
        cursor
            .write_u16::<LittleEndian>((units.len() as u16 + 1) * 2)
            .unwrap();
        cursor.write_u8(kind).unwrap();
        cursor.write_u8(1).unwrap();
        cursor.write_u32::<LittleEndian>(left).unwrap();
        cursor.write_u32::<LittleEndian>(right).unwrap();
        cursor.write_u32::<LittleEndian>(child).unwrap();
        cursor.write_all(&[0; 16]).unwrap();
        cursor.write_u32::<LittleEndian>(0).unwrap();
        cursor.write_u64::<LittleEndian>(0).unwrap();
        cursor.write_u64::<LittleEndian>(0).unwrap();
        cursor.write_u32::<LittleEndian>(start).unwrap();
        cursor.write_u32::<LittleEndian>(size).unwrap();
        cursor.write_u32::<LittleEndian>(0).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_read_entry_record() {
        let data = record("Root Entry", 0x05, NO_STREAM, NO_STREAM, 1, 3, 512);
        let entry = DirectoryEntry::read(&mut Cursor::new(data)).unwrap();
        assert_eq!(entry.name(), "Root Entry");
        assert_eq!(entry.kind(), EntryKind::Root);
        assert_eq!(entry.left(), None);
        assert_eq!(entry.child(), Some(1));
        assert_eq!(entry.start_sector(), 3);
        assert_eq!(entry.size(), 512);
    }

    #[test]
    fn test_unknown_entry_kind_is_fatal() {
        let data = record("x", 0x07, NO_STREAM, NO_STREAM, NO_STREAM, 0, 0);
        assert!(DirectoryEntry::read(&mut Cursor::new(data)).is_err());
    }

    #[test]
    fn test_tree_in_order_walk() {
        // Root's children keyed b < c < d, encoded as c with siblings b and d.
        let mut data = Vec::new();
        data.extend(record("Root Entry", 0x05, NO_STREAM, NO_STREAM, 2, 0, 0));
        data.extend(record("b", 0x02, NO_STREAM, NO_STREAM, NO_STREAM, 0, 0));
        data.extend(record("c", 0x02, 1, 3, NO_STREAM, 0, 0));
        data.extend(record("d", 0x02, NO_STREAM, NO_STREAM, NO_STREAM, 0, 0));
        let mut warnings = Vec::new();
        let directory = Directory::read(&data, &mut warnings).unwrap();
        assert_eq!(directory.children(0), &[1, 2, 3]);
        assert!(warnings.is_empty());
        assert_eq!(directory.find_child(0, "d"), Some(3));
        assert_eq!(directory.find_child(0, "missing"), None);
    }

    #[test]
    fn test_entry_linked_twice_is_fatal() {
        let mut data = Vec::new();
        data.extend(record("Root Entry", 0x05, NO_STREAM, NO_STREAM, 1, 0, 0));
        data.extend(record("a", 0x02, 2, 2, NO_STREAM, 0, 0));
        data.extend(record("b", 0x02, NO_STREAM, NO_STREAM, NO_STREAM, 0, 0));
        let mut warnings = Vec::new();
        let err = Directory::read(&data, &mut warnings).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_unreachable_entry_warns() {
        let mut data = Vec::new();
        data.extend(record("Root Entry", 0x05, NO_STREAM, NO_STREAM, 1, 0, 0));
        data.extend(record("a", 0x02, NO_STREAM, NO_STREAM, NO_STREAM, 0, 0));
        data.extend(record("orphan", 0x02, NO_STREAM, NO_STREAM, NO_STREAM, 0, 0));
        let mut warnings = Vec::new();
        let directory = Directory::read(&data, &mut warnings).unwrap();
        assert_eq!(directory.children(0), &[1]);
        assert!(matches!(
            warnings.as_slice(),
            [IntegrityWarning::UnreachableDirectoryEntry(2)]
        ));
    }

    #[test]
    fn test_root_name_mismatch_warns() {
        let data = record("Embedded", 0x05, NO_STREAM, NO_STREAM, NO_STREAM, 0, 0);
        let mut warnings = Vec::new();
        Directory::read(&data, &mut warnings).unwrap();
        assert!(matches!(
            warnings.as_slice(),
            [IntegrityWarning::RootEntryName(name)] if name == "Embedded"
        ));
    }
}
