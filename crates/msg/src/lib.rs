#![doc = include_str!("../README.md")]

use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
    sync::Mutex,
};

use thiserror::Error;

pub mod cfb;
pub mod mapi;

use cfb::{
    alloc::AllocationTable,
    directory::Directory,
    directory::EntryKind,
    header::Header,
    sector, CfbError,
};
use mapi::{key::PropertyKey, store::PropertyStore};

/// Non-fatal irregularities observed while parsing. These are reported
/// through the `tracing` sink and collected on the object that produced
/// them; parsing continues with a best-effort fallback.
#[derive(Error, Clone, PartialEq, Debug)]
pub enum IntegrityWarning {
    #[error("Non-zero HEADER clsid: {0:02X?}")]
    HeaderClassId([u8; 16]),
    #[error("Non-zero HEADER transacting signature: 0x{0:08X}")]
    TransactionSignature(u32),
    #[error("Directory entry 0x{0:08X} is unreachable from the root")]
    UnreachableDirectoryEntry(u32),
    #[error("Unexpected root entry name: {0:?}")]
    RootEntryName(String),
    #[error("Unknown property type 0x{type_code:04X} for tag 0x{tag:04X}")]
    UnknownPropertyType { tag: u16, type_code: u16 },
    #[error("Truncated value for property 0x{tag:04X} (type 0x{type_code:04X})")]
    TruncatedPropertyValue { tag: u16, type_code: u16 },
    #[error("Multivalue slot out of range for tag 0x{tag:04X}: 0x{slot:08X}")]
    MultivalueSlotOutOfRange { tag: u16, slot: u32 },
    #[error("No named property entry for pseudo-tag 0x{0:04X}")]
    UnresolvedNamedTag(u16),
    #[error("Duplicate property key: {0}")]
    DuplicateProperty(PropertyKey),
    #[error("Irregular legacy property block padding: {0} bytes")]
    LegacyBlockPadding(usize),
    #[error("Unrecognized child of property storage: {0:?}")]
    NonPropertyChild(String),
    #[error("Missing or malformed nameid stream: {0}")]
    MalformedNameidStream(&'static str),
    #[error("Named property GUID index out of range: 0x{0:04X}")]
    NamedGuidIndexOutOfRange(u16),
}

/// An opened MSG container: the validated header, both allocation tables,
/// the resolved mini-stream chain, and the reconstructed directory tree.
/// Everything is parsed eagerly on open; stream contents are fetched on
/// demand through [`MsgFile::entry_data`].
pub struct MsgFile<R> {
    reader: Mutex<R>,
    header: Header,
    fat: AllocationTable,
    mini_fat: AllocationTable,
    mini_stream: Vec<u32>,
    directory: Directory,
    warnings: Vec<IntegrityWarning>,
}

impl MsgFile<File> {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::read(File::open(path)?)
    }
}

impl<R: Read + Seek> MsgFile<R> {
    pub fn read(mut reader: R) -> io::Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let mut warnings = Vec::new();

        let header = Header::read(&mut reader, &mut warnings)?;
        let fat = AllocationTable::read_fat(&mut reader, &header)?;
        let mini_fat = AllocationTable::read_mini_fat(&mut reader, &header, &fat)?;

        let directory_chain = fat.chain(header.first_directory_sector())?;
        let directory_data = sector::read_big(&mut reader, &header, &directory_chain, None)?;
        let directory = Directory::read(&directory_data, &mut warnings)?;

        let root = directory
            .entry(directory.root())
            .ok_or(CfbError::MissingRootEntry)?;
        let mini_stream = fat.chain(root.start_sector())?;

        Ok(Self {
            reader: Mutex::new(reader),
            header,
            fat,
            mini_fat,
            mini_stream,
            directory,
            warnings,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Warnings collected while opening the container.
    pub fn warnings(&self) -> &[IntegrityWarning] {
        &self.warnings
    }

    /// The byte content of a stream entry, or `None` for storage, root, and
    /// empty entries. The chain is selected by the header's mini-stream
    /// cutoff and truncated to the entry's recorded size.
    pub fn entry_data(&self, index: u32) -> io::Result<Option<Vec<u8>>> {
        let entry = self
            .directory
            .entry(index)
            .ok_or(CfbError::DirectoryLinkOutOfRange(index))?;
        if entry.kind() != EntryKind::Stream {
            return Ok(None);
        }

        let size = entry.size() as usize;
        let mut reader = self
            .reader
            .lock()
            .map_err(|_| CfbError::FailedToLockReader)?;
        let reader = &mut *reader;

        let data = if entry.size() <= self.header.mini_stream_cutoff() {
            let chain = self.mini_fat.chain(entry.start_sector())?;
            sector::read_small(reader, &self.header, &self.mini_stream, &chain, Some(size))?
        } else {
            let chain = self.fat.chain(entry.start_sector())?;
            sector::read_big(reader, &self.header, &chain, Some(size))?
        };
        Ok(Some(data))
    }

    /// Decodes the MAPI property store of a storage entry (the root entry
    /// for the message itself, or a nested attachment/recipient storage).
    pub fn property_store(&self, storage: u32) -> io::Result<PropertyStore> {
        PropertyStore::read(self, storage)
    }
}
