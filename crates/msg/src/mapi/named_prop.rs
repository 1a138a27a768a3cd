//! ## [Named Property Mapping Storage](https://learn.microsoft.com/en-us/openspecs/exchange_server_protocols/ms-oxmsg/193c169b-0628-4392-aa51-83009be7ad71)
//!
//! The `__nameid_version1.0` storage maps the synthetic pseudo-tags at and
//! above 0x8000 to their real (namespace GUID, name-or-id) identities. It
//! is decoded before any other property because later decoding depends on
//! it.

use byteorder::{LittleEndian, ReadBytesExt};
use std::{
    collections::BTreeMap,
    io::{self, Cursor, Read, Seek},
};

use super::{
    key::{PropertyId, PropertyKey, PS_MAPI, PS_PUBLIC_STRINGS},
    value::{decode_utf16, GuidValue},
};
use crate::{IntegrityWarning, MsgFile};

/// Storage name of the named-property mapping block.
pub const NAMEID_STORAGE_NAME: &str = "__nameid_version1.0";

/// First pseudo-tag of the named-property range.
pub const NAMED_PROPERTY_FIRST: u16 = 0x8000;

const GUID_STREAM_NAME: &str = "__substg1.0_00020102";
const ENTRY_STREAM_NAME: &str = "__substg1.0_00030102";
const STRING_STREAM_NAME: &str = "__substg1.0_00040102";

/// One 8-byte record of the entry stream.
#[derive(Clone, Copy, Debug)]
struct NameIdEntry {
    id_or_offset: u32,
    guid_index: u16,
    is_string: bool,
    prop_index: u16,
}

impl NameIdEntry {
    fn read(f: &mut dyn Read) -> io::Result<Self> {
        let id_or_offset = f.read_u32::<LittleEndian>()?;
        let index_and_kind = f.read_u16::<LittleEndian>()?;
        let prop_index = f.read_u16::<LittleEndian>()?;
        Ok(Self {
            id_or_offset,
            guid_index: index_and_kind >> 1,
            is_string: index_and_kind & 0x0001 != 0,
            prop_index,
        })
    }
}

/// The per-storage pseudo-tag table, built once from the three companion
/// streams of the nameid storage.
#[derive(Default, Debug)]
pub struct NamedPropertyMap {
    entries: BTreeMap<u16, PropertyKey>,
}

impl NamedPropertyMap {
    /// Decodes a `__nameid_version1.0` storage. Missing or short companion
    /// streams degrade to warnings and a partial (possibly empty) map.
    pub fn read<R: Read + Seek>(
        msg: &MsgFile<R>,
        nameid: u32,
        warnings: &mut Vec<IntegrityWarning>,
    ) -> io::Result<Self> {
        let guid_data = read_companion(msg, nameid, GUID_STREAM_NAME, warnings)?;
        let entry_data = read_companion(msg, nameid, ENTRY_STREAM_NAME, warnings)?;
        let string_data = read_companion(msg, nameid, STRING_STREAM_NAME, warnings)?;

        let mut guids = Vec::with_capacity(guid_data.len() / 16);
        let mut cursor = Cursor::new(guid_data.as_slice());
        for _ in 0..guid_data.len() / 16 {
            guids.push(GuidValue::read(&mut cursor)?);
        }

        let mut entries = BTreeMap::new();
        let mut cursor = Cursor::new(entry_data.as_slice());
        for _ in 0..entry_data.len() / 8 {
            let entry = NameIdEntry::read(&mut cursor)?;

            let Some(guid) = namespace_guid(entry.guid_index, &guids) else {
                let warning = IntegrityWarning::NamedGuidIndexOutOfRange(entry.guid_index);
                tracing::warn!("{warning}");
                warnings.push(warning);
                continue;
            };

            let id = if entry.is_string {
                match read_string_entry(&string_data, entry.id_or_offset) {
                    Some(name) => PropertyId::Name(name),
                    None => {
                        let warning =
                            IntegrityWarning::MalformedNameidStream(STRING_STREAM_NAME);
                        tracing::warn!("{warning}");
                        warnings.push(warning);
                        continue;
                    }
                }
            } else {
                PropertyId::Number(entry.id_or_offset)
            };

            let Some(pseudo_tag) = NAMED_PROPERTY_FIRST.checked_add(entry.prop_index) else {
                let warning = IntegrityWarning::MalformedNameidStream(ENTRY_STREAM_NAME);
                tracing::warn!("{warning}");
                warnings.push(warning);
                continue;
            };
            entries.insert(pseudo_tag, PropertyKey::new(id, guid));
        }

        Ok(Self { entries })
    }

    /// The resolved key of a pseudo-tag, if the table defines one.
    pub fn get(&self, pseudo_tag: u16) -> Option<&PropertyKey> {
        self.entries.get(&pseudo_tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u16, &PropertyKey)> {
        self.entries.iter()
    }
}

/// Resolves the entry record's GUID index. Index 0 means "no GUID" on the
/// wire and resolves to the default MAPI namespace, same as index 1;
/// index 2 is the public-strings namespace; anything higher indexes the
/// GUID stream, biased by 3. `None` when the stream has no such entry.
fn namespace_guid(index: u16, guids: &[GuidValue]) -> Option<GuidValue> {
    match index {
        0 | 1 => Some(PS_MAPI),
        2 => Some(PS_PUBLIC_STRINGS),
        index => guids.get(index as usize - 3).copied(),
    }
}

fn read_companion<R: Read + Seek>(
    msg: &MsgFile<R>,
    nameid: u32,
    name: &'static str,
    warnings: &mut Vec<IntegrityWarning>,
) -> io::Result<Vec<u8>> {
    let Some(child) = msg.directory().find_child(nameid, name) else {
        let warning = IntegrityWarning::MalformedNameidStream(name);
        tracing::warn!("{warning}");
        warnings.push(warning);
        return Ok(Vec::new());
    };
    Ok(msg.entry_data(child)?.unwrap_or_default())
}

/// A string-stream entry: u32 byte length followed by that many UTF-16LE
/// bytes, records aligned to 4 bytes.
fn read_string_entry(data: &[u8], offset: u32) -> Option<String> {
    let offset = offset as usize;
    let header = data.get(offset..offset + 4)?;
    let length = u32::from_le_bytes(header.try_into().ok()?) as usize;
    let bytes = data.get(offset + 4..offset + 4 + length)?;
    Some(decode_utf16(bytes))
}
