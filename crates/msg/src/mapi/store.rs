//! ## [Message Object Properties](https://learn.microsoft.com/en-us/openspecs/exchange_server_protocols/ms-oxmsg/77d2a2ae-390a-4df6-a28f-dff6513ca1a5)
//!
//! Properties of a storage live in two places: variable-length values in
//! per-property child streams named `__substg1.0_TTTTCCCC`, and
//! fixed-length values packed into 16-byte records of the storage's
//! `__properties_version1.0` stream.

use byteorder::{LittleEndian, ReadBytesExt};
use std::{
    collections::BTreeMap,
    io::{self, Cursor, Read, Seek},
    mem,
};

use super::{
    key::{warn_once, PropertyKey},
    named_prop::{NamedPropertyMap, NAMED_PROPERTY_FIRST, NAMEID_STORAGE_NAME},
    prop_type::PropertyType,
    value::{decode_utf16, GuidValue, PropertyValue},
    MapiError, MapiResult,
};
use crate::{cfb::directory::EntryKind, IntegrityWarning, MsgFile};

/// Stream name of the fixed-length property block.
pub const PROPERTIES_STREAM_NAME: &str = "__properties_version1.0";

const SUBSTREAM_PREFIX: &str = "__substg1.0_";
const LEGACY_RECORD_SIZE: usize = 16;

/// Upper bound on multivalue slot indices, so a hostile stream-name suffix
/// cannot drive the slot list into a multi-gigabyte allocation.
const MAX_MULTIVALUE_SLOTS: usize = 0x10000;

/// `PidTagRtfCompressed`
const RTF_COMPRESSED: u16 = 0x1009;

/// A parsed `__substg1.0_TTTTCCCC[-IIIIIIII]` stream name: tag, type code,
/// and the multivalue slot suffix.
struct SubstreamName {
    tag: u16,
    type_code: u16,
    slot: Option<u32>,
}

fn parse_stream_name(name: &str) -> Option<SubstreamName> {
    let rest = name.strip_prefix(SUBSTREAM_PREFIX)?;
    if rest.len() < 8 || !rest.is_char_boundary(8) {
        return None;
    }
    let tag = u16::from_str_radix(&rest[..4], 16).ok()?;
    let type_code = u16::from_str_radix(&rest[4..8], 16).ok()?;
    let slot = match &rest[8..] {
        "" => None,
        suffix => {
            let digits = suffix.strip_prefix('-')?;
            if digits.len() != 8 {
                return None;
            }
            Some(u32::from_str_radix(digits, 16).ok()?)
        }
    };
    Some(SubstreamName {
        tag,
        type_code,
        slot,
    })
}

/// The decoded property map of one storage entry, keyed by resolved
/// [`PropertyKey`]. Decoding is permissive: structural damage inside a
/// single property degrades to an [`IntegrityWarning`] and the property is
/// skipped or kept in its identity form.
pub struct PropertyStore {
    properties: BTreeMap<PropertyKey, PropertyValue>,
    named: NamedPropertyMap,
    warnings: Vec<IntegrityWarning>,
}

impl PropertyStore {
    /// Decodes every property of one storage entry. The nameid block is
    /// decoded first so that later pseudo-tags can resolve through it.
    pub fn read<R: Read + Seek>(msg: &MsgFile<R>, storage: u32) -> io::Result<Self> {
        let entry = msg
            .directory()
            .entry(storage)
            .ok_or(MapiError::MissingStorageEntry(storage))?;
        if !matches!(entry.kind(), EntryKind::Storage | EntryKind::Root) {
            return Err(MapiError::NotAStorage(storage).into());
        }

        let mut warnings = Vec::new();
        let named = match msg.directory().find_child(storage, NAMEID_STORAGE_NAME) {
            Some(nameid) => NamedPropertyMap::read(msg, nameid, &mut warnings)?,
            None => NamedPropertyMap::default(),
        };

        let mut store = Self {
            properties: BTreeMap::new(),
            named,
            warnings,
        };

        // Slots of each multivalue property, accumulated across its
        // per-value streams and committed after the walk.
        let mut multivalues: BTreeMap<(u16, u16), Vec<PropertyValue>> = BTreeMap::new();
        let mut legacy_block = None;

        for &child in msg.directory().children(storage) {
            let Some(entry) = msg.directory().entry(child) else {
                continue;
            };
            let name = entry.name();
            if name == NAMEID_STORAGE_NAME {
                continue;
            }
            if name == PROPERTIES_STREAM_NAME {
                legacy_block = Some(child);
                continue;
            }
            let Some(parsed) = parse_stream_name(name) else {
                store.warn(IntegrityWarning::NonPropertyChild(name.to_owned()));
                continue;
            };

            let Ok(prop_type) = PropertyType::try_from(parsed.type_code) else {
                store.warn_unknown_type(parsed.tag, parsed.type_code);
                let data = msg.entry_data(child)?.unwrap_or_default();
                let key = store.resolve_key(parsed.tag);
                store.insert(
                    key,
                    PropertyValue::Unknown {
                        type_code: parsed.type_code,
                        data,
                    },
                );
                continue;
            };

            if prop_type == PropertyType::Object {
                let key = store.resolve_key(parsed.tag);
                store.insert(key, PropertyValue::Storage(child));
                continue;
            }

            if let Some(element_type) = prop_type.element_type() {
                let Some(slot) = parsed.slot else {
                    // The offset-less stream is the length table.
                    continue;
                };
                if slot as usize >= MAX_MULTIVALUE_SLOTS {
                    store.warn(IntegrityWarning::MultivalueSlotOutOfRange {
                        tag: parsed.tag,
                        slot,
                    });
                    continue;
                }
                let data = msg.entry_data(child)?.unwrap_or_default();
                let value = store.decode_or_fallback(element_type, data, &parsed);
                let slots = multivalues
                    .entry((parsed.tag, parsed.type_code))
                    .or_default();
                let slot = slot as usize;
                if slots.len() <= slot {
                    slots.resize(slot + 1, PropertyValue::Null);
                }
                if mem::replace(&mut slots[slot], value) != PropertyValue::Null {
                    let key = store.resolve_key(parsed.tag);
                    store.warn(IntegrityWarning::DuplicateProperty(key));
                }
                continue;
            }

            let data = msg.entry_data(child)?.unwrap_or_default();
            let value = store.decode_or_fallback(prop_type, data, &parsed);
            let key = store.resolve_key(parsed.tag);
            store.insert(key, value);
        }

        for ((tag, _), slots) in multivalues {
            let key = store.resolve_key(tag);
            store.insert(key, PropertyValue::Multiple(slots));
        }

        if let Some(child) = legacy_block {
            let data = msg.entry_data(child)?.unwrap_or_default();
            store.read_legacy_block(&data)?;
        }

        Ok(store)
    }

    /// Decodes the fixed-length record block of `__properties_version1.0`.
    /// The leading padding is `len % 16` bytes and must be zero.
    pub(crate) fn read_legacy_block(&mut self, data: &[u8]) -> io::Result<()> {
        let padding = data.len() % LEGACY_RECORD_SIZE;
        if !(padding == 0 || padding == 8) || data[..padding].iter().any(|&byte| byte != 0) {
            self.warn(IntegrityWarning::LegacyBlockPadding(padding));
        }

        let mut cursor = Cursor::new(&data[padding..]);
        for _ in 0..(data.len() - padding) / LEGACY_RECORD_SIZE {
            // wType
            let type_code = cursor.read_u16::<LittleEndian>()?;
            // wId
            let tag = cursor.read_u16::<LittleEndian>()?;
            // dwFlags
            let _ = cursor.read_u32::<LittleEndian>()?;
            let mut payload = [0_u8; 8];
            cursor.read_exact(&mut payload)?;

            let value = match PropertyType::try_from(type_code) {
                Ok(PropertyType::Integer32) => PropertyValue::Integer32(i32::from_le_bytes(
                    payload[..4].try_into().unwrap_or_default(),
                )),
                Ok(PropertyType::Boolean) => {
                    PropertyValue::Boolean(payload.iter().any(|&byte| byte != 0))
                }
                Ok(PropertyType::Time) => PropertyValue::Time(i64::from_le_bytes(payload)),
                // Variable-length and multivalue records only carry the
                // size; the value itself lives in a substream.
                Ok(_) => continue,
                Err(_) => {
                    self.warn_unknown_type(tag, type_code);
                    continue;
                }
            };
            let key = self.resolve_key(tag);
            self.insert(key, value);
        }
        Ok(())
    }

    /// Decodes one substream payload. A payload shorter than its
    /// fixed-width type degrades to the identity fallback with a warning,
    /// leaving the rest of the store intact.
    fn decode_or_fallback(
        &mut self,
        prop_type: PropertyType,
        data: Vec<u8>,
        parsed: &SubstreamName,
    ) -> PropertyValue {
        match decode_scalar(prop_type, &data) {
            Ok(value) => value,
            Err(_) => {
                self.warn(IntegrityWarning::TruncatedPropertyValue {
                    tag: parsed.tag,
                    type_code: parsed.type_code,
                });
                PropertyValue::Unknown {
                    type_code: parsed.type_code,
                    data,
                }
            }
        }
    }

    /// Substitutes a pseudo-tag through the named-property map. An
    /// unmapped pseudo-tag warns and keeps its bare numeric key.
    fn resolve_key(&mut self, tag: u16) -> PropertyKey {
        if tag >= NAMED_PROPERTY_FIRST {
            if let Some(key) = self.named.get(tag) {
                return key.clone();
            }
            self.warn(IntegrityWarning::UnresolvedNamedTag(tag));
        }
        PropertyKey::numeric(tag)
    }

    /// Last write wins; the earlier value is dropped with a warning.
    fn insert(&mut self, key: PropertyKey, value: PropertyValue) {
        if self.properties.insert(key.clone(), value).is_some() {
            self.warn(IntegrityWarning::DuplicateProperty(key));
        }
    }

    fn warn(&mut self, warning: IntegrityWarning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    fn warn_unknown_type(&mut self, tag: u16, type_code: u16) {
        let warning = IntegrityWarning::UnknownPropertyType { tag, type_code };
        if warn_once(&warning.to_string()) {
            tracing::warn!("{warning}");
        }
        self.warnings.push(warning);
    }

    pub fn get(&self, key: &PropertyKey) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Shortcut for a built-in numeric tag in the default namespace.
    pub fn tag(&self, tag: u16) -> Option<&PropertyValue> {
        self.properties.get(&PropertyKey::numeric(tag))
    }

    pub fn string(&self, tag: u16) -> Option<&str> {
        self.tag(tag).and_then(PropertyValue::as_str)
    }

    pub fn bytes(&self, tag: u16) -> Option<&[u8]> {
        self.tag(tag).and_then(PropertyValue::as_bytes)
    }

    pub fn int32(&self, tag: u16) -> Option<i32> {
        self.tag(tag).and_then(PropertyValue::as_i32)
    }

    pub fn boolean(&self, tag: u16) -> Option<bool> {
        self.tag(tag).and_then(PropertyValue::as_bool)
    }

    /// Raw FILETIME ticks of a time property.
    pub fn time(&self, tag: u16) -> Option<i64> {
        self.tag(tag).and_then(PropertyValue::as_time)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &PropertyValue)> {
        self.properties.iter()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn named(&self) -> &NamedPropertyMap {
        &self.named
    }

    /// Warnings collected while decoding this storage's properties.
    pub fn warnings(&self) -> &[IntegrityWarning] {
        &self.warnings
    }

    /// Decompresses the `rtf_compressed` body on request. `Ok(None)` when
    /// the property is absent.
    pub fn rtf_body(&self) -> MapiResult<Option<String>> {
        match self.tag(RTF_COMPRESSED) {
            None => Ok(None),
            Some(PropertyValue::Binary(data)) => {
                Ok(Some(compressed_rtf::decompress_rtf(data)?))
            }
            Some(_) => Err(MapiError::InvalidRtfBody),
        }
    }
}

/// Decodes one scalar substream payload.
fn decode_scalar(prop_type: PropertyType, data: &[u8]) -> io::Result<PropertyValue> {
    let mut cursor = Cursor::new(data);
    let value = match prop_type {
        PropertyType::Unspecified | PropertyType::Null => PropertyValue::Null,
        PropertyType::Integer16 => PropertyValue::Integer16(cursor.read_i16::<LittleEndian>()?),
        PropertyType::Integer32 | PropertyType::ErrorCode => {
            PropertyValue::Integer32(cursor.read_i32::<LittleEndian>()?)
        }
        PropertyType::Boolean => PropertyValue::Boolean(cursor.read_u8()? != 0),
        PropertyType::Integer64 => PropertyValue::Integer64(cursor.read_i64::<LittleEndian>()?),
        PropertyType::Time => PropertyValue::Time(cursor.read_i64::<LittleEndian>()?),
        PropertyType::String8 => {
            let mut bytes = data.to_vec();
            if bytes.last() == Some(&0) {
                bytes.pop();
            }
            PropertyValue::String8(bytes)
        }
        PropertyType::Unicode => PropertyValue::String(decode_utf16(data)),
        PropertyType::Guid => PropertyValue::Guid(GuidValue::read(&mut cursor)?),
        PropertyType::Binary => PropertyValue::Binary(data.to_vec()),
        PropertyType::Object
        | PropertyType::MultipleInteger16
        | PropertyType::MultipleInteger32
        | PropertyType::MultipleInteger64
        | PropertyType::MultipleString8
        | PropertyType::MultipleUnicode
        | PropertyType::MultipleTime
        | PropertyType::MultipleGuid
        | PropertyType::MultipleBinary => {
            return Err(MapiError::InvalidPropertyType(prop_type.into()).into())
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_store() -> PropertyStore {
        PropertyStore {
            properties: BTreeMap::new(),
            named: NamedPropertyMap::default(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_parse_scalar_stream_name() {
        let parsed = parse_stream_name("__substg1.0_0037001E").unwrap();
        assert_eq!(parsed.tag, 0x0037);
        assert_eq!(parsed.type_code, 0x001E);
        assert_eq!(parsed.slot, None);
    }

    #[test]
    fn test_parse_multivalue_stream_name() {
        let parsed = parse_stream_name("__substg1.0_1234101E-0000000A").unwrap();
        assert_eq!(parsed.tag, 0x1234);
        assert_eq!(parsed.type_code, 0x101E);
        assert_eq!(parsed.slot, Some(10));
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        assert!(parse_stream_name("__recip_version1.0_#00000000").is_none());
        assert!(parse_stream_name("__substg1.0_0037").is_none());
        assert!(parse_stream_name("__substg1.0_0037001E-123").is_none());
        assert!(parse_stream_name("__substg1.0_0037001Ex").is_none());
    }

    #[test]
    fn test_decode_string8_trims_one_nul() {
        let value = decode_scalar(PropertyType::String8, b"hello\0").unwrap();
        assert_eq!(value, PropertyValue::String8(b"hello".to_vec()));
    }

    #[test]
    fn test_decode_scalar_short_fixed_width_payload_is_err() {
        assert!(decode_scalar(PropertyType::Guid, &[0; 6]).is_err());
        assert!(decode_scalar(PropertyType::Integer32, &[1, 0]).is_err());
    }

    #[test]
    fn test_decode_unicode() {
        let data = [b'h', 0, b'i', 0, 0, 0];
        let value = decode_scalar(PropertyType::Unicode, &data).unwrap();
        assert_eq!(value.as_str(), Some("hi"));
    }

    #[test]
    fn test_legacy_block_integer_and_padding() {
        let mut data = vec![0_u8; 8];
        // PtypInteger32, tag 0x0011, value 42
        data.extend([0x03, 0x00, 0x11, 0x00]);
        data.extend(6_u32.to_le_bytes());
        data.extend(42_u64.to_le_bytes());

        let mut store = empty_store();
        store.read_legacy_block(&data).unwrap();
        assert_eq!(store.int32(0x0011), Some(42));
        assert!(store.warnings().is_empty());
    }

    #[test]
    fn test_legacy_block_unknown_type_warns_and_skips() {
        // Type 0x0666 does not exist; the record is dropped.
        let mut data = Vec::new();
        data.extend([0x66, 0x06, 0x12, 0x00]);
        data.extend(0_u32.to_le_bytes());
        data.extend(0_u64.to_le_bytes());

        let mut store = empty_store();
        store.read_legacy_block(&data).unwrap();
        assert!(store.tag(0x0012).is_none());
        assert!(matches!(
            store.warnings(),
            [IntegrityWarning::UnknownPropertyType {
                tag: 0x0012,
                type_code: 0x0666,
            }]
        ));
    }

    #[test]
    fn test_legacy_block_nonzero_padding_warns() {
        let mut data = vec![0_u8; 8];
        data[3] = 0xFF;
        let mut store = empty_store();
        store.read_legacy_block(&data).unwrap();
        assert!(matches!(
            store.warnings(),
            [IntegrityWarning::LegacyBlockPadding(8)]
        ));
    }

    #[test]
    fn test_legacy_block_boolean_nonzero_is_true() {
        let mut data = Vec::new();
        data.extend([0x0B, 0x00, 0x29, 0x00]);
        data.extend(0_u32.to_le_bytes());
        data.extend(2_u64.to_le_bytes());
        let mut store = empty_store();
        store.read_legacy_block(&data).unwrap();
        assert_eq!(store.boolean(0x0029), Some(true));
    }

    #[test]
    fn test_duplicate_insert_keeps_last_write() {
        let mut store = empty_store();
        store.insert(PropertyKey::numeric(0x0037), PropertyValue::Integer32(1));
        store.insert(PropertyKey::numeric(0x0037), PropertyValue::Integer32(2));
        assert_eq!(store.int32(0x0037), Some(2));
        assert!(matches!(
            store.warnings(),
            [IntegrityWarning::DuplicateProperty(_)]
        ));
    }

    #[test]
    fn test_unresolved_pseudo_tag_keeps_numeric_key() {
        let mut store = empty_store();
        let key = store.resolve_key(0x8123);
        assert_eq!(key, PropertyKey::numeric(0x8123));
        assert!(matches!(
            store.warnings(),
            [IntegrityWarning::UnresolvedNamedTag(0x8123)]
        ));
    }

    #[test]
    fn test_rtf_body_absent_is_none() {
        let store = empty_store();
        let Ok(None) = store.rtf_body() else {
            panic!("missing rtf_compressed should decode to None");
        };
    }

    #[test]
    fn test_rtf_body_wrong_type_is_fatal() {
        let mut store = empty_store();
        store.insert(
            PropertyKey::numeric(RTF_COMPRESSED),
            PropertyValue::Integer32(7),
        );
        let Err(MapiError::InvalidRtfBody) = store.rtf_body() else {
            panic!("a non-binary rtf_compressed value should be rejected");
        };
    }
}
