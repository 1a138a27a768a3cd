//! Canonical property identity: a numeric tag in the default MAPI
//! namespace, or a GUID-scoped name resolved through the named-property
//! indirection table.

use std::{
    collections::BTreeSet,
    fmt::Display,
    sync::{Mutex, OnceLock},
};

use super::{tags, value::GuidValue};

/// `PS_MAPI`: the default namespace of every built-in numeric tag.
pub const PS_MAPI: GuidValue = GuidValue::new(
    0x00020328,
    0x0000,
    0x0000,
    [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
);

/// `PS_PUBLIC_STRINGS`
pub const PS_PUBLIC_STRINGS: GuidValue = GuidValue::new(
    0x00020329,
    0x0000,
    0x0000,
    [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
);

/// Process-wide set of identities already reported as unresolvable, to keep
/// repeated lookups from flooding the log.
static WARNED: OnceLock<Mutex<BTreeSet<String>>> = OnceLock::new();

/// Records one diagnostic token, returning true the first time it is seen.
pub(crate) fn warn_once(token: &str) -> bool {
    let warned = WARNED.get_or_init(|| Mutex::new(BTreeSet::new()));
    match warned.lock() {
        Ok(mut warned) => warned.insert(token.to_owned()),
        Err(_) => true,
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum PropertyId {
    /// A built-in numeric tag, or the integer sub-identifier of a named
    /// property.
    Number(u32),
    /// The string sub-identifier of a named property.
    Name(String),
}

/// Immutable property identity. Two keys are equal iff both the identifier
/// and the namespace GUID are equal.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PropertyKey {
    id: PropertyId,
    guid: GuidValue,
}

impl PropertyKey {
    pub fn new(id: PropertyId, guid: GuidValue) -> Self {
        Self { id, guid }
    }

    /// A built-in numeric tag in the default namespace.
    pub fn numeric(tag: u16) -> Self {
        Self {
            id: PropertyId::Number(u32::from(tag)),
            guid: PS_MAPI,
        }
    }

    pub fn id(&self) -> &PropertyId {
        &self.id
    }

    pub fn guid(&self) -> &GuidValue {
        &self.guid
    }

    /// The symbolic name from the static dictionaries, or `None` when the
    /// identity is not listed. A miss is reported once at debug level; the
    /// key keeps its raw display form as the fallback.
    pub fn canonical_name(&self) -> Option<&'static str> {
        let name = match (&self.id, &self.guid) {
            (PropertyId::Number(tag), guid) if *guid == PS_MAPI => {
                u16::try_from(*tag).ok().and_then(tags::tag_name)
            }
            (PropertyId::Number(id), guid) => tags::named_number_name(guid, *id),
            (PropertyId::Name(name), guid) => tags::named_string_name(guid, name),
        };
        if name.is_none() {
            let token = self.fallback_display();
            if warn_once(&token) {
                tracing::debug!("no canonical name for property {token}");
            }
        }
        name
    }

    fn fallback_display(&self) -> String {
        match (&self.id, &self.guid) {
            (PropertyId::Number(tag), guid) if *guid == PS_MAPI => format!("0x{tag:04X}"),
            (PropertyId::Number(id), guid) => format!("{guid:?}:0x{id:08X}"),
            (PropertyId::Name(name), guid) => format!("{guid:?}:{name}"),
        }
    }
}

impl Display for PropertyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.canonical_name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "{}", self.fallback_display()),
        }
    }
}
