use arbitrary::Arbitrary;
use cbordata::Cborize;

use crate::{
    dbs::{self, Id, NOID},
    util, Result,
};

const ENTRY_VER: u32 = 0x00010001;
const ATTR_VER: u32 = 0x00010001;

/// Single attribute of a directory entry, a description and one or
/// more values. Values are opaque byte-strings to this package; the
/// schema module decides how they are tokenized for indexing.
#[derive(Clone, Debug, Default, Eq, PartialEq, Cborize, Arbitrary)]
pub struct Attr {
    pub desc: String,
    pub vals: Vec<Vec<u8>>,
}

impl Attr {
    const ID: u32 = ATTR_VER;

    pub fn new(desc: &str, vals: Vec<Vec<u8>>) -> Attr {
        Attr {
            desc: desc.to_string(),
            vals,
        }
    }
}

/// Directory entry. Persisted in the primary store as the CBOR
/// serialization of this type, keyed by the on-disk form of its id.
#[derive(Clone, Debug, Default, Eq, PartialEq, Cborize)]
pub struct Entry {
    pub id: Id,
    pub name: String,
    pub ndn: String,
    pub attrs: Vec<Attr>,
}

impl Entry {
    const ID: u32 = ENTRY_VER;

    /// Create a new entry from its as-given name; canonical name is
    /// derived, id starts out as [NOID] until the load pipeline
    /// assigns one.
    pub fn new(name: &str, attrs: Vec<Attr>) -> Entry {
        Entry {
            id: NOID,
            name: name.to_string(),
            ndn: dbs::to_canonical(name),
            attrs,
        }
    }

    /// Serialize for the primary store.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        util::into_cbor_bytes(self.clone())
    }

    /// Reverse of [Entry::to_bytes].
    pub fn from_bytes(data: &[u8]) -> Result<Entry> {
        let (entry, _) = util::from_cbor_bytes(data)?;
        Ok(entry)
    }

    pub fn as_attr(&self, desc: &str) -> Option<&Attr> {
        self.attrs.iter().find(|a| a.desc.eq_ignore_ascii_case(desc))
    }
}

#[cfg(test)]
#[path = "entry_test.rs"]
mod entry_test;
