//! Module implement schema-driven index record building.
//!
//! For every indexed attribute the schema supplies an [AttrIndex]
//! descriptor naming the kinds of index maintained for it. One entry
//! expands into a vector of [IndexRec] values, one per descriptor
//! ([recset]); running a record writes its tokens as postings for the
//! entry's id ([recrun]). The record vector is ordinal-stable, so
//! slicing it `ordinal mod nslices == base` partitions the work
//! deterministically across the index worker pool.

use crate::{dbs, Error, Result};

/// Upper bound on the byte length of an index token. Values whose
/// token would exceed this are rejected at [recrun] time.
pub const KEY_MAX: usize = 255;

/// Indexing descriptor for one attribute.
#[derive(Clone, Debug)]
pub struct AttrIndex {
    pub desc: String,
    pub eq: bool,
    pub pres: bool,
}

impl AttrIndex {
    /// New descriptor, with equality and presence indexing enabled.
    pub fn new(desc: &str) -> AttrIndex {
        AttrIndex {
            desc: desc.to_string(),
            eq: true,
            pres: true,
        }
    }

    pub fn set_eq(&mut self, eq: bool) -> &mut Self {
        self.eq = eq;
        self
    }

    pub fn set_pres(&mut self, pres: bool) -> &mut Self {
        self.pres = pres;
        self
    }
}

/// Index records for one attribute of one entry, the tokens to be
/// posted under the attribute's secondary database.
#[derive(Clone, Debug, Default)]
pub struct IndexRec {
    pub ax: usize, // attribute ordinal, also the secondary-db ordinal
    pub keys: Vec<Vec<u8>>,
}

/// Sink for postings, implemented by the tool session over its IDL
/// caches.
pub trait IdlSink {
    fn idl_insert(&self, ax: usize, key: &[u8], id: dbs::Id) -> Result<()>;
}

/// Expand `entry` into one [IndexRec] per descriptor. With
/// `active = Some(k)` only descriptor `k` produces tokens, the linear
/// index mode; records for the other ordinals stay empty.
pub fn recset(attrs: &[AttrIndex], active: Option<usize>, entry: &dbs::Entry) -> Vec<IndexRec> {
    let mut recs: Vec<IndexRec> = (0..attrs.len())
        .map(|ax| IndexRec {
            ax,
            keys: Vec::default(),
        })
        .collect();

    for (ax, ai) in attrs.iter().enumerate() {
        if let Some(k) = active {
            if ax != k {
                continue;
            }
        }
        let attr = match entry.as_attr(&ai.desc) {
            Some(attr) => attr,
            None => continue,
        };
        if ai.pres {
            recs[ax].keys.push(vec![b'+']);
        }
        if ai.eq {
            for val in attr.vals.iter() {
                let mut key = Vec::with_capacity(val.len() + 1);
                key.push(b'=');
                key.extend_from_slice(&val.to_ascii_lowercase());
                recs[ax].keys.push(key);
            }
        }
    }

    recs
}

/// Write the `base`-slice of `recs` as postings for `id`. Slices are
/// `ordinal mod nslices == base`; disjoint across bases.
pub fn recrun(
    sink: &dyn IdlSink,
    recs: &[IndexRec],
    id: dbs::Id,
    base: usize,
    nslices: usize,
) -> Result<()> {
    for (i, rec) in recs.iter().enumerate() {
        if i % nslices != base {
            continue;
        }
        for key in rec.keys.iter() {
            if key.len() > KEY_MAX {
                return err_at!(
                    IndexFail, msg: "index key {} exceeds {}", key.len(), KEY_MAX
                );
            }
            sink.idl_insert(rec.ax, key, id)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod schema_test;
