//! Module implement the offline bulk-load and reindex tool session.
//!
//! A [Session] exclusively owns everything one load needs: the shared
//! cursor over the primary store, the transaction when one is active,
//! the resolver's hole buffer, the IDL caches and a handle to the
//! index worker pool. Typical load workflow,
//!
//! ```ignore
//! let store = mdb::Mdb::new("backend");
//! let mut config = tool::Config::new("backend", "o=x");
//! config.set_quick(true).set_attrs(attrs);
//!
//! let mut session = tool::Session::open(store, config)?;
//! let mut text = tool::TextBuf::new(256);
//! for mut entry in entries {
//!     if session.put(&mut entry, &mut text) == dbs::NOID {
//!         eprintln!("{}", text.as_str());
//!     }
//! }
//! session.close()?;
//! ```
//!
//! And reindex workflow, over an already-loaded primary store,
//!
//! ```ignore
//! let mut session = tool::Session::open(store, config)?;
//! while let Some(id) = session.next()? {
//!     session.reindex(id)?;
//! }
//! session.close()?;
//! ```
//!
//! In quick mode writes bypass transactions, indexing for each entry
//! fans out across the worker pool, and inverted-index postings are
//! buffered in the IDL cache until close. Failures on the quick path
//! leave partial state behind; it is a bulk-load trade-off, not a
//! durability mode.

use std::{fmt, sync::Arc};

use crate::{
    dbs,
    mdb::{Cursor, Db, Mdb},
    schema, Error, Result,
};

mod config;
mod dn2id;
mod idl;
mod load;
mod pool;
mod reindex;

pub use config::{Config, IDL_CACHE_MAX_SIZE, IDL_DB_SIZE};
pub use idl::IDBLOCK;

/// Tool session over one backend store. Refer to [module
/// documentation][crate::tool] for the life-cycle.
pub struct Session {
    config: Config,
    store: Mdb,
    id2entry: Db,
    dn2id: Db,
    ctx: Arc<IndexCtx>,
    cursor: Option<Cursor>,
    lastid: dbs::Id,
    holes: dn2id::Holes,
    pool: Option<pool::Pool>,
    linear_attr: Option<usize>,
}

// state shared between the producer and the index workers: the store,
// the per-attribute secondary databases and their IDL caches.
pub(crate) struct IndexCtx {
    store: Mdb,
    dbs: Vec<Db>,
    attrs: Vec<schema::AttrIndex>,
    cache: idl::IdlCache,
    quick: bool,
}

impl schema::IdlSink for IndexCtx {
    fn idl_insert(&self, ax: usize, key: &[u8], id: dbs::Id) -> Result<()> {
        let db = match self.dbs.get(ax) {
            Some(db) => *db,
            None => return err_at!(Fatal, msg: "bad attribute ordinal {}", ax),
        };
        // postings are batched on the quick path only; transactional
        // loads take the direct duplicate-key path so aborts roll
        // them back.
        match self.quick {
            true => self.cache.insert(&self.store, ax, db, key, id),
            false => self.cache.insert_direct(&self.store, db, key, id),
        }
    }
}

/// Caller-supplied fixed-capacity buffer receiving human readable
/// error detail from [Session::put] and [Session::modify]. Text beyond
/// capacity is silently truncated.
pub struct TextBuf {
    buf: String,
    cap: usize,
}

impl TextBuf {
    pub fn new(cap: usize) -> TextBuf {
        TextBuf {
            buf: String::default(),
            cap,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear()
    }

    pub(crate) fn set(&mut self, args: fmt::Arguments) {
        let text = fmt::format(args);
        self.buf = text.chars().take(self.cap).collect();
    }
}

impl fmt::Display for TextBuf {
    fn fmt(&self, f: &mut fmt::Formatter) -> std::result::Result<(), fmt::Error> {
        write!(f, "{}", self.buf)
    }
}
