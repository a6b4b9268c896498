//! Module implement the batched IDL (inverted id-list) cache.
//!
//! During a bulk load every `(index-key, id)` posting would otherwise
//! cost one duplicate-key write. The cache batches postings per key in
//! [IDBLOCK]-sized blocks and writes them out in bulk, either when the
//! global block accounting hits the configured limit (flushing the
//! owning database's tree) or at session close (flushing everything).
//!
//! A key starts in **list** state and is persisted as one duplicate
//! per id. Once its posting count crosses the configured threshold it
//! switches to **range** state, persisted as exactly three duplicates
//! `[0, first, last]`; the zero-id duplicate is the range marker. The
//! transition is sticky until flush, and `first` never shrinks once in
//! range state.
//!
//! Blocks released by flushes and range transitions return to a global
//! free list; the free-list mutex also protects the in-use block
//! accounting.

use lazy_static::lazy_static;

use std::{
    cmp,
    collections::BTreeMap,
    mem,
    sync::{Mutex, MutexGuard},
};

use crate::{
    dbs::{disk_to_id, id_to_disk, Id},
    mdb::{Db, Mdb, Put},
    Error, Result,
};

/// Number of ids held by a single cache block.
pub const IDBLOCK: usize = 1024;

lazy_static! {
    // on-disk form of the reserved zero-id range marker.
    static ref RANGE_MARKER: Vec<u8> = id_to_disk(0).to_vec();
}

// index key; tree order is shorter-key-first, then byte-wise.
#[derive(Clone, Debug, Eq, PartialEq)]
struct IdlKey(Vec<u8>);

impl Ord for IdlKey {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        match self.0.len().cmp(&other.0.len()) {
            cmp::Ordering::Equal => self.0.cmp(&other.0),
            ord => ord,
        }
    }
}

impl PartialOrd for IdlKey {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// per-key buffer of postings. `first`/`last` are the extremes seen so
// far, `count` includes ids recovered from prior loads. In range state
// `blocks` stays empty.
struct IdlBuf {
    first: Id,
    last: Id,
    count: usize,
    blocks: Vec<Vec<Id>>,
}

impl IdlBuf {
    fn new() -> IdlBuf {
        IdlBuf {
            first: 0,
            last: 0,
            count: 0,
            blocks: Vec::default(),
        }
    }

    fn iter_ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.blocks.iter().flatten().copied()
    }
}

type IdlTree = BTreeMap<IdlKey, IdlBuf>;

// global free list of blocks plus in-use accounting. `size` counts
// blocks attached to cache entries, not blocks parked on the list.
struct FreeList {
    list: Vec<Vec<Id>>,
    size: usize,
    peak: usize,
}

/// IDL cache across all secondary databases of a session. One tree per
/// database; the attribute-to-slice partition keeps each tree
/// single-writer during a dispatch, the mutexes witness it.
pub struct IdlCache {
    trees: Vec<Mutex<IdlTree>>,
    free: Mutex<FreeList>,
    max_size: usize,
    db_size: usize,
}

impl IdlCache {
    pub fn new(ndbs: usize, max_size: usize, db_size: usize) -> IdlCache {
        IdlCache {
            trees: (0..ndbs).map(|_| Mutex::new(IdlTree::default())).collect(),
            free: Mutex::new(FreeList {
                list: Vec::default(),
                size: 0,
                peak: 0,
            }),
            max_size,
            db_size,
        }
    }

    /// Append a posting for `(db, key)`. The cache entry is created on
    /// first use, loading its initial count from the store so that data
    /// from prior loads merges correctly.
    pub fn insert(&self, store: &Mdb, ax: usize, db: Db, key: &[u8], id: Id) -> Result<()> {
        if self.max_size == 0 {
            return store_insert(store, db, key, id, self.db_size);
        }

        let mut tree = self.as_tree(ax)?;
        let idlk = IdlKey(key.to_vec());
        let mut buf = match tree.remove(&idlk) {
            Some(buf) => buf,
            None => Self::load_buf(store, db, key, self.db_size)?,
        };
        let res = self.insert_buf(store, db, &mut tree, &mut buf, id);
        tree.insert(idlk, buf);
        res
    }

    // recover the initial count for a key already present in the store.
    fn load_buf(store: &Mdb, db: Db, key: &[u8], db_size: usize) -> Result<IdlBuf> {
        let mut buf = IdlBuf::new();
        let mut curs = store.open_cursor(db)?;
        if let Some(data) = curs.set(key)? {
            match disk_to_id(&data)? {
                0 => buf.count = db_size + 1, // already a range
                first => {
                    buf.count = curs.count()?;
                    buf.first = first;
                }
            }
        }
        Ok(buf)
    }

    fn insert_buf(
        &self,
        store: &Mdb,
        db: Db,
        tree: &mut IdlTree,
        buf: &mut IdlBuf,
        id: Id,
    ) -> Result<()> {
        if buf.count > self.db_size {
            // range state, sticky till flush.
            buf.last = id;
            return Ok(());
        }
        if buf.count == self.db_size {
            // crossing into range state, blocks are no longer needed.
            let blocks = mem::take(&mut buf.blocks);
            self.release_blocks(blocks)?;
            buf.last = id;
            buf.count += 1;
            return Ok(());
        }
        if buf.blocks.is_empty() || buf.count % IDBLOCK == 0 {
            let block = self.alloc_block(store, db, tree)?;
            if buf.count == 0 {
                buf.first = id;
            }
            buf.blocks.push(block);
        }
        match buf.blocks.last_mut() {
            Some(tail) => tail.push(id),
            None => return err_at!(Fatal, msg: "no tail block"),
        }
        buf.count += 1;
        Ok(())
    }

    // allocate a block, preferring the free list. When the global
    // accounting is at the limit, flush this database's tree first;
    // the entry being inserted into is not in the tree at this point
    // and survives the flush.
    fn alloc_block(&self, store: &Mdb, db: Db, tree: &mut IdlTree) -> Result<Vec<Id>> {
        let mut free = self.as_free()?;
        if free.size >= self.max_size {
            drop(free);
            self.flush_tree(store, db, tree)?;
            free = self.as_free()?;
        }
        free.size += 1;
        free.peak = cmp::max(free.peak, free.size);
        Ok(free.list.pop().unwrap_or_else(|| Vec::with_capacity(IDBLOCK)))
    }

    fn release_blocks(&self, blocks: Vec<Vec<Id>>) -> Result<()> {
        if blocks.is_empty() {
            return Ok(());
        }
        let mut free = self.as_free()?;
        free.size -= blocks.len();
        for mut block in blocks.into_iter() {
            block.clear();
            free.list.push(block);
        }
        Ok(())
    }

    /// Flush one database's tree to the store and clear it.
    pub fn flush_db(&self, store: &Mdb, ax: usize, db: Db) -> Result<()> {
        let mut tree = self.as_tree(ax)?;
        self.flush_tree(store, db, &mut tree)
    }

    /// Flush every database's tree, `dbs` ordinal-parallel to the
    /// session's attributes.
    pub fn flush(&self, store: &Mdb, dbs: &[Db]) -> Result<()> {
        for (ax, db) in dbs.iter().enumerate() {
            self.flush_db(store, ax, *db)?;
        }
        Ok(())
    }

    fn flush_tree(&self, store: &Mdb, db: Db, tree: &mut IdlTree) -> Result<()> {
        // BTreeMap into-iteration is inorder over keys.
        for (key, mut buf) in mem::take(tree).into_iter() {
            self.flush_buf(store, db, &key, &mut buf)?;
        }
        Ok(())
    }

    fn flush_buf(&self, store: &Mdb, db: Db, key: &IdlKey, buf: &mut IdlBuf) -> Result<()> {
        // nothing new since the last flush of this entry.
        if buf.blocks.is_empty() && buf.count <= self.db_size {
            return Ok(());
        }

        let key = key.0.as_slice();
        let mut curs = store.open_cursor(db)?;
        match curs.set(key)? {
            Some(data) if buf.count > self.db_size => {
                if disk_to_id(&data)? != 0 {
                    // stored as a list; keep its first duplicate as the
                    // low edge, drop the rest, then mark.
                    while curs.next_dup()?.is_some() {
                        curs.del()?;
                    }
                    curs.put(key, RANGE_MARKER.as_slice(), Put::KeyFirst)?;
                } else {
                    // stored as a range; replace the high edge.
                    curs.next_dup()?; // old first
                    curs.next_dup()?; // old last
                    curs.del()?;
                }
                curs.put(key, &id_to_disk(buf.last), Put::KeyLast)?;
            }
            None if buf.count > self.db_size => {
                curs.put(key, RANGE_MARKER.as_slice(), Put::KeyLast)?;
                curs.put(key, &id_to_disk(buf.first), Put::KeyLast)?;
                curs.put(key, &id_to_disk(buf.last), Put::KeyLast)?;
            }
            _ => {
                // plain list write; the store's duplicate ordering does
                // the merge, collisions are idempotent success.
                for id in buf.iter_ids() {
                    match curs.put(key, &id_to_disk(id), Put::NoDupData) {
                        Err(Error::KeyExists(_, _)) => (),
                        res => res?,
                    }
                }
            }
        }

        let blocks = mem::take(&mut buf.blocks);
        self.release_blocks(blocks)
    }

    /// Uncached duplicate-key insert honoring this cache's threshold.
    pub fn insert_direct(&self, store: &Mdb, db: Db, key: &[u8], id: Id) -> Result<()> {
        store_insert(store, db, key, id, self.db_size)
    }

    /// High-water mark of in-use blocks, across all databases.
    pub fn to_peak(&self) -> usize {
        self.free.lock().map(|free| free.peak).unwrap_or(0)
    }

    fn as_tree(&self, ax: usize) -> Result<MutexGuard<IdlTree>> {
        match self.trees.get(ax) {
            Some(tree) => err_at!(Fatal, tree.lock()),
            None => err_at!(Fatal, msg: "bad db ordinal {}", ax),
        }
    }

    fn as_free(&self) -> Result<MutexGuard<FreeList>> {
        err_at!(Fatal, self.free.lock())
    }
}

/// Direct duplicate-key insert, the path taken when caching is
/// disabled. Maintains the same on-disk list/range discipline, one
/// posting at a time.
pub fn store_insert(store: &Mdb, db: Db, key: &[u8], id: Id, db_size: usize) -> Result<()> {
    let mut curs = store.open_cursor(db)?;
    let first = match curs.set(key)? {
        Some(data) => data,
        None => return curs.put(key, &id_to_disk(id), Put::NoDupData),
    };

    if disk_to_id(&first)? == 0 {
        // stored range; widen an edge when the id falls outside.
        let lo = match curs.next_dup()? {
            Some(data) => disk_to_id(&data)?,
            None => return err_at!(Fatal, msg: "range missing low edge"),
        };
        let hi = match curs.next_dup()? {
            Some(data) => disk_to_id(&data)?,
            None => return err_at!(Fatal, msg: "range missing high edge"),
        };
        if id < lo {
            curs.set(key)?;
            curs.next_dup()?;
            curs.del()?;
            curs.put(key, &id_to_disk(id), Put::KeyFirst)?;
        } else if id > hi {
            curs.del()?; // cursor rests on the high edge
            curs.put(key, &id_to_disk(id), Put::KeyLast)?;
        }
        Ok(())
    } else {
        let count = curs.count()?;
        if count >= db_size {
            // convert to a range covering old and new extremes.
            let lo = cmp::min(disk_to_id(&first)?, id);
            let mut hi = disk_to_id(&first)?;
            while let Some(data) = curs.next_dup()? {
                hi = disk_to_id(&data)?;
            }
            let hi = cmp::max(hi, id);
            store.set(db, key, RANGE_MARKER.as_slice())?;
            curs.put(key, &id_to_disk(lo), Put::KeyLast)?;
            curs.put(key, &id_to_disk(hi), Put::KeyLast)?;
            Ok(())
        } else {
            match curs.put(key, &id_to_disk(id), Put::NoDupData) {
                Err(Error::KeyExists(_, _)) => Ok(()),
                res => res,
            }
        }
    }
}

#[cfg(test)]
#[path = "idl_test.rs"]
mod idl_test;
