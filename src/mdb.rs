//! Module implement `Mdb`, an in-memory ordered key/value store with
//! duplicate values per key.
//!
//! Semantics follow the duplicate-key stores directory backends are
//! built on: duplicates under one key are kept in byte-sorted order,
//! cursors iterate keys and duplicates ([Cursor::next],
//! [Cursor::next_dup]), and writes position via [Put] flags.
//! [Put::NoDupData] refuses an exact duplicate with
//! [Error::KeyExists], which bulk-writers treat as success.
//!
//! Explicit transactions are undo-logged: writes apply immediately
//! (read-your-writes) and [Txn::abort], or dropping the [Txn], rolls
//! them back. A single write transaction can be active at a time.

use std::{
    collections::HashMap,
    ops::Bound,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{Error, Result};

/// Handle to a named database within an [Mdb] instance.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Db(usize);

/// Positioning flag for duplicate-key writes.
///
/// Duplicates are byte-sorted, so all three flags insert in sorted
/// position; they differ in how an already-present duplicate is
/// treated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Put {
    KeyFirst,
    KeyLast,
    NoDupData,
}

/// In-memory ordered dup-sort store. Cheap to clone, all clones share
/// the same underlying databases.
#[derive(Clone)]
pub struct Mdb {
    name: String,
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    dbs: Vec<Database>,
    undo: Option<UndoLog>,
}

struct Database {
    name: String,
    tree: DupTree,
}

type DupTree = std::collections::BTreeMap<Vec<u8>, Vec<Vec<u8>>>;

// first-touch snapshot of (db, key), None means key was absent.
type UndoLog = HashMap<(usize, Vec<u8>), Option<Vec<Vec<u8>>>>;

impl Mdb {
    pub fn new(name: &str) -> Mdb {
        let inner = Inner {
            dbs: Vec::default(),
            undo: None,
        };
        Mdb {
            name: name.to_string(),
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn to_name(&self) -> String {
        self.name.clone()
    }

    /// Open a database by name, creating it if required. Handles stay
    /// valid for the life of the instance.
    pub fn open_db(&self, name: &str) -> Result<Db> {
        let mut inner = self.as_inner()?;
        for (i, db) in inner.dbs.iter().enumerate() {
            if db.name == name {
                return Ok(Db(i));
            }
        }
        inner.dbs.push(Database {
            name: name.to_string(),
            tree: DupTree::default(),
        });
        Ok(Db(inner.dbs.len() - 1))
    }

    /// Begin an explicit write transaction. At most one can be active.
    pub fn begin(&self) -> Result<Txn> {
        let mut inner = self.as_inner()?;
        if inner.undo.is_some() {
            return err_at!(TxnFail, msg: "{} transaction already active", self.name);
        }
        inner.undo = Some(UndoLog::default());
        Ok(Txn {
            mdb: self.clone(),
            active: true,
        })
    }

    /// Replace all duplicates at `key` with the single `value`.
    pub fn set(&self, db: Db, key: &[u8], value: &[u8]) -> Result<()> {
        let mut inner = self.as_inner()?;
        inner.check_db(db)?;
        inner.save_undo(db.0, key);
        inner.dbs[db.0].tree.insert(key.to_vec(), vec![value.to_vec()]);
        Ok(())
    }

    /// Return the first duplicate at `key`, if the key is present.
    pub fn get(&self, db: Db, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let inner = self.as_inner()?;
        inner.check_db(db)?;
        Ok(inner.dbs[db.0].tree.get(key).map(|dups| dups[0].clone()))
    }

    /// Open a cursor over `db`. Any number of cursors can be open; they
    /// see writes immediately.
    pub fn open_cursor(&self, db: Db) -> Result<Cursor> {
        self.as_inner()?.check_db(db)?;
        Ok(Cursor {
            mdb: self.clone(),
            db,
            key: None,
            off: 0,
            pending: false,
        })
    }

    /// Snapshot `db` as a sorted list of `(key, duplicates)`.
    pub fn to_vec(&self, db: Db) -> Result<Vec<(Vec<u8>, Vec<Vec<u8>>)>> {
        let inner = self.as_inner()?;
        inner.check_db(db)?;
        let items = inner.dbs[db.0]
            .tree
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(items)
    }

    fn as_inner(&self) -> Result<MutexGuard<Inner>> {
        err_at!(Fatal, self.inner.lock())
    }
}

impl Inner {
    fn check_db(&self, db: Db) -> Result<()> {
        if db.0 < self.dbs.len() {
            Ok(())
        } else {
            err_at!(Fatal, msg: "invalid database handle {:?}", db)
        }
    }

    fn save_undo(&mut self, db: usize, key: &[u8]) {
        if let Some(undo) = &mut self.undo {
            let k = (db, key.to_vec());
            if !undo.contains_key(&k) {
                let prior = self.dbs[db].tree.get(key).cloned();
                undo.insert(k, prior);
            }
        }
    }

    fn rollback(&mut self) {
        if let Some(undo) = self.undo.take() {
            for ((db, key), prior) in undo.into_iter() {
                match prior {
                    Some(dups) => {
                        self.dbs[db].tree.insert(key, dups);
                    }
                    None => {
                        self.dbs[db].tree.remove(&key);
                    }
                }
            }
        }
    }
}

/// Explicit write transaction over an [Mdb] instance. Dropping an
/// un-committed transaction aborts it.
pub struct Txn {
    mdb: Mdb,
    active: bool,
}

impl Txn {
    pub fn commit(mut self) -> Result<()> {
        let mut inner = self.mdb.as_inner()?;
        inner.undo = None;
        self.active = false;
        Ok(())
    }

    pub fn abort(mut self) -> Result<()> {
        let mut inner = self.mdb.as_inner()?;
        inner.rollback();
        self.active = false;
        Ok(())
    }
}

impl Drop for Txn {
    fn drop(&mut self) {
        if self.active {
            if let Ok(mut inner) = self.mdb.inner.lock() {
                inner.rollback();
            }
        }
    }
}

/// Cursor over one database of an [Mdb] instance.
///
/// A cursor tracks `(key, duplicate-ordinal)`. Writes through
/// [Cursor::put] do not move the cursor; [Cursor::del] removes the
/// current duplicate and leaves the cursor between its neighbours, so
/// a following [Cursor::next_dup] sees the duplicate that slid into
/// the deleted slot.
pub struct Cursor {
    mdb: Mdb,
    db: Db,
    key: Option<Vec<u8>>,
    off: usize,
    pending: bool,
}

impl Cursor {
    /// Position at `key` and return its first duplicate, or `None`
    /// when the key is absent.
    pub fn set(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let inner = self.mdb.as_inner()?;
        self.key = Some(key.to_vec());
        self.off = 0;
        self.pending = false;
        Ok(inner.dbs[self.db.0].tree.get(key).map(|dups| dups[0].clone()))
    }

    /// Position at the first key and return `(key, first-duplicate)`.
    pub fn first(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let inner = self.mdb.as_inner()?;
        self.off = 0;
        self.pending = false;
        match inner.dbs[self.db.0].tree.iter().next() {
            Some((key, dups)) => {
                self.key = Some(key.clone());
                Ok(Some((key.clone(), dups[0].clone())))
            }
            None => {
                self.key = None;
                Ok(None)
            }
        }
    }

    /// Position at the last key and return `(key, last-duplicate)`.
    pub fn last(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let inner = self.mdb.as_inner()?;
        self.pending = false;
        match inner.dbs[self.db.0].tree.iter().next_back() {
            Some((key, dups)) => {
                self.key = Some(key.clone());
                self.off = dups.len() - 1;
                Ok(Some((key.clone(), dups[self.off].clone())))
            }
            None => {
                self.key = None;
                self.off = 0;
                Ok(None)
            }
        }
    }

    /// Advance to the next duplicate, crossing into the next key once
    /// duplicates are exhausted. Returns `(key, value)`.
    pub fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let inner = self.mdb.as_inner()?;
        let tree = &inner.dbs[self.db.0].tree;

        let key = match &self.key {
            Some(key) => key.clone(),
            None => {
                drop(inner);
                return self.first();
            }
        };

        if let Some(dups) = tree.get(&key) {
            let off = if self.pending { self.off } else { self.off + 1 };
            if off < dups.len() {
                self.off = off;
                self.pending = false;
                return Ok(Some((key, dups[off].clone())));
            }
        }

        let item = tree
            .range::<[u8], _>((Bound::Excluded(key.as_slice()), Bound::Unbounded))
            .next()
            .map(|(k, dups)| (k.clone(), dups[0].clone()));
        match item {
            Some((k, value)) => {
                self.key = Some(k.clone());
                self.off = 0;
                self.pending = false;
                Ok(Some((k, value)))
            }
            None => Ok(None),
        }
    }

    /// Advance to the next duplicate of the current key.
    pub fn next_dup(&mut self) -> Result<Option<Vec<u8>>> {
        let inner = self.mdb.as_inner()?;
        let key = match &self.key {
            Some(key) => key.clone(),
            None => return err_at!(Fatal, msg: "cursor not positioned"),
        };
        let dups = match inner.dbs[self.db.0].tree.get(&key) {
            Some(dups) => dups,
            None => return Ok(None),
        };
        let off = if self.pending { self.off } else { self.off + 1 };
        self.pending = false;
        if off < dups.len() {
            self.off = off;
            Ok(Some(dups[off].clone()))
        } else {
            Ok(None)
        }
    }

    /// Number of duplicates at the current key.
    pub fn count(&self) -> Result<usize> {
        let inner = self.mdb.as_inner()?;
        match &self.key {
            Some(key) => Ok(inner.dbs[self.db.0]
                .tree
                .get(key)
                .map(|dups| dups.len())
                .unwrap_or(0)),
            None => err_at!(Fatal, msg: "cursor not positioned"),
        }
    }

    /// Insert `value` as a duplicate at `key`. Refer to [Put] for the
    /// treatment of an already-present duplicate.
    pub fn put(&mut self, key: &[u8], value: &[u8], flag: Put) -> Result<()> {
        let mut inner = self.mdb.as_inner()?;
        inner.save_undo(self.db.0, key);
        let dups = inner.dbs[self.db.0]
            .tree
            .entry(key.to_vec())
            .or_insert_with(Vec::default);
        match dups.binary_search_by(|dup| dup.as_slice().cmp(value)) {
            Ok(_) if flag == Put::NoDupData => {
                err_at!(KeyExists, msg: "duplicate at key {:?}", key)
            }
            Ok(_) => Ok(()),
            Err(n) => {
                dups.insert(n, value.to_vec());
                Ok(())
            }
        }
    }

    /// Delete the duplicate the cursor is positioned on.
    pub fn del(&mut self) -> Result<()> {
        let mut inner = self.mdb.as_inner()?;
        let key = match &self.key {
            Some(key) => key.clone(),
            None => return err_at!(Fatal, msg: "cursor not positioned"),
        };
        inner.save_undo(self.db.0, &key);
        let dups = match inner.dbs[self.db.0].tree.get_mut(&key) {
            Some(dups) if self.off < dups.len() => dups,
            _ => return err_at!(Fatal, msg: "cursor delete past end"),
        };
        dups.remove(self.off);
        if dups.is_empty() {
            inner.dbs[self.db.0].tree.remove(&key);
        }
        self.pending = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "mdb_test.rs"]
mod mdb_test;
