use log::{debug, error};

use crate::{
    dbs::{self, id_to_disk, Id, NOID},
    tool::{dn2id, Session},
    Error, Result,
};

impl Session {
    /// Step the shared cursor to the next entry of the primary store
    /// and return its id, `None` at end of store. In linear-index mode
    /// the end of the store rotates to the next indexed attribute and
    /// restarts the scan, until every attribute had its pass.
    pub fn next(&mut self) -> Result<Option<Id>> {
        let item = match self.cursor.as_mut() {
            Some(curs) => curs.next()?,
            None => return err_at!(Fatal, msg: "session cursor is closed"),
        };
        match item {
            Some((key, _)) => Ok(Some(dbs::disk_to_id(&key)?)),
            None => self.rotate_linear(),
        }
    }

    // end of store. move to the next attribute and restart the scan,
    // flushing the finished attribute's cache so at most one
    // attribute's working set is resident at a time.
    fn rotate_linear(&mut self) -> Result<Option<Id>> {
        let k = match self.linear_attr {
            Some(k) if k + 1 < self.ctx.attrs.len() => k,
            _ => return Ok(None),
        };
        self.ctx.cache.flush_db(&self.store, k, self.ctx.dbs[k])?;
        self.linear_attr = Some(k + 1);

        let item = match self.cursor.as_mut() {
            Some(curs) => curs.first()?,
            None => return err_at!(Fatal, msg: "session cursor is closed"),
        };
        match item {
            Some((key, _)) => Ok(Some(dbs::disk_to_id(&key)?)),
            None => Ok(None),
        }
    }

    /// Fetch and decode entry `id` through the shared cursor.
    pub fn entry_get(&mut self, id: Id) -> Result<dbs::Entry> {
        let data = match self.cursor.as_mut() {
            Some(curs) => curs.set(&id_to_disk(id))?,
            None => return err_at!(Fatal, msg: "session cursor is closed"),
        };
        match data {
            Some(data) => {
                let mut entry = dbs::Entry::from_bytes(&data)?;
                entry.id = id;
                Ok(entry)
            }
            None => err_at!(KeyNotFound, msg: "could not locate id={}", id),
        }
    }

    /// Resolve a name to its id without side effects. Returns [NOID]
    /// when the name is not present, 0 for the empty name.
    pub fn dn2id_get(&self, dn: &str) -> Result<Id> {
        let ndn = dbs::to_canonical(dn);
        if ndn.is_empty() {
            return Ok(0);
        }
        match dn2id::find(&self.store, self.dn2id, &ndn)? {
            Some((id, _pid)) => Ok(id),
            None => Ok(NOID),
        }
    }

    /// Re-run index-add for the stored entry `id`, under a transaction
    /// unless in quick mode.
    pub fn reindex(&mut self, id: Id) -> Result<()> {
        debug!(target: "tool", "reindex {}", id);
        if self.ctx.attrs.is_empty() {
            return Ok(());
        }
        // first reindex of a linear run starts the first pass.
        if self.config.linear_index && self.linear_attr.is_none() {
            self.linear_attr = Some(0);
        }

        let entry = match self.entry_get(id) {
            Ok(entry) => entry,
            Err(err) => {
                error!(target: "tool", "could not locate id={}", id);
                return Err(err);
            }
        };

        let txn = match self.config.quick {
            true => None,
            false => Some(self.store.begin()?),
        };
        match self.index_add(&entry) {
            Ok(()) => match txn {
                Some(txn) => txn.commit(),
                None => Ok(()),
            },
            Err(err) => {
                if let Some(txn) = txn {
                    txn.abort().ok();
                    error!(target: "tool", "reindex {} txn_aborted! {}", id, err);
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "reindex_test.rs"]
mod reindex_test;
