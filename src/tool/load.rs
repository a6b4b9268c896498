use log::{debug, error};

use std::sync::Arc;

use crate::{
    dbs::{self, id_to_disk, Id, NOID},
    mdb::Mdb,
    schema,
    tool::{dn2id, idl::IdlCache, pool::Pool, Config, IndexCtx, Session, TextBuf},
    Error, Result,
};

impl Session {
    /// Open a tool session over `store`. Opens the primary, dn2id and
    /// per-attribute databases, recovers the id generator's high-water
    /// mark, positions the shared cursor, and, on the quick path with
    /// indexed attributes, starts the worker pool.
    pub fn open(store: Mdb, config: Config) -> Result<Session> {
        let id2entry = store.open_db("id2entry")?;
        let dn2id_db = store.open_db("dn2id")?;

        let mut sec_dbs = vec![];
        for ai in config.attrs.iter() {
            sec_dbs.push(store.open_db(&format!("ix:{}", ai.desc.to_lowercase()))?);
        }

        let ctx = Arc::new(IndexCtx {
            store: store.clone(),
            dbs: sec_dbs,
            attrs: config.attrs.clone(),
            cache: IdlCache::new(
                config.attrs.len(),
                config.idl_cache_max_size,
                config.idl_db_size,
            ),
            quick: config.quick,
        });

        let lastid = {
            let mut curs = store.open_cursor(id2entry)?;
            match curs.last()? {
                Some((key, _)) => dbs::disk_to_id(&key)?,
                None => 0,
            }
        };

        let cursor = Some(store.open_cursor(id2entry)?);

        // threaded indexing applies to the quick path only, and only
        // when there is something to index.
        let threaded = config.quick
            && !config.readonly
            && !config.attrs.is_empty()
            && config.thread_max > 1;
        let pool = match threaded {
            true => Some(Pool::new(config.thread_max, Arc::clone(&ctx))?),
            false => None,
        };

        Ok(Session {
            config,
            store,
            id2entry,
            dn2id: dn2id_db,
            ctx,
            cursor,
            lastid,
            holes: dn2id::Holes::new(),
            pool,
            linear_attr: None,
        })
    }

    /// Close the session: drain the worker pool, release the shared
    /// cursor, flush every IDL cache tree and verify that all holes
    /// were reconciled. Unresolved holes fail the load.
    pub fn close(mut self) -> Result<()> {
        if let Some(mut pool) = self.pool.take() {
            pool.close()?;
        }
        self.cursor.take();
        self.ctx.cache.flush(&self.store, &self.ctx.dbs)?;
        if !self.holes.is_empty() {
            error!(target: "tool", "error, entries missing!");
            for hole in self.holes.as_slice() {
                error!(target: "tool", "  entry {}: {}", hole.id, hole.ndn);
            }
            return err_at!(
                MissingEntries, msg: "{} unresolved holes at close", self.holes.len()
            );
        }
        Ok(())
    }

    /// Load one entry: resolve its id, write its index postings and
    /// persist it in the primary store, transactionally unless in
    /// quick mode. Returns the assigned id, or [NOID] with the failure
    /// detail formatted into `text`.
    pub fn put(&mut self, entry: &mut dbs::Entry, text: &mut TextBuf) -> Id {
        debug!(target: "tool", "put {:?}", entry.name);
        match self.do_put(entry, text) {
            Ok(()) => entry.id,
            Err(err) => {
                if text.is_empty() {
                    text.set(format_args!("{}", err));
                }
                entry.id = NOID;
                NOID
            }
        }
    }

    fn do_put(&mut self, entry: &mut dbs::Entry, text: &mut TextBuf) -> Result<()> {
        let txn = match self.config.quick {
            true => None,
            false => match self.store.begin() {
                Ok(txn) => Some(txn),
                Err(err) => {
                    text.set(format_args!("txn_begin failed: {}", err));
                    return Err(err);
                }
            },
        };

        match self.put_entry(entry, text) {
            Ok(()) => match txn {
                Some(txn) => match txn.commit() {
                    Ok(()) => Ok(()),
                    Err(err) => {
                        text.set(format_args!("txn_commit failed: {}", err));
                        Err(err)
                    }
                },
                None => Ok(()),
            },
            Err(err) => {
                if let Some(txn) = txn {
                    txn.abort().ok();
                    text.set(format_args!("txn_aborted! {}", err));
                }
                Err(err)
            }
        }
    }

    fn put_entry(&mut self, entry: &mut dbs::Entry, text: &mut TextBuf) -> Result<()> {
        dn2id::assign(
            &self.store,
            self.dn2id,
            &self.config.suffix,
            &mut self.holes,
            &mut self.lastid,
            entry,
            text,
        )?;

        // in linear-index mode secondaries are built by reindex scans.
        if !self.config.linear_index {
            if let Err(err) = self.index_add(entry) {
                text.set(format_args!("index_entry_add failed: {}", err));
                return Err(err);
            }
        }

        if let Err(err) = self.id2entry_add(entry) {
            text.set(format_args!("id2entry_add failed: {}", err));
            return Err(err);
        }
        Ok(())
    }

    // index one entry, fanning out across the worker pool when running
    // quick, inline as a single slice otherwise.
    pub(crate) fn index_add(&mut self, entry: &dbs::Entry) -> Result<()> {
        if self.ctx.attrs.is_empty() {
            return Ok(());
        }
        let recs = schema::recset(&self.ctx.attrs, self.linear_attr, entry);
        match &self.pool {
            Some(pool) => pool.dispatch(entry.id, Arc::new(recs)),
            None => schema::recrun(self.ctx.as_ref(), &recs, entry.id, 0, 1),
        }
    }

    fn id2entry_add(&mut self, entry: &dbs::Entry) -> Result<()> {
        self.store
            .set(self.id2entry, &id_to_disk(entry.id), &entry.to_bytes()?)
    }

    /// Rewrite one stored entry in place. The shared cursor does not
    /// compose with an explicit transaction on the same handle, so it
    /// is closed first and reopened after. Returns the entry's id, or
    /// [NOID] with detail in `text`.
    pub fn modify(&mut self, entry: &dbs::Entry, text: &mut TextBuf) -> Id {
        debug_assert!(entry.id != NOID);
        debug!(target: "tool", "modify ({}, {:?})", entry.id, entry.name);
        match self.do_modify(entry, text) {
            Ok(()) => entry.id,
            Err(err) => {
                if text.is_empty() {
                    text.set(format_args!("{}", err));
                }
                NOID
            }
        }
    }

    fn do_modify(&mut self, entry: &dbs::Entry, text: &mut TextBuf) -> Result<()> {
        let txn = match self.config.quick {
            true => None,
            false => {
                self.cursor.take();
                match self.store.begin() {
                    Ok(txn) => Some(txn),
                    Err(err) => {
                        text.set(format_args!("txn_begin failed: {}", err));
                        self.cursor = Some(self.store.open_cursor(self.id2entry)?);
                        return Err(err);
                    }
                }
            }
        };

        let res = match self.id2entry_add(entry) {
            Ok(()) => match txn {
                Some(txn) => match txn.commit() {
                    Ok(()) => Ok(()),
                    Err(err) => {
                        text.set(format_args!("txn_commit failed: {}", err));
                        Err(err)
                    }
                },
                None => Ok(()),
            },
            Err(err) => {
                text.set(format_args!("id2entry_add failed: {}", err));
                if let Some(txn) = txn {
                    txn.abort().ok();
                    text.set(format_args!("txn_aborted! {}", err));
                }
                Err(err)
            }
        };

        if !self.config.quick {
            self.cursor = Some(self.store.open_cursor(self.id2entry)?);
        }
        res
    }

    /// High-water mark of IDL cache blocks in use.
    pub fn to_idl_peak(&self) -> usize {
        self.ctx.cache.to_peak()
    }

    /// Last id handed out by the id generator.
    pub fn to_lastid(&self) -> Id {
        self.lastid
    }
}

#[cfg(test)]
#[path = "load_test.rs"]
mod load_test;
