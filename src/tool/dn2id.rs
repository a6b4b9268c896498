//! Module implement the name to id resolver.
//!
//! The dn2id database maps a canonical name to `(id, parent-id)`.
//! Resolution walks the name bottom-up: a missing ancestor is
//! materialized on the spot so the descendant can be placed, and its
//! `(id, name)` is remembered as a *hole*. When the real entry for
//! that name arrives later, the hit closes the hole. A load finishing
//! with unclosed holes is reporting entries that never arrived.

use crate::{
    dbs::{self, disk_to_id, id_to_disk, Id, DISK_ID_SIZE},
    mdb::{Db, Mdb},
    tool::TextBuf,
    Error, Result,
};

/// Initial capacity of the hole buffer.
pub const HOLE_SIZE: usize = 4096;

// auto-materialized ancestor awaiting its real entry.
#[derive(Clone, Debug)]
pub struct Hole {
    pub id: Id,
    pub ndn: String,
}

/// Hole buffer. Ids are allocated monotonically, so appends keep the
/// list ordered by ascending id.
pub struct Holes {
    list: Vec<Hole>,
}

impl Holes {
    pub fn new() -> Holes {
        Holes {
            list: Vec::with_capacity(HOLE_SIZE),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn as_slice(&self) -> &[Hole] {
        &self.list
    }

    fn push(&mut self, id: Id, ndn: &str) {
        self.list.push(Hole {
            id,
            ndn: ndn.to_string(),
        });
    }

    // close the hole for `id`, if one is open. Ascending order allows
    // the early exit.
    fn close(&mut self, id: Id) {
        for i in 0..self.list.len() {
            if self.list[i].id == id {
                self.list.remove(i);
                break;
            } else if self.list[i].id > id {
                break;
            }
        }
    }
}

// dn2id record, entry-id then parent-id, both in on-disk form.
fn to_record(id: Id, pid: Id) -> Vec<u8> {
    let mut data = Vec::with_capacity(2 * DISK_ID_SIZE);
    data.extend_from_slice(&id_to_disk(id));
    data.extend_from_slice(&id_to_disk(pid));
    data
}

fn from_record(data: &[u8]) -> Result<(Id, Id)> {
    if data.len() != 2 * DISK_ID_SIZE {
        return err_at!(FailConvert, msg: "dn2id record length {}", data.len());
    }
    let id = disk_to_id(&data[..DISK_ID_SIZE])?;
    let pid = disk_to_id(&data[DISK_ID_SIZE..])?;
    Ok((id, pid))
}

/// Look up canonical `ndn`, returning `(id, parent-id)`.
pub fn find(store: &Mdb, db: Db, ndn: &str) -> Result<Option<(Id, Id)>> {
    match store.get(db, ndn.as_bytes())? {
        Some(data) => Ok(Some(from_record(&data)?)),
        None => Ok(None),
    }
}

/// Link `ndn -> (id, parent-id)` into the dn2id database.
pub fn add(store: &Mdb, db: Db, ndn: &str, id: Id, pid: Id) -> Result<()> {
    store.set(db, ndn.as_bytes(), &to_record(id, pid))
}

/// Resolve or create the id for `entry`, materializing missing
/// ancestors up to the suffix. On success `entry.id` carries the
/// resolved id.
pub fn assign(
    store: &Mdb,
    db: Db,
    suffix: &str,
    holes: &mut Holes,
    lastid: &mut Id,
    entry: &mut dbs::Entry,
    text: &mut TextBuf,
) -> Result<()> {
    entry.id = next_id(store, db, suffix, holes, lastid, &entry.ndn, false, text)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn next_id(
    store: &Mdb,
    db: Db,
    suffix: &str,
    holes: &mut Holes,
    lastid: &mut Id,
    ndn: &str,
    hole: bool,
    text: &mut TextBuf,
) -> Result<Id> {
    if ndn.is_empty() {
        return Ok(0); // the tree root
    }
    match find(store, db, ndn)? {
        Some((id, _pid)) => {
            if !hole {
                // the real entry arrived; reconcile its hole, if any.
                holes.close(id);
            }
            Ok(id)
        }
        None => {
            let pid = match ndn == suffix {
                true => 0,
                false => {
                    let pndn = dbs::parent(ndn);
                    next_id(store, db, suffix, holes, lastid, pndn, true, text)?
                }
            };
            // the id is consumed even if the add below fails; ids are
            // never recycled and the resulting gap is tolerated.
            *lastid += 1;
            let id = *lastid;
            if let Err(err) = add(store, db, ndn, id, pid) {
                text.set(format_args!("dn2id_add failed: {}", err));
                return Err(err);
            }
            if hole {
                holes.push(id, ndn);
            }
            Ok(id)
        }
    }
}

#[cfg(test)]
#[path = "dn2id_test.rs"]
mod dn2id_test;
