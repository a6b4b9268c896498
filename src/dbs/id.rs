use std::convert::TryFrom;

use crate::{Error, Result};

/// Entry identifier, monotonically allocated by the backend's id
/// generator and never reused within a load.
///
/// Id `0` is reserved for the tree root; real entries are numbered
/// from 1. In secondary databases a duplicate decoding to id `0` acts
/// as the range marker.
pub type Id = u64;

/// Reserved sentinel meaning "no entry".
pub const NOID: Id = u64::MAX;

/// Width, in bytes, of an [Id] in its on-disk form.
pub const DISK_ID_SIZE: usize = 8;

/// Convert an id to its on-disk form. Ids are stored big-endian so that
/// the store's byte-wise duplicate ordering matches numeric ordering.
#[inline]
pub fn id_to_disk(id: Id) -> [u8; DISK_ID_SIZE] {
    id.to_be_bytes()
}

/// Reverse of [id_to_disk].
#[inline]
pub fn disk_to_id(data: &[u8]) -> Result<Id> {
    let data = err_at!(FailConvert, <[u8; DISK_ID_SIZE]>::try_from(data))?;
    Ok(Id::from_be_bytes(data))
}

#[cfg(test)]
#[path = "id_test.rs"]
mod id_test;
