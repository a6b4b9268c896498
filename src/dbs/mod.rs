//! Module implement data types shared across the package.

mod dn;
mod entry;
mod id;

pub use dn::{is_child_of, parent, to_canonical};
pub use entry::{Attr, Entry};
pub use id::{disk_to_id, id_to_disk, Id, DISK_ID_SIZE, NOID};
