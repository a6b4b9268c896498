use rand::{prelude::random, rngs::SmallRng, seq::SliceRandom, SeedableRng};

use std::collections::HashMap;

use super::*;
use crate::{dbs::Entry, tool::TextBuf};

#[test]
fn test_assign_out_of_order() {
    // out-of-order descendants, the S2 shape: ancestors materialize as
    // holes and close as the real entries arrive.
    let store = Mdb::new("test_assign_out_of_order");
    let db = store.open_db("dn2id").unwrap();
    let mut holes = Holes::new();
    let mut lastid: Id = 0;
    let mut text = TextBuf::new(256);

    let mut entry = Entry::new("cn=a,ou=b,o=x", vec![]);
    assign(&store, db, "o=x", &mut holes, &mut lastid, &mut entry, &mut text).unwrap();
    // suffix materialized first, then the intermediate.
    assert_eq!(entry.id, 3);
    assert_eq!(holes.len(), 2);
    assert_eq!(holes.as_slice()[0].id, 1);
    assert_eq!(holes.as_slice()[0].ndn, "o=x");
    assert_eq!(holes.as_slice()[1].id, 2);
    assert_eq!(holes.as_slice()[1].ndn, "ou=b,o=x");

    let mut entry = Entry::new("ou=b,o=x", vec![]);
    assign(&store, db, "o=x", &mut holes, &mut lastid, &mut entry, &mut text).unwrap();
    assert_eq!(entry.id, 2);
    assert_eq!(holes.len(), 1);

    let mut entry = Entry::new("o=x", vec![]);
    assign(&store, db, "o=x", &mut holes, &mut lastid, &mut entry, &mut text).unwrap();
    assert_eq!(entry.id, 1);
    assert!(holes.is_empty());

    // ids were not recycled, next fresh entry continues the sequence.
    let mut entry = Entry::new("cn=c,o=x", vec![]);
    assign(&store, db, "o=x", &mut holes, &mut lastid, &mut entry, &mut text).unwrap();
    assert_eq!(entry.id, 4);
}

#[test]
fn test_assign_random_order() {
    // for any ingest ordering of a fixed tree, the hole list ends
    // empty and every name keeps the id assigned on first reference.
    let seed: u128 = random();
    println!("test_assign_random_order seed {}", seed);
    let mut rng = SmallRng::from_seed(seed.to_le_bytes());

    let names = [
        "o=x",
        "ou=a,o=x",
        "ou=b,o=x",
        "cn=1,ou=a,o=x",
        "cn=2,ou=a,o=x",
        "cn=3,ou=b,o=x",
        "cn=4,ou=b,o=x",
    ];

    for _round in 0..32 {
        let store = Mdb::new("test_assign_random_order");
        let db = store.open_db("dn2id").unwrap();
        let mut holes = Holes::new();
        let mut lastid: Id = 0;
        let mut text = TextBuf::new(256);

        let mut order: Vec<&str> = names.to_vec();
        order.shuffle(&mut rng);

        let mut ids: HashMap<String, Id> = HashMap::new();
        for name in order.iter() {
            let mut entry = Entry::new(name, vec![]);
            assign(&store, db, "o=x", &mut holes, &mut lastid, &mut entry, &mut text)
                .unwrap();
            assert_ne!(entry.id, 0);
            // id pinned at first reference, by hole or by real entry.
            let (stored, _) = find(&store, db, &entry.ndn).unwrap().unwrap();
            assert_eq!(stored, entry.id);
            ids.insert(entry.ndn.clone(), entry.id);
        }

        assert!(holes.is_empty(), "order {:?}", order);
        assert_eq!(ids.len(), names.len());
        // parent linkage is consistent.
        for name in names.iter().filter(|n| **n != "o=x") {
            let (_, pid) = find(&store, db, name).unwrap().unwrap();
            assert_eq!(pid, ids[dbs::parent(name)], "{}", name);
        }
    }
}

#[test]
fn test_assign_root_and_suffix() {
    let store = Mdb::new("test_assign_root_and_suffix");
    let db = store.open_db("dn2id").unwrap();
    let mut holes = Holes::new();
    let mut lastid: Id = 0;
    let mut text = TextBuf::new(256);

    // empty name resolves to the reserved root id.
    let mut entry = Entry::new("", vec![]);
    assign(&store, db, "o=x", &mut holes, &mut lastid, &mut entry, &mut text).unwrap();
    assert_eq!(entry.id, 0);

    // the suffix itself links under the root.
    let mut entry = Entry::new("o=x", vec![]);
    assign(&store, db, "o=x", &mut holes, &mut lastid, &mut entry, &mut text).unwrap();
    assert_eq!(entry.id, 1);
    assert_eq!(find(&store, db, "o=x").unwrap().unwrap(), (1, 0));
    assert!(holes.is_empty());
}

#[test]
fn test_holes_close_order() {
    let mut holes = Holes::new();
    for id in [2 as Id, 5, 9].iter() {
        holes.push(*id, &format!("ou={},o=x", id));
    }

    holes.close(1); // no such hole, early exit
    assert_eq!(holes.len(), 3);
    holes.close(5);
    assert_eq!(holes.len(), 2);
    assert_eq!(holes.as_slice()[0].id, 2);
    assert_eq!(holes.as_slice()[1].id, 9);
    holes.close(5); // double close is a no-op
    assert_eq!(holes.len(), 2);
}
