use std::sync::Arc;

use super::*;
use crate::{
    dbs::{disk_to_id, Attr, Entry},
    mdb::{Db, Mdb},
    schema::{recset, AttrIndex, KEY_MAX},
    tool::idl::IdlCache,
};

fn testsuite_ctx(store: &Mdb, descs: &[&str], cache_max: usize) -> Arc<IndexCtx> {
    let attrs: Vec<AttrIndex> = descs.iter().map(|d| AttrIndex::new(d)).collect();
    let dbs: Vec<Db> = descs
        .iter()
        .map(|d| store.open_db(&format!("ix:{}", d)).unwrap())
        .collect();
    let cache = IdlCache::new(dbs.len(), cache_max, 1 << 16);
    Arc::new(IndexCtx {
        store: store.clone(),
        dbs,
        attrs,
        cache,
        quick: true,
    })
}

fn dups_at(store: &Mdb, db: Db, key: &[u8]) -> Vec<u64> {
    let mut curs = store.open_cursor(db).unwrap();
    let mut ids = vec![];
    if let Some(data) = curs.set(key).unwrap() {
        ids.push(disk_to_id(&data).unwrap());
        while let Some(data) = curs.next_dup().unwrap() {
            ids.push(disk_to_id(&data).unwrap());
        }
    }
    ids
}

#[test]
fn test_pool_rendezvous() {
    let store = Mdb::new("test_pool_rendezvous");
    let ctx = testsuite_ctx(&store, &["cn", "ou", "sn"], 64);
    let pool = Pool::new(4, Arc::clone(&ctx)).unwrap();

    let n = 100;
    for i in 1..=n {
        let entry = Entry::new(
            &format!("cn=e{},o=x", i),
            vec![
                Attr::new("cn", vec![format!("e{}", i).into_bytes()]),
                Attr::new("ou", vec![b"eng".to_vec()]),
                Attr::new("sn", vec![format!("s{}", i).into_bytes()]),
            ],
        );
        let recs = recset(&ctx.attrs, None, &entry);
        pool.dispatch(i, Arc::new(recs)).unwrap();
    }
    drop(pool); // close and join

    ctx.cache.flush(&store, &ctx.dbs).unwrap();

    // every record processed exactly once by exactly one slice.
    let all: Vec<u64> = (1..=n).collect();
    assert_eq!(dups_at(&store, ctx.dbs[0], b"+"), all);
    assert_eq!(dups_at(&store, ctx.dbs[1], b"+"), all);
    assert_eq!(dups_at(&store, ctx.dbs[1], b"=eng"), all);
    assert_eq!(dups_at(&store, ctx.dbs[2], b"+"), all);
    for i in 1..=n {
        let key = format!("=e{}", i).into_bytes();
        assert_eq!(dups_at(&store, ctx.dbs[0], &key), vec![i]);
        let key = format!("=s{}", i).into_bytes();
        assert_eq!(dups_at(&store, ctx.dbs[2], &key), vec![i]);
    }
}

#[test]
fn test_pool_first_error() {
    let store = Mdb::new("test_pool_first_error");
    let ctx = testsuite_ctx(&store, &["cn", "ou"], 64);
    let pool = Pool::new(2, Arc::clone(&ctx)).unwrap();

    // ordinal 1 lands on the worker slice; its key length violation
    // must surface through the result slot.
    let entry = Entry::new(
        "cn=a,o=x",
        vec![
            Attr::new("cn", vec![b"a".to_vec()]),
            Attr::new("ou", vec![vec![b'x'; KEY_MAX + 1]]),
        ],
    );
    let recs = recset(&ctx.attrs, None, &entry);
    match pool.dispatch(1, Arc::new(recs)) {
        Err(Error::IndexFail(_, _)) => (),
        res => panic!("unexpected {:?}", res),
    }

    // the pool survives a failed dispatch.
    let entry = Entry::new(
        "cn=b,o=x",
        vec![
            Attr::new("cn", vec![b"b".to_vec()]),
            Attr::new("ou", vec![b"eng".to_vec()]),
        ],
    );
    let recs = recset(&ctx.attrs, None, &entry);
    pool.dispatch(2, Arc::new(recs)).unwrap();
}

#[test]
fn test_pool_close() {
    let store = Mdb::new("test_pool_close");
    let ctx = testsuite_ctx(&store, &["cn"], 64);
    let mut pool = Pool::new(3, Arc::clone(&ctx)).unwrap();

    let entry = Entry::new("cn=a,o=x", vec![Attr::new("cn", vec![b"a".to_vec()])]);
    let recs = recset(&ctx.attrs, None, &entry);
    pool.dispatch(1, Arc::new(recs)).unwrap();

    pool.close().unwrap();
    pool.close().unwrap(); // idempotent

    assert!(Pool::new(1, ctx).is_err());
}
