//! Module implement the index worker pool.
//!
//! A single producer dispatches the index records of one entry at a
//! time across `nslices` slices. Slice 0 runs inline on the producer;
//! slices `1..nslices` run on parked worker threads woken by a
//! broadcast. Two condition variables make up the rendezvous: `go`
//! publishes new work to the workers, `idle` tells the producer that
//! workers have parked again or filled in their result slots. The
//! publish happens-before each worker's read of the work, and every
//! worker's completion happens-before the next publish.

use std::{
    sync::{Arc, Condvar, Mutex},
    thread,
};

use crate::{
    dbs::Id,
    schema::{self, IndexRec},
    tool::IndexCtx,
    Error, Result,
};

// work published for one entry.
#[derive(Clone)]
struct Work {
    id: Id,
    recs: Arc<Vec<IndexRec>>,
}

struct State {
    seq: u64,
    parked: usize,
    shutdown: bool,
    work: Option<Work>,
    // per-slice result, None while the slice is busy; slot 0 unused.
    slots: Vec<Option<Result<()>>>,
}

struct Shared {
    ctx: Arc<IndexCtx>,
    state: Mutex<State>,
    go: Condvar,
    idle: Condvar,
}

pub struct Pool {
    nslices: usize,
    shared: Arc<Shared>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl Pool {
    /// Spawn `nslices - 1` workers; the producer itself is slice 0.
    pub fn new(nslices: usize, ctx: Arc<IndexCtx>) -> Result<Pool> {
        if nslices < 2 {
            return err_at!(InvalidInput, msg: "pool needs at least 2 slices");
        }

        let shared = Arc::new(Shared {
            ctx,
            state: Mutex::new(State {
                seq: 0,
                parked: 0,
                shutdown: false,
                work: None,
                slots: (0..nslices).map(|_| None).collect(),
            }),
            go: Condvar::new(),
            idle: Condvar::new(),
        });

        let mut handles = vec![];
        for base in 1..nslices {
            let shared = Arc::clone(&shared);
            let handle = err_at!(
                ThreadFail,
                thread::Builder::new()
                    .name(format!("ditload-index-{}", base))
                    .spawn(move || worker_loop(shared, base, nslices))
            )?;
            handles.push(handle);
        }

        Ok(Pool {
            nslices,
            shared,
            handles,
        })
    }

    /// Index one entry across all slices. Returns the first observed
    /// error, producer slice first, then slot order.
    pub fn dispatch(&self, id: Id, recs: Arc<Vec<IndexRec>>) -> Result<()> {
        {
            let mut st = err_at!(Fatal, self.shared.state.lock())?;
            // wait for every worker to park from the previous entry.
            while st.parked < self.nslices - 1 {
                st = err_at!(Fatal, self.shared.idle.wait(st))?;
            }
            for slot in st.slots.iter_mut() {
                *slot = None;
            }
            st.work = Some(Work {
                id,
                recs: Arc::clone(&recs),
            });
            st.seq += 1;
            self.shared.go.notify_all();
        }

        // slice 0 runs on the producer.
        schema::recrun(self.shared.ctx.as_ref(), &recs, id, 0, self.nslices)?;

        let mut st = err_at!(Fatal, self.shared.state.lock())?;
        while st.slots.iter().skip(1).any(|slot| slot.is_none()) {
            st = err_at!(Fatal, self.shared.idle.wait(st))?;
        }
        st.work = None;
        for base in 1..self.nslices {
            if let Some(Err(err)) = st.slots[base].take() {
                return Err(err);
            }
        }
        Ok(())
    }

    /// Stop the workers: raise the shutdown flag, broadcast, join.
    pub fn close(&mut self) -> Result<()> {
        if self.handles.is_empty() {
            return Ok(());
        }
        {
            let mut st = err_at!(Fatal, self.shared.state.lock())?;
            st.shutdown = true;
            self.shared.go.notify_all();
        }
        let mut panicked = false;
        for handle in self.handles.drain(..) {
            panicked = handle.join().is_err() || panicked;
        }
        if panicked {
            err_at!(ThreadFail, msg: "index worker panicked")
        } else {
            Ok(())
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.close().ok();
    }
}

fn worker_loop(shared: Arc<Shared>, base: usize, nslices: usize) {
    let mut seen: u64 = 0;
    let mut st = match shared.state.lock() {
        Ok(st) => st,
        Err(_) => return,
    };
    loop {
        st.parked += 1;
        shared.idle.notify_all();
        while st.seq == seen && !st.shutdown {
            st = match shared.go.wait(st) {
                Ok(st) => st,
                Err(_) => return,
            };
        }
        if st.shutdown {
            return;
        }
        seen = st.seq;
        st.parked -= 1;
        let work = st.work.clone();
        drop(st);

        let res = match work {
            Some(work) => {
                schema::recrun(shared.ctx.as_ref(), &work.recs, work.id, base, nslices)
            }
            None => err_at!(Fatal, msg: "worker woke without work"),
        };

        st = match shared.state.lock() {
            Ok(st) => st,
            Err(_) => return,
        };
        st.slots[base] = Some(res);
        shared.idle.notify_all();
    }
}
