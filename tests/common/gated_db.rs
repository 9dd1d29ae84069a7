//! A [`MemDB`] that can pause the thread reading a chosen key.

use std::sync::{
    mpsc::{self, Receiver, Sender},
    Arc, Mutex,
};

use pvtdata_rs::pvtdata_store::kv_backed::pluggables::{KVGet, KVStore};

use super::mem_db::{MemDB, MemWriteBatch};

/// Wraps a [`MemDB`]. After [`GatedDB::pause_after_reading`], the next read of the given key returns
/// only once the test lets it continue.
#[derive(Clone)]
pub(crate) struct GatedDB {
    db: MemDB,
    gate: Arc<Mutex<Option<Gate>>>,
}

struct Gate {
    key: Vec<u8>,
    reached: Sender<()>,
    resume: Receiver<()>,
}

/// Handle to an armed gate.
pub(crate) struct GateHandle {
    reached: Receiver<()>,
    resume: Sender<()>,
}

impl GateHandle {
    /// Block until a thread has read the key and is paused.
    pub(crate) fn wait_until_reached(&self) {
        self.reached.recv().unwrap()
    }

    /// Let the paused thread continue.
    pub(crate) fn resume(&self) {
        self.resume.send(()).unwrap()
    }
}

impl GatedDB {
    pub(crate) fn new() -> GatedDB {
        GatedDB {
            db: MemDB::new(),
            gate: Arc::new(Mutex::new(None)),
        }
    }

    /// Pause the next thread that reads `key`, right after it has read the value. Only one read
    /// is paused.
    pub(crate) fn pause_after_reading(&self, key: Vec<u8>) -> GateHandle {
        let (reached_sender, reached) = mpsc::channel();
        let (resume, resume_receiver) = mpsc::channel();
        *self.gate.lock().unwrap() = Some(Gate {
            key,
            reached: reached_sender,
            resume: resume_receiver,
        });
        GateHandle { reached, resume }
    }
}

impl KVStore for GatedDB {
    type WriteBatch = MemWriteBatch;

    fn write(&mut self, wb: Self::WriteBatch) {
        self.db.write(wb)
    }
}

impl KVGet for GatedDB {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let value = self.db.get(key);
        let gate = {
            let mut gate = self.gate.lock().unwrap();
            match gate.as_ref() {
                Some(armed) if armed.key == key => gate.take(),
                _ => None,
            }
        };
        if let Some(gate) = gate {
            gate.reached.send(()).unwrap();
            gate.resume.recv().unwrap();
        }
        value
    }
}
