//! Background synchronizer bridging internal and external DB buffers.
//!
//! The server backend serves remote reads straight from the external
//! buffers without touching the store mutex, so heavy internal activity
//! never stalls a remote client. The synchronizer keeps the two buffer
//! sets coherent: each tick it takes a non-blocking shot at the store
//! lock (skipping the tick on contention) and runs one [`sync_pass`].
//!
//! Change detection is a CRC-32C over the external buffer rather than
//! per-write dirty flags, so *any* source of mutation is captured,
//! including the embedded server writing into the buffer directly. A
//! checksum collision suppresses at most one direction of copy for a
//! single tick; the next differing write is detected normally.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::s7::server::SharedArea;
use crate::s7::store::DbMemory;

/// Default synchronizer period.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_millis(20);
/// Shortest accepted period.
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_millis(10);
/// Longest accepted period.
pub const MAX_SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// Clamp a configured period into the supported range.
pub fn clamp_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_SYNC_INTERVAL, MAX_SYNC_INTERVAL)
}

/// One synchronizer pass over every DB, with the store lock held.
///
/// Per DB: checksum the external buffer; if it changed since the last
/// pass an external client wrote, so the external content wins and is
/// copied inward. Otherwise the internal content is copied outward and
/// the resulting checksum recorded.
pub fn sync_pass(
    internal: &mut BTreeMap<u32, Vec<u8>>,
    areas: &[(u32, SharedArea)],
    last_checksums: &mut BTreeMap<u32, u32>,
) {
    for (db_number, area) in areas {
        let Some(int_buf) = internal.get_mut(db_number) else {
            continue;
        };
        let mut ext_buf = area.lock().expect("external area lock");
        let checksum = crc32c::crc32c(&ext_buf);
        match last_checksums.get(db_number) {
            Some(prev) if *prev != checksum => {
                tracing::debug!(db_number, "external write detected, copying inward");
                int_buf.copy_from_slice(&ext_buf);
                last_checksums.insert(*db_number, checksum);
            }
            _ => {
                ext_buf.copy_from_slice(int_buf);
                last_checksums.insert(*db_number, crc32c::crc32c(&ext_buf));
            }
        }
    }
}

/// Handle to the running synchronizer thread.
pub struct Synchronizer {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Synchronizer {
    /// Spawn the synchronizer thread at the given (clamped) period.
    pub fn spawn(
        store: Arc<DbMemory>,
        areas: Vec<(u32, SharedArea)>,
        interval: Duration,
    ) -> Synchronizer {
        let interval = clamp_interval(interval);
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("s7sim-sync".to_string())
            .spawn(move || {
                tracing::debug!(?interval, "synchronizer started");
                let mut last_checksums = BTreeMap::new();
                while flag.load(Ordering::SeqCst) {
                    thread::sleep(interval);
                    // Skip the tick when the store is busy; remote reads
                    // keep being served from the external buffers.
                    if let Some(mut buffers) = store.try_lock_buffers() {
                        sync_pass(&mut buffers, &areas, &mut last_checksums);
                    }
                }
                tracing::debug!("synchronizer stopped");
            })
            .expect("spawn synchronizer thread");
        Synchronizer {
            running,
            handle: Some(handle),
        }
    }

    /// Stop the thread and drain it: the join returns after at most one
    /// period once the flag is cleared.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Synchronizer {
    fn drop(&mut self) {
        self.stop();
    }
}
