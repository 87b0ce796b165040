//! The object store (C1): OID allocation, on-disk persistence, TTL
//! expiry, destructive-read eviction, and lazy-deletion heap compaction.
//!
//! Concurrency shape: a single `Mutex` guards `{index, heap,
//! dirty_tombs, heap_clean_pending}`, paired with a `Condvar` for the
//! `heap_clean_pending` wait/signal. `std::sync::Condvar` only pairs
//! with a `Mutex`, and the pending flag must be checked and acted on
//! (pushed to / popped from the heap) in the *same* critical section as
//! every other mutation of `heap` — an `RwLock` plus a second,
//! independent `Mutex<bool>` for the flag let a compaction's snapshot
//! and swap interleave with an allocation's wait-then-push across two
//! separate locks, losing a just-pushed heap entry out from under a
//! live index entry. A single lock closes that window: allocation
//! re-checks `heap_clean_pending` and pushes its new `HeapEntry`
//! without ever releasing the lock in between, and compaction cannot
//! start its scan while any such push is still in flight. Disk I/O is
//! still performed **outside** the lock in every path, and the file
//! unlink for a destructive read is handed off to a dedicated
//! background worker over a channel so the pull response never blocks
//! on it — only the synchronous index removal (the logical
//! destruction) happens inline. Background work (the 60s expiry tick,
//! on-demand compaction, the delete worker) runs on plain
//! `std::thread` loops, following the `Arc<Mutex<T>>` + `thread::spawn`
//! pattern the teacher's multithreading labs use, since it is blocking
//! work, not async work.

use std::collections::{BinaryHeap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dead_drop_common::error::DeadDropError;
use dead_drop_common::oid::generate_oid;
use tracing::{error, info, warn};

const MAX_OID_ATTEMPTS: usize = 16;
const EXPIRY_TICK: Duration = Duration::from_secs(60);
const COMPACTION_DIRTY_THRESHOLD: usize = 4096;
const COMPACTION_RATIO_THRESHOLD: f64 = 0.5;

/// Default TTL, in minutes, when the server config doesn't override it.
pub const DEFAULT_TTL_MIN: u64 = 1440;

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeapEntry {
    created_at: u64,
    oid: String,
}

// BinaryHeap is a max-heap; flip the comparison so the smallest
// `created_at` (oldest object) sits at the top.
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .created_at
            .cmp(&self.created_at)
            .then_with(|| other.oid.cmp(&self.oid))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct SharedState {
    index: HashSet<String>,
    heap: BinaryHeap<HeapEntry>,
    dirty_tombs: usize,
    heap_clean_pending: bool,
}

pub struct ObjectStore {
    data_dir: PathBuf,
    ttl_min: u64,
    destructive_read: bool,
    state: Mutex<SharedState>,
    heap_clean_cv: Condvar,
    delete_tx: mpsc::Sender<String>,
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl ObjectStore {
    pub fn new(data_dir: PathBuf, ttl_min: u64, destructive_read: bool) -> Self {
        let (delete_tx, delete_rx) = mpsc::channel::<String>();
        let worker_dir = data_dir.clone();
        thread::spawn(move || {
            for oid in delete_rx {
                let path = worker_dir.join(&oid);
                match fs::remove_file(&path) {
                    Ok(()) => info!(oid = %oid, "destroyed object file after destructive read"),
                    Err(e) => {
                        warn!(oid = %oid, error = %e, "failed to delete object file after destructive read")
                    }
                }
            }
        });

        ObjectStore {
            data_dir,
            ttl_min,
            destructive_read,
            state: Mutex::new(SharedState::default()),
            heap_clean_cv: Condvar::new(),
            delete_tx,
        }
    }

    /// Enumerates `data_dir`, indexing every file found with its mtime
    /// as `created_at`, then heapifies. Run once at process start.
    pub fn startup_reindex(&self) -> Result<(), DeadDropError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| DeadDropError::internal(format!("failed to create data dir: {e}")))?;

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.data_dir)
            .map_err(|e| DeadDropError::internal(format!("failed to read data dir: {e}")))?
        {
            let entry =
                entry.map_err(|e| DeadDropError::internal(format!("failed to read dir entry: {e}")))?;
            let metadata = entry
                .metadata()
                .map_err(|e| DeadDropError::internal(format!("failed to stat entry: {e}")))?;
            if !metadata.is_file() {
                continue;
            }
            let oid = entry.file_name().to_string_lossy().into_owned();
            let modified = metadata
                .modified()
                .map_err(|e| DeadDropError::internal(format!("failed to read mtime: {e}")))?;
            let created_at = modified
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            entries.push((oid, created_at));
        }

        let count = entries.len();
        let mut state = self.state.lock().unwrap();
        state.index = entries.iter().map(|(oid, _)| oid.clone()).collect();
        state.heap = entries
            .into_iter()
            .map(|(oid, created_at)| HeapEntry { created_at, oid })
            .collect();
        drop(state);

        info!(count, data_dir = %self.data_dir.display(), "reindexed data directory on startup");
        Ok(())
    }

    /// Spawns the expiry-tick background thread. Must be called on an
    /// `Arc<ObjectStore>` so the thread can outlive the caller's frame.
    pub fn start_background_tasks(self: &Arc<Self>) {
        let store = Arc::clone(self);
        thread::spawn(move || loop {
            thread::sleep(EXPIRY_TICK);
            store.run_expiry_tick();
        });
    }

    /// Persists `bytes` under a freshly allocated OID and returns it.
    pub fn drop_object(self: &Arc<Self>, bytes: &[u8]) -> Result<String, DeadDropError> {
        let created_at = now_unix();
        let oid = self.allocate_oid(created_at, generate_oid);

        if let Err(err) = self.write_object_file(&oid, bytes) {
            // I1 must hold to the outside: a failed write never leaves
            // a present index entry with no backing file.
            let mut state = self.state.lock().unwrap();
            if state.index.remove(&oid) {
                state.dirty_tombs += 1;
            }
            return Err(err);
        }

        Ok(oid)
    }

    /// Reads the object named `oid`, if present. When destructive reads
    /// are enabled, a successful read schedules the object's eviction;
    /// the eviction itself does not block the response.
    pub fn pull_object(self: &Arc<Self>, oid: &str) -> Result<Option<Vec<u8>>, DeadDropError> {
        let present = {
            let state = self.state.lock().unwrap();
            state.index.contains(oid)
        };
        if !present {
            return Ok(None);
        }

        let bytes = fs::read(self.object_path(oid)).map_err(|e| {
            error!(oid, error = %e, "object present in index but missing or unreadable on disk");
            DeadDropError::internal(format!("failed to read object {oid}: {e}"))
        })?;

        if self.destructive_read {
            self.schedule_destruction(oid);
        }

        Ok(Some(bytes))
    }

    /// Acquires the state lock, blocking while `heap_clean_pending` is
    /// set, and returns the held guard with the flag observed `false`.
    /// Callers that need to push to or pop from the heap must do so
    /// before releasing this guard, so their mutation can never be
    /// skipped by a compaction snapshot that raced the wait.
    fn lock_when_clear(&self) -> MutexGuard<'_, SharedState> {
        let mut state = self.state.lock().unwrap();
        while state.heap_clean_pending {
            state = self.heap_clean_cv.wait(state).unwrap();
        }
        state
    }

    /// Blocks until no compaction is pending, without holding the lock
    /// afterwards. Used by callers (and tests) that only need to
    /// synchronize, not mutate, around compaction.
    #[cfg(test)]
    fn wait_for_compaction(&self) {
        drop(self.lock_when_clear());
    }

    fn allocate_oid(&self, created_at: u64, mut next_candidate: impl FnMut() -> String) -> String {
        for _ in 0..MAX_OID_ATTEMPTS {
            let candidate = next_candidate();
            let mut state = self.lock_when_clear();
            if !state.index.contains(&candidate) {
                state.index.insert(candidate.clone());
                state.heap.push(HeapEntry { created_at, oid: candidate.clone() });
                return candidate;
            }
        }

        let candidate = next_candidate();
        warn!(
            oid = %candidate,
            attempts = MAX_OID_ATTEMPTS,
            "OID key-space saturated; overwriting colliding object"
        );
        let mut state = self.lock_when_clear();
        state.index.insert(candidate.clone());
        state.heap.push(HeapEntry { created_at, oid: candidate.clone() });
        candidate
    }

    /// Destructive-read eviction: removes `oid` from the index (the
    /// durable, synchronous "destruction" that prevents OID reuse) and
    /// hands the file unlink off to the background delete worker so the
    /// pull response never waits on disk I/O.
    fn schedule_destruction(self: &Arc<Self>, oid: &str) {
        let mut should_compact = false;
        {
            let mut state = self.state.lock().unwrap();
            if state.index.remove(oid) {
                state.dirty_tombs += 1;
            }

            if self.compaction_should_fire(&state) {
                state.heap_clean_pending = true;
                should_compact = true;
            }
        }

        if should_compact {
            self.begin_compaction();
        }

        if self.delete_tx.send(oid.to_string()).is_err() {
            warn!(oid, "delete worker channel closed; object file leaked on disk");
        }
    }

    fn compaction_should_fire(&self, state: &SharedState) -> bool {
        !state.heap_clean_pending
            && state.dirty_tombs > COMPACTION_DIRTY_THRESHOLD
            && !state.heap.is_empty()
            && (state.dirty_tombs as f64 / state.heap.len() as f64) > COMPACTION_RATIO_THRESHOLD
    }

    fn begin_compaction(self: &Arc<Self>) {
        let store = Arc::clone(self);
        thread::spawn(move || store.run_compaction());
    }

    /// Rebuilds the heap to drop dirty tombs. Runs entirely under the
    /// single state lock: the scan and the swap are one critical
    /// section, so no allocation can push a new `HeapEntry` in between
    /// and have it silently dropped by the swap.
    fn run_compaction(&self) {
        let mut state = self.state.lock().unwrap();
        let dirty_observed = state.dirty_tombs;
        let heap_len_before = state.heap.len();

        let compacted: BinaryHeap<HeapEntry> = state
            .heap
            .iter()
            .filter(|entry| state.index.contains(&entry.oid))
            .cloned()
            .collect();

        state.heap = compacted;
        state.dirty_tombs = state.dirty_tombs.saturating_sub(dirty_observed);
        state.heap_clean_pending = false;
        drop(state);

        self.heap_clean_cv.notify_all();

        info!(
            dirty_tombs_cleared = dirty_observed,
            heap_len_before,
            "heap compaction complete"
        );
    }

    fn run_expiry_tick(&self) {
        let mut to_delete = Vec::new();
        {
            let mut state = self.lock_when_clear();
            let now = now_unix();
            let ttl_secs = self.ttl_min * 60;
            loop {
                let expired = match state.heap.peek() {
                    Some(top) => top.created_at + ttl_secs < now,
                    None => false,
                };
                if !expired {
                    break;
                }
                let entry = state.heap.pop().expect("peeked Some above");
                if state.index.remove(&entry.oid) {
                    to_delete.push(entry.oid);
                } else {
                    state.dirty_tombs = state.dirty_tombs.saturating_sub(1);
                }
            }
        }

        for oid in &to_delete {
            match fs::remove_file(self.object_path(oid)) {
                Ok(()) => info!(oid = %oid, "expired object deleted"),
                Err(e) => warn!(oid = %oid, error = %e, "failed to delete expired object file"),
            }
        }
    }

    fn object_path(&self, oid: &str) -> PathBuf {
        self.data_dir.join(oid)
    }

    fn write_object_file(&self, oid: &str, bytes: &[u8]) -> Result<(), DeadDropError> {
        let path = self.object_path(oid);
        fs::write(&path, bytes).map_err(|e| {
            error!(oid, error = %e, "failed to write object to disk");
            DeadDropError::internal(format!("failed to write object {oid}: {e}"))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(&path, fs::Permissions::from_mode(0o660)) {
                warn!(oid, error = %e, "failed to set object file permissions");
            }
        }

        Ok(())
    }

    /// Test/diagnostic accessor: current dirty-tomb counter.
    #[cfg(test)]
    fn dirty_tombs(&self) -> usize {
        self.state.lock().unwrap().dirty_tombs
    }

    #[cfg(test)]
    fn heap_len(&self) -> usize {
        self.state.lock().unwrap().heap.len()
    }
}
