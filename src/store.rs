//! Append-only vector index paired positionally with its metadata sequence.
//!
//! The index and the metadata form one logical table sharing an implicit
//! positional key: the vector at position `i` always belongs to the entry at
//! position `i`. [`VectorStore`] owns both sequences behind a single lock and
//! never exposes them independently, so the pairing cannot drift.
//!
//! Persistence is a flat two-artifact pair in one storage directory:
//!
//! - `index.bin`: a small header (magic, format version, dimension, count)
//!   followed by the vectors as little-endian `f32` values.
//! - `entries.json`: the entry sequence serialized with `serde_json`, in the
//!   same order as the vectors.
//!
//! Both artifacts are written via write-to-temp-then-rename, and reload
//! rejects any pair whose counts disagree.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use crate::types::StoredEntry;

const INDEX_FILE: &str = "index.bin";
const ENTRIES_FILE: &str = "entries.json";

const INDEX_MAGIC: [u8; 4] = *b"GRIX";
const INDEX_VERSION: u32 = 1;
const INDEX_HEADER_LEN: usize = 20;

/// Errors raised by [`VectorStore`] operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("search on an empty index")]
    EmptyIndex,

    #[error("corrupt store state: {0}")]
    Corrupt(String),

    #[error("failed to persist store artifacts: {0}")]
    Persist(String),
}

#[derive(Debug, Default)]
struct StoreState {
    /// Flat vector data, stride = store dimension.
    vectors: Vec<f32>,
    entries: Vec<StoredEntry>,
}

/// A nearest-neighbor match returned by [`VectorStore::search`].
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub entry: StoredEntry,
    /// Squared Euclidean distance between the probe and the stored vector.
    pub distance: f32,
}

/// Nearest-neighbor index plus metadata sequence with flat-file persistence.
///
/// Readers take a cheap read-lock snapshot; writers go through
/// [`VectorStore::lock_writer`], which serializes whole ingest-and-persist
/// cycles so a reader only ever observes pre- or post-ingest state.
pub struct VectorStore {
    dimension: usize,
    index_path: PathBuf,
    entries_path: PathBuf,
    state: RwLock<StoreState>,
    write_lock: Mutex<()>,
}

impl VectorStore {
    /// Open the store rooted at `dir`, loading both artifacts when present.
    ///
    /// A directory with neither artifact yields an empty store. Exactly one
    /// artifact present, a parse failure, or a count/dimension disagreement
    /// is [`StoreError::Corrupt`].
    ///
    /// # Panics
    ///
    /// Panics if `dimension` is zero.
    pub fn open(dir: impl AsRef<Path>, dimension: usize) -> Result<Self, StoreError> {
        assert!(dimension > 0, "vector dimension must be non-zero");
        let dir = dir.as_ref();
        let index_path = dir.join(INDEX_FILE);
        let entries_path = dir.join(ENTRIES_FILE);
        let state = load_state(&index_path, &entries_path, dimension)?.unwrap_or_default();
        Ok(Self {
            dimension,
            index_path,
            entries_path,
            state: RwLock::new(state),
            write_lock: Mutex::new(()),
        })
    }

    /// Dimensionality every stored and probed vector must match.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored entries (equal to the number of stored vectors).
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path of the binary index artifact.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Path of the metadata artifact.
    pub fn entries_path(&self) -> &Path {
        &self.entries_path
    }

    /// Acquire the single-writer lock.
    ///
    /// Ingestion holds this guard across its whole stage-apply-persist cycle;
    /// two concurrent ingestions serialize here instead of interleaving their
    /// appends.
    pub async fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Append one vector and its entry in a single logical step.
    pub fn add(&self, vector: &[f32], entry: StoredEntry) -> Result<(), StoreError> {
        self.check_dimension(vector.len())?;
        let mut state = self.state.write();
        state.vectors.extend_from_slice(vector);
        state.entries.push(entry);
        debug_assert_eq!(state.vectors.len(), state.entries.len() * self.dimension);
        Ok(())
    }

    /// Append a prepared batch of (vector, entry) pairs in order.
    ///
    /// Dimensions are validated for the whole batch before anything is
    /// appended, so a bad vector cannot leave a partial batch behind. The
    /// append itself is one write-lock critical section: readers see the
    /// store either without the batch or with all of it.
    pub fn extend(
        &self,
        items: Vec<(Vec<f32>, StoredEntry)>,
    ) -> Result<usize, StoreError> {
        for (vector, _) in &items {
            self.check_dimension(vector.len())?;
        }
        let added = items.len();
        let mut state = self.state.write();
        for (vector, entry) in items {
            state.vectors.extend_from_slice(&vector);
            state.entries.push(entry);
        }
        debug_assert_eq!(state.vectors.len(), state.entries.len() * self.dimension);
        Ok(added)
    }

    /// Return the `k` entries nearest to `query` by squared Euclidean
    /// distance, ascending. Ties break toward the lowest insertion position,
    /// so results are deterministic.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, StoreError> {
        self.check_dimension(query.len())?;
        let state = self.state.read();
        if state.entries.is_empty() {
            return Err(StoreError::EmptyIndex);
        }

        let mut scored: Vec<(usize, f32)> = state
            .vectors
            .chunks_exact(self.dimension)
            .map(|row| squared_l2(query, row))
            .enumerate()
            .collect();
        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(position, distance)| SearchHit {
                entry: state.entries[position].clone(),
                distance,
            })
            .collect())
    }

    /// Write both artifacts via write-to-temp-then-rename.
    ///
    /// A failure on either artifact is [`StoreError::Persist`]; the rename
    /// discipline guarantees a previously good artifact is never replaced by
    /// a partial one.
    pub fn persist(&self) -> Result<(), StoreError> {
        let (index_bytes, entries_bytes) = {
            let state = self.state.read();
            let index = encode_index(self.dimension, &state.vectors);
            let entries = serde_json::to_vec_pretty(&state.entries)
                .map_err(|err| StoreError::Persist(err.to_string()))?;
            (index, entries)
        };

        if let Some(parent) = self.index_path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                StoreError::Persist(format!("{}: {err}", parent.display()))
            })?;
        }
        write_atomic(&self.index_path, &index_bytes)?;
        write_atomic(&self.entries_path, &entries_bytes)?;
        Ok(())
    }

    /// Replace the in-memory state with the contents of the two artifacts.
    ///
    /// The swap happens under the write lock, so concurrent readers observe
    /// either the old state or the fully loaded new one.
    pub fn reload(&self) -> Result<(), StoreError> {
        let loaded = load_state(&self.index_path, &self.entries_path, self.dimension)?
            .ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "no persisted artifacts at {}",
                    self.index_path.display()
                ))
            })?;
        *self.state.write() = loaded;
        Ok(())
    }

    fn check_dimension(&self, actual: usize) -> Result<(), StoreError> {
        if actual != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn encode_index(dimension: usize, vectors: &[f32]) -> Vec<u8> {
    let count = vectors.len() / dimension;
    let mut bytes = Vec::with_capacity(INDEX_HEADER_LEN + vectors.len() * 4);
    bytes.extend_from_slice(&INDEX_MAGIC);
    bytes.extend_from_slice(&INDEX_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(dimension as u32).to_le_bytes());
    bytes.extend_from_slice(&(count as u64).to_le_bytes());
    for value in vectors {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_index(bytes: &[u8], dimension: usize) -> Result<Vec<f32>, StoreError> {
    if bytes.len() < INDEX_HEADER_LEN {
        return Err(StoreError::Corrupt("index artifact truncated".to_string()));
    }
    if bytes[..4] != INDEX_MAGIC {
        return Err(StoreError::Corrupt(
            "index artifact has an unrecognized header".to_string(),
        ));
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != INDEX_VERSION {
        return Err(StoreError::Corrupt(format!(
            "unsupported index format version {version}"
        )));
    }
    let file_dimension = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    if file_dimension != dimension {
        return Err(StoreError::Corrupt(format!(
            "index dimension {file_dimension} does not match configured dimension {dimension}"
        )));
    }
    let count = u64::from_le_bytes([
        bytes[12], bytes[13], bytes[14], bytes[15], bytes[16], bytes[17], bytes[18], bytes[19],
    ]) as usize;

    let data = &bytes[INDEX_HEADER_LEN..];
    let expected_len = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| StoreError::Corrupt("index length overflows".to_string()))?;
    if data.len() != expected_len {
        return Err(StoreError::Corrupt(format!(
            "index data length {} does not match header count {count}",
            data.len()
        )));
    }

    let mut vectors = Vec::with_capacity(count * dimension);
    for chunk in data.chunks_exact(4) {
        let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if !value.is_finite() {
            return Err(StoreError::Corrupt(
                "index contains non-finite values".to_string(),
            ));
        }
        vectors.push(value);
    }
    Ok(vectors)
}

/// Load both artifacts. `Ok(None)` means a fresh store (neither file exists);
/// anything short of a mutually consistent pair is [`StoreError::Corrupt`].
fn load_state(
    index_path: &Path,
    entries_path: &Path,
    dimension: usize,
) -> Result<Option<StoreState>, StoreError> {
    match (index_path.exists(), entries_path.exists()) {
        (false, false) => return Ok(None),
        (true, true) => {}
        (true, false) => {
            return Err(StoreError::Corrupt(format!(
                "index artifact present but {} is missing",
                entries_path.display()
            )));
        }
        (false, true) => {
            return Err(StoreError::Corrupt(format!(
                "metadata artifact present but {} is missing",
                index_path.display()
            )));
        }
    }

    let index_bytes = fs::read(index_path)
        .map_err(|err| StoreError::Corrupt(format!("{}: {err}", index_path.display())))?;
    let vectors = decode_index(&index_bytes, dimension)?;

    let entries_bytes = fs::read(entries_path)
        .map_err(|err| StoreError::Corrupt(format!("{}: {err}", entries_path.display())))?;
    let entries: Vec<StoredEntry> = serde_json::from_slice(&entries_bytes)
        .map_err(|err| StoreError::Corrupt(format!("{}: {err}", entries_path.display())))?;

    if vectors.len() != entries.len() * dimension {
        return Err(StoreError::Corrupt(format!(
            "index holds {} vectors but metadata holds {} entries",
            vectors.len() / dimension,
            entries.len()
        )));
    }

    Ok(Some(StoreState { vectors, entries }))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    let written = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, path));
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::Persist(format!("{}: {err}", path.display())));
    }
    Ok(())
}
