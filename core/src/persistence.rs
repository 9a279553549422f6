use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::arena::{ArenaConfig, VectorArena};
use crate::catalog::{MetadataCatalog, RecordId, RecordMeta};

const MAGIC: [u8; 4] = *b"FDXI";
const FORMAT_VERSION: u32 = 1;
// magic + version + dimension + count + payload crc
const HEADER_LEN: usize = 4 + 4 + 4 + 8 + 4;

/// Error type for store persistence.
#[derive(Debug)]
pub enum PersistenceError {
    Io(std::io::Error),
    Serde(serde_json::Error),
    /// The persisted pair is unusable: header/checksum damage, unparsable
    /// metadata, or an index/metadata count disagreement. Loading aborts
    /// without yielding partial data.
    Corrupt(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(error) => write!(f, "io error: {error}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::Corrupt(message) => write!(f, "corrupt store: {message}"),
        }
    }
}

impl Error for PersistenceError {}

impl From<std::io::Error> for PersistenceError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

/// Sidecar location for an index path: the same path with the extension
/// replaced by `meta.json`.
pub fn metadata_path(index_path: &Path) -> PathBuf {
    index_path.with_extension("meta.json")
}

/// Writes the arena and catalog as a paired file set.
///
/// The index blob carries the vectors in slot order behind a checksummed
/// header; the sidecar maps string-encoded record ids to their metadata.
/// Both files are written to a temporary sibling and atomically renamed into
/// place, so a crash mid-write never leaves a truncated file.
pub fn save_store(
    index_path: &Path,
    arena: &VectorArena,
    catalog: &MetadataCatalog,
) -> Result<(), PersistenceError> {
    let mut payload = Vec::with_capacity(arena.as_flat().len() * 4);
    for value in arena.as_flat() {
        payload.extend_from_slice(&value.to_le_bytes());
    }
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&payload);

    let mut blob = Vec::with_capacity(HEADER_LEN + payload.len());
    blob.extend_from_slice(&MAGIC);
    blob.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    blob.extend_from_slice(&(arena.dimension() as u32).to_le_bytes());
    blob.extend_from_slice(&(arena.len() as u64).to_le_bytes());
    blob.extend_from_slice(&hasher.finalize().to_le_bytes());
    blob.extend_from_slice(&payload);
    write_atomic(index_path, &blob)?;

    let sidecar: BTreeMap<String, &RecordMeta> = catalog
        .entries()
        .iter()
        .map(|(id, meta)| (id.to_string(), meta))
        .collect();
    let bytes = serde_json::to_vec_pretty(&sidecar)?;
    write_atomic(&metadata_path(index_path), &bytes)?;
    Ok(())
}

/// Loads a persisted pair, or `None` when no index blob exists yet.
///
/// The loaded vector count must equal the sidecar entry count; any
/// disagreement, damage, or unparsable metadata fails with
/// [`PersistenceError::Corrupt`] and nothing is loaded.
pub fn load_store(
    index_path: &Path,
    config: ArenaConfig,
) -> Result<Option<(VectorArena, MetadataCatalog)>, PersistenceError> {
    if !index_path.exists() {
        return Ok(None);
    }

    let raw = fs::read(index_path)?;
    if raw.len() < HEADER_LEN {
        return Err(PersistenceError::Corrupt(format!(
            "index blob holds {} bytes, header needs {HEADER_LEN}",
            raw.len()
        )));
    }
    if raw[..4] != MAGIC {
        return Err(PersistenceError::Corrupt(
            "index blob has wrong magic".to_string(),
        ));
    }

    let version = read_u32(&raw[4..8]);
    if version != FORMAT_VERSION {
        return Err(PersistenceError::Corrupt(format!(
            "unsupported index format version {version}"
        )));
    }

    let dimension = read_u32(&raw[8..12]) as usize;
    if dimension != config.dimension {
        return Err(PersistenceError::Corrupt(format!(
            "index dimension {dimension} does not match configured dimension {}",
            config.dimension
        )));
    }

    let count = read_u64(&raw[12..20]);
    let expected_crc = read_u32(&raw[20..24]);

    let payload = &raw[HEADER_LEN..];
    let expected_payload_len = count
        .checked_mul(dimension as u64)
        .and_then(|values| values.checked_mul(4));
    if expected_payload_len != Some(payload.len() as u64) {
        return Err(PersistenceError::Corrupt(format!(
            "index payload holds {} bytes, header promises {count} vectors of dimension {dimension}",
            payload.len()
        )));
    }

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(payload);
    if hasher.finalize() != expected_crc {
        return Err(PersistenceError::Corrupt(
            "index payload checksum mismatch".to_string(),
        ));
    }

    let values: Vec<f32> = payload
        .chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect();

    let sidecar_path = metadata_path(index_path);
    if !sidecar_path.exists() {
        return Err(PersistenceError::Corrupt(format!(
            "metadata sidecar missing at {}",
            sidecar_path.display()
        )));
    }

    let sidecar_raw = fs::read_to_string(&sidecar_path)?;
    let sidecar: BTreeMap<String, RecordMeta> =
        serde_json::from_str(&sidecar_raw).map_err(|error| {
            PersistenceError::Corrupt(format!("invalid metadata sidecar: {error}"))
        })?;

    // Ids travel as JSON object keys; the string-to-integer conversion
    // happens here and nowhere else.
    let mut entries = BTreeMap::new();
    for (key, meta) in sidecar {
        let id: RecordId = key.parse().map_err(|_| {
            PersistenceError::Corrupt(format!("invalid record id '{key}' in metadata sidecar"))
        })?;
        entries.insert(id, meta);
    }

    if entries.len() as u64 != count {
        return Err(PersistenceError::Corrupt(format!(
            "index holds {count} vectors but metadata has {} entries",
            entries.len()
        )));
    }

    let arena = VectorArena::from_flat(config, values);
    let catalog = MetadataCatalog::from_entries(entries);
    Ok(Some((arena, catalog)))
}

/// Deletes the persisted pair if present.
pub fn remove_store_files(index_path: &Path) -> Result<(), PersistenceError> {
    for path in [index_path.to_path_buf(), metadata_path(index_path)] {
        if path.exists() {
            fs::remove_file(path)?;
        }
    }
    Ok(())
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_u64(bytes: &[u8]) -> u64 {
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    ensure_parent_dir(path)?;
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, bytes)?;
    File::open(&temp_path)?.sync_all()?;
    fs::rename(&temp_path, path)?;
    sync_parent_dir(path)?;
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn sync_parent_dir(path: &Path) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}
