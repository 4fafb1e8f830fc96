//! Versioned snapshot files on disk
//!
//! Layout: a directory of `kg-v{version}.sgs` files, one per saved graph
//! version. Each file is `SGKG` magic, a bincode header (format version,
//! graph version, payload checksum, payload length), then a gzip-compressed
//! bincode payload holding the node and edge arenas, the embedding cache
//! and the model parameters. Writes go through a temp file and rename, so
//! a crash mid-save never leaves a truncated snapshot under a real name.

use crate::embed::{EmbeddingCache, ModelParams};
use crate::graph::{Edge, GraphStore, Node};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const MAGIC: [u8; 4] = *b"SGKG";
const FORMAT_VERSION: u16 = 1;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("not a snapshot file (bad magic)")]
    BadMagic,

    #[error("unsupported snapshot format version {0}")]
    UnsupportedFormat(u16),

    #[error("checksum mismatch, snapshot file is corrupt")]
    ChecksumMismatch,

    #[error("no snapshot for graph version {0}")]
    MissingVersion(u64),

    #[error("no snapshots in {0}")]
    NoSnapshots(PathBuf),
}

pub type PersistResult<T> = Result<T, PersistError>;

#[derive(Serialize, Deserialize)]
struct Header {
    format_version: u16,
    graph_version: u64,
    checksum: [u8; 32],
    payload_len: u64,
}

#[derive(Serialize, Deserialize)]
struct PersistedState {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    cache: EmbeddingCache,
    params: ModelParams,
}

/// Engine state loaded back from one snapshot file.
#[derive(Debug)]
pub struct LoadedState {
    pub store: GraphStore,
    pub cache: EmbeddingCache,
    pub params: ModelParams,
}

/// Directory of versioned snapshot files.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open (creating if needed) a snapshot directory.
    pub fn open(dir: impl AsRef<Path>) -> PersistResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(SnapshotStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self, version: u64) -> PathBuf {
        self.dir.join(format!("kg-v{version}.sgs"))
    }

    /// Persist the current engine state under its graph version. Returns
    /// the file path written.
    pub fn save(
        &self,
        store: &GraphStore,
        cache: &EmbeddingCache,
        params: &ModelParams,
    ) -> PersistResult<PathBuf> {
        let state = PersistedState {
            nodes: store.all_nodes().to_vec(),
            edges: store.all_edges().to_vec(),
            cache: cache.clone(),
            params: params.clone(),
        };

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        bincode::serialize_into(&mut encoder, &state)?;
        let payload = encoder.finish()?;

        let header = Header {
            format_version: FORMAT_VERSION,
            graph_version: store.version(),
            checksum: Sha256::digest(&payload).into(),
            payload_len: payload.len() as u64,
        };

        let path = self.file_path(store.version());
        let tmp = path.with_extension("sgs.tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&MAGIC)?;
            bincode::serialize_into(&mut file, &header)?;
            file.write_all(&payload)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        info!(
            version = store.version(),
            bytes = payload.len(),
            path = %path.display(),
            "snapshot saved"
        );
        Ok(path)
    }

    /// Load the snapshot for one graph version.
    pub fn load(&self, version: u64) -> PersistResult<LoadedState> {
        let path = self.file_path(version);
        if !path.exists() {
            return Err(PersistError::MissingVersion(version));
        }
        self.load_file(&path)
    }

    /// Load the snapshot with the highest graph version.
    pub fn load_latest(&self) -> PersistResult<LoadedState> {
        let version = self
            .versions()?
            .into_iter()
            .max()
            .ok_or_else(|| PersistError::NoSnapshots(self.dir.clone()))?;
        self.load(version)
    }

    /// Graph versions with a snapshot on disk, ascending.
    pub fn versions(&self) -> PersistResult<Vec<u64>> {
        let mut versions = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(v) = name
                .strip_prefix("kg-v")
                .and_then(|rest| rest.strip_suffix(".sgs"))
                .and_then(|v| v.parse::<u64>().ok())
            {
                versions.push(v);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    fn load_file(&self, path: &Path) -> PersistResult<LoadedState> {
        let mut file = File::open(path)?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(PersistError::BadMagic);
        }

        let header: Header = bincode::deserialize_from(&mut file)?;
        if header.format_version != FORMAT_VERSION {
            return Err(PersistError::UnsupportedFormat(header.format_version));
        }

        let mut payload = vec![0u8; header.payload_len as usize];
        file.read_exact(&mut payload)?;
        let checksum: [u8; 32] = Sha256::digest(&payload).into();
        if checksum != header.checksum {
            return Err(PersistError::ChecksumMismatch);
        }

        let mut decoder = GzDecoder::new(payload.as_slice());
        let mut raw = Vec::new();
        decoder.read_to_end(&mut raw)?;
        let state: PersistedState = bincode::deserialize(&raw)?;

        debug!(
            version = header.graph_version,
            nodes = state.nodes.len(),
            edges = state.edges.len(),
            "snapshot loaded"
        );
        Ok(LoadedState {
            store: GraphStore::from_parts(header.graph_version, state.nodes, state.edges),
            cache: state.cache,
            params: state.params,
        })
    }
}
