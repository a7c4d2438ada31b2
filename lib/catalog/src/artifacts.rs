// Persisted embedding artifacts: gzip JSON plus a SHA-256 sidecar
use crate::ArtifactError;
use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const ARTIFACT_VERSION: u32 = 1;

const EXTENSION: &str = "emb.json.gz";

/// Hex SHA-256 of an embedding text, used as the cache key
pub fn text_digest(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub id: String,
    pub text_hash: String,
    pub vector: Vec<f32>,
}

/// Embeddings computed for one catalog build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingArtifacts {
    pub version: u32,
    pub model: String,
    pub dim: usize,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<ArtifactEntry>,
}

impl EmbeddingArtifacts {
    pub fn new(model: impl Into<String>, dim: usize, entries: Vec<ArtifactEntry>) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            model: model.into(),
            dim,
            created_at: Utc::now(),
            entries,
        }
    }
}

/// Artifact description for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescription {
    pub name: String,
    pub size: u64,
    pub checksum: String,
}

pub struct ArtifactStore {
    dir: PathBuf,
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|f| f.write_all(bytes))
        .map_err(|e| match e {
            atomicwrites::Error::Internal(err) | atomicwrites::Error::User(err) => ArtifactError::Io(err),
        })
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, ArtifactError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{EXTENSION}"))
    }

    fn checksum_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{EXTENSION}.sha256"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.artifact_path(name).exists()
    }

    /// Compress, checksum and atomically write an artifact under `name`
    pub fn save(&self, name: &str, artifacts: &EmbeddingArtifacts) -> Result<ArtifactDescription, ArtifactError> {
        let json = serde_json::to_vec(artifacts)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        let compressed = encoder.finish()?;

        let checksum = format!("{:x}", Sha256::digest(&compressed));
        write_atomic(&self.artifact_path(name), &compressed)?;
        write_atomic(&self.checksum_path(name), checksum.as_bytes())?;

        info!(
            name,
            entries = artifacts.entries.len(),
            bytes = compressed.len(),
            "Saved embedding artifacts"
        );
        Ok(ArtifactDescription {
            name: name.to_string(),
            size: compressed.len() as u64,
            checksum,
        })
    }

    /// Load and verify an artifact
    pub fn load(&self, name: &str) -> Result<EmbeddingArtifacts, ArtifactError> {
        let path = self.artifact_path(name);
        let compressed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let expected = match fs::read_to_string(self.checksum_path(name)) {
            Ok(s) => s.trim().to_string(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound(format!("{name} checksum")))
            }
            Err(e) => return Err(e.into()),
        };
        let actual = format!("{:x}", Sha256::digest(&compressed));
        if actual != expected {
            return Err(ArtifactError::ChecksumMismatch {
                name: name.to_string(),
                expected,
                actual,
            });
        }

        let mut json = Vec::new();
        GzDecoder::new(compressed.as_slice()).read_to_end(&mut json)?;
        let artifacts: EmbeddingArtifacts = serde_json::from_slice(&json)?;
        if artifacts.version != ARTIFACT_VERSION {
            return Err(ArtifactError::UnsupportedVersion(artifacts.version));
        }

        info!(name, entries = artifacts.entries.len(), "Loaded embedding artifacts");
        Ok(artifacts)
    }

    pub fn list(&self) -> Result<Vec<ArtifactDescription>, ArtifactError> {
        let suffix = format!(".{EXTENSION}");
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(&suffix)) else {
                continue;
            };
            let data = fs::read(entry.path())?;
            found.push(ArtifactDescription {
                name: name.to_string(),
                size: data.len() as u64,
                checksum: format!("{:x}", Sha256::digest(&data)),
            });
        }
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> EmbeddingArtifacts {
        EmbeddingArtifacts::new(
            "hash-trigram",
            3,
            vec![ArtifactEntry {
                id: "p1".to_string(),
                text_hash: text_digest("red dress"),
                vector: vec![0.0, 0.6, 0.8],
            }],
        )
    }

    #[test]
    fn test_save_load() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let saved = sample();

        let description = store.save("catalog", &saved).unwrap();
        assert_eq!(description.checksum.len(), 64);
        assert!(store.exists("catalog"));

        let loaded = store.load("catalog").unwrap();
        assert_eq!(loaded, saved);

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "catalog");
        assert_eq!(listed[0].checksum, description.checksum);
    }

    #[test]
    fn test_checksum_mismatch() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        store.save("catalog", &sample()).unwrap();
        fs::write(dir.path().join("catalog.emb.json.gz.sha256"), "0000").unwrap();

        assert!(matches!(
            store.load("catalog"),
            Err(ArtifactError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_missing() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        assert!(matches!(store.load("nope"), Err(ArtifactError::NotFound(_))));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_text_digest_stable() {
        assert_eq!(text_digest("a"), text_digest("a"));
        assert_ne!(text_digest("a"), text_digest("b"));
    }
}
