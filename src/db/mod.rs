//! File-backed persistence for availability snapshots, season records and
//! movies.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod movies;
pub mod seasons;
pub mod snapshots;

pub use movies::{JsonMovieRepository, MemoryMovieRepository, MovieRepository};
pub use seasons::{JsonSeasonRepository, MemorySeasonRepository, SeasonRepository};
pub use snapshots::{JsonSnapshotStore, SnapshotStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt data in {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Writes `content` next to `path` and renames it into place, so readers see
/// either the old file or the new one.
pub(crate) async fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    tokio::fs::write(&temp, content)
        .await
        .map_err(|e| StoreError::io(&temp, e))?;

    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(StoreError::io(path, e));
    }

    Ok(())
}

/// Maps an arbitrary key to a file name that is valid on every platform.
pub(crate) fn file_stem(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_replaces_reserved_characters() {
        assert_eq!(file_stem("LINE TV-drama"), "LINE TV-drama");
        assert_eq!(file_stem("a/b:c"), "a_b_c");
        assert_eq!(file_stem("friDay影音-movie"), "friDay影音-movie");
    }

    #[tokio::test]
    async fn write_atomic_replaces_content() {
        let dir = std::env::temp_dir().join(format!("dramawatch-store-{}", uuid::Uuid::new_v4()));
        let path = dir.join("x.json");

        write_atomic(&path, b"one").await.unwrap();
        write_atomic(&path, b"two").await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"two");

        let leftovers = std::fs::read_dir(&dir).unwrap().count();
        assert_eq!(leftovers, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
