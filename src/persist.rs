use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::PipelineError;

/// Reads a JSON store file. A missing file is `Ok(None)`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PipelineError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PipelineError::store_io(path, e)),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| PipelineError::StoreFormat {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes `value` as pretty JSON next to `path`, then renames it into place.
///
/// Readers either see the previous file or the new one, never a torn write.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| PipelineError::StoreFormat {
        path: path.to_path_buf(),
        source,
    })?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| PipelineError::store_io(dir, e))?;

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| PipelineError::store_io(dir, e))?;
    temp.write_all(&json)
        .and_then(|_| temp.flush())
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| PipelineError::store_io(temp.path(), e))?;

    temp.persist(path)
        .map_err(|e| PipelineError::store_io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        value: u32,
    }

    #[test]
    fn test_missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let read: Option<Sample> = read_json(&dir.path().join("absent.json")).unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn test_write_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        write_json_atomic(&path, &Sample { value: 1 }).unwrap();
        write_json_atomic(&path, &Sample { value: 2 }).unwrap();

        let read: Option<Sample> = read_json(&path).unwrap();
        assert_eq!(read, Some(Sample { value: 2 }));

        // no temp files left behind
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_corrupt_file_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = read_json::<Sample>(&path).unwrap_err();
        assert!(matches!(err, PipelineError::StoreFormat { .. }));
        assert!(err.is_store_error());
    }
}
