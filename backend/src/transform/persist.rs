//! Write converted metadata objects to disk, one JSON file per object.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::MetadataObject;

/// A file that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistFailure {
    pub index: usize,
    pub path: PathBuf,
    pub message: String,
}

/// Result of [`save_objects`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistSummary {
    pub written: usize,
    pub failures: Vec<PersistFailure>,
}

/// File name of the object at `index`: `1.json`, `2.json`, ...
pub fn file_name(index: usize) -> String {
    format!("{}.json", index + 1)
}

/// Write every object under `destination` as `<n>.json`.
///
/// A failed write is recorded and the remaining objects are still written.
pub fn save_objects(objects: &[MetadataObject], destination: &Path) -> PersistSummary {
    let mut summary = PersistSummary::default();

    if let Err(e) = fs::create_dir_all(destination) {
        tracing::warn!(
            destination = %destination.display(),
            error = %e,
            "cannot create output directory"
        );
    }

    for (index, object) in objects.iter().enumerate() {
        let path = destination.join(file_name(index));
        let written = serde_json::to_string_pretty(object)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(&path, json).map_err(|e| e.to_string()));

        match written {
            Ok(()) => summary.written += 1,
            Err(message) => summary.failures.push(PersistFailure {
                index,
                path,
                message,
            }),
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_file_per_object() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("out");
        let objects = vec![
            MetadataObject::new("a", "ipfs://a.png", "image/png"),
            MetadataObject::new("b", "ipfs://b.png", "image/png"),
        ];

        let summary = save_objects(&objects, &destination);
        assert_eq!(summary.written, 2);
        assert!(summary.failures.is_empty());

        let saved: MetadataObject =
            serde_json::from_str(&fs::read_to_string(destination.join("2.json")).unwrap()).unwrap();
        assert_eq!(saved, objects[1]);
    }

    #[test]
    fn test_failed_write_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the first file name makes that write fail.
        fs::create_dir(dir.path().join("1.json")).unwrap();

        let objects = vec![
            MetadataObject::new("a", "ipfs://a.png", "image/png"),
            MetadataObject::new("b", "ipfs://b.png", "image/png"),
            MetadataObject::new("c", "ipfs://c.png", "image/png"),
        ];
        let summary = save_objects(&objects, dir.path());

        assert_eq!(summary.written, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].index, 0);
        assert!(dir.path().join("3.json").is_file());
    }
}
