//! Writing generated files and detecting drift
//!
//! Every file is written through a temporary file in the destination
//! directory and renamed into place, so a reader never observes a partially
//! written file. A manifest of SHA256 checksums is kept next to the output.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use similar::TextDiff;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::checksum::Checksum;
use crate::codegen::{GeneratedFile, GeneratedOutput};
use crate::error::{Error, Result};

/// Manifest file name, relative to the output directory
pub const MANIFEST_FILE: &str = "tupletree.manifest.json";

// =============================================================================
// Manifest
// =============================================================================

/// Checksums of the files produced by the last `generate`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub files: BTreeMap<String, Checksum>,
}

impl Manifest {
    /// Load the manifest in `dir`, if any
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        match fs::read_to_string(dir.join(MANIFEST_FILE)) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        write_atomic(&dir.join(MANIFEST_FILE), &content)
    }

    pub fn record(&mut self, file: &GeneratedFile) {
        self.files
            .insert(manifest_key(&file.path), Checksum::of_content(&file.content));
    }

    /// Files whose content on disk no longer matches the recorded checksum
    pub fn modified_files(&self, dir: &Path) -> Result<Vec<String>> {
        let mut modified = Vec::new();
        for (path, expected) in &self.files {
            match Checksum::of_file(dir.join(path)) {
                Ok(actual) if actual == *expected => {}
                Ok(_) => modified.push(path.clone()),
                Err(e) if e.kind() == ErrorKind::NotFound => modified.push(path.clone()),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(modified)
    }
}

fn manifest_key(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// =============================================================================
// Writing
// =============================================================================

/// Write `content` to `path` atomically, creating parent directories
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let mut temp = NamedTempFile::new_in(&parent)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Persist {
        path: path.display().to_string(),
        source: e.error,
    })?;

    debug!(path = %path.display(), bytes = content.len(), "written");
    Ok(())
}

/// Write every generated file under `dir`. With `write_manifest`, their
/// checksums are merged into the manifest already in `dir`.
pub fn write_output(dir: &Path, outputs: &[GeneratedOutput], write_manifest: bool) -> Result<Manifest> {
    let mut manifest = Manifest::load(dir)?.unwrap_or_default();

    for file in outputs.iter().flat_map(|o| &o.files) {
        write_atomic(&dir.join(&file.path), &file.content)?;
        manifest.record(file);
    }

    if write_manifest {
        manifest.save(dir)?;
    }

    info!(
        dir = %dir.display(),
        files = outputs.iter().map(|o| o.files.len()).sum::<usize>(),
        "output written"
    );
    Ok(manifest)
}

// =============================================================================
// Drift
// =============================================================================

/// How a file on disk differs from freshly generated content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    Missing,
    /// Unified diff from the file on disk to the generated content
    Changed { diff: String },
}

/// Compare generated files with what is on disk under `dir`. Only drifted
/// files are returned.
pub fn check_output(dir: &Path, outputs: &[GeneratedOutput]) -> Result<Vec<(PathBuf, Drift)>> {
    let mut drifted = Vec::new();

    for file in outputs.iter().flat_map(|o| &o.files) {
        let path = dir.join(&file.path);
        let on_disk = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "missing");
                drifted.push((file.path.clone(), Drift::Missing));
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if on_disk != file.content {
            let label = manifest_key(&file.path);
            let diff = TextDiff::from_lines(&on_disk, &file.content)
                .unified_diff()
                .context_radius(3)
                .header(&format!("a/{label}"), &format!("b/{label}"))
                .to_string();
            warn!(path = %path.display(), "drifted");
            drifted.push((file.path.clone(), Drift::Changed { diff }));
        }
    }

    Ok(drifted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::Language;
    use tempfile::tempdir;

    fn output(path: &str, content: &str) -> GeneratedOutput {
        GeneratedOutput {
            language: Language::Rust,
            files: vec![GeneratedFile {
                path: PathBuf::from(path),
                content: content.to_string(),
            }],
            type_count: 1,
        }
    }

    #[test]
    fn test_write_atomic_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/model.rs");
        write_atomic(&path, "content\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "content\n");

        write_atomic(&path, "replaced\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "replaced\n");
        // No temporary files are left behind
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_output_records_manifest() {
        let dir = tempdir().unwrap();
        let manifest = write_output(dir.path(), &[output("model.rs", "a\n")], true).unwrap();

        assert_eq!(manifest.files["model.rs"], Checksum::of_content("a\n"));
        let loaded = Manifest::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, manifest);
        assert!(loaded.modified_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_manifest_merges_targets() {
        let dir = tempdir().unwrap();
        write_output(dir.path(), &[output("model.rs", "a\n")], true).unwrap();
        let manifest = write_output(dir.path(), &[output("model.py", "b\n")], true).unwrap();

        assert_eq!(manifest.files.len(), 2);
    }

    #[test]
    fn test_manifest_detects_hand_edits() {
        let dir = tempdir().unwrap();
        let manifest = write_output(dir.path(), &[output("model.rs", "a\n")], false).unwrap();
        assert!(Manifest::load(dir.path()).unwrap().is_none());

        fs::write(dir.path().join("model.rs"), "edited\n").unwrap();
        assert_eq!(manifest.modified_files(dir.path()).unwrap(), vec!["model.rs"]);
    }

    #[test]
    fn test_check_output() {
        let dir = tempdir().unwrap();
        let outputs = [output("model.rs", "line one\nline two\n")];
        assert_eq!(
            check_output(dir.path(), &outputs).unwrap(),
            vec![(PathBuf::from("model.rs"), Drift::Missing)]
        );

        write_output(dir.path(), &outputs, false).unwrap();
        assert!(check_output(dir.path(), &outputs).unwrap().is_empty());

        fs::write(dir.path().join("model.rs"), "line one\nline 2\n").unwrap();
        let drifted = check_output(dir.path(), &outputs).unwrap();
        match &drifted[0].1 {
            Drift::Changed { diff } => {
                assert!(diff.contains("--- a/model.rs"));
                assert!(diff.contains("-line 2"));
                assert!(diff.contains("+line two"));
            }
            other => panic!("unexpected drift: {other:?}"),
        }
    }
}
