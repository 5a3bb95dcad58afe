// src/report.rs

use crate::aggregator::Artifacts;
use crate::error::{Error, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct FilesWithNoTests<'a> {
    files: &'a [String],
}

fn save_json<T: Serialize + ?Sized>(value: &T, dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    let file = File::create(&path).map_err(|source| Error::Io {
        path: path.clone(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush().map_err(|source| Error::Io {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), "saved");
    Ok(path)
}

/// Writes the run's JSON documents into `dir`, each prefixed with
/// `timestamp` (Unix seconds). Per-file documents only exist in precise mode.
pub fn save(artifacts: &Artifacts, dir: &Path, timestamp: i64) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|source| Error::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = vec![save_json(
        &artifacts.per_changeset,
        dir,
        &format!("{timestamp}_tests_scheduled_per_changeset.json"),
    )?];
    if let Some(per_file) = &artifacts.per_file {
        written.push(save_json(
            per_file,
            dir,
            &format!("{timestamp}_tests_scheduled_per_file.json"),
        )?);
    }
    if let Some(files) = &artifacts.files_with_no_tests {
        written.push(save_json(
            &FilesWithNoTests { files },
            dir,
            &format!("{timestamp}_files_with_no_tests.json"),
        )?);
    }
    Ok(written)
}
