//! JSON snapshots of a `Graph`, nested subgraphs included.

use super::dag::Graph;
use crate::validation::{ValidationError, Validator};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed graph snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not persist snapshot: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("Snapshot violates graph invariants ({} error(s))", .0.len())]
    Invalid(Vec<ValidationError>),
}

/// Writes the snapshot to a temporary file beside `path`, then renames it into
/// place so readers never observe a half-written file.
pub fn save_json(graph: &Graph, path: &Path) -> Result<(), PersistError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, graph)?;
        writer.flush()?;
    }
    tmp.persist(path)?;
    Ok(())
}

pub fn load_json(path: &Path) -> Result<Graph, PersistError> {
    let reader = BufReader::new(File::open(path)?);
    let mut graph: Graph = serde_json::from_reader(reader)?;
    graph.rebuild_name_caches();
    Validator::new(&graph).validate().map_err(PersistError::Invalid)?;
    Ok(graph)
}
