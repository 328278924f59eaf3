#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use ch_ingest::{
    dataset::{Column, Dataset, Dtype},
    value::{Value, parse_naive_datetime},
};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// `(id, created, active, name)` rows; `created` runs one day per row from
/// `first_day` (`YYYY-MM-DD`).
pub fn events_dataset(rows: usize, first_day: &str) -> Dataset {
    let start = parse_naive_datetime(&format!("{first_day} 00:00:00")).expect("start date");
    let mut ids = Vec::with_capacity(rows);
    let mut created = Vec::with_capacity(rows);
    let mut active = Vec::with_capacity(rows);
    let mut names = Vec::with_capacity(rows);
    for idx in 0..rows {
        ids.push(Some(Value::Integer(idx as i64 + 1)));
        created.push(Some(Value::DateTime(
            start + chrono::Duration::days(idx as i64),
        )));
        active.push(Some(Value::Boolean(idx % 2 == 0)));
        names.push(Some(Value::String(format!("event-{idx}"))));
    }
    Dataset::new(vec![
        Column::new("id", Dtype::Int64, ids),
        Column::new("created", Dtype::datetime(), created),
        Column::new("active", Dtype::Bool, active),
        Column::new("name", Dtype::Object, names),
    ])
    .expect("events dataset")
}
