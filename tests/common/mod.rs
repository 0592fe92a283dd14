#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use churn_segments::segments::RawRecord;
use tempfile::{TempDir, tempdir};

pub const FIXTURE: &str = "churn_results.csv";

pub const HEADER: &str = "CustomerID;Country;TotalPrice;UnitPrice;Quantity;Recency;Churn;Predicted_Churn";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

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
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }
}

/// Builds a semicolon-delimited export from data lines.
pub fn export_with_rows(rows: &[&str]) -> String {
    let mut contents = String::from(HEADER);
    contents.push('\n');
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    contents
}

pub fn raw(
    customer_id: i64,
    country: &str,
    total_price: f64,
    quantity: f64,
    recency: f64,
    churn: bool,
    predicted_churn: bool,
) -> RawRecord {
    RawRecord {
        customer_id,
        country: country.to_string(),
        total_price: Some(total_price),
        unit_price: Some(1.0),
        quantity: Some(quantity),
        recency: Some(recency),
        churn,
        predicted_churn,
    }
}
