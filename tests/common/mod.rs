#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Two contracts on consecutive days, headers in the built-in French aliases.
pub const SCENARIO_CSV: &str = "\
Date,CA,Marge,Produit,Part,Client
05/01/2024,100,10,X,0.5,D1
06/01/2024,200,20,Y,0.5,D2
";

/// Same layout as [`SCENARIO_CSV`] but with no distributor column.
pub const MISSING_DISTRIBUTOR_CSV: &str = "\
Date,CA,Marge,Produit,Part
05/01/2024,100,10,X,0.5
";

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

    pub fn scenario(&self) -> PathBuf {
        self.write("sales.csv", SCENARIO_CSV)
    }
}

/// `rows` synthetic contracts spread over `months` consecutive months,
/// cycling through three products and two distributors.
pub fn synthetic_csv(rows: usize, months: u32) -> String {
    let mut csv = String::from("date,prime total ttc,marge,produit,part assureur,distributeur\n");
    let products = ["Auto", "Habitation", "Voyage"];
    let distributors = ["Agence Tunis", "Agence Sfax"];
    for idx in 0..rows {
        let month = (idx as u32 % months.max(1)) + 1;
        let day = (idx % 27) + 1;
        let revenue = 100.0 + (idx % 13) as f64 * 7.5;
        csv.push_str(&format!(
            "{day:02}/{month:02}/2023,{revenue},{},{},0.4,{}\n",
            revenue / 5.0,
            products[idx % products.len()],
            distributors[idx % distributors.len()]
        ));
    }
    csv
}
