//! fluorin-test-data
//!
//! Small labeled fluorescence splits embedded in the crate for use in testing.
//! The rows are GFP variants with `primary` and `log_fluorescence` columns, the
//! same layout as the full dataset.
//!
//! The test files are represented as `TestFile` objects which package the raw binary data
//! and create temporary files for programs to operate on.
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile, TempDir};

#[derive(Debug)]
/// Test File
///
/// Example usage:
///
/// ```ignore
/// // returns (filepath, _tempfile_handle).
/// // _handle ensures the tempfile remains in scope
/// use fluorin_test_data::TestFile;
/// let (train_csv, _temp) = TestFile::fluorescence_train().create_temp().unwrap();
/// ```
pub struct TestFile {
    filebinary: &'static [u8],
    suffix: &'static str,
}

impl TestFile {
    /// 24 training rows
    pub fn fluorescence_train() -> Self {
        Self {
            filebinary: include_bytes!("../data/fluorescence/train.csv"),
            suffix: "csv",
        }
    }
    /// 8 validation rows
    pub fn fluorescence_valid() -> Self {
        Self {
            filebinary: include_bytes!("../data/fluorescence/valid.csv"),
            suffix: "csv",
        }
    }
    /// 8 test rows
    pub fn fluorescence_test() -> Self {
        Self {
            filebinary: include_bytes!("../data/fluorescence/test.csv"),
            suffix: "csv",
        }
    }

    pub fn create_temp(&self) -> std::io::Result<(String, NamedTempFile)> {
        let temp = Builder::new()
            .suffix(&format!(".{}", self.suffix))
            .tempfile()?;

        fs::write(&temp, self.filebinary)?;
        let path = temp.path().to_string_lossy().into_owned();

        Ok((path, temp))
    }
}

/// The three fluorescence splits written as `train.csv`, `valid.csv` and `test.csv`
/// into one temporary directory.
pub struct FluorescenceSplits {
    dir: TempDir,
}

impl FluorescenceSplits {
    pub fn create_temp() -> std::io::Result<Self> {
        let dir = Builder::new().prefix("fluorescence").tempdir()?;
        for (name, file) in [
            ("train.csv", TestFile::fluorescence_train()),
            ("valid.csv", TestFile::fluorescence_valid()),
            ("test.csv", TestFile::fluorescence_test()),
        ] {
            fs::write(dir.path().join(name), file.filebinary)?;
        }
        Ok(Self { dir })
    }
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
    pub fn train(&self) -> PathBuf {
        self.dir.path().join("train.csv")
    }
    pub fn valid(&self) -> PathBuf {
        self.dir.path().join("valid.csv")
    }
    pub fn test(&self) -> PathBuf {
        self.dir.path().join("test.csv")
    }
}
