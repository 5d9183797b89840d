//! Master image management for bitmap verification.

use crate::bitmap::{Bitmap, ComparisonCriteria, ComparisonResult};
use crate::ci::should_update_masters;
use crate::{TestError, TestResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A directory of master PNGs that samples are compared against.
///
/// For a master `name` the directory holds `name.png`; a failed comparison
/// also leaves `name.actual.png` and `name.diff.png` next to it.
#[derive(Debug, Clone)]
pub struct MasterImages {
    base_path: PathBuf,
    update: bool,
}

impl MasterImages {
    /// Masters under `base_path`; updating follows the `UPDATE_MASTERS` variable.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            update: should_update_masters(),
        }
    }

    /// Force update mode on or off.
    pub fn with_update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn is_updating(&self) -> bool {
        self.update
    }

    pub fn master_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{}.png", name))
    }

    fn actual_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{}.actual.png", name))
    }

    fn diff_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{}.diff.png", name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.master_path(name).exists()
    }

    /// Load a master.
    pub fn load(&self, name: &str) -> TestResult<Bitmap> {
        let path = self.master_path(name);
        if !path.exists() {
            return Err(TestError::MasterNotFound(path.display().to_string()));
        }
        Bitmap::load_png(path)
    }

    /// Store `bitmap` as the master for `name`.
    pub fn save(&self, name: &str, bitmap: &Bitmap) -> TestResult<PathBuf> {
        let path = self.master_path(name);
        bitmap.save_png(&path)?;
        Ok(path)
    }

    /// Compare `sample` with the master for `name`.
    ///
    /// In update mode the sample becomes the new master. Otherwise a
    /// missing master is [`TestError::MasterNotFound`] and a comparison
    /// outside `criteria` is [`TestError::VerificationFailed`], with the
    /// actual and difference images written beside the master.
    pub fn assert_matches(
        &self,
        name: &str,
        sample: &Bitmap,
        criteria: &ComparisonCriteria,
    ) -> TestResult<ComparisonResult> {
        if self.update {
            let path = self.save(name, sample)?;
            tracing::info!(master = %path.display(), "master image updated");
            return Ok(sample.compare(sample, criteria));
        }

        let master = self.load(name)?;
        let result = master.compare(sample, criteria);

        if result.criteria_met {
            self.remove_if_exists(&self.actual_path(name))?;
            self.remove_if_exists(&self.diff_path(name))?;
            return Ok(result);
        }

        sample.save_png(self.actual_path(name))?;
        if let Some(diff) = &result.difference {
            diff.save_png(self.diff_path(name))?;
        }
        Err(TestError::VerificationFailed(format!(
            "Bitmap '{}' does not match its master: {}",
            name,
            result.describe()
        )))
    }

    /// Names of all masters in the directory.
    pub fn list_masters(&self) -> TestResult<Vec<String>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !stem.ends_with(".actual") && !stem.ends_with(".diff") {
                    names.push(stem.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    /// Report which expected masters are missing and which are unused.
    pub fn verify_coverage(&self, expected: &HashSet<String>) -> TestResult<CoverageReport> {
        let existing: HashSet<String> = self.list_masters()?.into_iter().collect();

        let mut missing: Vec<String> = expected.difference(&existing).cloned().collect();
        let mut extra: Vec<String> = existing.difference(expected).cloned().collect();
        missing.sort();
        extra.sort();

        Ok(CoverageReport { missing, extra })
    }

    fn remove_if_exists(&self, path: &Path) -> TestResult<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Missing and unused masters.
#[derive(Debug, Clone, Default)]
pub struct CoverageReport {
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    const GREY: Rgba<u8> = Rgba([128, 128, 128, 255]);

    fn masters(dir: &TempDir) -> MasterImages {
        MasterImages::new(dir.path()).with_update(false)
    }

    #[test]
    fn test_missing_master() {
        let dir = TempDir::new().unwrap();
        let result = masters(&dir).assert_matches("nope", &Bitmap::new(2, 2, GREY), &ComparisonCriteria::exact());
        assert!(matches!(result, Err(TestError::MasterNotFound(_))));
    }

    #[test]
    fn test_update_then_match() {
        let dir = TempDir::new().unwrap();
        let sample = Bitmap::new(4, 4, GREY);

        MasterImages::new(dir.path())
            .with_update(true)
            .assert_matches("box", &sample, &ComparisonCriteria::exact())
            .unwrap();
        assert!(dir.path().join("box.png").exists());

        let result = masters(&dir)
            .assert_matches("box", &sample, &ComparisonCriteria::exact())
            .unwrap();
        assert!(result.criteria_met);
    }

    #[test]
    fn test_mismatch_writes_artifacts() {
        let dir = TempDir::new().unwrap();
        let m = masters(&dir);
        m.save("box", &Bitmap::new(4, 4, GREY)).unwrap();

        let mut sample = Bitmap::new(4, 4, GREY);
        sample.set_pixel(0, 0, Rgba([0, 0, 0, 255]));

        let err = m
            .assert_matches("box", &sample, &ComparisonCriteria::exact())
            .unwrap_err();
        assert!(matches!(err, TestError::VerificationFailed(_)));
        assert!(dir.path().join("box.actual.png").exists());
        assert!(dir.path().join("box.diff.png").exists());

        // Within tolerance the stale artifacts are cleared.
        m.assert_matches("box", &sample, &ComparisonCriteria::new(0.1, 0.0))
            .unwrap();
        assert!(!dir.path().join("box.actual.png").exists());
    }

    #[test]
    fn test_list_and_coverage() {
        let dir = TempDir::new().unwrap();
        let m = masters(&dir);
        m.save("a", &Bitmap::new(1, 1, GREY)).unwrap();
        m.save("b", &Bitmap::new(1, 1, GREY)).unwrap();
        Bitmap::new(1, 1, GREY)
            .save_png(dir.path().join("b.diff.png"))
            .unwrap();

        assert_eq!(m.list_masters().unwrap(), vec!["a", "b"]);

        let expected: HashSet<String> = ["a", "c"].iter().map(|s| s.to_string()).collect();
        let report = m.verify_coverage(&expected).unwrap();
        assert_eq!(report.missing, vec!["c"]);
        assert_eq!(report.extra, vec!["b"]);
        assert!(!report.is_complete());
    }
}
