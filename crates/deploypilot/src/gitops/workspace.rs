//! Local working directory layout.
//!
//! ```text
//! <root>/
//!   checkout/<repo>/   fresh clone, removed once staged
//!   files/             staged (and later decrypted) subtree
//!   files/script.sh    generated deployment wrapper
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{ReconcileError, Result};
use super::progress::ReconcileStage;

const CHECKOUT_DIR: &str = "checkout";
const STAGING_DIR: &str = "files";
pub const SCRIPT_FILE: &str = "script.sh";

/// The data directory every reconciliation works in.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn checkout_dir(&self, repo: &str) -> PathBuf {
        self.root.join(CHECKOUT_DIR).join(repo)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    pub fn script_path(&self) -> PathBuf {
        self.staging_dir().join(SCRIPT_FILE)
    }

    /// Creates the data root and the checkout parent.
    pub fn ensure_root(&self) -> Result<()> {
        let checkout_parent = self.root.join(CHECKOUT_DIR);
        std::fs::create_dir_all(&checkout_parent)
            .map_err(|e| ReconcileError::filesystem(ReconcileStage::Prepare, checkout_parent, e))
    }

    /// Removes everything a previous run left behind.
    pub fn clear(&self, repo: &str) -> Result<()> {
        remove_tree(&self.checkout_dir(repo), ReconcileStage::Prepare)?;
        remove_file(&self.script_path(), ReconcileStage::Prepare)?;
        remove_tree(&self.staging_dir(), ReconcileStage::Prepare)
    }

    pub async fn settle(&self, delay: Duration) {
        if !delay.is_zero() {
            log::debug!("Waiting {}s before checkout", delay.as_secs_f32());
            tokio::time::sleep(delay).await;
        }
    }

    /// Moves `<checkout>/<monitor_path>` into the staging directory.
    ///
    /// An empty `monitor_path` stages the whole checkout.
    pub fn stage(&self, repo: &str, monitor_path: &str) -> Result<PathBuf> {
        let checkout = self.checkout_dir(repo);
        let source = match monitor_path.trim_matches('/') {
            "" => checkout,
            sub => checkout.join(sub),
        };
        let target = self.staging_dir();

        let staging_error = |reason: String| ReconcileError::Staging {
            from: source.clone(),
            to: target.clone(),
            reason,
        };

        match std::fs::metadata(&source) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(staging_error("source is not a directory".to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(staging_error(
                    "path does not exist in the repository".to_string(),
                ))
            }
            Err(e) => return Err(staging_error(e.to_string())),
        }

        std::fs::rename(&source, &target).map_err(|e| staging_error(e.to_string()))?;
        log::debug!("Staged {} at {}", source.display(), target.display());
        Ok(target)
    }

    /// Deletes the clone once its relevant part has been staged.
    pub fn remove_checkout(&self, repo: &str) -> Result<()> {
        remove_tree(&self.checkout_dir(repo), ReconcileStage::Cleanup)
    }
}

fn remove_tree(path: &Path, stage: ReconcileStage) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ReconcileError::filesystem(stage, path, e)),
    }
}

fn remove_file(path: &Path, stage: ReconcileStage) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ReconcileError::filesystem(stage, path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn populated_checkout(ws: &Workspace, repo: &str) {
        let checkout = ws.checkout_dir(repo);
        fs::create_dir_all(checkout.join("deploy/nested")).unwrap();
        fs::write(checkout.join("README.md"), "readme").unwrap();
        fs::write(checkout.join("deploy/app.yaml"), "kind: App").unwrap();
        fs::write(checkout.join("deploy/nested/secret.yaml"), "enc").unwrap();
    }

    #[test]
    fn test_layout() {
        let ws = Workspace::new("/srv/data");
        assert_eq!(ws.checkout_dir("infra"), PathBuf::from("/srv/data/checkout/infra"));
        assert_eq!(ws.staging_dir(), PathBuf::from("/srv/data/files"));
        assert_eq!(ws.script_path(), PathBuf::from("/srv/data/files/script.sh"));
    }

    #[test]
    fn test_checkout_dir_never_collides_with_staging() {
        let ws = Workspace::new("/srv/data");
        assert_ne!(ws.checkout_dir("files"), ws.staging_dir());
    }

    #[test]
    fn test_clear_missing_paths_is_ok() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path().join("data"));
        ws.clear("infra").unwrap();
        ws.ensure_root().unwrap();
        ws.clear("infra").unwrap();
        assert!(ws.root().join("checkout").is_dir());
    }

    #[test]
    fn test_clear_removes_prior_state() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path());
        ws.ensure_root().unwrap();
        populated_checkout(&ws, "infra");
        fs::create_dir_all(ws.staging_dir().join("old")).unwrap();
        fs::write(ws.script_path(), "echo old").unwrap();

        ws.clear("infra").unwrap();

        assert!(!ws.checkout_dir("infra").exists());
        assert!(!ws.staging_dir().exists());
    }

    #[test]
    fn test_stage_subpath() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path());
        ws.ensure_root().unwrap();
        populated_checkout(&ws, "infra");

        let staged = ws.stage("infra", "deploy").unwrap();

        assert_eq!(staged, ws.staging_dir());
        assert!(staged.join("app.yaml").is_file());
        assert!(staged.join("nested/secret.yaml").is_file());
        assert!(!staged.join("README.md").exists());
    }

    #[test]
    fn test_stage_whole_repository() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path());
        ws.ensure_root().unwrap();
        populated_checkout(&ws, "infra");

        ws.stage("infra", "").unwrap();

        assert!(ws.staging_dir().join("README.md").is_file());
        assert!(!ws.checkout_dir("infra").exists());
        ws.remove_checkout("infra").unwrap();
    }

    #[test]
    fn test_stage_missing_subpath() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path());
        ws.ensure_root().unwrap();
        populated_checkout(&ws, "infra");

        let err = ws.stage("infra", "does/not/exist").unwrap_err();
        assert!(matches!(err, ReconcileError::Staging { .. }));
        assert_eq!(err.stage(), ReconcileStage::Stage);
    }

    #[test]
    fn test_stage_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path());
        ws.ensure_root().unwrap();
        populated_checkout(&ws, "infra");

        let err = ws.stage("infra", "README.md").unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
