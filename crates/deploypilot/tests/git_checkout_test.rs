//! `GitCheckout` against a real repository served over `file://`.

mod common;

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use secrecy::SecretString;
use tempfile::TempDir;

use common::TestHarness;
use deploypilot::{Checkout, GitCheckout, ReconcileError};

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args([
            "-c",
            "user.name=Deploy Bot",
            "-c",
            "user.email=bot@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {:?} failed", args);
}

/// Creates `<root>/acme/infra.git` (bare) with one commit.
fn create_remote(root: &Path, files: &[(&str, &str)]) {
    let work = root.join("work");
    std::fs::create_dir_all(&work).unwrap();
    git(&work, &["init", "--quiet"]);
    for (path, content) in files {
        let target = work.join(path);
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(target, content).unwrap();
    }
    git(&work, &["add", "."]);
    git(&work, &["commit", "--quiet", "-m", "initial"]);

    let owner = root.join("acme");
    std::fs::create_dir_all(&owner).unwrap();
    git(
        &owner,
        &["clone", "--quiet", "--bare", work.to_str().unwrap(), "infra.git"],
    );
}

fn file_base(root: &Path) -> String {
    format!("file://{}", root.display())
}

#[tokio::test]
async fn test_clone_from_local_remote() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let remote = TempDir::new().unwrap();
    create_remote(remote.path(), &[("deploy/app.yaml", "replicas: 2")]);

    let dest_root = TempDir::new().unwrap();
    let dest = dest_root.path().join("infra");
    let checkout = GitCheckout::new(Some(SecretString::from("ghp_unused".to_string())))
        .with_base_url(file_base(remote.path()));

    checkout.checkout("acme", "infra", &dest).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(dest.join("deploy/app.yaml")).unwrap(),
        "replicas: 2"
    );
    assert!(dest.join(".git").is_dir());
}

#[tokio::test]
async fn test_clone_of_unknown_repository_fails_with_output() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let remote = TempDir::new().unwrap();
    let dest_root = TempDir::new().unwrap();
    let checkout = GitCheckout::new(None).with_base_url(file_base(remote.path()));

    let err = checkout
        .checkout("acme", "missing", &dest_root.path().join("missing"))
        .await
        .unwrap_err();

    match err {
        ReconcileError::Checkout { output } => {
            assert!(output.contains("missing.git"), "unexpected output: {}", output)
        }
        other => panic!("expected checkout error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_reconcile_with_real_git() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let harness = TestHarness::new();
    let remote = harness.temp_path().join("remote");
    std::fs::create_dir_all(&remote).unwrap();
    create_remote(
        &remote,
        &[
            ("README.md", "# infra"),
            ("deploy/app.yaml", "replicas: 2"),
            ("deploy/db.yaml", "ENC[password: hunter2"),
        ],
    );

    let checkout = GitCheckout::new(None).with_base_url(file_base(&remote));
    let reconciler = harness.reconciler(Arc::new(checkout));

    let report = reconciler
        .reconcile(&harness.context("deploy", "cat db.yaml"))
        .await
        .unwrap();

    assert_eq!(report.output.trim(), "password: hunter2");
    assert!(!harness.workspace().checkout_dir("infra").exists());
}
