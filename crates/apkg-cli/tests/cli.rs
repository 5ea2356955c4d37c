//! Smoke tests against the built `apkg` binary.

use std::process::{Command, Output};

use apkg_core::{Installed, Layout, LedgerStore};
use apkg_schema::{PackageName, Version};

fn apkg(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_apkg"))
        .args(args)
        .env_remove("APKG_HOME")
        .env_remove("APKG_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    let out = apkg(&["--help"]);
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    for sub in ["add", "remove", "reinstall", "regen-indexes", "list-installed"] {
        assert!(text.contains(sub), "missing {sub} in:\n{text}");
    }
}

#[test]
fn test_list_installed_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let state = tmp.path().to_str().unwrap();

    let out = apkg(&["--state-dir", state, "list-installed"]);

    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("No packages installed."));
}

#[test]
fn test_list_installed_shows_ledger() {
    let tmp = tempfile::tempdir().unwrap();
    let mut installed = Installed::new();
    installed.insert(PackageName::new("busybox"), Version::new("1.36.1-r29"));
    installed.insert(PackageName::new("musl"), Version::new("1.2.5-r0"));
    LedgerStore::new(Layout::new(tmp.path()))
        .save(&installed)
        .unwrap();

    let out = apkg(&["--state-dir", tmp.path().to_str().unwrap(), "list-installed"]);

    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("busybox"));
    assert!(text.contains("1.36.1-r29"));
    assert!(text.contains("musl"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("absent.toml");

    let out = apkg(&[
        "--config",
        config.to_str().unwrap(),
        "--state-dir",
        tmp.path().to_str().unwrap(),
    ]);

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("absent.toml"));
}

#[test]
fn test_remove_alias() {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("absent.toml");

    let out = apkg(&["--config", config.to_str().unwrap(), "del", "foo"]);

    // Parses as `remove`, then fails on the missing config.
    assert!(!out.status.success());
    assert!(!String::from_utf8_lossy(&out.stderr).contains("unrecognized subcommand"));
}
