//! Permission capture, deferred restore, and bulk tracking.

#![cfg(unix)]

use std::fs::{self, Permissions};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use assert_fs::prelude::*;
use safewrite::{PermTracker, WriteContext};

fn mode_of(path: &Path) -> u32 {
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}

fn chmod(path: &Path, mode: u32) {
    fs::set_permissions(path, Permissions::from_mode(mode)).unwrap();
}

#[test]
fn restore_applies_the_open_time_bits_and_is_idempotent() {
    let tmp = assert_fs::TempDir::new().unwrap();
    tmp.child("conf.toml").write_str("old").unwrap();
    let target = tmp.path().join("conf.toml");
    chmod(&target, 0o644);

    let mut ctx = WriteContext::new();
    let mut h = ctx.open(&target, |_| true).unwrap();
    h.write_all(b"new").unwrap();
    let receipt = ctx.finalize(h).unwrap();

    // The replaced file carries the temp file's default creation bits,
    // whatever those are, until restore runs.
    receipt.restore_permissions().unwrap();
    assert_eq!(mode_of(&target), 0o644);

    receipt.restore_permissions().unwrap();
    assert_eq!(mode_of(&target), 0o644);
}

#[test]
fn read_only_targets_are_reported_to_the_prompt() {
    let tmp = assert_fs::TempDir::new().unwrap();
    tmp.child("locked.txt").write_str("old").unwrap();
    let target = tmp.path().join("locked.txt");
    chmod(&target, 0o444);

    let mut ctx = WriteContext::new();
    let err = ctx
        .open(&target, |info| {
            assert!(info.read_only());
            false
        })
        .unwrap_err();
    assert!(matches!(err, safewrite::OpenError::OverwriteRejected));
    assert_eq!(mode_of(&target), 0o444);
}

#[test]
fn read_only_target_can_be_saved_twice_before_restore() {
    // Restoring bits inside finalize would make the second save of a
    // read-only target fail; deferring restore keeps it working.
    let tmp = assert_fs::TempDir::new().unwrap();
    tmp.child("locked.txt").write_str("old").unwrap();
    let target = tmp.path().join("locked.txt");
    chmod(&target, 0o444);

    let mut ctx = WriteContext::new();
    let mut tracker = PermTracker::new();

    for body in [b"new".as_slice(), b"newer".as_slice()] {
        let mut h = ctx.open(&target, |_| true).unwrap();
        h.write_all(body).unwrap();
        tracker.track(ctx.finalize(h).unwrap());
    }

    assert_eq!(fs::read(&target).unwrap(), b"newer");
    assert_eq!(fs::read(tmp.path().join("locked.txt~")).unwrap(), b"old");

    tracker.restore_all().unwrap();
    assert_eq!(mode_of(&target), 0o444);
}

#[test]
fn tracker_restores_multiple_targets() {
    let tmp = assert_fs::TempDir::new().unwrap();
    tmp.child("a.txt").write_str("a0").unwrap();
    tmp.child("b.txt").write_str("b0").unwrap();
    let a = tmp.path().join("a.txt");
    let b = tmp.path().join("b.txt");
    chmod(&a, 0o640);
    chmod(&b, 0o600);

    let mut ctx = WriteContext::new();
    let mut tracker = PermTracker::new();
    for (path, body) in [(&a, b"a1".as_slice()), (&b, b"b1".as_slice())] {
        let mut h = ctx.open(path, |_| true).unwrap();
        h.write_all(body).unwrap();
        tracker.track(ctx.finalize(h).unwrap());
    }
    assert_eq!(tracker.len(), 2);

    tracker.restore_all().unwrap();
    assert!(tracker.is_empty());
    assert_eq!(mode_of(&a), 0o640);
    assert_eq!(mode_of(&b), 0o600);
}
