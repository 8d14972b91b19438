// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn unit_file_runs_foreground_from_binary_directory() {
    let contents = unit_file_contents(Path::new("/opt/relayd/bin/relayd"));
    assert!(contents.contains("Description=Relay Event Daemon"));
    assert!(contents.contains("WorkingDirectory=/opt/relayd/bin"));
    assert!(contents.contains("ExecStart=/opt/relayd/bin/relayd foreground"));
    assert!(contents.contains("EnvironmentFile=/etc/environment"));
    assert!(contents.contains("Type=simple"));
    assert!(contents.contains("WantedBy=multi-user.target"));
}

#[test]
fn write_creates_unit_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relayd.service");
    let exe = Path::new("/usr/local/bin/relayd");

    assert!(write_service_file_at(&path, exe).unwrap());
    let first = std::fs::read_to_string(&path).unwrap();

    // A second install leaves the existing unit alone.
    assert!(!write_service_file_at(&path, exe).unwrap());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
}

#[test]
fn unit_path_is_under_systemd() {
    assert_eq!(
        unit_file_path("relayd"),
        Path::new("/etc/systemd/system/relayd.service")
    );
}
