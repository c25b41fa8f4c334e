//! Tests for process execution and timeout enforcement.

#![cfg(unix)]

use std::time::{Duration, Instant};

use openclaw_bridge::bridge::{BridgeError, CommandRunner, ProcessRunner};

use super::support::{process_exists, sh};

#[tokio::test]
async fn silent_success_is_empty_output() {
    let err = ProcessRunner
        .run("test", &sh("exit 0"), Duration::from_secs(5))
        .await
        .unwrap_err();

    match err {
        BridgeError::EmptyOutput { detail, .. } => assert_eq!(detail, "empty output"),
        other => panic!("Expected EmptyOutput, got {other:?}"),
    }
}

#[tokio::test]
async fn stderr_becomes_detail() {
    let err = ProcessRunner
        .run("test", &sh("echo '  token rejected  ' >&2; exit 3"), Duration::from_secs(5))
        .await
        .unwrap_err();

    match err {
        BridgeError::EmptyOutput { command, detail } => {
            assert_eq!(command, "test");
            assert_eq!(detail, "token rejected");
        }
        other => panic!("Expected EmptyOutput, got {other:?}"),
    }
}

#[tokio::test]
async fn nonzero_exit_with_stdout_is_ok() {
    let out = ProcessRunner
        .run("test", &sh("echo '[1,2]'; exit 4"), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(out, "[1,2]");
}

#[tokio::test]
async fn large_output_does_not_deadlock() {
    let out = ProcessRunner
        .run(
            "test",
            &sh("i=0; while [ $i -lt 20000 ]; do echo 0123456789; echo x >&2; i=$((i+1)); done"),
            Duration::from_secs(30),
        )
        .await
        .unwrap();
    assert_eq!(out.lines().count(), 20000);
}

#[tokio::test]
async fn timeout_kills_and_reaps_child() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("pid");
    let script = format!("echo $$ > {}; exec sleep 30", pid_file.display());

    let started = Instant::now();
    let err = ProcessRunner
        .run("test", &sh(&script), Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(10));

    let pid: i32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert!(!process_exists(pid), "child {pid} outlived the timeout");
}
