#![cfg(all(unix, feature = "cli"))]

use std::process::{Command, Output};

fn dime(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dime"))
        .env_remove("DIME_ADDRESS")
        .args(["--log-level", "off"])
        .args(args)
        .output()
        .expect("dime should run")
}

#[test]
fn version_prints_package_version() {
    let output = dime(&["version", "--extended"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with(&format!("dime {}", env!("CARGO_PKG_VERSION"))));
    assert!(stdout.contains("serialization: dimeb"));
}

#[test]
fn unsupported_protocol_is_a_usage_error() {
    let output = dime(&["--address", "udp://127.0.0.1:1", "devices"]);

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid address"));
}

#[test]
fn missing_socket_fails_to_connect() {
    let path = format!("/tmp/dime-cli-missing-{}.sock", std::process::id());
    let output = dime(&["--address", &format!("ipc://{path}"), "sync"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("connect failed"));
}

#[test]
fn malformed_assignment_is_rejected_before_connecting() {
    let path = format!("/tmp/dime-cli-unused-{}.sock", std::process::id());
    let output = dime(&["--address", &format!("ipc://{path}"), "send", "g", "x=nope"]);

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not valid JSON"));
}
