//! End-to-end tests driving the `crc` binary the way a user would.

use std::process::Command;

fn crc_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_crc"))
}

#[test]
fn computes_crc32_for_the_check_string() {
    let output = crc_cmd()
        .args(["--model", "CRC-32", "--check-string", "123456789"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "0xcbf43926");
}

#[test]
fn model_flags_can_be_overridden_individually() {
    let output = crc_cmd()
        .args([
            "--model",
            "CRC-32",
            "--xor-out",
            "0x0",
            "--check-string",
            "123456789",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_ne!(String::from_utf8_lossy(&output.stdout).trim(), "0xcbf43926");
}

#[test]
fn unknown_model_is_a_nonzero_exit() {
    let output = crc_cmd()
        .args(["--model", "NOT-A-MODEL", "--check-string", "x"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn generate_h_prints_to_stdout_by_default() {
    let output = crc_cmd()
        .args(["--model", "CRC-16/ARC", "--generate", "h"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("#ifndef"));
}

#[test]
fn missing_parameters_in_compute_mode_fail_without_a_model() {
    let output = crc_cmd()
        .args(["--check-string", "123456789"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
