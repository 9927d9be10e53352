//! Integration tests for the scopedump CLI.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use scope_core as _;

fn binary_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.join("scopedump")
}

fn create_temp_file(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

// Jump of 5, then a trigger-marked sample and a plain sample.
const COMPRESSED_CAPTURE: &str = "\
# compressed capture, three words
0x80000005
0x40000041
0x00000042
";

#[test]
fn status_command_decodes_every_field() {
    let output = Command::new(binary_path())
        .args(["status", "0x60300002"])
        .output()
        .expect("failed to run scopedump");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("STOPPED:\tYes"));
    assert!(stdout.contains("TRIGGERED:\tYes"));
    assert!(stdout.contains("PRIMED:\tNo"));
    assert!(stdout.contains("LENGTH:\t\t8 words"));
    assert!(stdout.contains("HOLDOFF:\t2"));
    assert!(stdout.contains("TRIGGER:\tsample 5"));
}

#[test]
fn status_command_reports_absent_instruments() {
    let output = Command::new(binary_path())
        .args(["status", "0x60000000"])
        .output()
        .expect("failed to run scopedump");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No instrument present"));
}

#[test]
fn print_command_lists_a_compressed_capture() {
    let temp_dir = tempfile::tempdir().unwrap();
    let capture = create_temp_file(temp_dir.path(), "capture.hex", COMPRESSED_CAPTURE);

    let output = Command::new(binary_path())
        .args(["print", capture.to_str().unwrap(), "--compressed"])
        .output()
        .expect("failed to run scopedump");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(" ** (+5)"));
    assert!(stdout.contains("40000041"));
    assert!(stdout.contains("00000042"));
}

#[test]
fn vcd_command_writes_a_document_with_declared_traces() {
    let temp_dir = tempfile::tempdir().unwrap();
    let capture = create_temp_file(temp_dir.path(), "capture.hex", COMPRESSED_CAPTURE);
    let output_path = temp_dir.path().join("capture.vcd");

    let status = Command::new(binary_path())
        .args([
            "vcd",
            capture.to_str().unwrap(),
            "-z",
            "-t",
            "flag:1:6",
            "-t",
            "low:4:0",
            "-o",
            output_path.to_str().unwrap(),
        ])
        .status()
        .expect("failed to run scopedump");

    assert!(status.success());
    let document = fs::read_to_string(&output_path).unwrap();
    assert!(document.contains("$timescale 1ns $end"));
    assert!(document.contains("$var wire  1 va flag $end"));
    assert!(document.contains("$var wire  4 vb low [3:0] $end"));
    // Trigger-marked sample at dense address 5, 100 MHz default clock.
    assert!(document.contains("$timezero -50 $end"));
    assert!(document.contains("#50\n"));
    assert!(document.contains("#60\n"));
}

#[test]
fn vcd_command_defaults_the_output_path() {
    let temp_dir = tempfile::tempdir().unwrap();
    let capture = create_temp_file(temp_dir.path(), "capture.hex", "0\n1\n2\n3\n");
    let expected = temp_dir.path().join("capture.vcd");

    let status = Command::new(binary_path())
        .args(["vcd", capture.to_str().unwrap()])
        .status()
        .expect("failed to run scopedump");

    assert!(status.success());
    assert!(expected.exists());
}

#[test]
fn malformed_captures_are_reported_as_errors() {
    let temp_dir = tempfile::tempdir().unwrap();
    let capture = create_temp_file(temp_dir.path(), "bad.hex", "0x41\n0x80000001\n");

    let output = Command::new(binary_path())
        .args(["print", capture.to_str().unwrap(), "--compressed"])
        .output()
        .expect("failed to run scopedump");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"));
    assert!(stderr.contains("token"));
}

#[test]
fn unknown_commands_print_usage() {
    let output = Command::new(binary_path())
        .args(["frobnicate"])
        .output()
        .expect("failed to run scopedump");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"));
    assert!(stderr.contains("Usage: scopedump"));
}
