//! Integration tests for the command-line interface

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use indoc::indoc;
use similar::TextDiff;

fn binary_path() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("target");
    path.push("debug");
    path.push("edyaml");
    path
}

fn run_edyaml(args: &[&str], stdin_data: &str) -> (String, String, Option<i32>) {
    let binary = binary_path();

    let mut child = Command::new(&binary)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn edyaml");

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(stdin_data.as_bytes())
            .expect("Failed to write to stdin");
    }

    let output = child.wait_with_output().expect("Failed to wait on child");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code(),
    )
}

fn assert_output_eq(actual: &str, expected: &str) {
    if actual != expected {
        let diff = TextDiff::from_lines(expected, actual);
        eprintln!();
        for line in diff
            .unified_diff()
            .header("expected", "actual")
            .to_string()
            .lines()
        {
            if line.starts_with('-') {
                eprintln!("\x1b[31m{}\x1b[0m", line);
            } else if line.starts_with('+') {
                eprintln!("\x1b[32m{}\x1b[0m", line);
            } else if line.starts_with('@') {
                eprintln!("\x1b[36m{}\x1b[0m", line);
            } else {
                eprintln!("{}", line);
            }
        }
        panic!("Output mismatch - see diff above");
    }
}

// =============================================================================
// Get
// =============================================================================

#[test]
fn test_get_scalar() {
    let (stdout, stderr, code) = run_edyaml(
        &["get", "server.host"],
        "server:\n  host: localhost\n  port: 8080\n",
    );
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(&stdout, "localhost\n");
}

#[test]
fn test_get_whole_document_preserves_formatting() {
    let input = indoc! {"
        # config
        a: 1   # note

        b: [ 1, 2 ]
    "};
    let (stdout, stderr, code) = run_edyaml(&["get"], input);
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(&stdout, input);
}

#[test]
fn test_get_yaml_output() {
    let (stdout, stderr, code) = run_edyaml(&["get", "items", "-y"], "items: [1, 2]\n");
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(&stdout, "- 1\n- 2\n");
}

#[test]
fn test_get_missing_path_fails() {
    let (stdout, stderr, code) = run_edyaml(&["get", "missing"], "a: 1\n");
    assert_eq!(code, Some(127));
    assert!(stdout.is_empty());
    assert!(stderr.contains("missing"));
}

#[test]
fn test_get_missing_path_quiet() {
    let (stdout, _stderr, code) = run_edyaml(&["-q", "get", "missing"], "a: 1\n");
    assert_eq!(code, Some(1));
    assert!(stdout.is_empty());
}

// =============================================================================
// Set / Del
// =============================================================================

#[test]
fn test_set_literal_string() {
    let (stdout, stderr, code) = run_edyaml(&["set", "name", "new"], "name: old\n");
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(&stdout, "name: new\n");
}

#[test]
fn test_set_yaml_value_keeps_comment() {
    let (stdout, stderr, code) =
        run_edyaml(&["set", "cpu", "256", "-y"], "cpu: 512 # millicores\n");
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(&stdout, "cpu: 256 # millicores\n");
}

#[test]
fn test_set_preserves_sibling_formatting() {
    let input = indoc! {"
        # deploy
        replicas: 2   # two is plenty
        image: app:v1
    "};
    let (stdout, stderr, code) = run_edyaml(&["set", "image", "app:v2"], input);
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(
        &stdout,
        indoc! {"
            # deploy
            replicas: 2   # two is plenty
            image: app:v2
        "},
    );
}

#[test]
fn test_del_key() {
    let (stdout, stderr, code) = run_edyaml(&["del", "b"], "a: 1\nb: 2\nc: 3\n");
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(&stdout, "a: 1\nc: 3\n");
}

#[test]
fn test_del_missing_quiet() {
    let (stdout, _stderr, code) = run_edyaml(&["-q", "del", "missing"], "a: 1\n");
    assert_eq!(code, Some(1));
    assert!(stdout.is_empty());
}

// =============================================================================
// Array actions
// =============================================================================

#[test]
fn test_append_flow() {
    let (stdout, stderr, code) = run_edyaml(&["append", "items", "4", "-y"], "items: [1, 2, 3]\n");
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(&stdout, "items: [1, 2, 3, 4]\n");
}

#[test]
fn test_append_zero_indent_block() {
    let (stdout, stderr, code) =
        run_edyaml(&["append", "items", "three"], "items:\n- one\n- two\n");
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(&stdout, "items:\n- one\n- two\n- three\n");
}

#[test]
fn test_insert_and_update() {
    let (stdout, stderr, code) = run_edyaml(&["insert", "items", "1", "b"], "items: [a, c]\n");
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(&stdout, "items: [a, b, c]\n");

    let (stdout, stderr, code) = run_edyaml(&["update", "items", "0", "z"], "items: [a, c]\n");
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(&stdout, "items: [z, c]\n");
}

#[test]
fn test_remove_element() {
    let (stdout, stderr, code) = run_edyaml(&["remove", "items", "0"], "items: [a, b]\n");
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(&stdout, "items: [b]\n");
}

#[test]
fn test_remove_out_of_range() {
    let (stdout, stderr, code) = run_edyaml(&["remove", "items", "9"], "items: [a]\n");
    assert_eq!(code, Some(127));
    assert!(stdout.is_empty());
    assert!(stderr.contains("out of range"));
}

// =============================================================================
// Files and in-place editing
// =============================================================================

#[test]
fn test_file_input_writes_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.yaml");
    std::fs::write(&path, "a: 1 # keep\n").unwrap();

    let (stdout, stderr, code) =
        run_edyaml(&["-f", path.to_str().unwrap(), "set", "a", "2", "-y"], "");
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(&stdout, "a: 2 # keep\n");
    // source file untouched without --in-place
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "a: 1 # keep\n");
}

#[test]
fn test_in_place_edit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.yaml");
    std::fs::write(&path, "a: 1 # keep\nb: 2\n").unwrap();

    let (stdout, stderr, code) = run_edyaml(
        &["-f", path.to_str().unwrap(), "-i", "set", "a", "3", "-y"],
        "",
    );
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert!(stdout.is_empty());
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "a: 3 # keep\nb: 2\n"
    );
}

// =============================================================================
// Apply
// =============================================================================

#[test]
fn test_apply_overlay() {
    let dir = tempfile::tempdir().unwrap();
    let overlay = dir.path().join("overlay.yaml");
    std::fs::write(&overlay, "b: 9\nc: 3\n").unwrap();

    let (stdout, stderr, code) = run_edyaml(
        &["apply", overlay.to_str().unwrap()],
        "a: 1 # note\nb: 2\n",
    );
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(&stdout, "a: 1 # note\nb: 9\nc: 3\n");
}

#[test]
fn test_apply_replace_policy() {
    let dir = tempfile::tempdir().unwrap();
    let overlay = dir.path().join("overlay.yaml");
    std::fs::write(&overlay, "server:\n  host: new\n").unwrap();

    let (stdout, stderr, code) = run_edyaml(
        &[
            "apply",
            "-m",
            "server=replace",
            overlay.to_str().unwrap(),
        ],
        "server:\n  host: old\n  port: 80\n",
    );
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(&stdout, "server:\n  host: new\n");
}

// =============================================================================
// Global flags
// =============================================================================

#[test]
fn test_no_comments_flag() {
    let (stdout, stderr, code) = run_edyaml(
        &["--no-comments", "set", "a", "2", "-y"],
        "a: 1 # secret note\n",
    );
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(&stdout, "a: 2\n");
}

#[test]
fn test_comment_col_flag() {
    let (stdout, stderr, code) = run_edyaml(
        &["--comment-col", "15", "set", "cpu", "1", "-y"],
        "cpu: 512 # cores\n",
    );
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_output_eq(&stdout, "cpu: 1        # cores\n");
}

#[test]
fn test_version_flag() {
    let (stdout, stderr, code) = run_edyaml(&["-V"], "");
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert!(stdout.contains("version:"));
    assert!(stdout.contains("Rust:"));
}

#[test]
fn test_invalid_yaml_fails() {
    let (stdout, _stderr, code) = run_edyaml(&["get", "a"], "a: [unclosed\n");
    assert_eq!(code, Some(127));
    assert!(stdout.is_empty());
}
