use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const SERVER_SCHEMA: &str = r#"{
    "name": "server",
    "summary": "Run the demo server",
    "usage": ["server --port=8080 -a 127.0.0.1"],
    "params": [
        { "names": "h,help", "flag": true, "description": "Show help" },
        { "long": "port", "required": true, "default-value": "8080", "description": "Listen port" },
        { "names": "a,ip-address", "required": true, "description": "Bind address" }
    ]
}"#;

fn make_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before UNIX_EPOCH")
        .as_nanos();
    let pid = std::process::id();
    let dir = std::env::temp_dir().join(format!("paramparse-integ-{prefix}-{pid}-{nanos}"));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn write_schema(dir: &Path) -> PathBuf {
    let path = dir.join("server.json");
    fs::write(&path, SERVER_SCHEMA).expect("failed to write schema fixture");
    path
}

fn paramparse() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_paramparse"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("failed to run paramparse")
}

#[test]
fn help_works() {
    let out = run(paramparse().arg("--help"));
    assert!(
        out.status.success(),
        "paramparse --help failed:\nstatus: {}\nstderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stderr),
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.starts_with("Usage:") && stdout.contains("schema") && stdout.contains("json"),
        "unexpected help output:\n{stdout}"
    );
}

#[test]
fn missing_schema_option_is_reported() {
    let out = run(&mut paramparse());
    assert!(!out.status.success(), "expected failure without --schema");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("not all required arguments are specified"),
        "unexpected stderr:\n{stderr}"
    );
}

#[test]
fn json_report_lists_bound_values() {
    let dir = make_temp_dir("json-report");
    let schema = write_schema(&dir);

    let out = run(paramparse()
        .arg(format!("--schema={}", schema.display()))
        .arg("--json")
        .args(["--", "server", "--help", "-a", "127.0.0.1"]));
    assert!(
        out.status.success(),
        "paramparse failed:\nstatus: {}\nstderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stderr),
    );

    let report: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("stdout is not JSON");
    assert_eq!(report["program"], "server");
    assert_eq!(report["params"]["help"]["parsed"], true);
    assert_eq!(report["params"]["port"]["value"], "8080");
    assert_eq!(report["params"]["port"]["parsed"], false);
    assert_eq!(report["params"]["ip-address"]["value"], "127.0.0.1");
    assert_eq!(report["params"]["ip-address"]["parsed"], true);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn text_report_marks_defaults() {
    let dir = make_temp_dir("text-report");
    let schema = write_schema(&dir);

    let out = run(paramparse()
        .arg("-s")
        .arg(&schema)
        .args(["--", "server", "-a", "::1"]));
    assert!(
        out.status.success(),
        "paramparse failed:\nstatus: {}\nstderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stderr),
    );

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("8080 (default)"), "unexpected report:\n{stdout}");
    assert!(stdout.contains("::1 (set)"), "unexpected report:\n{stdout}");
    assert!(stdout.contains("absent"), "unexpected report:\n{stdout}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn unknown_target_key_fails_with_help() {
    let dir = make_temp_dir("unknown-key");
    let schema = write_schema(&dir);

    let out = run(paramparse()
        .arg("--schema")
        .arg(&schema)
        .args(["--", "server", "--verbose", "-a", "127.0.0.1"]));
    assert!(!out.status.success(), "expected failure for unknown key");

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("unknown parameter key specified: --verbose"),
        "unexpected stderr:\n{stderr}"
    );
    assert!(
        stderr.contains("server - Run the demo server") && stderr.contains("ip-address"),
        "target help not shown:\n{stderr}"
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn unreadable_schema_is_an_error() {
    let dir = make_temp_dir("no-schema");
    let missing = dir.join("missing.json");

    let out = run(paramparse()
        .arg("--schema")
        .arg(&missing)
        .args(["--", "server"]));
    assert!(!out.status.success(), "expected failure for missing schema");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("failed to read schema"),
        "unexpected stderr:\n{stderr}"
    );

    let _ = fs::remove_dir_all(&dir);
}
