//! Shared harness for running the `vlisten` binary in integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

/// Captured result of one CLI invocation.
pub struct CliResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

/// Run `vlisten` with `args` and no stdin.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CliResult {
    run_cli_case_with_stdin(case_name, args, None)
}

/// Run `vlisten` with `args`, feeding `stdin` when given. The full transcript
/// is kept under the target temp dir so failing assertions can point at it.
pub fn run_cli_case_with_stdin(case_name: &str, args: &[&str], stdin: Option<&[u8]>) -> CliResult {
    let mut child = Command::new(env!("CARGO_BIN_EXE_vlisten"))
        .args(args)
        .env_remove("VLISTEN_CONFIG")
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn vlisten");

    if let Some(input) = stdin {
        child
            .stdin
            .take()
            .expect("piped stdin")
            .write_all(input)
            .expect("write stdin");
    }
    let output = child.wait_with_output().expect("wait for vlisten");

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    let log_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("cli-cases");
    std::fs::create_dir_all(&log_dir).expect("create log dir");
    let log_path = log_dir.join(format!("{case_name}.log"));
    let transcript = format!(
        "args: {args:?}\nstatus: {}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}\n",
        output.status
    );
    std::fs::write(&log_path, transcript).expect("write case log");

    CliResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}
