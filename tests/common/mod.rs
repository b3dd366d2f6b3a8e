#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_smx") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "smx.exe" } else { "smx" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve smx binary path for integration test"),
    }
}

/// Run the binary with an isolated `HOME` so default paths never touch the real one.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    let home = tempfile::tempdir().expect("create temp home");
    run_cli_case_with_env(case_name, args, &[("HOME", &home.path().to_string_lossy())])
}

pub fn run_cli_case_with_env(case_name: &str, args: &[&str], env: &[(&str, &str)]) -> CmdResult {
    let root = std::env::temp_dir().join("smx-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .env("RUST_BACKTRACE", "1")
        .env_remove("SMX_OUTPUT_FORMAT")
        .env_remove("SMX_API_URL")
        .env_remove("SMX_ACTIVITY_LOG");
    for (name, value) in env {
        command.env(name, value);
    }
    let output = command.output().expect("execute smx command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Three-row configuration pointing at `api_url`, logging into `dir`.
pub fn reference_config(api_url: &str, dir: &Path) -> String {
    format!(
        r##"api_url = "{api_url}"
size = [64, 32, 3]
background_color = 0x000000
update_interval = 0.05
keep_values_on_fail = 2
request_timeout_secs = 2

[logging]
activity_log = "{log}"

[data.CPU]
unit = "%"
placeholder = "0"
max_length = 3
thresholds = {{ high = [90, 0xFF0000], med = [50, 0xFFFF00], low = [0, 0x00FF00] }}

[data.RAM]
unit = "%"
placeholder = "0"
max_length = 3
thresholds = {{ high = [70, 0xFF0000], med = [50, 0xFFFF00], low = [10, 0x00FF00] }}

[data.Temp]
unit = "C"
max_length = 3
thresholds = {{ high = [70, 0xFF0000], med = [60, 0xFFFF00], low = [40, 0x00FF00] }}
"##,
        log = dir.join("activity.jsonl").display()
    )
}

/// Write `contents` as `config.toml` inside `dir` and return its path.
pub fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("config.toml");
    fs::write(&path, contents).expect("write config");
    path
}
