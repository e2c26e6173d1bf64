//! Tests for the command-line entry point.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_neptune-supervisor"))
}

#[test]
fn test_help_lists_subcommands() {
    let output = bin().arg("--help").output().expect("Failed to execute binary");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("serve"), "Help should mention serve");
    assert!(stdout.contains("call"), "Help should mention call");
}

#[test]
fn test_call_rejects_unknown_operation() {
    let dir = tempfile::tempdir().unwrap();
    let output = bin()
        .args(["call", "reboot", "--socket"])
        .arg(dir.path().join("none.sock"))
        .arg("--config")
        .arg(dir.path().join("none.toml"))
        .output()
        .expect("Failed to execute binary");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Unknown operation: reboot"));
}

#[test]
fn test_call_without_supervisor_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = bin()
        .args(["call", "status", "--socket"])
        .arg(dir.path().join("none.sock"))
        .arg("--config")
        .arg(dir.path().join("none.toml"))
        .output()
        .expect("Failed to execute binary");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Supervisor not running"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "autostart = [").unwrap();

    let output = bin()
        .args(["call", "status", "--config"])
        .arg(&config)
        .output()
        .expect("Failed to execute binary");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Failed to parse config file"));
}

/// Write a `serve` config rooted in `dir` whose node runs `core_script`.
#[cfg(unix)]
fn write_serve_config(dir: &std::path::Path, core_script: &str, ready_timeout_ms: u64) -> PathBuf {
    let config_path = dir.join("serve.toml");
    let config = format!(
        r#"socket_path = '{socket}'
autostart = true

[supervisor]
network = "regtest"
data_dir = '{dir}'
probe_rpc = false
cookie_path = '{cookie}'
ready_timeout_ms = {ready_timeout_ms}
poll_interval_ms = 20
terminate_timeout_ms = 1000

[supervisor.core]
binary = "sh"
args = ["-c", '{core_script}']

[supervisor.core.env]
COOKIE_PATH = '{cookie}'
PID_FILE = '{pid_file}'

[supervisor.cli]
binary = "sh"
args = ["-c", "exec sleep 30"]
"#,
        socket = dir.join("serve.sock").display(),
        dir = dir.display(),
        cookie = dir.join(".cookie").display(),
        pid_file = dir.join("core.pid").display(),
    );
    std::fs::write(&config_path, config).unwrap();
    config_path
}

#[cfg(unix)]
fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    condition()
}

#[cfg(unix)]
fn is_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    kill(Pid::from_raw(i32::try_from(pid).unwrap()), None).is_ok()
}

#[cfg(unix)]
fn terminate_and_wait(serve: &mut Child) -> std::process::ExitStatus {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(
        Pid::from_raw(i32::try_from(serve.id()).unwrap()),
        Signal::SIGTERM,
    )
    .unwrap();

    let mut status = None;
    let exited = wait_until(Duration::from_secs(10), || {
        status = serve.try_wait().unwrap();
        status.is_some()
    });
    if !exited {
        let _ = serve.kill();
        panic!("serve did not exit after SIGTERM");
    }
    status.unwrap()
}

#[cfg(unix)]
fn spawn_serve(config: &std::path::Path) -> Child {
    bin()
        .arg("serve")
        .arg("--config")
        .arg(config)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn serve")
}

#[cfg(unix)]
#[test]
fn test_sigterm_stops_running_processes() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_serve_config(
        dir.path(),
        r#"printf %s "cookie-$$" > "$COOKIE_PATH"; exec sleep 30"#,
        10_000,
    );
    let mut serve = spawn_serve(&config);

    let mut pids = None;
    let ready = wait_until(Duration::from_secs(10), || {
        let Ok(output) = bin().args(["call", "status", "--config"]).arg(&config).output() else {
            return false;
        };
        let Ok(response) = serde_json::from_slice::<serde_json::Value>(&output.stdout) else {
            return false;
        };
        let status = &response["status"];
        if status["initialized"] != true {
            return false;
        }
        pids = status["core"]["pid"]
            .as_u64()
            .zip(status["cli"]["pid"].as_u64());
        pids.is_some()
    });
    if !ready {
        let _ = serve.kill();
        panic!("supervisor did not initialize");
    }
    let (core_pid, cli_pid) = pids.unwrap();
    let core_pid = u32::try_from(core_pid).unwrap();
    let cli_pid = u32::try_from(cli_pid).unwrap();

    let status = terminate_and_wait(&mut serve);

    assert!(status.success(), "serve exited with {status}");
    assert!(wait_until(Duration::from_secs(5), || !is_alive(core_pid)));
    assert!(wait_until(Duration::from_secs(5), || !is_alive(cli_pid)));
    assert!(!dir.path().join("serve.sock").exists());
}

#[cfg(unix)]
#[test]
fn test_sigterm_during_startup_stops_node() {
    let dir = tempfile::tempdir().unwrap();
    // Never writes a cookie, so autostart is still waiting when the signal lands.
    let config = write_serve_config(
        dir.path(),
        r#"echo $$ > "$PID_FILE"; exec sleep 30"#,
        30_000,
    );
    let pid_file = dir.path().join("core.pid");
    let mut serve = spawn_serve(&config);

    let mut core_pid = None;
    let started = wait_until(Duration::from_secs(10), || {
        core_pid = std::fs::read_to_string(&pid_file)
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok());
        core_pid.is_some()
    });
    if !started {
        let _ = serve.kill();
        panic!("node was never spawned");
    }
    let core_pid = core_pid.unwrap();
    assert!(is_alive(core_pid));

    let status = terminate_and_wait(&mut serve);

    assert!(status.success(), "serve exited with {status}");
    assert!(wait_until(Duration::from_secs(5), || !is_alive(core_pid)));
    assert!(!dir.path().join("serve.sock").exists());
}
