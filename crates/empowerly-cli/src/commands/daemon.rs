/// Daemon lifecycle management commands
use anyhow::{Context, Result};
use empowerly_core::{
    config::get_data_dir,
    ipc::{IpcClient, IpcRequest, IpcResponse, SOCKET_FILE},
    AppConfig, Daemon,
};
use empowerly_storage::Database;
use std::{env, fs, io, path::Path, process::Command, time::Duration};
use sysinfo::{Pid, System};

const PID_FILE: &str = "empowerly.pid";

pub fn start_daemon(data_dir: &Path) -> Result<()> {
    let pid_file_path = data_dir.join(PID_FILE);
    let sock_path = data_dir.join(SOCKET_FILE);

    if let Some(pid) = running_pid(&pid_file_path) {
        log::info!("Daemon is already running (PID: {pid}).");
        return Ok(());
    }
    if pid_file_path.exists() {
        log::warn!("Removing stale PID file.");
        let _ = fs::remove_file(&pid_file_path);
    }

    if sock_path.exists() {
        log::warn!("Removing stale socket file.");
        fs::remove_file(&sock_path)?;
    }

    // Fail here rather than inside the detached process
    AppConfig::load_default()?;

    log::info!("Starting Empowerly session daemon...");

    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    let child = Command::new(env::current_exe()?)
        .arg("daemon-internal-start")
        .current_dir(env::current_dir()?)
        .spawn()?;

    log::info!("Daemon process started with PID: {}", child.id());
    fs::write(&pid_file_path, child.id().to_string())?;

    Ok(())
}

/// PID from the pid file, if that process is still alive
fn running_pid(pid_file_path: &Path) -> Option<usize> {
    let pid = fs::read_to_string(pid_file_path)
        .ok()?
        .trim()
        .parse::<usize>()
        .ok()?;
    let mut sys = System::new();
    sys.refresh_process(Pid::from(pid)).then_some(pid)
}

pub async fn run_daemon_process() -> Result<()> {
    // Detached process: nothing to print to, so logging goes to a file
    if let Err(e) = setup_daemon_logging() {
        eprintln!("Failed to set up daemon logging: {e:#}");
        return Err(e);
    }
    log::info!("Daemon process started internally.");

    if let Err(e) = daemon_main_logic().await {
        log::error!("Daemon main logic exited with a fatal error: {e:#}");
        return Err(e);
    }

    Ok(())
}

async fn daemon_main_logic() -> Result<()> {
    let config = AppConfig::load_default()?;
    let db = Database::new(None)?;
    let mut daemon = Daemon::new(db, &config);
    daemon.run_with_signals().await
}

pub async fn stop_daemon(data_dir: &Path) -> Result<()> {
    let pid_file_path = data_dir.join(PID_FILE);
    let sock_path = data_dir.join(SOCKET_FILE);

    if !pid_file_path.exists() {
        log::info!("Daemon is not running (no PID file).");
        if sock_path.exists() {
            fs::remove_file(&sock_path)?;
        }
        return Ok(());
    }

    let pid = fs::read_to_string(&pid_file_path)?
        .trim()
        .parse::<usize>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    log::info!("Stopping Empowerly session daemon (PID: {pid})...");
    let client = IpcClient::new(&sock_path);

    match client.send_command(IpcRequest::Shutdown).await {
        Ok(IpcResponse::Shutdown) => {
            log::info!("Daemon shutdown signal sent. Waiting for process to exit...");
            tokio::time::sleep(Duration::from_secs(2)).await;

            let mut sys = System::new();
            if sys.refresh_process(Pid::from(pid)) {
                log::warn!("Daemon did not stop gracefully. Force killing...");
                if let Some(process) = sys.process(Pid::from(pid)) {
                    process.kill();
                }
            } else {
                log::info!("Daemon stopped successfully.");
            }
        }
        Ok(resp) => log::error!("Received unexpected response from daemon: {resp:?}"),
        Err(e) => {
            log::error!("Failed to send shutdown command: {e}. Forcing cleanup.");
            let mut sys = System::new();
            if sys.refresh_process(Pid::from(pid)) {
                if let Some(process) = sys.process(Pid::from(pid)) {
                    process.kill();
                    log::info!("Process killed.");
                }
            }
        }
    }

    fs::remove_file(&pid_file_path)?;
    if sock_path.exists() {
        fs::remove_file(&sock_path)?;
    }

    Ok(())
}

fn setup_daemon_logging() -> Result<()> {
    use std::fs::{create_dir_all, OpenOptions};

    let log_path = get_data_dir()?.join("empowerly.log");

    if let Some(parent) = log_path.parent() {
        create_dir_all(parent)?;
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Debug)
        .init();

    Ok(())
}
