//! Sign-in session commands
//!
//! These talk to the daemon when it is running. Without it, login and logout
//! still update the stored session so the next daemon start picks it up.

use anyhow::{Context, Result};
use chrono::Local;
use empowerly_core::{
    daemon::DaemonContext,
    ipc::{IpcClient, IpcRequest, IpcResponse, SOCKET_FILE},
    ActivityKind, AppConfig, AuthContext, AuthResponse, InputBus, LogoutReason, SessionStatus,
    SystemClock,
};
use empowerly_storage::Database;
use std::{
    fs,
    io::{self, Read},
    path::Path,
};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Send `request` to a running daemon; `None` when there is no daemon to ask
async fn ask_daemon(data_dir: &Path, request: IpcRequest) -> Option<IpcResponse> {
    let sock_path = data_dir.join(SOCKET_FILE);
    if !sock_path.exists() {
        return None;
    }
    match IpcClient::new(&sock_path).send_command(request).await {
        Ok(response) => Some(response),
        Err(e) => {
            log::warn!("Daemon not responding: {e}");
            None
        }
    }
}

async fn require_daemon(data_dir: &Path, request: IpcRequest) -> Result<IpcResponse> {
    ask_daemon(data_dir, request)
        .await
        .context("Daemon is not running. Start it with `empowerly start`.")
}

fn offline_context(config: &AppConfig) -> Result<DaemonContext> {
    let db = Database::new(None)?;
    Ok(AuthContext::new(
        db,
        SystemClock,
        InputBus::new(),
        &config.session,
    ))
}

fn read_auth_response(file: Option<&Path>) -> Result<AuthResponse> {
    let raw = match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read sign-in response from stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("Sign-in response is not valid JSON")
}

pub async fn login(data_dir: &Path, config: &AppConfig, file: Option<&Path>) -> Result<()> {
    let auth = read_auth_response(file)?;
    if let Some(message) = auth.message.as_deref() {
        log::debug!("Backend message: {message}");
    }

    match ask_daemon(data_dir, IpcRequest::Login(auth.clone())).await {
        Some(IpcResponse::LoggedIn { name, role }) => {
            println!("Signed in as {name} ({role})");
            Ok(())
        }
        Some(IpcResponse::Rejected(reason)) => anyhow::bail!("Sign-in rejected: {reason}"),
        Some(other) => anyhow::bail!("Unexpected response from daemon: {other:?}"),
        None => {
            let mut context = offline_context(config)?;
            context.login(&auth)?;
            println!("Signed in as {} ({})", auth.name, auth.role);
            println!("Daemon is not running; inactivity is enforced once it starts.");
            Ok(())
        }
    }
}

pub async fn logout(data_dir: &Path, config: &AppConfig) -> Result<()> {
    match ask_daemon(data_dir, IpcRequest::Logout).await {
        Some(IpcResponse::LoggedOut) => {}
        Some(other) => anyhow::bail!("Unexpected response from daemon: {other:?}"),
        None => offline_context(config)?.logout(LogoutReason::Manual),
    }
    println!("Signed out");
    Ok(())
}

pub async fn show_status(data_dir: &Path) -> Result<()> {
    let (status, daemon_running) = match ask_daemon(data_dir, IpcRequest::Status).await {
        Some(IpcResponse::Status(status)) => (status, true),
        Some(_) => anyhow::bail!("Unexpected response from daemon"),
        None => (SessionStatus::from_storage(&Database::new(None)?), false),
    };

    println!(
        "Daemon Status: {}",
        if daemon_running { "Running" } else { "Not running" }
    );
    println!("\n{}", Table::new(status_rows(&status, daemon_running)));

    for notification in &status.notifications {
        println!(
            "\n[{:?}] {} ({})\n  {}",
            notification.level,
            notification.title,
            notification.created_at.with_timezone(&Local).format("%H:%M:%S"),
            notification.message
        );
    }
    Ok(())
}

fn status_rows(status: &SessionStatus, daemon_running: bool) -> Vec<StatusRow> {
    let mut rows = Vec::new();
    match &status.user {
        Some(user) => {
            rows.push(StatusRow {
                field: "User",
                value: format!("{} <{}>", user.name, user.email),
            });
            rows.push(StatusRow {
                field: "Role",
                value: user.role.to_string(),
            });
            if let Some(department) = user.department {
                rows.push(StatusRow {
                    field: "Department",
                    value: format!("{department:?}"),
                });
            }
        }
        None => rows.push(StatusRow {
            field: "User",
            value: String::from("Signed out"),
        }),
    }

    if daemon_running {
        rows.push(StatusRow {
            field: "Monitor",
            value: status.state.description().to_string(),
        });
        if let Some(secs) = status.seconds_until_logout {
            rows.push(StatusRow {
                field: "Logout in",
                value: format!("{:02}:{:02}", secs / 60, secs % 60),
            });
        }
    }

    if status.show_inactivity_warning {
        rows.push(StatusRow {
            field: "Warning",
            value: String::from("Session will expire soon. Run `empowerly stay`."),
        });
    }
    if let Some(reason) = status.last_logout {
        rows.push(StatusRow {
            field: "Last logout",
            value: reason.description().to_string(),
        });
    }
    rows
}

pub async fn record_activity(data_dir: &Path, kind: &str, count: u32) -> Result<()> {
    let kind: ActivityKind = kind.parse()?;
    match require_daemon(data_dir, IpcRequest::Activity { kind, count }).await? {
        IpcResponse::ActivityAccepted { delivered: 0 } => {
            println!("No active session; {kind} ignored");
        }
        IpcResponse::ActivityAccepted { delivered } => {
            println!("Delivered {delivered} {kind} event(s)");
        }
        other => anyhow::bail!("Unexpected response from daemon: {other:?}"),
    }
    Ok(())
}

pub async fn report_unauthorized(data_dir: &Path, detail: Option<String>) -> Result<()> {
    match require_daemon(data_dir, IpcRequest::Unauthorized { detail }).await? {
        IpcResponse::LoggedOut => {
            println!("Signed out: the server rejected the session token");
            Ok(())
        }
        other => anyhow::bail!("Unexpected response from daemon: {other:?}"),
    }
}

pub async fn stay_signed_in(data_dir: &Path) -> Result<()> {
    match require_daemon(data_dir, IpcRequest::StaySignedIn).await? {
        IpcResponse::StillSignedIn {
            seconds_until_logout,
        } => {
            match seconds_until_logout {
                Some(secs) => println!("Still signed in; logout in {}m {}s", secs / 60, secs % 60),
                None => println!("Still signed in"),
            }
            Ok(())
        }
        IpcResponse::Rejected(reason) => anyhow::bail!("{reason}"),
        other => anyhow::bail!("Unexpected response from daemon: {other:?}"),
    }
}
