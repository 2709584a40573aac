use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
};

use crate::auth::SessionStatus;
use crate::daemon::SharedContext;
use crate::input::{ActivityKind, InputBus};
use crate::session::{AuthResponse, LogoutReason, Role};

/// Socket file name inside the data directory
pub const SOCKET_FILE: &str = "empowerly.sock";

/// IPC request from CLI to daemon
#[derive(Serialize, Deserialize, Debug)]
pub enum IpcRequest {
    Status,
    Login(AuthResponse),
    Logout,
    Activity { kind: ActivityKind, count: u32 },
    StaySignedIn,
    /// The backend answered 401 for the stored token
    Unauthorized { detail: Option<String> },
    Shutdown,
}

/// IPC response from daemon to CLI
#[derive(Serialize, Deserialize, Debug)]
pub enum IpcResponse {
    Status(SessionStatus),
    LoggedIn { name: String, role: Role },
    LoggedOut,
    ActivityAccepted { delivered: u32 },
    StillSignedIn { seconds_until_logout: Option<u64> },
    Rejected(String),
    Shutdown,
}

#[derive(Debug)]
pub struct IpcClient {
    sock_path: PathBuf,
}

impl IpcClient {
    #[must_use]
    pub fn new(sock_path: &Path) -> Self {
        Self {
            sock_path: sock_path.to_path_buf(),
        }
    }

    /// Send one request and wait for the reply
    ///
    /// # Errors
    ///
    /// Returns an error if the socket is unreachable or the exchange cannot be decoded
    pub async fn send_command(&self, request: IpcRequest) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.sock_path).await?;

        let encoded = bincode::serialize(&request)?;
        stream.write_all(&encoded).await?;
        stream.shutdown().await?;

        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await?;
        let response: IpcResponse = bincode::deserialize(&buffer)?;

        Ok(response)
    }
}

pub struct DaemonIpcHandler {
    context: SharedContext,
    input: InputBus,
    shutdown_signal: Arc<AtomicBool>,
}

impl DaemonIpcHandler {
    pub fn new(context: SharedContext, input: InputBus, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            context,
            input,
            shutdown_signal,
        }
    }

    /// Apply a request to the hosted session and build the reply
    pub async fn respond(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Status => IpcResponse::Status(self.context.lock().await.status()),
            IpcRequest::Login(auth) => {
                let mut context = self.context.lock().await;
                match context.login(&auth) {
                    Ok(()) => IpcResponse::LoggedIn {
                        name: auth.name,
                        role: auth.role,
                    },
                    Err(e) => IpcResponse::Rejected(e.to_string()),
                }
            }
            IpcRequest::Logout => {
                self.context.lock().await.logout(LogoutReason::Manual);
                IpcResponse::LoggedOut
            }
            IpcRequest::Activity { kind, count } => {
                // Straight onto the bus; the next tick drains it. Repeats of
                // one kind coalesce there, so a single dispatch stands for all.
                let accepted = count > 0 && self.input.dispatch(kind);
                IpcResponse::ActivityAccepted {
                    delivered: if accepted { count } else { 0 },
                }
            }
            IpcRequest::StaySignedIn => {
                let mut context = self.context.lock().await;
                if !context.is_authenticated() {
                    return IpcResponse::Rejected(String::from("not signed in"));
                }
                context.reset_inactivity_timer();
                IpcResponse::StillSignedIn {
                    seconds_until_logout: context.time_until_logout().map(|d| d.as_secs()),
                }
            }
            IpcRequest::Unauthorized { detail } => {
                self.context
                    .lock()
                    .await
                    .handle_unauthorized(detail.as_deref());
                IpcResponse::LoggedOut
            }
            IpcRequest::Shutdown => {
                self.shutdown_signal.store(true, Ordering::SeqCst);
                IpcResponse::Shutdown
            }
        }
    }

    pub async fn handle(&self, stream: &mut UnixStream, request: IpcRequest) -> Result<()> {
        let response = self.respond(request).await;
        let encoded = bincode::serialize(&response)?;
        stream.write_all(&encoded).await?;
        Ok(())
    }
}

pub async fn listen(handler: Arc<DaemonIpcHandler>, sock_path: &Path) -> io::Result<()> {
    if sock_path.exists() {
        fs::remove_file(sock_path)?;
    }
    let listener = UnixListener::bind(sock_path)?;

    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    match stream.read_to_end(&mut buf).await {
                        Ok(n) if n > 0 => match bincode::deserialize::<IpcRequest>(&buf) {
                            Ok(request) => {
                                if let Err(e) = handler.handle(&mut stream, request).await {
                                    log::error!("IPC handle error: {e}");
                                }
                            }
                            Err(e) => {
                                log::error!("IPC deserialize error: {e}");
                            }
                        },
                        Ok(_) => {} // Connection closed
                        Err(e) => {
                            log::error!("IPC read error: {e}");
                        }
                    }
                });
            }
            Err(e) => {
                log::error!("IPC accept error: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::SessionConfig;
    use crate::monitor::MonitorState;
    use crate::AuthContext;
    use empowerly_storage::Database;
    use tokio::sync::Mutex;

    fn handler() -> (DaemonIpcHandler, InputBus, Arc<AtomicBool>) {
        let bus = InputBus::new();
        let context = AuthContext::new(
            Database::in_memory().unwrap(),
            SystemClock,
            bus.clone(),
            &SessionConfig::default(),
        );
        let shutdown = Arc::new(AtomicBool::new(false));
        let handler = DaemonIpcHandler::new(
            Arc::new(Mutex::new(context)),
            bus.clone(),
            shutdown.clone(),
        );
        (handler, bus, shutdown)
    }

    fn auth_response() -> AuthResponse {
        serde_json::from_str(
            r#"{"token":"t-1","id":"7","name":"Dana","email":"dana@empowerly.io","role":"ADMIN"}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_login_then_status() {
        let (handler, bus, _) = handler();

        match handler.respond(IpcRequest::Login(auth_response())).await {
            IpcResponse::LoggedIn { name, role } => {
                assert_eq!(name, "Dana");
                assert_eq!(role, Role::Admin);
            }
            other => panic!("unexpected response: {other:?}"),
        }
        assert_eq!(bus.listener_count(), 1);

        match handler.respond(IpcRequest::Status).await {
            IpcResponse::Status(status) => {
                assert!(status.is_authenticated());
                assert_eq!(status.state, MonitorState::Armed);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_activity_dropped_while_signed_out() {
        let (handler, _, _) = handler();
        match handler
            .respond(IpcRequest::Activity {
                kind: ActivityKind::Click,
                count: 3,
            })
            .await
        {
            IpcResponse::ActivityAccepted { delivered } => assert_eq!(delivered, 0),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_activity_delivered_while_signed_in() {
        let (handler, bus, _) = handler();
        handler.respond(IpcRequest::Login(auth_response())).await;

        match handler
            .respond(IpcRequest::Activity {
                kind: ActivityKind::PointerMove,
                count: 4,
            })
            .await
        {
            IpcResponse::ActivityAccepted { delivered } => assert_eq!(delivered, 4),
            other => panic!("unexpected response: {other:?}"),
        }
        assert_eq!(bus.pending(), 1);
    }

    #[tokio::test]
    async fn test_activity_burst_stays_bounded() {
        let (handler, bus, _) = handler();
        handler.respond(IpcRequest::Login(auth_response())).await;

        for kind in [ActivityKind::PointerMove, ActivityKind::KeyPress] {
            match handler
                .respond(IpcRequest::Activity {
                    kind,
                    count: u32::MAX,
                })
                .await
            {
                IpcResponse::ActivityAccepted { delivered } => assert_eq!(delivered, u32::MAX),
                other => panic!("unexpected response: {other:?}"),
            }
        }
        assert_eq!(bus.pending(), 2);
    }

    #[tokio::test]
    async fn test_zero_count_delivers_nothing() {
        let (handler, bus, _) = handler();
        handler.respond(IpcRequest::Login(auth_response())).await;

        assert!(matches!(
            handler
                .respond(IpcRequest::Activity {
                    kind: ActivityKind::Click,
                    count: 0,
                })
                .await,
            IpcResponse::ActivityAccepted { delivered: 0 }
        ));
        assert_eq!(bus.pending(), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_ends_session() {
        let (handler, bus, _) = handler();
        handler.respond(IpcRequest::Login(auth_response())).await;

        assert!(matches!(
            handler
                .respond(IpcRequest::Unauthorized {
                    detail: Some(String::from("User account has been deleted")),
                })
                .await,
            IpcResponse::LoggedOut
        ));
        assert_eq!(bus.listener_count(), 0);

        match handler.respond(IpcRequest::Status).await {
            IpcResponse::Status(status) => {
                assert!(!status.is_authenticated());
                assert_eq!(status.last_logout, Some(LogoutReason::Unauthorized));
                assert_eq!(status.notifications.len(), 1);
                assert_eq!(status.notifications[0].title, "Account Removed");
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stay_signed_in_requires_session() {
        let (handler, _, _) = handler();
        assert!(matches!(
            handler.respond(IpcRequest::StaySignedIn).await,
            IpcResponse::Rejected(_)
        ));

        handler.respond(IpcRequest::Login(auth_response())).await;
        match handler.respond(IpcRequest::StaySignedIn).await {
            IpcResponse::StillSignedIn {
                seconds_until_logout,
            } => assert!(seconds_until_logout.is_some_and(|s| s > 890)),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_logout_and_shutdown() {
        let (handler, bus, shutdown) = handler();
        handler.respond(IpcRequest::Login(auth_response())).await;

        assert!(matches!(
            handler.respond(IpcRequest::Logout).await,
            IpcResponse::LoggedOut
        ));
        assert_eq!(bus.listener_count(), 0);

        assert!(matches!(
            handler.respond(IpcRequest::Shutdown).await,
            IpcResponse::Shutdown
        ));
        assert!(shutdown.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_invalid_login_is_rejected() {
        let (handler, _, _) = handler();
        let mut auth = auth_response();
        auth.token.clear();

        assert!(matches!(
            handler.respond(IpcRequest::Login(auth)).await,
            IpcResponse::Rejected(_)
        ));
    }
}
