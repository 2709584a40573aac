use crate::{
    auth::AuthContext,
    clock::SystemClock,
    config::{get_data_dir, AppConfig},
    input::InputBus,
    ipc::{listen, DaemonIpcHandler, SOCKET_FILE},
    monitor::MonitorState,
};
use anyhow::Result;
use empowerly_storage::Database;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::Mutex, time::interval};

/// The session as hosted by the daemon
pub type DaemonContext = AuthContext<Database, SystemClock, InputBus>;

/// Shared between the tick loop and IPC connections
pub type SharedContext = Arc<Mutex<DaemonContext>>;

pub struct Daemon {
    context: SharedContext,
    ipc_handler: Arc<DaemonIpcHandler>,
    shutdown_signal: Arc<AtomicBool>,
    tick_interval: Duration,
    last_state: MonitorState,
}

impl Daemon {
    #[must_use]
    pub fn new(db: Database, config: &AppConfig) -> Self {
        let bus = InputBus::new();
        let context = AuthContext::new(db, SystemClock, bus.clone(), &config.session);
        let last_state = context.monitor().state();
        let context = Arc::new(Mutex::new(context));
        let shutdown_signal = Arc::new(AtomicBool::new(false));

        Self {
            ipc_handler: Arc::new(DaemonIpcHandler::new(
                context.clone(),
                bus,
                shutdown_signal.clone(),
            )),
            context,
            shutdown_signal,
            tick_interval: config.daemon.tick_interval(),
            last_state,
        }
    }

    /// Serve IPC and drive the session clock until Ctrl-C or a shutdown request
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined
    pub async fn run_with_signals(&mut self) -> Result<()> {
        let sock_path = get_data_dir()?.join(SOCKET_FILE);
        let ipc_handler = self.ipc_handler.clone();

        tokio::spawn(async move {
            if let Err(e) = listen(ipc_handler, &sock_path).await {
                log::error!("IPC listener failed: {e}");
            }
        });

        let mut interval = interval(self.tick_interval);
        log::info!(
            "Daemon started with signal handling and IPC (tick every {}ms)",
            self.tick_interval.as_millis()
        );

        loop {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received Ctrl-C, shutting down...");
                    self.shutdown_signal.store(true, Ordering::SeqCst);
                }
            }

            if self.shutdown_signal.load(Ordering::SeqCst) {
                break;
            }
        }

        // The stored session outlives the daemon and is restored on next start
        log::info!("Daemon shut down gracefully.");
        Ok(())
    }

    async fn tick(&mut self) {
        let mut context = self.context.lock().await;
        context.tick();

        let state = context.monitor().state();
        if state != self.last_state {
            log::debug!(
                "Monitor {} -> {}",
                self.last_state.description(),
                state.description()
            );
            self.last_state = state;
        }
    }
}
