//! Session lifecycle and inactivity enforcement for the Empowerly HR client
//!
//! The core is a deterministic state machine: time comes from a [`Clock`],
//! input from an [`InputEventSource`], and [`AuthContext::tick`] advances
//! both. The daemon and IPC modules host it for the `empowerly` CLI.

pub mod auth;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod error;
pub mod input;
pub mod ipc;
pub mod monitor;
pub mod notification;
pub mod session;
pub mod timer;

pub use auth::{AuthContext, SessionStatus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use daemon::Daemon;
pub use error::AuthError;
pub use input::{ActivityKind, InputBus, InputEventSource};
pub use monitor::{ActivityMonitor, MonitorConfig, MonitorState};
pub use notification::{Notification, NotificationLevel};
pub use session::{Access, AuthResponse, Department, LogoutReason, Role, UserProfile};
