//! Session store with inactivity enforcement
//!
//! `AuthContext` owns the current session, mirrors it into durable storage
//! and drives the [`ActivityMonitor`]. It is built once at startup and passed
//! by reference to whatever needs it.

use empowerly_storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::AuthError;
use crate::input::InputEventSource;
use crate::monitor::{ActivityMonitor, MonitorEvent, MonitorState};
use crate::notification::{Notification, NotificationCenter, NotificationLevel};
use crate::session::{
    Access, AuthResponse, LogoutReason, Role, Session, UserProfile, TOKEN_KEY, USER_KEY,
};


/// Snapshot of the session for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub user: Option<UserProfile>,
    pub state: MonitorState,
    pub show_inactivity_warning: bool,
    pub seconds_until_logout: Option<u64>,
    pub last_logout: Option<LogoutReason>,
    pub notifications: Vec<Notification>,
}

impl SessionStatus {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Status of whatever session `storage` holds, without touching it
    ///
    /// Nothing is armed and malformed leftovers stay where they are; they are
    /// only cleaned up when an [`AuthContext`] hydrates from the same store.
    pub fn from_storage<S: KeyValueStore>(storage: &S) -> Self {
        let user = match load_session(storage) {
            Hydration::Restored(session) => Some(session.user),
            Hydration::Empty => None,
            Hydration::Malformed(reason) => {
                log::warn!("Stored session is malformed: {reason}");
                None
            }
        };
        Self {
            user,
            state: MonitorState::Disarmed,
            show_inactivity_warning: false,
            seconds_until_logout: None,
            last_logout: None,
            notifications: Vec::new(),
        }
    }
}

/// What durable storage held at startup
enum Hydration {
    Restored(Session),
    Empty,
    Malformed(String),
}

fn load_session<S: KeyValueStore>(storage: &S) -> Hydration {
    let (token, user) = match (storage.get_item(TOKEN_KEY), storage.get_item(USER_KEY)) {
        (Ok(token), Ok(user)) => (token, user),
        (Err(e), _) | (_, Err(e)) => {
            log::warn!("Stored session unreadable, starting signed out: {e:#}");
            return Hydration::Empty;
        }
    };

    match (token, user) {
        (None, None) => Hydration::Empty,
        (Some(_), None) => Hydration::Malformed(String::from("token stored without user")),
        (None, Some(_)) => Hydration::Malformed(String::from("user stored without token")),
        (Some(token), Some(raw_user)) => {
            if token.trim().is_empty() {
                return Hydration::Malformed(String::from("stored token is blank"));
            }
            match serde_json::from_str::<UserProfile>(&raw_user) {
                Ok(user) => Hydration::Restored(Session { token, user }),
                Err(e) => Hydration::Malformed(format!("stored user is not a valid profile: {e}")),
            }
        }
    }
}

fn describe_timeout(timeout: Duration) -> String {
    let secs = timeout.as_secs();
    match secs {
        60 => String::from("1 minute"),
        s if s > 60 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => String::from("1 second"),
        s => format!("{s} seconds"),
    }
}

pub struct AuthContext<S, C, I> {
    storage: S,
    clock: C,
    session: Option<Session>,
    monitor: ActivityMonitor<I>,
    notifications: NotificationCenter,
    last_logout: Option<LogoutReason>,
}

impl<S, C, I> AuthContext<S, C, I>
where
    S: KeyValueStore,
    C: Clock,
    I: InputEventSource,
{
    /// Build the context and restore any session left in `storage`
    ///
    /// A restored session arms the monitor immediately. Incomplete or
    /// unparsable leftovers are removed and the context starts signed out.
    pub fn new(storage: S, clock: C, input: I, config: &SessionConfig) -> Self {
        let mut context = Self {
            storage,
            clock,
            session: None,
            monitor: ActivityMonitor::new(config.monitor_config(), input),
            notifications: NotificationCenter::new(config.notification_ttl()),
            last_logout: None,
        };
        context.hydrate();
        context
    }

    fn hydrate(&mut self) {
        match load_session(&self.storage) {
            Hydration::Restored(session) => {
                log::info!(
                    "Restored session for {} ({})",
                    session.user.email,
                    session.user.role
                );
                self.session = Some(session);
                let now = self.clock.now();
                self.monitor.arm(now);
            }
            Hydration::Empty => log::debug!("No stored session"),
            Hydration::Malformed(reason) => {
                log::warn!("Discarding stored session: {reason}");
                self.clear_storage();
            }
        }
    }

    /// Sign in with a backend response
    ///
    /// Token and profile are written to storage together, then the monitor
    /// is (re)armed from now.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for a blank token or user id and
    /// [`AuthError::Storage`] if persisting fails. The context is unchanged in
    /// both cases.
    pub fn login(&mut self, response: &AuthResponse) -> Result<(), AuthError> {
        let session = Session::from_response(response)?;
        let user_json =
            serde_json::to_string(&session.user).map_err(|e| AuthError::Storage(e.into()))?;
        self.storage
            .set_items(&[(TOKEN_KEY, session.token.as_str()), (USER_KEY, user_json.as_str())])
            .map_err(AuthError::Storage)?;

        log::info!(
            "Signed in as {} ({})",
            session.user.email,
            session.user.role
        );
        self.session = Some(session);
        self.last_logout = None;
        let now = self.clock.now();
        self.monitor.arm(now);
        Ok(())
    }

    /// End the session. Never fails; storage errors are logged.
    pub fn logout(&mut self, reason: LogoutReason) {
        let now = self.clock.now();
        self.logout_at(reason, now);
    }

    fn logout_at(&mut self, reason: LogoutReason, at: Instant) {
        self.monitor.disarm();
        let previous = self.session.take();
        self.clear_storage();
        self.last_logout = Some(reason);

        let Some(session) = previous else {
            log::debug!("Logout requested with no active session");
            return;
        };
        log::info!(
            "Session for {} {}",
            session.user.email,
            reason.description()
        );

        if reason == LogoutReason::Inactivity {
            let message = format!(
                "You've been logged out due to {} of inactivity",
                describe_timeout(self.monitor.config().inactivity_timeout)
            );
            self.notifications
                .show(NotificationLevel::Warning, "Session Expired", &message, at);
        }
    }

    /// The backend answered 401 for the current token
    ///
    /// Ends the session; when the server says the account was deleted the
    /// user is told so.
    pub fn handle_unauthorized(&mut self, detail: Option<&str>) {
        let now = self.clock.now();
        self.logout_at(LogoutReason::Unauthorized, now);
        if detail.is_some_and(|d| d.contains("deleted")) {
            self.notifications.show(
                NotificationLevel::Error,
                "Account Removed",
                "Your account has been deleted by an administrator. You will be logged out.",
                now,
            );
        }
    }

    fn clear_storage(&mut self) {
        if let Err(e) = self.storage.remove_items(&[TOKEN_KEY, USER_KEY]) {
            log::warn!("Failed to clear stored session: {e:#}");
        }
    }

    /// Run one event-loop step at the clock's current time
    ///
    /// Due timers fire first (each at its own deadline), then queued input is
    /// drained, then anything that became due is fired.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        self.run_due(now);
        self.monitor.pump_input(now);
        self.run_due(now);
    }

    fn run_due(&mut self, now: Instant) {
        loop {
            let monitor_due = self.monitor.next_deadline().filter(|d| *d <= now);
            let notice_due = self.notifications.next_deadline().filter(|d| *d <= now);
            match (monitor_due, notice_due) {
                (Some(m), Some(n)) if n < m => self.expire_notification(now),
                (Some(_), _) => self.fire_monitor(now),
                (None, Some(_)) => self.expire_notification(now),
                (None, None) => break,
            }
        }
    }

    fn fire_monitor(&mut self, now: Instant) {
        let Some((at, event)) = self.monitor.poll_due(now) else {
            return;
        };
        match event {
            MonitorEvent::Reset => {}
            MonitorEvent::WarningShown => {
                log::info!("Session will expire soon due to inactivity");
            }
            MonitorEvent::Expired => self.logout_at(LogoutReason::Inactivity, at),
        }
    }

    fn expire_notification(&mut self, now: Instant) {
        if let Some(notification) = self.notifications.expire_due(now) {
            log::debug!("Notification dismissed: {}", notification.title);
        }
    }

    /// "Stay signed in": restart both timers now, bypassing the throttle
    pub fn reset_inactivity_timer(&mut self) {
        let now = self.clock.now();
        self.monitor.reset(now);
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// `false` when signed out
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.session.as_ref().is_some_and(|s| s.user.role == role)
    }

    /// Guarded-route check against a set of allowed roles
    #[must_use]
    pub fn authorize(&self, allowed: &[Role]) -> Access {
        match &self.session {
            None => Access::SignInRequired,
            Some(session) if allowed.contains(&session.user.role) => Access::Granted,
            Some(_) => Access::Forbidden,
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserProfile> {
        self.session.as_ref().map(|s| &s.user)
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    #[must_use]
    pub fn show_inactivity_warning(&self) -> bool {
        self.monitor.is_warning_shown()
    }

    #[must_use]
    pub fn time_until_logout(&self) -> Option<Duration> {
        self.monitor.time_until_logout(self.clock.now())
    }

    #[must_use]
    pub fn last_logout(&self) -> Option<LogoutReason> {
        self.last_logout
    }

    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        self.notifications.active()
    }

    #[must_use]
    pub fn monitor(&self) -> &ActivityMonitor<I> {
        &self.monitor
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    #[cfg(test)]
    fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            user: self.user().cloned(),
            state: self.monitor.state(),
            show_inactivity_warning: self.show_inactivity_warning(),
            seconds_until_logout: self.time_until_logout().map(|d| d.as_secs()),
            last_logout: self.last_logout,
            notifications: self.notifications.active().to_vec(),
        }
    }
}
