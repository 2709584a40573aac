//! Inactivity monitor
//!
//! While a session is active the monitor keeps two timers armed: one that
//! raises the inactivity warning and one that expires the session. Qualifying
//! input restarts both, at most once per throttle window.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::input::{ActivityKind, InputEventSource, ListenerId};
use crate::timer::{TimerHandle, TimerQueue};

#[cfg(test)]
mod tests;

/// Inactivity before the session is ended
pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// How long before the timeout the warning is shown
pub const WARNING_LEAD: Duration = Duration::from_secs(60);

/// Minimum spacing between two timer resets
pub const THROTTLE_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub inactivity_timeout: Duration,
    pub warning_lead: Duration,
    pub throttle_window: Duration,
}

impl MonitorConfig {
    /// Inactivity after which the warning fires
    #[must_use]
    pub fn warning_after(&self) -> Duration {
        self.inactivity_timeout.saturating_sub(self.warning_lead)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: INACTIVITY_TIMEOUT,
            warning_lead: WARNING_LEAD,
            throttle_window: THROTTLE_WINDOW,
        }
    }
}

/// Monitor lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorState {
    /// No session, no timers, no listeners
    Disarmed,
    /// Session active, warning and logout timers pending
    Armed,
    /// Warning timer fired, logout timer still pending
    WarningShown,
}

impl MonitorState {
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        !matches!(self, Self::Disarmed)
    }

    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Disarmed => "Signed out",
            Self::Armed => "Active",
            Self::WarningShown => "Inactivity warning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorTimer {
    Warning,
    Logout,
    Throttle,
}

/// What happened when a monitor timer fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Throttled activity restarted both timers
    Reset,
    /// The warning timer fired
    WarningShown,
    /// The logout timer fired; the monitor has already disarmed itself
    Expired,
}

pub struct ActivityMonitor<I> {
    config: MonitorConfig,
    input: I,
    state: MonitorState,
    timers: TimerQueue<MonitorTimer>,
    warning_timer: Option<TimerHandle>,
    logout_timer: Option<TimerHandle>,
    /// Set while a throttled reset is outstanding; further activity is ignored until it runs
    throttle_timer: Option<TimerHandle>,
    listener: Option<ListenerId>,
    last_activity_at: Option<Instant>,
    reset_count: u64,
}

impl<I: InputEventSource> ActivityMonitor<I> {
    #[must_use]
    pub fn new(config: MonitorConfig, input: I) -> Self {
        Self {
            config,
            input,
            state: MonitorState::Disarmed,
            timers: TimerQueue::new(),
            warning_timer: None,
            logout_timer: None,
            throttle_timer: None,
            listener: None,
            last_activity_at: None,
            reset_count: 0,
        }
    }

    /// Start (or restart) monitoring from `now`
    ///
    /// Attaches the activity listener if it is not attached yet, drops any
    /// outstanding throttled reset and starts both timers.
    pub fn arm(&mut self, now: Instant) {
        if self.listener.is_none() {
            self.listener = Some(self.input.subscribe(&ActivityKind::ALL));
        }
        if let Some(handle) = self.throttle_timer.take() {
            self.timers.cancel(handle);
        }
        self.state = MonitorState::Armed;
        self.reset(now);
    }

    /// Tear everything down: listener removed, every timer cleared
    pub fn disarm(&mut self) {
        if let Some(listener) = self.listener.take() {
            self.input.unsubscribe(listener);
        }
        self.timers.clear();
        self.warning_timer = None;
        self.logout_timer = None;
        self.throttle_timer = None;
        self.last_activity_at = None;
        if self.state.is_armed() {
            log::debug!("Inactivity monitor disarmed");
        }
        self.state = MonitorState::Disarmed;
    }

    /// Note one qualifying event observed at `now`
    ///
    /// The first event schedules a reset one throttle window later; events
    /// arriving while that reset is outstanding are ignored. Returns whether
    /// a reset was scheduled.
    pub fn record_activity(&mut self, now: Instant) -> bool {
        if !self.state.is_armed() || self.throttle_timer.is_some() {
            return false;
        }
        self.throttle_timer =
            self.timers
                .schedule_after(now, self.config.throttle_window, MonitorTimer::Throttle);
        self.throttle_timer.is_some()
    }

    /// Restart both timers from `now` and clear the warning
    ///
    /// Does nothing while disarmed. An outstanding throttled reset is left in
    /// place.
    pub fn reset(&mut self, now: Instant) {
        if !self.state.is_armed() {
            return;
        }
        for handle in [self.warning_timer.take(), self.logout_timer.take()]
            .into_iter()
            .flatten()
        {
            self.timers.cancel(handle);
        }

        self.warning_timer =
            self.timers
                .schedule_after(now, self.config.warning_after(), MonitorTimer::Warning);
        self.logout_timer =
            self.timers
                .schedule_after(now, self.config.inactivity_timeout, MonitorTimer::Logout);
        if self.logout_timer.is_none() {
            log::warn!(
                "Inactivity timeout of {:?} is out of range; the session will not expire",
                self.config.inactivity_timeout
            );
        }

        if self.state == MonitorState::WarningShown {
            log::debug!("Activity resumed, inactivity warning cleared");
        }
        self.state = MonitorState::Armed;
        self.last_activity_at = Some(now);
        self.reset_count += 1;
    }

    /// Drain queued input, recording each event at `now`. Returns how many were drained.
    pub fn pump_input(&mut self, now: Instant) -> usize {
        let mut drained = 0;
        while self.input.poll_event().is_some() {
            drained += 1;
            self.record_activity(now);
        }
        drained
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Fire the earliest timer due at or before `now`
    ///
    /// Each timer is handled at its own deadline, so a late call replays
    /// transitions exactly as they would have happened on time.
    pub fn poll_due(&mut self, now: Instant) -> Option<(Instant, MonitorEvent)> {
        let fired = self.timers.pop_due(now)?;
        let event = match fired.payload {
            MonitorTimer::Throttle => {
                self.throttle_timer = None;
                self.reset(fired.deadline);
                MonitorEvent::Reset
            }
            MonitorTimer::Warning => {
                self.warning_timer = None;
                self.state = MonitorState::WarningShown;
                log::debug!("Inactivity warning shown");
                MonitorEvent::WarningShown
            }
            MonitorTimer::Logout => {
                self.logout_timer = None;
                self.disarm();
                MonitorEvent::Expired
            }
        };
        Some((fired.deadline, event))
    }

    #[must_use]
    pub fn state(&self) -> MonitorState {
        self.state
    }

    #[must_use]
    pub fn is_warning_shown(&self) -> bool {
        self.state == MonitorState::WarningShown
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    #[must_use]
    pub fn is_reset_pending(&self) -> bool {
        self.throttle_timer.is_some()
    }

    /// Pending timers, throttled reset included
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    #[must_use]
    pub fn last_activity_at(&self) -> Option<Instant> {
        self.last_activity_at
    }

    /// Resets performed since creation
    #[must_use]
    pub fn reset_count(&self) -> u64 {
        self.reset_count
    }

    /// Time left before the logout timer fires
    #[must_use]
    pub fn time_until_logout(&self, now: Instant) -> Option<Duration> {
        let deadline = self.timers.deadline(self.logout_timer?)?;
        Some(deadline.saturating_duration_since(now))
    }

    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    #[must_use]
    pub fn input(&self) -> &I {
        &self.input
    }
}
