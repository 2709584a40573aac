use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// User interaction signals that count as activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityKind {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
}

impl ActivityKind {
    /// The full monitored set
    pub const ALL: [Self; 6] = [
        Self::PointerDown,
        Self::PointerMove,
        Self::KeyPress,
        Self::Scroll,
        Self::TouchStart,
        Self::Click,
    ];

    /// Browser event name for this signal
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::PointerDown => "mousedown",
            Self::PointerMove => "mousemove",
            Self::KeyPress => "keypress",
            Self::Scroll => "scroll",
            Self::TouchStart => "touchstart",
            Self::Click => "click",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

impl FromStr for ActivityKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.event_name() == name)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(ActivityKind::event_name).collect();
                anyhow::anyhow!("Unknown activity '{s}'. Expected one of: {}", known.join(", "))
            })
    }
}

/// Identifies one registered listener on an input source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A stream of interaction events with explicit listener registration
///
/// Events only flow while at least one listener is subscribed to their kind;
/// anything dispatched with nobody listening is discarded.
pub trait InputEventSource {
    fn subscribe(&mut self, kinds: &[ActivityKind]) -> ListenerId;

    /// Remove a listener. Unknown ids are ignored.
    fn unsubscribe(&mut self, listener: ListenerId);

    /// Next queued event, if any
    fn poll_event(&mut self) -> Option<ActivityKind>;
}

#[derive(Debug, Default)]
struct BusState {
    next_id: u64,
    listeners: HashMap<ListenerId, Vec<ActivityKind>>,
    pending: VecDeque<ActivityKind>,
    dropped: u64,
}

impl BusState {
    fn wants(&self, kind: ActivityKind) -> bool {
        self.listeners.values().any(|kinds| kinds.contains(&kind))
    }
}

/// Shared in-process input source
///
/// Hosts push interaction events with [`InputBus::dispatch`] from wherever
/// they observe them; the session core drains them on its own thread. Clones
/// share the same bus.
#[derive(Debug, Clone, Default)]
pub struct InputBus {
    inner: Arc<Mutex<BusState>>,
}

impl InputBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event. Returns `false` when nobody listens for it.
    ///
    /// Pending events are coalesced per kind: a kind already waiting to be
    /// drained is not queued again, so the queue never holds more than one
    /// entry per [`ActivityKind`].
    pub fn dispatch(&self, kind: ActivityKind) -> bool {
        let mut state = self.state();
        if state.wants(kind) {
            if !state.pending.contains(&kind) {
                state.pending.push_back(kind);
            }
            true
        } else {
            state.dropped += 1;
            false
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.state().listeners.len()
    }

    /// Events delivered but not yet drained
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state().pending.len()
    }

    /// Events discarded because nobody was listening
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.state().dropped
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InputEventSource for InputBus {
    fn subscribe(&mut self, kinds: &[ActivityKind]) -> ListenerId {
        let mut state = self.state();
        let id = ListenerId(state.next_id);
        state.next_id += 1;
        state.listeners.insert(id, kinds.to_vec());
        id
    }

    fn unsubscribe(&mut self, listener: ListenerId) {
        let mut state = self.state();
        if state.listeners.remove(&listener).is_none() {
            return;
        }
        // Queued events nobody wants anymore are gone with the listener
        let pending = std::mem::take(&mut state.pending);
        let kept: VecDeque<ActivityKind> = pending.into_iter().filter(|k| state.wants(*k)).collect();
        state.pending = kept;
    }

    fn poll_event(&mut self) -> Option<ActivityKind> {
        self.state().pending.pop_front()
    }
}
