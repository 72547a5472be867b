use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Where a rule is in one test execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleState {
    /// Nothing has happened yet
    Idle,
    /// Publishing bindings and starting the server
    Starting,
    /// The test body is executing
    Running,
    /// Stopping the server and clearing bindings
    Stopping,
    /// Teardown finished (or start failed)
    Done,
}

/// Rule lifecycle event types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Start requested
    Starting,
    /// Server started
    Started,
    /// Server failed to start
    StartFailed,
    /// Stop requested
    Stopping,
    /// Server stopped
    Stopped,
    /// Server stop reported an error
    StopFailed,
}

impl LifecycleEvent {
    /// State a rule is in once this event has been recorded
    pub fn state(self) -> RuleState {
        match self {
            LifecycleEvent::Starting => RuleState::Starting,
            LifecycleEvent::Started => RuleState::Running,
            LifecycleEvent::Stopping => RuleState::Stopping,
            LifecycleEvent::StartFailed | LifecycleEvent::Stopped | LifecycleEvent::StopFailed => {
                RuleState::Done
            }
        }
    }
}

/// One recorded lifecycle event
#[derive(Debug, Clone)]
pub struct LifecycleRecord {
    /// Event type
    pub event: LifecycleEvent,
    /// Event timestamp
    pub timestamp: Instant,
    /// Event details
    pub details: Option<String>,
}

/// Shared, append-only history of a rule's lifecycle events
#[derive(Debug, Clone, Default)]
pub struct LifecycleLog {
    events: Arc<Mutex<Vec<LifecycleRecord>>>,
}

impl LifecycleLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LifecycleRecord>> {
        // A panicking test body never holds this lock, so poisoning carries no torn state.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record an event
    pub fn record(&self, event: LifecycleEvent, details: Option<String>) {
        self.lock().push(LifecycleRecord {
            event,
            timestamp: Instant::now(),
            details,
        });
    }

    /// All events, oldest first
    pub fn events(&self) -> Vec<LifecycleRecord> {
        self.lock().clone()
    }

    /// Number of times `event` was recorded
    pub fn count(&self, event: LifecycleEvent) -> usize {
        self.lock().iter().filter(|r| r.event == event).count()
    }

    /// Current state derived from the last event
    pub fn state(&self) -> RuleState {
        self.lock()
            .last()
            .map(|r| r.event.state())
            .unwrap_or(RuleState::Idle)
    }
}
