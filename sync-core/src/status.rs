//! Sync status state machine for keepsync.
//!
//! A pure, side-effect-free state machine for the sync cycle lifecycle:
//!
//! ```text
//! Idle ──CycleStarted──► Syncing ──CycleSucceeded──► Idle
//!   ▲                       │
//!   │                       └──CycleFailed──► Error ──CycleStarted──► Syncing
//! ```
//!
//! The actual pull/push work is performed by sync-client, which feeds the
//! outcome of each cycle back in as events.

use std::fmt;

/// Observable sync status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncStatus {
    /// No cycle in flight.
    #[default]
    Idle,
    /// A cycle is in flight.
    Syncing,
    /// The last cycle failed.
    Error {
        /// Description of the failure.
        cause: String,
    },
}

impl SyncStatus {
    /// Process an event and return the new status.
    ///
    /// Events that make no sense in the current status leave it unchanged.
    pub fn on_event(self, event: StatusEvent) -> Self {
        match (self, event) {
            (Self::Idle | Self::Error { .. }, StatusEvent::CycleStarted) => Self::Syncing,
            (Self::Syncing, StatusEvent::CycleSucceeded) => Self::Idle,
            (Self::Syncing, StatusEvent::CycleFailed { error }) => Self::Error { cause: error },

            // Invalid transitions - stay in current status
            (status, _) => status,
        }
    }

    /// Check if a cycle is in flight.
    pub fn is_syncing(&self) -> bool {
        matches!(self, Self::Syncing)
    }

    /// Check if the last cycle failed.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Syncing => write!(f, "syncing"),
            Self::Error { cause } => write!(f, "error: {}", cause),
        }
    }
}

/// Events in the cycle lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// A cycle began.
    CycleStarted,
    /// Every requested step completed.
    CycleSucceeded,
    /// A step failed.
    CycleFailed {
        /// Error message describing the failure.
        error: String,
    },
}

/// What a sync cycle should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncType {
    /// Export and upload local state only.
    Push,
    /// Download and merge remote state only.
    Pull,
    /// Pull, then push.
    Both,
}

impl SyncType {
    /// The steps of a cycle, in execution order.
    ///
    /// Pull always precedes push so a device never uploads its view before
    /// it has merged the newest remote state.
    pub fn steps(&self) -> &'static [CycleStep] {
        match self {
            Self::Push => &[CycleStep::Push],
            Self::Pull => &[CycleStep::Pull],
            Self::Both => &[CycleStep::Pull, CycleStep::Push],
        }
    }

    /// Whether this cycle pulls.
    pub fn includes_pull(&self) -> bool {
        matches!(self, Self::Pull | Self::Both)
    }

    /// Whether this cycle pushes.
    pub fn includes_push(&self) -> bool {
        matches!(self, Self::Push | Self::Both)
    }
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::Pull => write!(f, "pull"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// One step of a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleStep {
    /// Fetch, decrypt and merge the latest remote snapshot.
    Pull,
    /// Export, encrypt and upload local state.
    Push,
}
