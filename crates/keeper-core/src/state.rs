//! Pump and call request state types

/// Lifecycle of one gateway run
///
/// A gateway services exactly one `run_to_completion`; there is no
/// transition back to `Running` once a terminal state is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PumpState {
    /// Built, no run started yet
    Idle = 0,

    /// Background operation active, pump draining
    Running = 1,

    /// Background operation returned a value
    Completed = 2,

    /// Background operation honored cancellation
    Cancelled = 3,

    /// Background operation failed or panicked
    Failed = 4,
}

impl PumpState {
    /// Check if the run has finished
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            PumpState::Completed | PumpState::Cancelled | PumpState::Failed
        )
    }
}

impl From<u8> for PumpState {
    fn from(v: u8) -> Self {
        match v {
            0 => PumpState::Idle,
            1 => PumpState::Running,
            2 => PumpState::Completed,
            3 => PumpState::Cancelled,
            4 => PumpState::Failed,
            _ => PumpState::Idle,
        }
    }
}

impl From<PumpState> for u8 {
    fn from(state: PumpState) -> u8 {
        state as u8
    }
}

/// State of a single marshaled call
///
/// ```text
/// Pending ──(owner)──▶ Running ──▶ Done
///    │
///    └──(requester, after cancel)──▶ Abandoned
/// ```
///
/// The two exits from `Pending` are compare-and-swaps, so exactly one side
/// ever takes the captured closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CallState {
    /// Queued, not yet picked up by the owner
    Pending = 0,

    /// Executing on the owner thread
    Running = 1,

    /// Finished, outcome written
    Done = 2,

    /// Requester gave up after cancellation; never executed
    Abandoned = 3,
}

impl From<u8> for CallState {
    fn from(v: u8) -> Self {
        match v {
            0 => CallState::Pending,
            1 => CallState::Running,
            2 => CallState::Done,
            3 => CallState::Abandoned,
            _ => CallState::Pending,
        }
    }
}

impl From<CallState> for u8 {
    fn from(state: CallState) -> u8 {
        state as u8
    }
}
