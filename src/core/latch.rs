use once_cell::sync::OnceCell;

/// Who is allowed to send the terminal response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claimant {
    Dispatcher,
    DeadlineGuard,
}

impl Claimant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Claimant::Dispatcher => "dispatcher",
            Claimant::DeadlineGuard => "deadline guard",
        }
    }
}

/// Single-use latch shared by the dispatcher and the deadline guard.
///
/// The first successful [`claim`](CompletionLatch::claim) owns the right to
/// send the terminal response; every later claim fails.
#[derive(Debug, Default)]
pub struct CompletionLatch {
    winner: OnceCell<Claimant>,
}

impl CompletionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true only for the first caller
    pub fn claim(&self, claimant: Claimant) -> bool {
        self.winner.set(claimant).is_ok()
    }

    pub fn winner(&self) -> Option<Claimant> {
        self.winner.get().copied()
    }

    pub fn is_claimed(&self) -> bool {
        self.winner.get().is_some()
    }
}
