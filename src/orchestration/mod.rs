//! Invocation orchestration layer
//!
//! This module wires the executor, the deadline guard and the notifier
//! together under the dispatcher.

pub mod deadline;
pub mod dispatcher;
pub mod executor;
pub mod responder;


pub use deadline::{DeadlineGuard, GuardState, TIMEOUT_REASON};
pub use dispatcher::{Dispatcher, Handlers};
pub use executor::Executor;
pub use responder::{Delivery, Responder};

use crate::core::{ContractError, DispatchError, DispatchResult, HandlerError, HandlerResult};

/// How an invocation ended
#[derive(Debug)]
pub enum Outcome {
    Success(HandlerResult),
    Unsupported { request_type: String },
    HandlerFailed(HandlerError),
    ContractViolation(ContractError),
    TimedOut,
}

/// What the caller has to do once the terminal response is out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Nothing, the invocation is done
    Complete,
    /// Surface the error to the platform
    Reraise,
    /// Stop the process
    Halt,
}

impl Outcome {
    pub fn tag(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "Success",
            Outcome::Unsupported { .. } => "Unsupported",
            Outcome::HandlerFailed(_) => "HandlerFailed",
            Outcome::ContractViolation(_) => "ContractViolation",
            Outcome::TimedOut => "TimedOut",
        }
    }

    pub fn disposition(&self) -> Disposition {
        match self {
            Outcome::Success(_) | Outcome::Unsupported { .. } => Disposition::Complete,
            Outcome::HandlerFailed(_) | Outcome::ContractViolation(_) => Disposition::Reraise,
            Outcome::TimedOut => Disposition::Halt,
        }
    }

    /// Completed outcomes stay `Ok`; the rest become the matching error
    pub fn into_result(self) -> DispatchResult<Outcome> {
        match self {
            Outcome::HandlerFailed(e) => Err(DispatchError::Handler(e)),
            Outcome::ContractViolation(e) => Err(DispatchError::Contract(e)),
            Outcome::TimedOut => Err(DispatchError::TimedOut),
            completed => Ok(completed),
        }
    }
}
