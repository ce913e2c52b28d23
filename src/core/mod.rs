//! Core abstractions and interfaces for cfn-dispatch
//!
//! This module provides the data model of one invocation and the traits
//! through which the dispatcher talks to handlers and to the network.

pub mod context;
pub mod error;
pub mod latch;
pub mod output;
pub mod request;
pub mod response;
pub mod traits;


// Re-export commonly used types
pub use context::{ExecutionContext, LambdaContext};
pub use error::{ContractError, DeliveryError, DispatchError, DispatchResult, HandlerError};
pub use latch::{Claimant, CompletionLatch};
pub use output::{HandlerOutput, HandlerResult};
pub use request::{InvocationEnvelope, Request, RequestType};
pub use response::{ResponseStatus, TerminalResponse};
pub use traits::*;
