//! Core traits for cfn-dispatch components
//!
//! These are the seams to the outside world: the integrator's handlers and
//! the HTTP transport that carries the terminal response.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use super::{
    context::ExecutionContext,
    error::{DeliveryError, HandlerError},
    output::HandlerOutput,
    request::Request,
};

/// A create, update or delete routine supplied by the integrator
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn handle(
        &self,
        request: &Request,
        context: &dyn ExecutionContext,
    ) -> Result<HandlerOutput, HandlerError>;
}

/// Handler built from a plain synchronous closure.
///
/// The closure runs on the dispatcher's task, so it should not block for
/// longer than the invocation budget allows.
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&Request, &dyn ExecutionContext) -> Result<HandlerOutput, HandlerError> + Send + Sync,
{
    FnHandler { f }
}

#[async_trait]
impl<F> ResourceHandler for FnHandler<F>
where
    F: Fn(&Request, &dyn ExecutionContext) -> Result<HandlerOutput, HandlerError> + Send + Sync,
{
    async fn handle(
        &self,
        request: &Request,
        context: &dyn ExecutionContext,
    ) -> Result<HandlerOutput, HandlerError> {
        (self.f)(request, context)
    }
}

/// What the callback endpoint answered
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Carries a terminal response to the callback URL
#[async_trait]
pub trait CallbackTransport: Send + Sync {
    /// One PUT attempt; only transport-level failures are errors here
    async fn put(
        &self,
        url: &str,
        body: Bytes,
        headers: HeaderMap,
    ) -> Result<TransportResponse, DeliveryError>;
}
