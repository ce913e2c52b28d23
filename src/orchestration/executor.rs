//! Handler execution
//!
//! Invokes the selected handler and checks its output against the
//! `(PhysicalResourceId, Data)` contract.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::{
    core::{
        DispatchError, DispatchResult, ExecutionContext, HandlerError, HandlerResult, Request,
        ResourceHandler,
    },
    logging::InvocationLog,
};

/// Runs one handler for one request
pub struct Executor<'a> {
    log: &'a InvocationLog,
}

impl<'a> Executor<'a> {
    pub fn new(log: &'a InvocationLog) -> Self {
        Self { log }
    }

    /// Invoke `handler` and validate what it returned.
    ///
    /// With `delete` set the handler is expected to return only the
    /// physical resource id; the data mapping is then always empty.
    pub async fn execute(
        &self,
        request: &Request,
        context: &dyn ExecutionContext,
        handler: &dyn ResourceHandler,
        name: &'static str,
        delete: bool,
    ) -> DispatchResult<HandlerResult> {
        self.log.debug(format_args!("Invoking {name} handler"));

        let output = match AssertUnwindSafe(handler.handle(request, context))
            .catch_unwind()
            .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(DispatchError::Handler(e)),
            Err(payload) => return Err(DispatchError::Handler(HandlerError::from_panic(payload))),
        };

        let result = output.validate(name, delete)?;
        self.log.debug(format_args!(
            "{name} handler returned PhysicalResourceId {}",
            result.physical_resource_id
        ));
        Ok(result)
    }
}
