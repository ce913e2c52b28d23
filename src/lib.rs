//! This crate implements the callback side of custom resource provisioning.
//!
//! A short-lived function receives a Create, Update or Delete request,
//! runs exactly one integrator handler for it and reports the outcome to
//! the orchestrator's callback URL before its execution budget runs out.

pub mod config;
pub mod core;
pub mod logging;
pub mod orchestration;
pub mod service;

use std::sync::Arc;

use serde_json::Value as JsonValue;

pub use crate::core::{
    handler_fn, DispatchError, DispatchResult, ExecutionContext, HandlerError, HandlerOutput,
    LambdaContext, Request, RequestType, ResourceHandler,
};
pub use crate::orchestration::{Dispatcher, Disposition, Handlers, Outcome};

/// Entry point for one raw invocation event.
///
/// The envelope is validated before anything runs; an invalid envelope is
/// returned as [`DispatchError::InvalidRequest`] without contacting the
/// orchestrator.
pub async fn handle_event(
    dispatcher: &Dispatcher,
    event: JsonValue,
    context: Arc<dyn ExecutionContext>,
    handlers: Handlers<'_>,
) -> DispatchResult<Outcome> {
    let request = Request::try_from(event).inspect_err(|e| log::error!("{e}"))?;
    dispatcher.dispatch(request, context, handlers).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::DispatcherConfig, service::testing::RecordingTransport};
    use serde_json::{json, Map};
    use std::time::Duration;

    #[tokio::test]
    async fn test_handle_event_dispatches_create() {
        let transport = Arc::new(RecordingTransport::new());
        let dispatcher = Dispatcher::new(transport.clone(), &DispatcherConfig::default());
        let create = handler_fn(|req, _ctx| {
            let size = req.resource_properties().get("Size").cloned();
            let mut data = Map::new();
            data.insert("Size".into(), size.unwrap_or(JsonValue::Null));
            Ok(HandlerOutput::new("bucket-1", data))
        });
        let other = handler_fn(|_req, _ctx| Ok("unused".into()));

        let event = json!({
            "RequestType": "Create",
            "StackId": "S1",
            "RequestId": "R1",
            "LogicalResourceId": "L1",
            "ResponseURL": "https://callback.example.com/U",
            "ResourceType": "Custom::Bucket",
            "ResourceProperties": {"Size": 3}
        });
        let context: Arc<dyn ExecutionContext> = Arc::new(LambdaContext::with_remaining(
            Duration::from_secs(30),
            "g",
            "s",
        ));

        let outcome = handle_event(
            &dispatcher,
            event,
            context,
            Handlers::new(&create, &other, &other),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, Outcome::Success(_)));

        let body = transport.calls()[0].json();
        assert_eq!(body["PhysicalResourceId"], "bucket-1");
        assert_eq!(body["Data"], json!({"Size": 3}));
    }

    #[tokio::test]
    async fn test_handle_event_rejects_invalid_envelope() {
        let transport = Arc::new(RecordingTransport::new());
        let dispatcher = Dispatcher::new(transport.clone(), &DispatcherConfig::default());
        let handler = handler_fn(|_req, _ctx| Ok("unused".into()));
        let context: Arc<dyn ExecutionContext> = Arc::new(LambdaContext::with_remaining(
            Duration::from_secs(30),
            "g",
            "s",
        ));

        let err = handle_event(
            &dispatcher,
            json!({"RequestType": "Create"}),
            context,
            Handlers::new(&handler, &handler, &handler),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DispatchError::InvalidRequest(_)));
        assert!(transport.calls().is_empty());
    }
}
