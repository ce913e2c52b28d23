//! Runs one custom resource invocation read from stdin.
//!
//! The handlers echo the resource properties back as data, which makes the
//! demo handy for checking what the orchestrator receives:
//!
//! ```text
//! echo '{"RequestType":"Create", ...}' | cargo run --example echo_resource
//! ```

use std::{sync::Arc, time::Duration};

use cfn_dispatch::{
    config::DispatcherConfig, handle_event, handler_fn, logging, service::ReqwestTransport,
    ExecutionContext, HandlerOutput, Handlers, LambdaContext,
};
use tokio::io::AsyncReadExt;

const TIMEOUT_ENV: &str = "CFN_DISPATCH_TIMEOUT_MS";

#[tokio::main]
async fn main() {
    let config = match DispatcherConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    logging::init_logger(&config.log);

    let mut event = String::new();
    if let Err(e) = tokio::io::stdin().read_to_string(&mut event).await {
        log::error!("Failed to read event from stdin: {e}");
        std::process::exit(2);
    }
    let event = match serde_json::from_str(&event) {
        Ok(event) => event,
        Err(e) => {
            log::error!("Event is not JSON: {e}");
            std::process::exit(2);
        }
    };

    let timeout_ms = std::env::var(TIMEOUT_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30_000);
    let context: Arc<dyn ExecutionContext> =
        Arc::new(LambdaContext::from_env(Duration::from_millis(timeout_ms)));

    let create = handler_fn(|req, ctx| {
        Ok(HandlerOutput::new(
            ctx.log_stream_name(),
            req.resource_properties().clone(),
        ))
    });
    let update = handler_fn(|req, ctx| {
        let id = req.physical_resource_id().unwrap_or(ctx.log_stream_name());
        Ok(HandlerOutput::new(id, req.resource_properties().clone()))
    });
    let delete = handler_fn(|req, ctx| {
        Ok(HandlerOutput::id(
            req.physical_resource_id().unwrap_or(ctx.log_stream_name()),
        ))
    });

    let transport = match ReqwestTransport::from_config(&config) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(2);
        }
    };
    let dispatcher = cfn_dispatch::Dispatcher::new(transport, &config);

    match handle_event(
        &dispatcher,
        event,
        context,
        Handlers::new(&create, &update, &delete),
    )
    .await
    {
        Ok(outcome) => log::info!("Done: {}", outcome.tag()),
        Err(e) if e.is_fatal() => {
            log::error!("Fatal: {e}");
            std::process::exit(1);
        }
        Err(e) => {
            log::error!("{e}");
            std::process::exit(3);
        }
    }
}
