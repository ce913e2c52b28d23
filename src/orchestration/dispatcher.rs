//! Request dispatch
//!
//! Routes a lifecycle request to its handler while the deadline guard
//! counts down, and makes sure exactly one terminal response leaves the
//! invocation.

use std::{future::pending, sync::Arc, time::Duration};

use serde_json::Map;

use crate::{
    config::DispatcherConfig,
    core::{
        CallbackTransport, Claimant, DispatchError, DispatchResult, ExecutionContext, Request,
        RequestType, ResourceHandler, ResponseStatus,
    },
    logging::InvocationLog,
    service::Notifier,
};

use super::{
    deadline::DeadlineGuard,
    executor::Executor,
    responder::{Delivery, Responder},
    Outcome,
};

/// The three integrator routines, one per lifecycle verb
#[derive(Clone, Copy)]
pub struct Handlers<'a> {
    pub create: &'a dyn ResourceHandler,
    pub update: &'a dyn ResourceHandler,
    pub delete: &'a dyn ResourceHandler,
}

impl<'a> Handlers<'a> {
    pub fn new(
        create: &'a dyn ResourceHandler,
        update: &'a dyn ResourceHandler,
        delete: &'a dyn ResourceHandler,
    ) -> Self {
        Self {
            create,
            update,
            delete,
        }
    }
}

pub struct Dispatcher {
    notifier: Notifier,
    safety_margin: Duration,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn CallbackTransport>, config: &DispatcherConfig) -> Self {
        Self {
            notifier: Notifier::new(transport),
            safety_margin: config.safety_margin,
        }
    }

    /// Handle one invocation end to end.
    ///
    /// `Ok` carries a completed outcome (success or unsupported request
    /// type). Handler failures and contract violations are reported as
    /// FAILED and then returned as errors; a fired deadline guard is
    /// returned as the fatal [`DispatchError::TimedOut`].
    pub async fn dispatch(
        &self,
        request: Request,
        context: Arc<dyn ExecutionContext>,
        handlers: Handlers<'_>,
    ) -> DispatchResult<Outcome> {
        let log = InvocationLog::for_request(&request);
        let request = Arc::new(request);
        let responder = Arc::new(Responder::new(
            self.notifier.clone(),
            request.clone(),
            context.clone(),
            log.clone(),
        ));

        // leave time to notify before the platform kills us
        let budget = context.remaining_time().saturating_sub(self.safety_margin);
        let mut guard = DeadlineGuard::new(responder.clone());
        guard.arm(budget);

        let result = tokio::select! {
            biased;
            fired = guard.fired() => {
                if let Err(e) = fired {
                    log.error(format_args!("Timeout response could not be delivered: {e}"));
                }
                Ok(Outcome::TimedOut)
            }
            outcome = self.run(&request, context.as_ref(), &responder, handlers, &log) => outcome,
        };
        guard.disarm();

        let outcome = result?;
        log.info(format_args!(
            "Invocation finished with {} ({:?})",
            outcome.tag(),
            outcome.disposition()
        ));
        outcome.into_result()
    }

    async fn run(
        &self,
        request: &Request,
        context: &dyn ExecutionContext,
        responder: &Responder,
        handlers: Handlers<'_>,
        log: &InvocationLog,
    ) -> DispatchResult<Outcome> {
        log.info(format_args!("Received a {} Request", request.request_type()));

        let (handler, name, delete) = match request.request_type() {
            RequestType::Create => (handlers.create, "create", false),
            RequestType::Update => (handlers.update, "update", false),
            RequestType::Delete => (handlers.delete, "delete", true),
            RequestType::Other(value) => {
                let reason = format!("Unsupported RequestType: {value}");
                log.warn(format_args!("{reason}"));
                let delivery = responder
                    .send(
                        Claimant::Dispatcher,
                        ResponseStatus::Failed,
                        Map::new(),
                        Some(&reason),
                        request.physical_resource_id(),
                    )
                    .await?;
                return settle(
                    delivery,
                    Outcome::Unsupported {
                        request_type: value.clone(),
                    },
                )
                .await;
            }
        };

        let executed = Executor::new(log)
            .execute(request, context, handler, name, delete)
            .await;

        match executed {
            Ok(result) => {
                let delivery = responder
                    .send(
                        Claimant::Dispatcher,
                        ResponseStatus::Success,
                        result.data.clone(),
                        None,
                        Some(&result.physical_resource_id),
                    )
                    .await?;
                settle(delivery, Outcome::Success(result)).await
            }
            Err(error) => {
                log.error(format_args!("{name} handler failed: {error}"));
                let reason = error.reason();
                let delivery = responder
                    .send(
                        Claimant::Dispatcher,
                        ResponseStatus::Failed,
                        Map::new(),
                        Some(&reason),
                        request.physical_resource_id(),
                    )
                    .await?;
                let outcome = match error {
                    DispatchError::Contract(e) => Outcome::ContractViolation(e),
                    DispatchError::Handler(e) => Outcome::HandlerFailed(e),
                    other => return Err(other),
                };
                settle(delivery, outcome).await
            }
        }
    }
}

/// Hand back `outcome` if our response went out. If the deadline guard
/// owns the response instead, park until the guard's own completion wins
/// the select in [`Dispatcher::dispatch`].
async fn settle(delivery: Delivery, outcome: Outcome) -> DispatchResult<Outcome> {
    match delivery {
        Delivery::Sent => Ok(outcome),
        Delivery::Suppressed => pending().await,
    }
}
