//! Latch-gated terminal response sender
//!
//! One [`Responder`] exists per invocation and is shared by the dispatcher
//! and the deadline guard. Only the side that wins the completion latch
//! reaches the notifier.

use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use crate::{
    core::{Claimant, CompletionLatch, DeliveryError, ExecutionContext, Request, ResponseStatus},
    logging::InvocationLog,
    service::Notifier,
};

/// Whether a send attempt reached the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The other side already owns the terminal response
    Suppressed,
}

pub struct Responder {
    notifier: Notifier,
    latch: CompletionLatch,
    request: Arc<Request>,
    context: Arc<dyn ExecutionContext>,
    log: InvocationLog,
}

impl Responder {
    pub fn new(
        notifier: Notifier,
        request: Arc<Request>,
        context: Arc<dyn ExecutionContext>,
        log: InvocationLog,
    ) -> Self {
        Self {
            notifier,
            latch: CompletionLatch::new(),
            request,
            context,
            log,
        }
    }

    pub async fn send(
        &self,
        claimant: Claimant,
        status: ResponseStatus,
        data: Map<String, JsonValue>,
        reason: Option<&str>,
        physical_resource_id: Option<&str>,
    ) -> Result<Delivery, DeliveryError> {
        if !self.latch.claim(claimant) {
            self.log.warn(format_args!(
                "Terminal response already owned by the {}, dropping {} response from the {}",
                self.latch.winner().map(|w| w.as_str()).unwrap_or("unknown"),
                status.as_str(),
                claimant.as_str()
            ));
            return Ok(Delivery::Suppressed);
        }

        self.notifier
            .notify(
                &self.log,
                &self.request,
                self.context.as_ref(),
                status,
                data,
                reason,
                physical_resource_id,
            )
            .await
            .map(|()| Delivery::Sent)
    }

    pub fn latch(&self) -> &CompletionLatch {
        &self.latch
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn log(&self) -> &InvocationLog {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::LambdaContext, service::testing::RecordingTransport};
    use std::time::Duration;

    fn responder(transport: Arc<RecordingTransport>) -> Responder {
        let request = Request::new("Create", "S1", "R1", "L1", "https://callback.example.com");
        let log = InvocationLog::for_request(&request);
        Responder::new(
            Notifier::new(transport),
            Arc::new(request),
            Arc::new(LambdaContext::with_remaining(Duration::from_secs(5), "g", "s")),
            log,
        )
    }

    #[tokio::test]
    async fn test_second_send_is_suppressed() {
        let transport = Arc::new(RecordingTransport::new());
        let responder = responder(transport.clone());

        let first = responder
            .send(Claimant::DeadlineGuard, ResponseStatus::Failed, Map::new(), Some("late"), None)
            .await
            .unwrap();
        let second = responder
            .send(Claimant::Dispatcher, ResponseStatus::Success, Map::new(), None, Some("pid"))
            .await
            .unwrap();

        assert_eq!(first, Delivery::Sent);
        assert_eq!(second, Delivery::Suppressed);
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(transport.calls()[0].json()["Status"], "FAILED");
        assert_eq!(responder.latch().winner(), Some(Claimant::DeadlineGuard));
    }
}
