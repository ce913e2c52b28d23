//! Terminal response delivery
//!
//! Builds the callback payload and performs exactly one PUT through the
//! configured [`CallbackTransport`]. Nothing is retried here.

use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use crate::{
    core::{
        CallbackTransport, DeliveryError, ExecutionContext, Request, ResponseStatus,
        TerminalResponse,
    },
    logging::InvocationLog,
};

/// Where the orchestrator's operator should look for details
pub fn diagnostic_reason(context: &dyn ExecutionContext) -> String {
    format!(
        "See the details in CloudWatch Log group {} Stream: {}",
        context.log_group_name(),
        context.log_stream_name()
    )
}

#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn CallbackTransport>,
}

impl Notifier {
    pub fn new(transport: Arc<dyn CallbackTransport>) -> Self {
        Self { transport }
    }

    /// Assemble the terminal response for `request`.
    ///
    /// A caller-supplied reason gets the diagnostic suffix appended; without
    /// one the suffix is the whole reason. A missing physical resource id
    /// falls back to the log stream name.
    pub fn build_response(
        request: &Request,
        context: &dyn ExecutionContext,
        status: ResponseStatus,
        data: Map<String, JsonValue>,
        reason: Option<&str>,
        physical_resource_id: Option<&str>,
    ) -> TerminalResponse {
        let diagnostic = diagnostic_reason(context);
        let reason = match reason {
            Some(reason) if !reason.is_empty() => format!("{reason}.. {diagnostic}"),
            _ => diagnostic,
        };

        let physical_resource_id = physical_resource_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| context.log_stream_name())
            .to_string();

        TerminalResponse {
            status,
            reason,
            physical_resource_id,
            stack_id: request.stack_id().to_string(),
            request_id: request.request_id().to_string(),
            logical_resource_id: request.logical_resource_id().to_string(),
            data,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn notify(
        &self,
        log: &InvocationLog,
        request: &Request,
        context: &dyn ExecutionContext,
        status: ResponseStatus,
        data: Map<String, JsonValue>,
        reason: Option<&str>,
        physical_resource_id: Option<&str>,
    ) -> Result<(), DeliveryError> {
        let response =
            Self::build_response(request, context, status, data, reason, physical_resource_id);
        self.deliver(log, request.callback_url(), &response).await
    }

    /// Single PUT of an already built response
    pub async fn deliver(
        &self,
        log: &InvocationLog,
        url: &str,
        response: &TerminalResponse,
    ) -> Result<(), DeliveryError> {
        let body = response.to_body()?;
        let headers = TerminalResponse::headers(&body);

        log.info(format_args!("ResponseURL: {url}"));
        log.info(format_args!(
            "ResponseBody: {}",
            String::from_utf8_lossy(&body)
        ));

        let reply = match self.transport.put(url, body, headers).await {
            Ok(reply) => reply,
            Err(e) => {
                log.error(format_args!("Failed to send terminal response: {e}"));
                return Err(e);
            }
        };

        if !reply.status.is_success() {
            log.error(format_args!(
                "Failed to send terminal response. Status code: {}, body: {}",
                reply.status, reply.body
            ));
            return Err(DeliveryError::Rejected {
                status: reply.status,
                body: reply.body,
            });
        }

        log.info(format_args!("Status code: {}", reply.status));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::LambdaContext, service::testing::RecordingTransport};
    use http::{header, StatusCode};
    use serde_json::json;
    use std::time::Duration;

    fn context() -> LambdaContext {
        LambdaContext::with_remaining(Duration::from_secs(60), "/aws/lambda/fn", "2024/01/01/abc")
    }

    fn request() -> Request {
        Request::new("Create", "S1", "R1", "L1", "https://callback.example.com/put")
    }

    #[test]
    fn test_reason_gets_diagnostic_suffix() {
        let response = Notifier::build_response(
            &request(),
            &context(),
            ResponseStatus::Failed,
            Map::new(),
            Some("ValueError: nope"),
            None,
        );

        assert_eq!(
            response.reason,
            "ValueError: nope.. See the details in CloudWatch Log group /aws/lambda/fn Stream: 2024/01/01/abc"
        );
    }

    #[test]
    fn test_missing_reason_is_diagnostic_only() {
        let response = Notifier::build_response(
            &request(),
            &context(),
            ResponseStatus::Success,
            Map::new(),
            None,
            Some("pid-1"),
        );

        assert_eq!(response.reason, diagnostic_reason(&context()));
        assert_eq!(response.physical_resource_id, "pid-1");
    }

    #[test]
    fn test_physical_resource_id_falls_back_to_log_stream() {
        let response = Notifier::build_response(
            &request(),
            &context(),
            ResponseStatus::Failed,
            Map::new(),
            None,
            None,
        );

        assert_eq!(response.physical_resource_id, "2024/01/01/abc");
    }

    #[tokio::test]
    async fn test_notify_puts_json_body() {
        let transport = Arc::new(RecordingTransport::new());
        let notifier = Notifier::new(transport.clone());
        let request = request();
        let log = InvocationLog::for_request(&request);

        let mut data = Map::new();
        data.insert("k".into(), json!("v"));
        notifier
            .notify(
                &log,
                &request,
                &context(),
                ResponseStatus::Success,
                data,
                None,
                Some("pid-123"),
            )
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "https://callback.example.com/put");
        assert_eq!(calls[0].headers[header::CONTENT_TYPE], "");
        assert_eq!(
            calls[0].headers[header::CONTENT_LENGTH],
            calls[0].body.len().to_string().as_str()
        );

        let body = calls[0].json();
        assert_eq!(body["Status"], "SUCCESS");
        assert_eq!(body["PhysicalResourceId"], "pid-123");
        assert_eq!(body["Data"], json!({"k": "v"}));
    }

    #[tokio::test]
    async fn test_non_success_status_is_delivery_error() {
        let transport = Arc::new(RecordingTransport::with_status(StatusCode::FORBIDDEN));
        let notifier = Notifier::new(transport.clone());
        let request = request();
        let log = InvocationLog::for_request(&request);

        let err = notifier
            .notify(
                &log,
                &request,
                &context(),
                ResponseStatus::Failed,
                Map::new(),
                Some("boom"),
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeliveryError::Rejected {
                status: StatusCode::FORBIDDEN,
                ..
            }
        ));
        // a single attempt, no retry
        assert_eq!(transport.calls().len(), 1);
    }
}
