pub mod http;
pub mod notifier;

pub use self::http::ReqwestTransport;
pub use notifier::{diagnostic_reason, Notifier};

#[cfg(test)]
pub(crate) mod testing {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use async_trait::async_trait;
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};
    use serde_json::Value as JsonValue;

    use crate::core::{CallbackTransport, DeliveryError, TransportResponse};

    #[derive(Debug, Clone)]
    pub struct RecordedPut {
        pub url: String,
        pub body: Bytes,
        pub headers: HeaderMap,
    }

    impl RecordedPut {
        pub fn json(&self) -> JsonValue {
            serde_json::from_slice(&self.body).expect("terminal response is json")
        }
    }

    /// In-memory transport that records every PUT
    pub struct RecordingTransport {
        status: StatusCode,
        delay: Duration,
        panics: bool,
        calls: Arc<Mutex<Vec<RecordedPut>>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::with_status(StatusCode::OK)
        }

        pub fn with_status(status: StatusCode) -> Self {
            Self {
                status,
                delay: Duration::ZERO,
                panics: false,
                calls: Arc::default(),
            }
        }

        /// Each PUT takes `delay` before it answers
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Each PUT is recorded and then panics
        pub fn panicking(mut self) -> Self {
            self.panics = true;
            self
        }

        pub fn calls(&self) -> Vec<RecordedPut> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CallbackTransport for RecordingTransport {
        async fn put(
            &self,
            url: &str,
            body: Bytes,
            headers: HeaderMap,
        ) -> Result<TransportResponse, DeliveryError> {
            self.calls.lock().unwrap().push(RecordedPut {
                url: url.to_string(),
                body,
                headers,
            });
            if self.panics {
                panic!("callback transport crashed");
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(TransportResponse {
                status: self.status,
                body: String::new(),
            })
        }
    }
}
