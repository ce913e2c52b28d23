//! `reqwest` backed callback transport

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;

use crate::{
    config::DispatcherConfig,
    core::{
        error::ErrorContext, CallbackTransport, DeliveryError, DispatchResult, TransportResponse,
    },
};

#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Every PUT is bounded by `timeout`
    pub fn new(timeout: Duration) -> DispatchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .with_context("Unable to build callback client")?;
        Ok(Self { client })
    }

    pub fn from_config(config: &DispatcherConfig) -> DispatchResult<Self> {
        Self::new(config.callback_timeout)
    }
}

#[async_trait]
impl CallbackTransport for ReqwestTransport {
    async fn put(
        &self,
        url: &str,
        body: Bytes,
        headers: HeaderMap,
    ) -> Result<TransportResponse, DeliveryError> {
        let response = self
            .client
            .put(url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(format!("PUT {url} failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DeliveryError::Transport(format!("failed reading callback reply: {e}")))?;

        Ok(TransportResponse { status, body })
    }
}
