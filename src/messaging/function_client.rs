use crate::processing::change_request::ChangeRequest;
use crate::shared::constants::aws::TRACE_ID_HEADER;
use crate::shared::error::DosIntegrationError;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Calls the event receiver and event sender through their function URLs
#[derive(Clone)]
pub struct FunctionUrlClient {
    http_client: Client,
    event_receiver_url: Option<String>,
    event_sender_url: Option<String>,
}

impl FunctionUrlClient {
    pub fn new(
        event_receiver_url: Option<String>,
        event_sender_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DosIntegrationError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            event_receiver_url,
            event_sender_url,
        })
    }

    pub fn event_sender_url(&self) -> Option<&str> {
        self.event_sender_url.as_deref()
    }

    /// Posts a change event body to the event receiver
    pub async fn post_change_event<T: Serialize + ?Sized>(
        &self,
        event: &T,
    ) -> Result<u16, DosIntegrationError> {
        let url = self.event_receiver_url.as_deref().ok_or_else(|| {
            DosIntegrationError::Config("EVENT_RECEIVER_FUNCTION_URL is not set".to_string())
        })?;
        self.post(url, event, None).await
    }

    /// Posts a change request to the event sender, passing the X-Ray trace on
    pub async fn post_change_request(
        &self,
        request: &ChangeRequest,
        x_ray_trace_id: &str,
    ) -> Result<u16, DosIntegrationError> {
        let url = self.event_sender_url.as_deref().ok_or_else(|| {
            DosIntegrationError::Config("EVENT_SENDER_FUNCTION_URL is not set".to_string())
        })?;
        self.post(url, request, Some(x_ray_trace_id)).await
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        x_ray_trace_id: Option<&str>,
    ) -> Result<u16, DosIntegrationError> {
        debug!("Invoking function URL {}", url);

        let mut builder = self.http_client.post(url).json(body);
        if let Some(trace_id) = x_ray_trace_id {
            builder = builder.header(TRACE_ID_HEADER, trace_id);
        }
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DosIntegrationError::FunctionRejected {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        info!("Function URL {} answered {}", url, status);
        Ok(status.as_u16())
    }
}
