use crate::{
    messaging::{
        domain::{ChangeRequestDispatcher, TracedChangeRequest},
        function_client::FunctionUrlClient,
    },
    processing::change_request::ChangeRequest,
    shared::error::DosIntegrationError,
};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

/// Queues change requests for the in-process sender
#[derive(Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::Sender<TracedChangeRequest>,
}

impl ChannelDispatcher {
    pub fn new(sender: mpsc::Sender<TracedChangeRequest>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ChangeRequestDispatcher for ChannelDispatcher {
    async fn dispatch(
        &self,
        request: ChangeRequest,
        x_ray_trace_id: &str,
    ) -> Result<(), DosIntegrationError> {
        debug!("Queueing change request {} for service {}", request.reference, request.service_id);
        self.sender
            .send(TracedChangeRequest::new(request, x_ray_trace_id))
            .await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "channel"
    }
}

/// Forwards change requests to a separately deployed event sender
#[derive(Clone)]
pub struct FunctionUrlDispatcher {
    client: FunctionUrlClient,
}

impl FunctionUrlDispatcher {
    pub fn new(client: FunctionUrlClient) -> Result<Self, DosIntegrationError> {
        if client.event_sender_url().is_none() {
            return Err(DosIntegrationError::Config(
                "EVENT_SENDER_FUNCTION_URL is required for function URL dispatch".to_string(),
            ));
        }
        Ok(Self { client })
    }
}

#[async_trait]
impl ChangeRequestDispatcher for FunctionUrlDispatcher {
    async fn dispatch(
        &self,
        request: ChangeRequest,
        x_ray_trace_id: &str,
    ) -> Result<(), DosIntegrationError> {
        self.client.post_change_request(&request, x_ray_trace_id).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "function-url"
    }
}
