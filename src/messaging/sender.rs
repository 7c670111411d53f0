use crate::{
    infrastructure::{
        config::ChangeRequestSettings, logging::InvocationContext, metrics::Metrics,
        shutdown::ShutdownSignal,
    },
    messaging::domain::{SenderStats, TracedChangeRequest},
    processing::change_request::ChangeRequest,
    shared::{constants::functions, error::DosIntegrationError},
};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn, Instrument};

/// Delivers change requests to the DoS change request endpoint
#[derive(Clone)]
pub struct ChangeRequestSender {
    settings: ChangeRequestSettings,
    http_client: Client,
    stats: Arc<RwLock<SenderStats>>,
}

impl ChangeRequestSender {
    pub fn new(settings: ChangeRequestSettings) -> Result<Self, DosIntegrationError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        if settings.mock_mode {
            info!("Mock mode on, change requests go to {}", settings.mockserver_url);
        }
        if settings.username.is_empty() {
            warn!("No API gateway username set, change requests are sent without basic auth");
        }

        Ok(Self {
            settings,
            http_client,
            stats: Arc::new(RwLock::new(SenderStats::new())),
        })
    }

    /// Sends one change request, returning the endpoint's status code
    pub async fn send(&self, request: &ChangeRequest) -> Result<u16, DosIntegrationError> {
        let start_time = Instant::now();
        let result = self.post(request).await;
        Metrics::record_change_request_duration(start_time.elapsed().as_secs_f64());

        let mut stats = self.stats.write().await;
        match &result {
            Ok(status) => {
                stats.record_success(*status);
                Metrics::increment_change_requests_sent(*status);
                info!(
                    "Change request {} for service {} accepted with status {}",
                    request.reference, request.service_id, status
                );
            }
            Err(e) => {
                stats.record_failure(e);
                Metrics::increment_change_requests_failed();
                error!(
                    "Change request {} for service {} failed: {}",
                    request.reference, request.service_id, e
                );
            }
        }

        result
    }

    async fn post(&self, request: &ChangeRequest) -> Result<u16, DosIntegrationError> {
        request
            .validate()
            .map_err(DosIntegrationError::InvalidChangeRequest)?;

        let mut builder = self.http_client.post(self.settings.target_url()).json(request);
        if !self.settings.username.is_empty() {
            builder = builder.basic_auth(&self.settings.username, Some(&self.settings.password));
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DosIntegrationError::ChangeRequestRejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(status.as_u16())
    }

    /// Sends every change request arriving on `change_requests` until shutdown,
    /// each inside an event sender invocation span
    pub async fn run(
        &self,
        mut change_requests: mpsc::Receiver<TracedChangeRequest>,
        shutdown: ShutdownSignal,
    ) {
        info!("Event sender started, waiting for change requests...");

        loop {
            tokio::select! {
                request = change_requests.recv() => {
                    match request {
                        Some(TracedChangeRequest { request, x_ray_trace_id }) => {
                            let ctx = InvocationContext::new(
                                functions::EVENT_SENDER,
                                request.reference.clone(),
                                Some(x_ray_trace_id.as_str()),
                            );
                            // failures are recorded in stats and logs
                            let _ = self.send(&request).instrument(ctx.span()).await;
                        }
                        None => {
                            warn!("Change request channel closed, stopping event sender");
                            break;
                        }
                    }
                }
                _ = shutdown.wait() => {
                    info!("Event sender shutdown signal received");
                    break;
                }
            }
        }

        info!("Event sender stopped");
    }

    pub async fn get_stats(&self) -> SenderStats {
        self.stats.read().await.clone()
    }

    pub fn settings(&self) -> &ChangeRequestSettings {
        &self.settings
    }
}
