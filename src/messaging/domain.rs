use crate::processing::change_request::ChangeRequest;
use crate::shared::error::DosIntegrationError;
use async_trait::async_trait;

/// A change request queued for the sender with the trace of the event behind it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracedChangeRequest {
    pub request: ChangeRequest,
    pub x_ray_trace_id: String,
}

impl TracedChangeRequest {
    pub fn new(request: ChangeRequest, x_ray_trace_id: impl Into<String>) -> Self {
        Self {
            request,
            x_ray_trace_id: x_ray_trace_id.into(),
        }
    }
}

/// Hand-off of change requests from the processor to the sender
#[async_trait]
pub trait ChangeRequestDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        request: ChangeRequest,
        x_ray_trace_id: &str,
    ) -> Result<(), DosIntegrationError>;

    /// Name used in logs
    fn name(&self) -> &str;
}

/// Sender statistics
#[derive(Debug, Clone, Default)]
pub struct SenderStats {
    pub change_requests_sent: u64,
    pub change_requests_failed: u64,
    pub last_status: Option<u16>,
    pub last_error: Option<String>,
    pub last_activity: Option<u64>,
}

impl SenderStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, status: u16) {
        self.change_requests_sent += 1;
        self.last_status = Some(status);
        self.update_last_activity();
    }

    /// Only a response from the endpoint moves `last_status`
    pub fn record_failure(&mut self, error: &DosIntegrationError) {
        self.change_requests_failed += 1;
        if let DosIntegrationError::ChangeRequestRejected { status, .. } = error {
            self.last_status = Some(*status);
        }
        self.last_error = Some(error.to_string());
        self.update_last_activity();
    }

    fn update_last_activity(&mut self) {
        self.last_activity = Some(crate::shared::utils::time::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_stats() {
        let mut stats = SenderStats::new();
        stats.record_success(201);
        stats.record_failure(&DosIntegrationError::ChangeRequestRejected {
            status: 500,
            body: "boom".to_string(),
        });

        assert_eq!(stats.change_requests_sent, 1);
        assert_eq!(stats.change_requests_failed, 1);
        assert_eq!(stats.last_status, Some(500));
        assert!(stats.last_error.unwrap().contains("boom"));
        assert!(stats.last_activity.is_some());
    }

    #[test]
    fn test_unsent_request_leaves_last_status() {
        let mut stats = SenderStats::new();
        stats.record_success(201);
        stats.record_failure(&DosIntegrationError::InvalidChangeRequest(
            "Change request has no changes".to_string(),
        ));

        assert_eq!(stats.change_requests_failed, 1);
        assert_eq!(stats.last_status, Some(201));
    }
}
