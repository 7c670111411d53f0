use crate::{
    dos::repository::DosServiceRepository,
    events::domain::ReceivedEvent,
    infrastructure::{logging::InvocationContext, metrics::Metrics, shutdown::ShutdownSignal},
    messaging::domain::ChangeRequestDispatcher,
    processing::change_request::ChangeRequest,
    shared::{
        constants::functions,
        error::{DosIntegrationError, ValidationError},
    },
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn, Instrument};

/// Result of processing one change event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingOutcome {
    pub services_matched: usize,
    pub services_valid: usize,
    pub change_requests_dispatched: usize,
    pub change_requests_failed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessorStats {
    pub events_processed: u64,
    pub events_failed: u64,
    pub change_requests_dispatched: u64,
    pub change_requests_failed: u64,
    pub last_error: Option<String>,
}

/// Compares NHS UK entities with the DoS services sharing their ODS5 prefix
#[derive(Clone)]
pub struct EventProcessor {
    repository: Arc<dyn DosServiceRepository>,
    dispatcher: Arc<dyn ChangeRequestDispatcher>,
    stats: Arc<RwLock<ProcessorStats>>,
}

impl EventProcessor {
    pub fn new(
        repository: Arc<dyn DosServiceRepository>,
        dispatcher: Arc<dyn ChangeRequestDispatcher>,
    ) -> Self {
        Self {
            repository,
            dispatcher,
            stats: Arc::new(RwLock::new(ProcessorStats::default())),
        }
    }

    pub async fn process(
        &self,
        event: &ReceivedEvent,
    ) -> Result<ProcessingOutcome, DosIntegrationError> {
        let start_time = Instant::now();
        let result = self.process_inner(event).await;
        Metrics::record_event_processing_duration(start_time.elapsed().as_secs_f64());

        let mut stats = self.stats.write().await;
        match &result {
            Ok(outcome) => {
                stats.events_processed += 1;
                stats.change_requests_dispatched += outcome.change_requests_dispatched as u64;
                stats.change_requests_failed += outcome.change_requests_failed as u64;
            }
            Err(e) => {
                stats.events_failed += 1;
                stats.last_error = Some(e.to_string());
                Metrics::increment_errors(e.kind());
            }
        }

        result
    }

    async fn process_inner(
        &self,
        event: &ReceivedEvent,
    ) -> Result<ProcessingOutcome, DosIntegrationError> {
        let ods_code = event
            .entity
            .ods_code()
            .ok_or(ValidationError::MissingOdsCode)?;
        debug!(
            "Processing change event {} received {}s ago",
            event.request_id,
            event.age_seconds()
        );

        let services = self.repository.get_matching_services(&ods_code).await?;
        let mut outcome = ProcessingOutcome {
            services_matched: services.len(),
            ..Default::default()
        };

        if services.is_empty() {
            warn!("No matching DoS services found for ODSCode {}", ods_code);
        }

        for service in &services {
            if !service.is_valid_for_change() {
                debug!("Skipping service {} (type or status not eligible)", service);
                continue;
            }
            outcome.services_valid += 1;

            let changes = service.get_changes(&event.entity);
            let Some(request) = ChangeRequest::for_service(
                event.request_id.clone(),
                ods_code.as_str(),
                service,
                changes,
            ) else {
                debug!("Service {} already matches NHS UK", service);
                continue;
            };

            info!(
                "Dispatching change request for service {} via {}: {}",
                service,
                self.dispatcher.name(),
                request.message
            );
            let reference = request.reference.clone();
            match self.dispatcher.dispatch(request, &event.x_ray_trace_id).await {
                Ok(()) => outcome.change_requests_dispatched += 1,
                Err(e) => {
                    error!(
                        "Failed to dispatch change request {} for service {}: {}",
                        reference, service, e
                    );
                    Metrics::increment_errors(e.kind());
                    outcome.change_requests_failed += 1;
                }
            }
        }

        Metrics::record_services_matched(
            outcome.services_matched as u64,
            outcome.services_valid as u64,
        );
        info!(
            "Processed ODSCode {}: {} matched, {} valid, {} change requests, {} failed",
            ods_code,
            outcome.services_matched,
            outcome.services_valid,
            outcome.change_requests_dispatched,
            outcome.change_requests_failed
        );
        Ok(outcome)
    }

    /// Processes every event arriving on `events` until shutdown or the channel closes
    pub async fn run(&self, mut events: mpsc::Receiver<ReceivedEvent>, shutdown: ShutdownSignal) {
        info!("Event processor started, waiting for events...");

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            let ctx = InvocationContext::new(
                                functions::EVENT_PROCESSOR,
                                event.request_id.clone(),
                                Some(event.x_ray_trace_id.as_str()),
                            );
                            if let Err(e) = self.process(&event).instrument(ctx.span()).await {
                                error!("Failed to process event {}: {}", event.request_id, e);
                            }
                        }
                        None => {
                            warn!("Event channel closed, stopping event processor");
                            break;
                        }
                    }
                }
                _ = shutdown.wait() => {
                    info!("Event processor shutdown signal received");
                    break;
                }
            }
        }

        info!("Event processor stopped");
    }

    pub async fn get_stats(&self) -> ProcessorStats {
        self.stats.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dos::repository::InMemoryDosRepository;
    use crate::dos::service::{ChangeField, DosService};
    use crate::events::domain::NhsEntity;
    use crate::messaging::dispatcher::ChannelDispatcher;
    use crate::messaging::domain::TracedChangeRequest;
    use crate::shared::types::RequestId;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn service(id: i32, odscode: &str, typeid: i32, statusid: i32) -> DosService {
        DosService {
            id,
            odscode: Some(odscode.to_string()),
            typeid: Some(typeid),
            statusid: Some(statusid),
            web: Some("www.example.com".to_string()),
            postcode: Some("LS1 1AA".to_string()),
            publicphone: Some("0113 000 0000".to_string()),
            publicname: Some("Pharmacy".to_string()),
            ..Default::default()
        }
    }

    fn event(website: &str) -> ReceivedEvent {
        ReceivedEvent::new(
            RequestId::new(),
            NhsEntity {
                ods_code: Some("FXA12345".to_string()),
                organisation_name: Some("Pharmacy".to_string()),
                postcode: Some("LS1 1AA".to_string()),
                website: Some(website.to_string()),
                phone: Some("0113 000 0000".to_string()),
                ..Default::default()
            },
        )
    }

    fn processor(
        services: Vec<DosService>,
    ) -> (EventProcessor, mpsc::Receiver<TracedChangeRequest>) {
        let (tx, rx) = mpsc::channel(16);
        let processor = EventProcessor::new(
            Arc::new(InMemoryDosRepository::with_services(services)),
            Arc::new(ChannelDispatcher::new(tx)),
        );
        (processor, rx)
    }

    #[tokio::test]
    async fn test_only_valid_services_get_requests() {
        let (processor, mut rx) = processor(vec![
            service(1, "FXA12001", 13, 1),
            service(2, "FXA12002", 99, 1),
            service(3, "FXA12003", 131, 2),
            service(4, "FXB00001", 13, 1),
        ]);

        let outcome = processor.process(&event("www.new.example.com")).await.unwrap();
        assert_eq!(
            outcome,
            ProcessingOutcome {
                services_matched: 3,
                services_valid: 1,
                change_requests_dispatched: 1,
                change_requests_failed: 0,
            }
        );

        let request = rx.recv().await.unwrap().request;
        assert_eq!(request.service_id, "1");
        assert_eq!(request.changes.len(), 1);
        assert_eq!(
            request.changes.get(ChangeField::Website),
            Some(&Some("www.new.example.com".to_string()))
        );
    }

    #[tokio::test]
    async fn test_no_request_when_in_line() {
        let (processor, mut rx) = processor(vec![service(1, "FXA12001", 13, 1)]);

        let outcome = processor.process(&event("www.example.com")).await.unwrap();
        assert_eq!(outcome.services_valid, 1);
        assert_eq!(outcome.change_requests_dispatched, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reference_follows_event() {
        let (processor, mut rx) = processor(vec![service(1, "FXA12001", 137, 1)]);
        let event = event("www.other.example.com").with_trace_id("Root=1-processor");

        processor.process(&event).await.unwrap();
        let queued = rx.recv().await.unwrap();
        assert_eq!(queued.request.reference, event.request_id);
        assert_eq!(queued.x_ray_trace_id, "Root=1-processor");
    }

    #[tokio::test]
    async fn test_missing_ods_code_fails() {
        let (processor, _rx) = processor(vec![]);
        let event = ReceivedEvent::new(RequestId::new(), NhsEntity::default());

        assert!(processor.process(&event).await.is_err());
        let stats = processor.get_stats().await;
        assert_eq!(stats.events_failed, 1);
        assert!(stats.last_error.is_some());
    }

    #[tokio::test]
    async fn test_run_drains_until_channel_closes() {
        let (processor, mut rx) = processor(vec![service(1, "FXA12001", 13, 1)]);
        let (event_tx, event_rx) = mpsc::channel(4);

        event_tx.send(event("www.one.example.com")).await.unwrap();
        event_tx.send(event("www.two.example.com")).await.unwrap();
        drop(event_tx);

        processor.run(event_rx, ShutdownSignal::new()).await;

        assert_eq!(processor.get_stats().await.events_processed, 2);
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
    }

    /// Fails the first dispatch, accepts the rest
    #[derive(Default)]
    struct FlakyDispatcher {
        attempts: AtomicUsize,
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChangeRequestDispatcher for FlakyDispatcher {
        async fn dispatch(
            &self,
            request: ChangeRequest,
            _x_ray_trace_id: &str,
        ) -> Result<(), DosIntegrationError> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(DosIntegrationError::ChannelSend("channel closed".to_string()));
            }
            self.delivered.lock().unwrap().push(request.service_id);
            Ok(())
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_failed_dispatch_does_not_skip_remaining_services() {
        let dispatcher = Arc::new(FlakyDispatcher::default());
        let processor = EventProcessor::new(
            Arc::new(InMemoryDosRepository::with_services(vec![
                service(1, "FXA12001", 13, 1),
                service(2, "FXA12002", 131, 1),
                service(3, "FXA12003", 137, 1),
            ])),
            dispatcher.clone(),
        );

        let outcome = processor.process(&event("www.new.example.com")).await.unwrap();
        assert_eq!(outcome.services_valid, 3);
        assert_eq!(outcome.change_requests_dispatched, 2);
        assert_eq!(outcome.change_requests_failed, 1);
        assert_eq!(dispatcher.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.delivered.lock().unwrap().len(), 2);

        let stats = processor.get_stats().await;
        assert_eq!(stats.events_processed, 1);
        assert_eq!(stats.change_requests_dispatched, 2);
        assert_eq!(stats.change_requests_failed, 1);
    }
}
