use crate::{
    events::{
        domain::{NhsEntity, ReceivedEvent},
        parser::parse_change_event,
    },
    infrastructure::{logging::InvocationContext, metrics::Metrics},
    shared::{
        constants::{dos::ODS5_LENGTH, nhs},
        error::{DosIntegrationError, ValidationError},
    },
};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};

/// Counters kept by the receiver
#[derive(Debug, Clone, Default)]
pub struct ReceiverStats {
    pub events_received: u64,
    pub events_accepted: u64,
    pub events_rejected: u64,
    /// Valid events that could not be handed to the processor
    pub events_failed: u64,
    pub last_rejection: Option<String>,
}

/// Admits NHS UK change events and forwards them to the processor
#[derive(Clone)]
pub struct EventReceiver {
    event_sender: mpsc::Sender<ReceivedEvent>,
    stats: Arc<RwLock<ReceiverStats>>,
}

impl EventReceiver {
    pub fn new(event_sender: mpsc::Sender<ReceivedEvent>) -> Self {
        Self {
            event_sender,
            stats: Arc::new(RwLock::new(ReceiverStats::default())),
        }
    }

    /// Checks an entity is a community pharmacy with a usable ODS code
    pub fn validate(entity: &NhsEntity) -> Result<(), ValidationError> {
        let ods_code = entity.ods_code().ok_or(ValidationError::MissingOdsCode)?;
        let code = ods_code.as_str();

        if code.chars().count() < ODS5_LENGTH {
            return Err(ValidationError::OdsCodeTooShort(code.to_string()));
        }

        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::OdsCodeNotAlphanumeric(code.to_string()));
        }

        let organisation_type = entity.organisation_type_id.as_deref().unwrap_or_default();
        if organisation_type != nhs::ORGANISATION_TYPE_PHARMACY {
            return Err(ValidationError::UnexpectedOrganisationType(
                organisation_type.to_string(),
            ));
        }

        let sub_type = entity.organisation_sub_type.as_deref().unwrap_or_default();
        if sub_type != nhs::ORGANISATION_SUB_TYPE_COMMUNITY {
            return Err(ValidationError::UnexpectedOrganisationSubType(sub_type.to_string()));
        }

        Ok(())
    }

    /// Parses, validates and queues a raw change event body
    pub async fn receive(
        &self,
        ctx: &InvocationContext,
        body: &[u8],
    ) -> Result<ReceivedEvent, DosIntegrationError> {
        self.stats.write().await.events_received += 1;
        Metrics::increment_events_received();

        let entity = match parse_change_event(body).and_then(|entity| {
            Self::validate(&entity)?;
            Ok(entity)
        }) {
            Ok(entity) => entity,
            Err(e) => {
                warn!("Change event rejected: {}", e);
                let mut stats = self.stats.write().await;
                stats.events_rejected += 1;
                stats.last_rejection = Some(e.to_string());
                Metrics::increment_events_rejected();
                return Err(e);
            }
        };

        let event = ReceivedEvent::new(ctx.aws_request_id.clone(), entity)
            .with_trace_id(ctx.x_ray_trace_id.clone());
        if let Err(e) = self.event_sender.send(event.clone()).await {
            let e = DosIntegrationError::from(e);
            error!("Change event could not be queued for processing: {}", e);
            self.stats.write().await.events_failed += 1;
            Metrics::increment_errors(e.kind());
            return Err(e);
        }

        self.stats.write().await.events_accepted += 1;
        info!(
            "Change event accepted for ODSCode {}",
            event.entity.ods_code.as_deref().unwrap_or_default()
        );
        Ok(event)
    }

    pub async fn get_stats(&self) -> ReceiverStats {
        self.stats.read().await.clone()
    }
}
