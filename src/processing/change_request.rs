use crate::dos::service::{ChangeSet, DosService};
use crate::shared::constants::change_request::SYSTEM;
use crate::shared::types::RequestId;
use serde::{Deserialize, Serialize};

/// Request asking DoS to update one service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeRequest {
    pub reference: RequestId,
    pub system: String,
    pub message: String,
    pub service_id: String,
    pub changes: ChangeSet,
}

impl ChangeRequest {
    /// Builds a request for `service`, or `None` when nothing needs changing
    pub fn for_service(
        reference: RequestId,
        ods_code: &str,
        service: &DosService,
        changes: ChangeSet,
    ) -> Option<Self> {
        if changes.is_empty() {
            return None;
        }

        let fields: Vec<&str> = changes.fields().map(|field| field.as_str()).collect();
        Some(Self {
            reference,
            system: SYSTEM.to_string(),
            message: format!(
                "Change request for ODSCode {} updating {}",
                ods_code,
                fields.join(", ")
            ),
            service_id: service.id.to_string(),
            changes,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.service_id.trim().is_empty() {
            return Err("Missing service_id".to_string());
        }
        if self.changes.is_empty() {
            return Err("Change request has no changes".to_string());
        }
        Ok(())
    }
}
