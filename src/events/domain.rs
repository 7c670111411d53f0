use crate::shared::constants::aws::DEFAULT_TRACE_ID;
use crate::shared::types::{OdsCode, RequestId};
use serde::{Deserialize, Serialize};

/// NHS UK organisation as carried by a change event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NhsEntity {
    #[serde(rename = "ODSCode", default)]
    pub ods_code: Option<String>,
    #[serde(rename = "OrganisationName", default)]
    pub organisation_name: Option<String>,
    #[serde(rename = "OrganisationTypeId", default)]
    pub organisation_type_id: Option<String>,
    #[serde(rename = "OrganisationSubType", default)]
    pub organisation_sub_type: Option<String>,
    #[serde(rename = "OrganisationStatus", default)]
    pub organisation_status: Option<String>,
    #[serde(rename = "Postcode", default)]
    pub postcode: Option<String>,
    #[serde(rename = "Website", default)]
    pub website: Option<String>,
    #[serde(rename = "Phone", default)]
    pub phone: Option<String>,
    #[serde(rename = "Address1", default, skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(rename = "Address2", default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(rename = "Address3", default, skip_serializing_if = "Option::is_none")]
    pub address3: Option<String>,
    #[serde(rename = "City", default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl NhsEntity {
    pub fn ods_code(&self) -> Option<OdsCode> {
        self.ods_code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
            .map(OdsCode::from)
    }
}

/// A validated change event travelling from the receiver to the processor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedEvent {
    pub request_id: RequestId,
    /// X-Ray trace of the invocation that received the event
    pub x_ray_trace_id: String,
    pub entity: NhsEntity,
    pub received_at: u64,
}

impl ReceivedEvent {
    pub fn new(request_id: RequestId, entity: NhsEntity) -> Self {
        Self {
            request_id,
            x_ray_trace_id: DEFAULT_TRACE_ID.to_string(),
            entity,
            received_at: crate::shared::utils::time::now(),
        }
    }

    pub fn with_trace_id(mut self, x_ray_trace_id: impl Into<String>) -> Self {
        self.x_ray_trace_id = x_ray_trace_id.into();
        self
    }

    /// Seconds spent between receipt and now
    pub fn age_seconds(&self) -> u64 {
        crate::shared::utils::time::now().saturating_sub(self.received_at)
    }
}
