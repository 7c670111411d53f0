use crate::events::domain::NhsEntity;
use crate::shared::error::DosIntegrationError;
use serde_json::Value;
use tracing::debug;

/// Parses the body of a change event into an NHS UK entity.
///
/// The body must be a JSON object; anything else is reported as malformed
/// rather than as a validation failure.
pub fn parse_change_event(body: &[u8]) -> Result<NhsEntity, DosIntegrationError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| DosIntegrationError::MalformedEvent(format!("body is not valid JSON: {}", e)))?;

    if !value.is_object() {
        return Err(DosIntegrationError::MalformedEvent(
            "body must be a JSON object".to_string(),
        ));
    }

    let entity: NhsEntity = serde_json::from_value(value)
        .map_err(|e| DosIntegrationError::MalformedEvent(e.to_string()))?;

    debug!("Parsed change event for ODSCode {:?}", entity.ods_code);
    Ok(entity)
}
