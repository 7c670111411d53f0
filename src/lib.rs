pub mod shared;
pub mod events;
pub mod dos;
pub mod processing;
pub mod messaging;
pub mod infrastructure;

// Re-export commonly used types
pub use dos::service::{ChangeField, ChangeSet, DosService};
pub use events::domain::NhsEntity;
pub use processing::change_request::ChangeRequest;
pub use shared::error::DosIntegrationError;
pub use shared::types::{OdsCode, RequestId};

// Re-export result type
pub type Result<T> = anyhow::Result<T>;
