use crate::shared::error::DosIntegrationError;
use async_trait::async_trait;
use aws_sdk_secretsmanager::config::Region;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client;
use tracing::{debug, info};

/// Source of secret strings such as the DoS database password
#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn get_secret(&self, secret_name: &str) -> Result<String, DosIntegrationError>;
}

/// Reads secrets from AWS Secrets Manager
pub struct SecretsManagerProvider {
    client: Client,
}

impl SecretsManagerProvider {
    /// Builds a client for `region`, optionally using a named AWS profile
    pub async fn new(region: &str, profile: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()));
        if let Some(profile) = profile.filter(|p| !p.is_empty()) {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        info!("Secrets Manager client created for region {}", region);
        Self {
            client: Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl SecretProvider for SecretsManagerProvider {
    async fn get_secret(&self, secret_name: &str) -> Result<String, DosIntegrationError> {
        debug!("Fetching secret {}", secret_name);

        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_name)
            .send()
            .await
            .map_err(|e| {
                DosIntegrationError::Secrets(format!(
                    "failed to read secret '{}': {}",
                    secret_name,
                    DisplayErrorContext(&e)
                ))
            })?;

        response
            .secret_string()
            .map(str::to_string)
            .ok_or_else(|| {
                DosIntegrationError::Secrets(format!("secret '{}' has no SecretString", secret_name))
            })
    }
}

/// Fixed secret, for local runs and tests
#[derive(Clone)]
pub struct StaticSecretProvider {
    secret: String,
}

impl StaticSecretProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl SecretProvider for StaticSecretProvider {
    async fn get_secret(&self, _secret_name: &str) -> Result<String, DosIntegrationError> {
        Ok(self.secret.clone())
    }
}
