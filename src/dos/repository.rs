use crate::dos::secrets::SecretProvider;
use crate::dos::service::{DosService, DB_COLUMNS};
use crate::shared::constants::dos::CONNECT_TIMEOUT_SECS;
use crate::shared::error::DosIntegrationError;
use crate::shared::types::OdsCode;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, info};

/// Lookup of DoS services belonging to an organisation
#[async_trait]
pub trait DosServiceRepository: Send + Sync {
    /// Services whose ODS code starts with the first five characters of `odscode`
    async fn get_matching_services(
        &self,
        odscode: &OdsCode,
    ) -> Result<Vec<DosService>, DosIntegrationError>;
}

/// Connection details for the DoS database
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub server: String,
    pub port: u16,
    pub name: String,
    pub user_name: String,
    pub secret_name: String,
}

/// Reads services from the DoS Postgres database
pub struct PostgresDosRepository {
    settings: DatabaseSettings,
    secrets: Arc<dyn SecretProvider>,
}

impl PostgresDosRepository {
    pub fn new(settings: DatabaseSettings, secrets: Arc<dyn SecretProvider>) -> Self {
        Self { settings, secrets }
    }

    async fn connect(&self) -> Result<Client, DosIntegrationError> {
        let password = self.secrets.get_secret(&self.settings.secret_name).await?;

        info!("Attempting connection to database '{}'", self.settings.server);
        debug!(
            "host={}, port={}, dbname={}, user={}",
            self.settings.server, self.settings.port, self.settings.name, self.settings.user_name
        );

        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&self.settings.server)
            .port(self.settings.port)
            .dbname(&self.settings.name)
            .user(&self.settings.user_name)
            .password(password)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS));

        let (client, connection) = pg_config.connect(NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("DoS database connection error: {}", e);
            }
        });

        Ok(client)
    }
}

/// SQL used to find services sharing an ODS5 prefix
pub fn matching_services_query() -> String {
    format!(
        "SELECT {} FROM services WHERE odscode LIKE $1",
        DB_COLUMNS.join(", ")
    )
}

/// LIKE pattern matching every code that starts with `prefix`
pub fn like_prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn service_from_row(row: &Row) -> Result<DosService, tokio_postgres::Error> {
    Ok(DosService {
        id: row.try_get("id")?,
        uid: row.try_get("uid")?,
        name: row.try_get("name")?,
        odscode: row.try_get("odscode")?,
        address: row.try_get("address")?,
        town: row.try_get("town")?,
        postcode: row.try_get("postcode")?,
        web: row.try_get("web")?,
        email: row.try_get("email")?,
        fax: row.try_get("fax")?,
        nonpublicphone: row.try_get("nonpublicphone")?,
        typeid: row.try_get("typeid")?,
        parentid: row.try_get("parentid")?,
        subregionid: row.try_get("subregionid")?,
        statusid: row.try_get("statusid")?,
        createdtime: row.try_get("createdtime")?,
        modifiedtime: row.try_get("modifiedtime")?,
        publicphone: row.try_get("publicphone")?,
        publicname: row.try_get("publicname")?,
    })
}

#[async_trait]
impl DosServiceRepository for PostgresDosRepository {
    async fn get_matching_services(
        &self,
        odscode: &OdsCode,
    ) -> Result<Vec<DosService>, DosIntegrationError> {
        info!(
            "Searching for DoS services with ODSCode that matches first 5 digits of '{}'",
            odscode
        );

        let client = self.connect().await?;
        let sql = matching_services_query();
        let pattern = like_prefix_pattern(odscode.ods5());
        debug!("Running SQL command: {} with pattern {}", sql, pattern);

        let rows = client.query(sql.as_str(), &[&pattern]).await?;
        let services = rows
            .iter()
            .map(service_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        info!("Found {} DoS services for ODS5 '{}'", services.len(), odscode.ods5());
        Ok(services)
    }
}

/// In-memory repository backing local runs and tests
#[derive(Clone, Default)]
pub struct InMemoryDosRepository {
    services: Arc<RwLock<Vec<DosService>>>,
}

impl InMemoryDosRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_services(services: Vec<DosService>) -> Self {
        Self {
            services: Arc::new(RwLock::new(services)),
        }
    }

    pub async fn insert(&self, service: DosService) {
        self.services.write().await.push(service);
    }

    pub async fn len(&self) -> usize {
        self.services.read().await.len()
    }
}

#[async_trait]
impl DosServiceRepository for InMemoryDosRepository {
    async fn get_matching_services(
        &self,
        odscode: &OdsCode,
    ) -> Result<Vec<DosService>, DosIntegrationError> {
        let prefix = odscode.ods5();
        let services = self.services.read().await;
        Ok(services
            .iter()
            .filter(|service| {
                service
                    .odscode
                    .as_deref()
                    .map(|code| code.starts_with(prefix))
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}
