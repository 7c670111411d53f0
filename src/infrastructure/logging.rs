use crate::shared::constants::aws;
use crate::shared::types::RequestId;
use anyhow::Result;
use tracing::{info_span, Level, Span};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Maps a `LOG_LEVEL` value onto a tracing level.
///
/// Accepts the level names used by the deployment scripts (`WARNING`,
/// `CRITICAL`) alongside the tracing ones, in any case.
pub fn parse_log_level(level: &str) -> Result<Level, String> {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" | "WARNING" => Ok(Level::WARN),
        "ERROR" | "CRITICAL" => Ok(Level::ERROR),
        other => Err(format!("Invalid log level '{}'", other)),
    }
}

pub struct Logging {
    level: Level,
    json: bool,
}

impl Logging {
    pub fn new(level: &str) -> Result<Self> {
        let level = parse_log_level(level).map_err(|e| anyhow::anyhow!(e))?;
        Ok(Self { level, json: true })
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// `RUST_LOG` wins over the configured level when set
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("dos_integration={}", self.level)))
    }

    pub fn init(&self) -> Result<()> {
        let registry = tracing_subscriber::registry().with(self.env_filter());

        if self.json {
            registry
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_file(true)
                        .with_line_number(true)
                        .json()
                        .with_current_span(true),
                )
                .try_init()?;
        } else {
            registry.with(fmt::layer().with_target(false)).try_init()?;
        }

        tracing::debug!("Logger set to {} mode", self.level);
        Ok(())
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

/// X-Ray trace id from the request header, else the `_X_AMZN_TRACE_ID` value, else
/// the placeholder; blank values count as absent
pub fn resolve_trace_id(header: Option<&str>, env_value: Option<String>) -> String {
    header
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
        .or_else(|| env_value.filter(|id| !id.trim().is_empty()))
        .unwrap_or_else(|| aws::DEFAULT_TRACE_ID.to_string())
}

/// Fields attached to every log line written while handling one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    pub function_name: String,
    pub aws_request_id: RequestId,
    pub x_ray_trace_id: String,
}

impl InvocationContext {
    /// Builds the context for `function_name`, preferring the trace id from
    /// the request header, then `_X_AMZN_TRACE_ID`, then a fixed placeholder
    pub fn new(function_name: &str, aws_request_id: RequestId, trace_header: Option<&str>) -> Self {
        let function_name = std::env::var(aws::FUNCTION_NAME_ENV)
            .ok()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| function_name.to_string());

        Self {
            function_name,
            aws_request_id,
            x_ray_trace_id: resolve_trace_id(trace_header, std::env::var(aws::TRACE_ID_ENV).ok()),
        }
    }

    pub fn span(&self) -> Span {
        info_span!(
            "invocation",
            function_name = %self.function_name,
            aws_request_id = %self.aws_request_id,
            x_ray_trace_id = %self.x_ray_trace_id,
        )
    }
}
