// Infrastructure - configuration, logging, metrics, HTTP surface and the application orchestrator

pub mod app;
pub mod config;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod shutdown;
