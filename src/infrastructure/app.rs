use crate::{
    dos::{
        repository::{DosServiceRepository, PostgresDosRepository},
        secrets::{SecretProvider, SecretsManagerProvider, StaticSecretProvider},
    },
    events::{domain::ReceivedEvent, receiver::EventReceiver},
    infrastructure::{
        config::Config,
        http::{self, HttpState},
        metrics::Metrics,
        shutdown::ShutdownSignal,
    },
    messaging::{
        dispatcher::{ChannelDispatcher, FunctionUrlDispatcher},
        domain::{ChangeRequestDispatcher, TracedChangeRequest},
        function_client::FunctionUrlClient,
        sender::ChangeRequestSender,
    },
    processing::processor::EventProcessor,
    shared::{constants::pipeline, utils::time::format_duration},
};
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::{net::TcpListener, sync::mpsc, task::JoinHandle, time::interval};
use tracing::{error, info};

/// Wires the event receiver, processor and sender into one running service
pub struct DosIntegration {
    config: Config,
    shutdown: ShutdownSignal,
    receiver: EventReceiver,
    processor: EventProcessor,
    sender: ChangeRequestSender,
    event_rx: mpsc::Receiver<ReceivedEvent>,
    change_request_tx: mpsc::Sender<TracedChangeRequest>,
    change_request_rx: mpsc::Receiver<TracedChangeRequest>,
}

impl DosIntegration {
    /// Create the service against the DoS Postgres database
    pub async fn new(config: Config, shutdown: ShutdownSignal) -> Result<Self> {
        let secrets: Arc<dyn SecretProvider> = match &config.db_password {
            Some(password) => {
                info!("Using configured database password instead of Secrets Manager");
                Arc::new(StaticSecretProvider::new(password.clone()))
            }
            None => Arc::new(
                SecretsManagerProvider::new(&config.aws_region, config.aws_profile.as_deref()).await,
            ),
        };

        let repository = Arc::new(PostgresDosRepository::new(config.database(), secrets));
        Self::with_repository(config, shutdown, repository)
    }

    /// Create the service with any DoS repository
    pub fn with_repository(
        config: Config,
        shutdown: ShutdownSignal,
        repository: Arc<dyn DosServiceRepository>,
    ) -> Result<Self> {
        info!("Initializing DoS integration...");

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

        let (event_tx, event_rx) = mpsc::channel(pipeline::EVENT_CHANNEL_CAPACITY);
        let (change_request_tx, change_request_rx) =
            mpsc::channel(pipeline::CHANGE_REQUEST_CHANNEL_CAPACITY);

        let dispatcher: Arc<dyn ChangeRequestDispatcher> = match &config.event_sender_function_url {
            Some(_) => {
                let client = FunctionUrlClient::new(
                    config.event_receiver_function_url.clone(),
                    config.event_sender_function_url.clone(),
                    Duration::from_secs(config.change_request_endpoint_timeout),
                )?;
                Arc::new(FunctionUrlDispatcher::new(client)?)
            }
            None => Arc::new(ChannelDispatcher::new(change_request_tx.clone())),
        };
        info!("Change requests dispatched via {}", dispatcher.name());

        let receiver = EventReceiver::new(event_tx);
        let processor = EventProcessor::new(repository, dispatcher);
        let sender = ChangeRequestSender::new(config.change_request())?;

        info!("DoS integration initialized successfully");

        Ok(Self {
            config,
            shutdown,
            receiver,
            processor,
            sender,
            event_rx,
            change_request_tx,
            change_request_rx,
        })
    }

    /// Run on the configured HTTP address until shutdown
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.http_address()).await?;
        self.serve(listener).await
    }

    /// Run on an already bound listener until shutdown
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!("Starting DoS integration...");
        let started_at = Instant::now();

        let Self {
            config: _,
            shutdown,
            receiver,
            processor,
            sender,
            event_rx,
            change_request_tx,
            change_request_rx,
        } = self;

        let router = http::router(HttpState {
            receiver: receiver.clone(),
            processor: processor.clone(),
            sender: sender.clone(),
            sender_queue: change_request_tx,
            started_at,
        });

        let processor_handle = {
            let processor = processor.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { processor.run(event_rx, shutdown).await })
        };

        let sender_handle = {
            let sender = sender.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { sender.run(change_request_rx, shutdown).await })
        };

        let stats_handle = Self::start_stats_collection(
            receiver,
            processor,
            sender,
            shutdown.clone(),
            started_at,
        );

        let http_result = http::serve(listener, router, shutdown.clone()).await;
        if let Err(e) = &http_result {
            error!("HTTP server failed: {}", e);
        }

        // the server only returns early on failure; make sure the workers stop too
        shutdown.shutdown();
        Self::stop_services(vec![processor_handle, sender_handle, stats_handle]).await;

        info!("DoS integration stopped");
        http_result.map_err(Into::into)
    }

    fn start_stats_collection(
        receiver: EventReceiver,
        processor: EventProcessor,
        sender: ChangeRequestSender,
        shutdown: ShutdownSignal,
        started_at: Instant,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(pipeline::STATS_COLLECTION_INTERVAL));
            // first tick completes immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let uptime = started_at.elapsed().as_secs();
                        Metrics::set_uptime(uptime as f64);

                        let receiver_stats = receiver.get_stats().await;
                        let processor_stats = processor.get_stats().await;
                        let sender_stats = sender.get_stats().await;
                        info!(
                            "Stats - Received: {}, Rejected: {}, Processed: {}, Failed: {}, Sent: {}, Send failures: {}, Uptime: {}",
                            receiver_stats.events_received,
                            receiver_stats.events_rejected,
                            processor_stats.events_processed,
                            processor_stats.events_failed,
                            sender_stats.change_requests_sent,
                            sender_stats.change_requests_failed,
                            format_duration(uptime)
                        );
                    }
                    _ = shutdown.wait() => {
                        break;
                    }
                }
            }
        })
    }

    async fn stop_services(handles: Vec<JoinHandle<()>>) {
        info!("Stopping all services...");

        for handle in handles {
            match tokio::time::timeout(Duration::from_secs(10), handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Service task failed: {}", e),
                Err(_) => error!("Service task did not stop within 10s"),
            }
        }

        info!("All services stopped");
    }

    pub fn receiver(&self) -> &EventReceiver {
        &self.receiver
    }

    pub fn processor(&self) -> &EventProcessor {
        &self.processor
    }

    pub fn sender(&self) -> &ChangeRequestSender {
        &self.sender
    }
}
