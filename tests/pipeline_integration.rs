use dos_integration::{
    dos::repository::InMemoryDosRepository,
    infrastructure::{app::DosIntegration, config::Config, shutdown::ShutdownSignal},
    DosService, Result,
};
use mockito::Matcher;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const TEST_TIMEOUT: Duration = Duration::from_secs(8);

fn pharmacy_service(id: i32, odscode: &str) -> DosService {
    DosService {
        id,
        uid: Some(format!("{}", 1000 + id)),
        name: Some("Test Pharmacy".to_string()),
        odscode: Some(odscode.to_string()),
        postcode: Some("LS1 1AA".to_string()),
        web: Some("www.old.example.com".to_string()),
        typeid: Some(13),
        statusid: Some(1),
        publicphone: Some("0113 000 0000".to_string()),
        publicname: Some("Test Pharmacy".to_string()),
        ..Default::default()
    }
}

fn change_event(website: &str) -> Value {
    json!({
        "ODSCode": "FXA12345",
        "OrganisationName": "Test Pharmacy",
        "OrganisationTypeId": "PHA",
        "OrganisationSubType": "Community",
        "OrganisationStatus": "Visible",
        "Postcode": "LS1 1AA",
        "Website": website,
        "Phone": "0113 000 0000"
    })
}

fn test_config(endpoint_url: &str) -> Config {
    Config {
        change_request_endpoint_url: endpoint_url.to_string(),
        change_request_endpoint_timeout: 5,
        api_gateway_username: "user".to_string(),
        api_gateway_password: "pass".to_string(),
        db_server: "localhost".to_string(),
        db_name: "pathwaysdos".to_string(),
        db_user_name: "postgres".to_string(),
        db_secret_name: "dos-db-secret".to_string(),
        metrics_enabled: false,
        ..Config::default()
    }
}

struct RunningService {
    addr: SocketAddr,
    shutdown: ShutdownSignal,
    handle: JoinHandle<Result<()>>,
}

impl RunningService {
    async fn start(config: Config, services: Vec<DosService>) -> Result<Self> {
        let shutdown = ShutdownSignal::new();
        let app = DosIntegration::with_repository(
            config,
            shutdown.clone(),
            Arc::new(InMemoryDosRepository::with_services(services)),
        )?;
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(app.serve(listener));
        Ok(Self { addr, shutdown, handle })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn health(&self) -> Result<Value> {
        Ok(reqwest::get(self.url("/health")).await?.json().await?)
    }

    /// Polls /health until `pointer` reaches `expected`
    async fn wait_for(&self, pointer: &str, expected: u64) -> Result<()> {
        loop {
            let health = self.health().await?;
            if health.pointer(pointer).and_then(Value::as_u64) == Some(expected) {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    async fn stop(self) -> Result<()> {
        self.shutdown.shutdown();
        self.handle.await?
    }
}

#[tokio::test]
async fn test_change_event_reaches_change_request_endpoint() -> Result<()> {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/change-request")
            .match_header("authorization", "Basic dXNlcjpwYXNz")
            .match_body(Matcher::PartialJson(json!({
                "system": "DoS Integration",
                "service_id": "1",
                "changes": {"website": "www.new.example.com"}
            })))
            .with_status(201)
            .expect(1)
            .create_async()
            .await;

        let service = RunningService::start(
            test_config(&format!("{}/change-request", server.url())),
            vec![pharmacy_service(1, "FXA12001"), pharmacy_service(2, "FXB00001")],
        )
        .await?;

        let response = reqwest::Client::new()
            .post(service.url("/event-receiver"))
            .header("X-Amzn-Trace-Id", "Root=1-test")
            .json(&change_event("www.new.example.com"))
            .send()
            .await?;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await?;
        assert_eq!(body["message"], "Change event received");

        service.wait_for("/sender/change_requests_sent", 1).await?;
        mock.assert_async().await;

        let health = service.health().await?;
        assert_eq!(health["receiver"]["events_accepted"], 1);
        assert_eq!(health["processor"]["change_requests_dispatched"], 1);
        assert_eq!(health["sender"]["last_status"], 201);

        service.stop().await
    })
    .await?
}

#[tokio::test]
async fn test_invalid_change_event_is_rejected() -> Result<()> {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let service = RunningService::start(test_config("http://127.0.0.1:1/unused"), vec![]).await?;
        let client = reqwest::Client::new();

        let mut event = change_event("www.example.com");
        event["OrganisationTypeId"] = json!("GPB");
        let response = client.post(service.url("/event-receiver")).json(&event).send().await?;
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await?;
        assert!(body["message"].as_str().unwrap_or_default().contains("GPB"));

        let response = client
            .post(service.url("/event-receiver"))
            .body("not json")
            .send()
            .await?;
        assert_eq!(response.status(), 400);

        let health = service.health().await?;
        assert_eq!(health["receiver"]["events_rejected"], 2);
        assert_eq!(health["receiver"]["events_accepted"], 0);

        service.stop().await
    })
    .await?
}

#[tokio::test]
async fn test_event_sender_endpoint_delivers_change_request() -> Result<()> {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"service_id": "77"})))
            .with_status(200)
            .create_async()
            .await;

        let mut config = test_config("http://127.0.0.1:1/live-endpoint");
        config.mock_mode = true;
        config.mockserver_url = server.url();
        let service = RunningService::start(config, vec![]).await?;

        let response = reqwest::Client::new()
            .post(service.url("/event-sender"))
            .json(&json!({
                "reference": "ref-77",
                "system": "DoS Integration",
                "message": "manual change request",
                "service_id": "77",
                "changes": {"postcode": "LS2 2BB"}
            }))
            .send()
            .await?;
        assert_eq!(response.status(), 202);
        let body: Value = response.json().await?;
        assert_eq!(body["reference"], "ref-77");

        service.wait_for("/sender/change_requests_sent", 1).await?;
        mock.assert_async().await;

        let health = service.health().await?;
        assert_eq!(health["mock_mode"], true);

        service.stop().await
    })
    .await?
}

#[tokio::test]
async fn test_event_sender_rejects_empty_change_request() -> Result<()> {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let service = RunningService::start(test_config("http://127.0.0.1:1/unused"), vec![]).await?;

        let response = reqwest::Client::new()
            .post(service.url("/event-sender"))
            .json(&json!({
                "reference": "ref-1",
                "system": "DoS Integration",
                "message": "",
                "service_id": "1",
                "changes": {}
            }))
            .send()
            .await?;
        assert_eq!(response.status(), 400);

        service.stop().await
    })
    .await?
}

#[tokio::test]
async fn test_failed_delivery_is_counted() -> Result<()> {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/change-request")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let service = RunningService::start(
            test_config(&format!("{}/change-request", server.url())),
            vec![pharmacy_service(1, "FXA12001")],
        )
        .await?;

        let response = reqwest::Client::new()
            .post(service.url("/event-receiver"))
            .json(&change_event("www.new.example.com"))
            .send()
            .await?;
        assert_eq!(response.status(), 200);

        service.wait_for("/sender/change_requests_failed", 1).await?;
        mock.assert_async().await;

        let health = service.health().await?;
        assert_eq!(health["sender"]["change_requests_sent"], 0);
        assert_eq!(health["sender"]["last_status"], 500);

        service.stop().await
    })
    .await?
}
