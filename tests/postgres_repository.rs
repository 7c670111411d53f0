use dos_integration::{
    dos::{
        repository::{DatabaseSettings, DosServiceRepository, PostgresDosRepository},
        secrets::StaticSecretProvider,
    },
    OdsCode, Result,
};
use std::sync::Arc;
use testcontainers::clients;
use testcontainers_modules::postgres::Postgres;
use tokio_postgres::NoTls;

const CREATE_SERVICES: &str = "
    CREATE TABLE services (
        id integer PRIMARY KEY,
        uid varchar(255),
        name varchar(255),
        odscode varchar(255),
        address varchar(512),
        town varchar(255),
        postcode varchar(16),
        web varchar(255),
        email varchar(255),
        fax varchar(255),
        nonpublicphone varchar(255),
        typeid integer,
        parentid integer,
        subregionid integer,
        statusid integer,
        createdtime timestamptz,
        modifiedtime timestamptz,
        publicphone varchar(255),
        publicname varchar(255)
    )";

async fn seed(port: u16) -> Result<()> {
    let url = format!("host=127.0.0.1 port={} user=postgres password=postgres dbname=postgres", port);
    let (client, connection) = tokio_postgres::connect(&url, NoTls).await?;
    tokio::spawn(connection);

    client.batch_execute(CREATE_SERVICES).await?;
    client
        .batch_execute(
            "INSERT INTO services (id, uid, name, odscode, postcode, web, typeid, statusid, createdtime, publicphone, publicname) VALUES
                (1, '101', 'Pharmacy One', 'FXA12001', 'LS1 1AA', 'www.one.example.com', 13, 1, now(), '0113 000 0001', 'Pharmacy One'),
                (2, '102', 'Pharmacy Two', 'FXA12', NULL, NULL, 131, 2, NULL, NULL, NULL),
                (3, '103', 'Other Pharmacy', 'FXB99001', 'LS2 2BB', NULL, 13, 1, NULL, NULL, NULL),
                (4, '104', 'Wildcard', 'FXA1_XYZ', NULL, NULL, 13, 1, NULL, NULL, NULL)",
        )
        .await?;
    Ok(())
}

fn repository(port: u16) -> PostgresDosRepository {
    PostgresDosRepository::new(
        DatabaseSettings {
            server: "127.0.0.1".to_string(),
            port,
            name: "postgres".to_string(),
            user_name: "postgres".to_string(),
            secret_name: "dos-db-secret".to_string(),
        },
        Arc::new(StaticSecretProvider::new("postgres".to_string())),
    )
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_services_matched_on_ods5_prefix() -> Result<()> {
    let docker = clients::Cli::default();
    let postgres = docker.run(Postgres::default());
    let port = postgres.get_host_port_ipv4(5432);
    seed(port).await?;

    let repository = repository(port);
    let mut services = repository
        .get_matching_services(&OdsCode::new("FXA12345"))
        .await?;
    services.sort_by_key(|service| service.id);

    let ids: Vec<i32> = services.iter().map(|service| service.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let first = &services[0];
    assert_eq!(first.web.as_deref(), Some("www.one.example.com"));
    assert_eq!(first.typeid, Some(13));
    assert!(first.createdtime.is_some());
    assert!(services[1].postcode.is_none());
    Ok(())
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_like_wildcards_are_literal() -> Result<()> {
    let docker = clients::Cli::default();
    let postgres = docker.run(Postgres::default());
    let port = postgres.get_host_port_ipv4(5432);
    seed(port).await?;

    let services = repository(port)
        .get_matching_services(&OdsCode::new("FXA1_XYZ"))
        .await?;

    let ids: Vec<i32> = services.iter().map(|service| service.id).collect();
    assert_eq!(ids, vec![4]);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_database_is_an_error() {
    let result = repository(1)
        .get_matching_services(&OdsCode::new("FXA12345"))
        .await;
    assert!(result.is_err());
}
