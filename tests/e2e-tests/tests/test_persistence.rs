//! File-backed catalog survives a server restart.

use catalog_client::{RegisterOutcome, Registration};
use e2e_tests::assertions::{assert_endpoints, assert_service_names};
use e2e_tests::TestRegistry;
use tempfile::tempdir;

const ID_A: &str = "11111111-1111-1111-1111-111111111111";

#[tokio::test]
async fn test_restart_keeps_registrations() {
    let dir = tempdir().unwrap();

    let registry = TestRegistry::start_file(dir.path()).await.unwrap();
    let registration = Registration {
        name: "db".to_string(),
        description: Some("primary".to_string()),
        address: Some("10.0.0.5".to_string()),
        port: Some(5432),
        node_id: Some(ID_A.to_string()),
    };
    registry.client.register(registration.clone()).await.unwrap();
    registry.stop().await.unwrap();

    let registry = TestRegistry::start_file(dir.path()).await.unwrap();
    let client = &registry.client;
    assert_service_names(client, &["db"]).await.unwrap();

    let details = client.service_details("db").await.unwrap().unwrap();
    assert_eq!(details.description.as_deref(), Some("primary"));
    assert_endpoints(&details, &[("10.0.0.5", 5432)]).unwrap();

    // Duplicate detection still applies to reloaded records.
    assert_eq!(
        client.register(registration).await.unwrap(),
        RegisterOutcome::AlreadyExists
    );

    registry.stop().await.unwrap();
}
