//! Register, discover and deregister through a live server.

use catalog_client::{DeregisterOutcome, Error, RegisterOutcome, Registration};
use e2e_tests::assertions::{assert_endpoints, assert_service_names};
use e2e_tests::TestRegistry;

const ID_A: &str = "11111111-1111-1111-1111-111111111111";
const ID_B: &str = "22222222-2222-2222-2222-222222222222";

fn node(name: &str, address: &str, port: u16, id: &str) -> Registration {
    Registration {
        name: name.to_string(),
        description: None,
        address: Some(address.to_string()),
        port: Some(port),
        node_id: Some(id.to_string()),
    }
}

#[tokio::test]
async fn test_full_lifecycle() {
    let registry = TestRegistry::start_memory().await.unwrap();
    let client = &registry.client;

    assert!(client.health().await.unwrap());
    assert_service_names(client, &[]).await.unwrap();

    let web = node("web", "10.0.0.1", 8080, ID_A);
    assert_eq!(client.register(web.clone()).await.unwrap(), RegisterOutcome::Created);
    assert_eq!(
        client.register(web).await.unwrap(),
        RegisterOutcome::AlreadyExists
    );
    assert_service_names(client, &["web"]).await.unwrap();

    let details = client.service_details("web").await.unwrap().unwrap();
    assert_endpoints(&details, &[("10.0.0.1", 8080)]).unwrap();

    assert_eq!(
        client.deregister("web", Some(ID_A.to_string())).await.unwrap(),
        DeregisterOutcome::Removed
    );
    assert_service_names(client, &[]).await.unwrap();
    assert!(client.service_details("web").await.unwrap().is_none());
    assert_eq!(
        client.deregister("web", Some(ID_A.to_string())).await.unwrap(),
        DeregisterOutcome::NotFound
    );

    registry.stop().await.unwrap();
}

#[tokio::test]
async fn test_nodes_accumulate_and_move() {
    let registry = TestRegistry::start_memory().await.unwrap();
    let client = &registry.client;

    client.register(node("web", "10.0.0.1", 8080, ID_A)).await.unwrap();
    client.register(node("web", "10.0.0.2", 8080, ID_B)).await.unwrap();
    let details = client.service_details("web").await.unwrap().unwrap();
    assert_endpoints(&details, &[("10.0.0.1", 8080), ("10.0.0.2", 8080)]).unwrap();

    // Same node id on a new endpoint replaces the old entry in place.
    assert_eq!(
        client.register(node("web", "10.0.0.1", 9090, ID_A)).await.unwrap(),
        RegisterOutcome::Created
    );
    let details = client.service_details("web").await.unwrap().unwrap();
    assert_endpoints(&details, &[("10.0.0.1", 9090), ("10.0.0.2", 8080)]).unwrap();

    // Removing one of two nodes keeps the service.
    client.deregister("web", Some(ID_A.to_string())).await.unwrap();
    let details = client.service_details("web").await.unwrap().unwrap();
    assert_endpoints(&details, &[("10.0.0.2", 8080)]).unwrap();

    registry.stop().await.unwrap();
}

#[tokio::test]
async fn test_descriptions_and_listing_order() {
    let registry = TestRegistry::start_memory().await.unwrap();
    let client = &registry.client;

    for name in ["zeta", "alpha", "mid"] {
        let mut registration = node(name, "10.0.0.1", 8080, ID_A);
        registration.description = Some(format!("{} service", name));
        client.register(registration).await.unwrap();
    }
    assert_service_names(client, &["zeta", "alpha", "mid"]).await.unwrap();

    let services = client.list_services().await.unwrap();
    assert_eq!(services[1].description.as_deref(), Some("alpha service"));

    registry.stop().await.unwrap();
}

#[tokio::test]
async fn test_validation_errors_reach_the_client() {
    let registry = TestRegistry::start_memory().await.unwrap();
    let client = &registry.client;

    let err = client
        .register(node("", "10.0.0.1", 8080, ID_A))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "'name' can't be null");

    let err = client
        .register(node("web", "10.0.0.1", 0, ID_A))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "'service_port' can't be null");

    let err = client
        .register(node("web", "10.0.0.1", 8080, "not-an-id"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));

    assert_service_names(client, &[]).await.unwrap();
    registry.stop().await.unwrap();
}

#[tokio::test]
async fn test_hostname_address_is_resolved() {
    let registry = TestRegistry::start_memory().await.unwrap();
    let client = &registry.client;

    client
        .register(node("local", "localhost", 8080, ID_A))
        .await
        .unwrap();
    let details = client.service_details("local").await.unwrap().unwrap();
    let address: std::net::IpAddr = details.nodes[0].address.parse().unwrap();
    assert!(address.is_ipv4());

    registry.stop().await.unwrap();
}
