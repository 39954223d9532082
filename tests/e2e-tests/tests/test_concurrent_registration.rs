//! Many clients registering under one name must not lose nodes.

use catalog_client::{RegisterOutcome, Registration, RegistryClient};
use e2e_tests::TestRegistry;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_registrations_under_one_name() {
    let registry = TestRegistry::start_memory().await.unwrap();
    let base_url = registry.client.base_url().to_string();

    let mut handles = Vec::new();
    for i in 0..24u16 {
        let client = RegistryClient::new(base_url.clone());
        handles.push(tokio::spawn(async move {
            let registration = Registration {
                name: "api".to_string(),
                description: None,
                address: Some(format!("10.0.1.{}", i)),
                port: Some(8000 + i),
                node_id: Some(format!("00000000-0000-0000-0000-{:012}", i)),
            };
            client.register(registration).await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), RegisterOutcome::Created);
    }

    let details = registry.client.service_details("api").await.unwrap().unwrap();
    assert_eq!(details.nodes.len(), 24);

    let services = registry.client.list_services().await.unwrap();
    assert_eq!(services.len(), 1);

    registry.stop().await.unwrap();
}
