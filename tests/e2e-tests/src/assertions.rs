//! Custom assertions for E2E tests

use catalog_client::{RegistryClient, ServiceDetails};

/// Assert that `details` lists exactly these endpoints, in order.
pub fn assert_endpoints(details: &ServiceDetails, expected: &[(&str, u16)]) -> Result<(), String> {
    let actual: Vec<(&str, u16)> = details
        .nodes
        .iter()
        .map(|n| (n.address.as_str(), n.service_port))
        .collect();

    if actual == expected {
        Ok(())
    } else {
        Err(format!(
            "Service '{}' has endpoints {:?}, expected {:?}",
            details.name, actual, expected
        ))
    }
}

/// Assert that the registry lists exactly these service names, in order.
pub async fn assert_service_names(client: &RegistryClient, expected: &[&str]) -> Result<(), String> {
    let services = client
        .list_services()
        .await
        .map_err(|e| format!("list failed: {}", e))?;
    let names: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();

    if names == expected {
        Ok(())
    } else {
        Err(format!("Registry lists {:?}, expected {:?}", names, expected))
    }
}
