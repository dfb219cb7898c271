//! Serial port discovery
//!
//! Enumeration sits behind the [`PortRegistry`] trait so handlers and the
//! dispatcher never touch the host facility directly. Every call re-enumerates;
//! devices come and go between requests.

mod fixed;
mod normalize;
mod system;

pub use fixed::FixedPortRegistry;
pub use normalize::{normalize, port_name};
pub use system::SystemPortRegistry;

use async_trait::async_trait;
use flexlingo_common::config::{PortSource, PortsConfig};
use flexlingo_common::{DeviceId, PortDescriptor};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Enumeration failure
#[derive(Debug, Error)]
pub enum EnumerationError {
    /// The OS helper used for enumeration is not installed (e.g. no udev on
    /// a minimal Linux host). Treated as "no ports" by [`list_ports`].
    #[error("Port enumeration helper missing: {0}")]
    HelperMissing(String),

    /// Any other enumeration failure
    #[error("Port enumeration failed: {0}")]
    Failed(String),
}

/// Source of serial port descriptors
#[async_trait]
pub trait PortRegistry: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Query the current set of ports
    async fn enumerate(&self) -> Result<Vec<PortDescriptor>, EnumerationError>;
}

/// Build the registry selected by configuration
pub fn registry_from_config(config: &PortsConfig) -> Arc<dyn PortRegistry> {
    match config.source {
        PortSource::System => Arc::new(SystemPortRegistry),
        PortSource::Fixed => Arc::new(FixedPortRegistry::new(config.fixed.clone())),
    }
}

/// Enumerate ports, mapping a missing helper to an empty list
pub async fn list_ports(
    registry: &dyn PortRegistry,
) -> Result<Vec<PortDescriptor>, EnumerationError> {
    match registry.enumerate().await {
        Ok(ports) => {
            debug!(registry = registry.name(), count = ports.len(), "Enumerated serial ports");
            Ok(ports)
        }
        Err(EnumerationError::HelperMissing(detail)) => {
            warn!(
                registry = registry.name(),
                detail = %detail,
                "Serial port helper unavailable, reporting no ports"
            );
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Currently enumerated port whose normalized id is `device`
pub async fn find_port(
    registry: &dyn PortRegistry,
    device: &DeviceId,
) -> Result<Option<PortDescriptor>, EnumerationError> {
    let ports = list_ports(registry).await?;
    Ok(ports.into_iter().find(|p| normalize(p) == *device))
}

/// Whether `device` is among the currently enumerated ports
pub async fn is_connected(
    registry: &dyn PortRegistry,
    device: &DeviceId,
) -> Result<bool, EnumerationError> {
    Ok(find_port(registry, device).await?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MissingHelper;

    #[async_trait]
    impl PortRegistry for MissingHelper {
        fn name(&self) -> &'static str {
            "missing-helper"
        }

        async fn enumerate(&self) -> Result<Vec<PortDescriptor>, EnumerationError> {
            Err(EnumerationError::HelperMissing("udevadm: not found".to_string()))
        }
    }

    struct Broken;

    #[async_trait]
    impl PortRegistry for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn enumerate(&self) -> Result<Vec<PortDescriptor>, EnumerationError> {
            Err(EnumerationError::Failed("permission denied".to_string()))
        }
    }

    #[tokio::test]
    async fn test_missing_helper_yields_empty_list() {
        let ports = list_ports(&MissingHelper).await.unwrap();
        assert!(ports.is_empty());
    }

    #[tokio::test]
    async fn test_other_failures_propagate() {
        let err = list_ports(&Broken).await.unwrap_err();
        assert!(matches!(err, EnumerationError::Failed(_)));
        assert!(is_connected(&Broken, &DeviceId::new("COM7")).await.is_err());
    }

    #[tokio::test]
    async fn test_is_connected_matches_case_insensitively() {
        let registry = FixedPortRegistry::new(vec![
            PortDescriptor::with_com_name("com7"),
            PortDescriptor::with_path("/dev/ttyACM0"),
        ]);

        assert!(is_connected(&registry, &DeviceId::new("COM7")).await.unwrap());
        assert!(is_connected(&registry, &DeviceId::new("/dev/ttyacm0")).await.unwrap());
        assert!(!is_connected(&registry, &DeviceId::new("COM8")).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_port_returns_reported_descriptor() {
        let registry = FixedPortRegistry::new(vec![
            PortDescriptor::with_com_name("COM7"),
            PortDescriptor::with_path("/dev/ttyACM0").meta("manufacturer", "Arduino"),
        ]);

        let found = find_port(&registry, &DeviceId::new("/DEV/TTYACM0"))
            .await
            .unwrap()
            .expect("port should be found");
        assert_eq!(found.path.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(found.metadata["manufacturer"], "Arduino");

        assert!(find_port(&registry, &DeviceId::new("COM9")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_helper_means_not_connected() {
        assert!(!is_connected(&MissingHelper, &DeviceId::new("COM7")).await.unwrap());
    }

    #[test]
    fn test_registry_from_config() {
        let config = PortsConfig {
            source: PortSource::Fixed,
            fixed: vec![PortDescriptor::with_path("COM1")],
        };
        assert_eq!(registry_from_config(&config).name(), "fixed");
        assert_eq!(registry_from_config(&PortsConfig::default()).name(), "system");
    }
}
