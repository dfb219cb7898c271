//! Statically configured port list

use super::{EnumerationError, PortRegistry};
use async_trait::async_trait;
use flexlingo_common::PortDescriptor;

/// Registry that always reports the same descriptors
///
/// Used for demos on machines without the glove attached, and in tests.
#[derive(Debug, Clone, Default)]
pub struct FixedPortRegistry {
    ports: Vec<PortDescriptor>,
}

impl FixedPortRegistry {
    pub fn new(ports: Vec<PortDescriptor>) -> Self {
        Self { ports }
    }
}

#[async_trait]
impl PortRegistry for FixedPortRegistry {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn enumerate(&self) -> Result<Vec<PortDescriptor>, EnumerationError> {
        Ok(self.ports.clone())
    }
}
