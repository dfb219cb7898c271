//! Port identity normalization

use flexlingo_common::{DeviceId, PortDescriptor};

/// Canonical id of a port descriptor
///
/// `path` is preferred, `comName` is the fallback. Empty values count as
/// absent. A descriptor with neither normalizes to the empty id, which never
/// matches a validated device.
pub fn normalize(descriptor: &PortDescriptor) -> DeviceId {
    DeviceId::new(port_name(descriptor).unwrap_or(""))
}

/// Name of the port exactly as the host reported it
///
/// This is what gets handed to the predictor: device nodes such as
/// `/dev/ttyACM0` are case-sensitive.
pub fn port_name(descriptor: &PortDescriptor) -> Option<&str> {
    [descriptor.path.as_deref(), descriptor.com_name.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
}
