//! Host serial port enumeration via the `serialport` crate

use super::{EnumerationError, PortRegistry};
use async_trait::async_trait;
use flexlingo_common::PortDescriptor;
use serialport::{SerialPortInfo, SerialPortType};

/// Enumerates the ports the host OS currently exposes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPortRegistry;

#[async_trait]
impl PortRegistry for SystemPortRegistry {
    fn name(&self) -> &'static str {
        "system"
    }

    async fn enumerate(&self) -> Result<Vec<PortDescriptor>, EnumerationError> {
        // available_ports() walks sysfs / the registry synchronously
        let ports = tokio::task::spawn_blocking(serialport::available_ports)
            .await
            .map_err(|e| EnumerationError::Failed(format!("enumeration task failed: {}", e)))?
            .map_err(classify)?;

        Ok(ports.into_iter().map(describe).collect())
    }
}

/// Separate "helper not installed" from real failures
///
/// The facility reports a missing helper binary or device database as an I/O
/// NotFound error.
fn classify(err: serialport::Error) -> EnumerationError {
    match err.kind {
        serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
            EnumerationError::HelperMissing(err.description)
        }
        _ => EnumerationError::Failed(err.description),
    }
}

fn describe(info: SerialPortInfo) -> PortDescriptor {
    let descriptor = PortDescriptor::with_path(info.port_name);
    match info.port_type {
        SerialPortType::UsbPort(usb) => {
            let mut d = descriptor
                .meta("type", "usb")
                .meta("vendorId", format!("{:04x}", usb.vid))
                .meta("productId", format!("{:04x}", usb.pid));
            if let Some(manufacturer) = usb.manufacturer {
                d = d.meta("manufacturer", manufacturer);
            }
            if let Some(product) = usb.product {
                d = d.meta("product", product);
            }
            if let Some(serial) = usb.serial_number {
                d = d.meta("serialNumber", serial);
            }
            d
        }
        SerialPortType::PciPort => descriptor.meta("type", "pci"),
        SerialPortType::BluetoothPort => descriptor.meta("type", "bluetooth"),
        SerialPortType::Unknown => descriptor.meta("type", "unknown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_helper_missing() {
        let err = serialport::Error::new(
            serialport::ErrorKind::Io(std::io::ErrorKind::NotFound),
            "udevadm not found",
        );
        assert!(matches!(classify(err), EnumerationError::HelperMissing(_)));
    }

    #[test]
    fn test_other_errors_are_failures() {
        let err = serialport::Error::new(
            serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied),
            "permission denied",
        );
        assert!(matches!(classify(err), EnumerationError::Failed(_)));

        let err = serialport::Error::new(serialport::ErrorKind::Unknown, "boom");
        assert!(matches!(classify(err), EnumerationError::Failed(_)));
    }

    #[test]
    fn test_describe_non_usb_port() {
        let d = describe(SerialPortInfo {
            port_name: "/dev/ttyS0".to_string(),
            port_type: SerialPortType::PciPort,
        });
        assert_eq!(d.path.as_deref(), Some("/dev/ttyS0"));
        assert_eq!(d.metadata["type"], "pci");
    }
}
