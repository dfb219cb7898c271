//! Device and model identifiers shared between the service and its tests

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Canonical serial device identifier (e.g. `COM7`, `/DEV/TTYACM0`)
///
/// Always stored uppercase so that equality is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Canonicalize a raw identifier (trim + uppercase)
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(&raw))
    }
}

/// Which predictor implementation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSelector {
    /// Random forest classifier
    Rf,
    /// Bidirectional LSTM classifier
    Bilstm,
}

impl ModelSelector {
    /// Message returned to callers for any unrecognized selector
    pub const INVALID_MESSAGE: &'static str = "Model must be 'rf' or 'bilstm'";

    pub const ALL: [ModelSelector; 2] = [ModelSelector::Rf, ModelSelector::Bilstm];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSelector::Rf => "rf",
            ModelSelector::Bilstm => "bilstm",
        }
    }
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rf" => Ok(ModelSelector::Rf),
            "bilstm" => Ok(ModelSelector::Bilstm),
            _ => Err(Error::InvalidInput(Self::INVALID_MESSAGE.to_string())),
        }
    }
}

/// One serial endpoint as reported by the host
///
/// Platforms and drivers disagree on where the endpoint name lives, so both
/// the `path` and legacy `comName` spellings are accepted. Everything else
/// is kept as opaque metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(
        default,
        rename = "comName",
        alias = "com_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub com_name: Option<String>,

    #[serde(flatten)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl PortDescriptor {
    /// Descriptor exposing its name under the primary `path` field
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Descriptor exposing its name under the legacy `comName` field
    pub fn with_com_name(name: impl Into<String>) -> Self {
        Self {
            com_name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Attach a metadata entry (builder style)
    pub fn meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Label produced by one predictor run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_is_case_insensitive() {
        assert_eq!(DeviceId::new("com7"), DeviceId::new("COM7"));
        assert_eq!(DeviceId::new("  Com7 ").as_str(), "COM7");
        assert!(DeviceId::new("   ").is_empty());
    }

    #[test]
    fn test_model_selector_parse() {
        assert_eq!("rf".parse::<ModelSelector>().unwrap(), ModelSelector::Rf);
        assert_eq!("BiLSTM".parse::<ModelSelector>().unwrap(), ModelSelector::Bilstm);
        assert_eq!(" rf ".parse::<ModelSelector>().unwrap(), ModelSelector::Rf);

        for bad in ["", "xyz", "lstm", "r f", "rf2"] {
            match bad.parse::<ModelSelector>() {
                Err(Error::InvalidInput(msg)) => assert_eq!(msg, ModelSelector::INVALID_MESSAGE),
                other => panic!("expected InvalidInput for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_port_descriptor_accepts_both_spellings() {
        let a: PortDescriptor =
            serde_json::from_str(r#"{"comName":"COM7","manufacturer":"Arduino"}"#).unwrap();
        assert_eq!(a.com_name.as_deref(), Some("COM7"));
        assert_eq!(a.path, None);
        assert_eq!(a.metadata["manufacturer"], "Arduino");

        let b: PortDescriptor = serde_json::from_str(r#"{"path":"/dev/ttyACM0"}"#).unwrap();
        assert_eq!(b.path.as_deref(), Some("/dev/ttyACM0"));
        assert!(b.metadata.is_empty());
    }

    #[test]
    fn test_port_descriptor_serializes_flat() {
        let d = PortDescriptor::with_com_name("COM7").meta("manufacturer", "Arduino");
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v, serde_json::json!({"comName": "COM7", "manufacturer": "Arduino"}));
    }
}
