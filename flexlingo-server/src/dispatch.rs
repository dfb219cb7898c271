//! Prediction dispatch
//!
//! Validates the request, confirms the device is attached, resolves the
//! script for the requested model and runs the predictor once. Runs for the
//! same device are serialized so two requests never open the same serial port
//! at once; different devices proceed in parallel.

use crate::ports::{self, EnumerationError, PortRegistry};
use crate::predictor::{extract_label, ExecutionError, Predictor};
use flexlingo_common::config::ScriptsConfig;
use flexlingo_common::{DeviceId, ModelSelector, PredictionResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tracing::{error, info, warn};

/// Dispatch failure, one variant per caller-visible outcome
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Bad request parameters; nothing was enumerated or spawned
    #[error("{0}")]
    Validation(String),

    #[error("Device {0} not connected")]
    NotFound(DeviceId),

    #[error("Predictor script not found: {0}")]
    ScriptMissing(PathBuf),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Enumeration(#[from] EnumerationError),
}

/// One async mutex per device id
///
/// Entries live only while someone holds or waits for them, so the map is
/// bounded by the number of devices with a dispatch in flight.
#[derive(Debug, Clone, Default)]
pub struct DeviceLocks {
    inner: Arc<Mutex<HashMap<DeviceId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl DeviceLocks {
    /// Wait for exclusive use of `device`
    pub async fn acquire(&self, device: &DeviceId) -> DeviceGuard {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(device.clone()).or_default().clone()
        };
        // Built before waiting so a cancelled waiter still cleans up
        let mut guard = DeviceGuard {
            device: device.clone(),
            locks: self.clone(),
            held: None,
        };
        guard.held = Some(lock.lock_owned().await);
        guard
    }

    /// Devices currently holding or awaiting a lock
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive use of one device; releases and prunes its map entry on drop
pub struct DeviceGuard {
    device: DeviceId,
    locks: DeviceLocks,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        drop(self.held.take());
        let mut map = self.locks.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map's own reference left: nobody holds or waits
        if map
            .get(&self.device)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.device);
        }
    }
}

pub struct Dispatcher {
    registry: Arc<dyn PortRegistry>,
    predictor: Arc<dyn Predictor>,
    scripts: ScriptsConfig,
    locks: DeviceLocks,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<dyn PortRegistry>,
        predictor: Arc<dyn Predictor>,
        scripts: ScriptsConfig,
    ) -> Self {
        Self {
            registry,
            predictor,
            scripts,
            locks: DeviceLocks::default(),
        }
    }

    /// Run one prediction for `device` with `model`
    ///
    /// Both arguments are raw request values. The model is checked first,
    /// then the device id; neither check performs I/O.
    pub async fn dispatch(
        &self,
        device: &str,
        model: &str,
    ) -> Result<PredictionResult, DispatchError> {
        let model: ModelSelector = model
            .parse()
            .map_err(|_| DispatchError::Validation(ModelSelector::INVALID_MESSAGE.to_string()))?;

        let device = DeviceId::new(device);
        if device.is_empty() {
            return Err(DispatchError::Validation("Device id is required".to_string()));
        }

        // Unknown ids never reach the lock map
        if ports::find_port(self.registry.as_ref(), &device).await?.is_none() {
            return Err(DispatchError::NotFound(device));
        }

        let _guard = self.locks.acquire(&device).await;

        // The port may have gone away while this request was queued
        let descriptor = match ports::find_port(self.registry.as_ref(), &device).await? {
            Some(descriptor) => descriptor,
            None => return Err(DispatchError::NotFound(device)),
        };
        let port = ports::port_name(&descriptor).unwrap_or(device.as_str());

        let script = self.scripts.script_for(model);
        if !matches!(tokio::fs::try_exists(script).await, Ok(true)) {
            error!(model = %model, script = %script.display(), "Predictor script missing");
            return Err(DispatchError::ScriptMissing(script.to_path_buf()));
        }

        info!(device = %device, port, model = %model, "Starting prediction");
        let output = match self.predictor.run(script, port).await {
            Ok(output) => output,
            Err(e) => {
                error!(
                    device = %device,
                    model = %model,
                    error = %e,
                    stderr = e.stderr().unwrap_or(""),
                    "Prediction failed"
                );
                return Err(e.into());
            }
        };

        if !output.stderr.trim().is_empty() {
            warn!(device = %device, model = %model, stderr = %output.stderr.trim(), "Predictor wrote to stderr");
        }

        let label = extract_label(&output.stdout);
        info!(device = %device, model = %model, label = %label, "Prediction complete");
        Ok(PredictionResult { label })
    }
}
