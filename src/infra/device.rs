// ============================================================
// Layer 6 — Execution Configuration
// ============================================================
// Explicit description of where training runs. Passed into the
// trainer and inferencer instead of mutating process-wide
// environment variables.
//
// Only the first visible device is used: multi-device data
// parallelism is left to the backend.

use burn::backend::wgpu::WgpuDevice;
use burn::tensor::backend::Backend;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Let the backend pick
    #[default]
    Auto,
    /// Discrete GPU (index from `visible_devices`)
    Gpu,
    /// CPU fallback of the wgpu backend
    Cpu,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub device:          DeviceKind,
    /// Device indices the run may use, in preference order
    pub visible_devices: Vec<usize>,
}

impl ExecutionConfig {
    pub fn wgpu_device(&self) -> WgpuDevice {
        if self.visible_devices.len() > 1 {
            tracing::warn!(
                "{} devices visible, training on the first one only",
                self.visible_devices.len()
            );
        }
        let first = self.visible_devices.first().copied();
        match (self.device, first) {
            (DeviceKind::Cpu, _)          => WgpuDevice::Cpu,
            (DeviceKind::Gpu, idx)        => WgpuDevice::DiscreteGpu(idx.unwrap_or(0)),
            (DeviceKind::Auto, Some(idx)) => WgpuDevice::DiscreteGpu(idx),
            (DeviceKind::Auto, None)      => WgpuDevice::DefaultDevice,
        }
    }
}

/// Best-effort: wait for queued device work so freed buffers can be
/// reclaimed. Never fails the run.
pub fn release_device_cache<B: Backend>(device: &B::Device, when: &str) {
    B::sync(device);
    tracing::debug!("Device synchronised ({})", when);
}
