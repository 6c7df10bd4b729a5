//! Device capability queries.
//!
//! Tests only use these to decide whether a case applies to the device at
//! hand (architecture family, XNACK, managed memory) and to size launches.

use crate::Status;

/// Properties of one device, as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProps {
    pub name: String,
    /// Architecture string including feature suffixes, e.g. `gfx90a:sramecc+:xnack+`
    pub arch_name: String,
    pub multi_processor_count: u32,
    pub clock_rate_khz: u32,
    pub managed_memory: bool,
    pub max_shared_memory_per_block: usize,
}

impl DeviceProps {
    /// RDNA3 parts use a wall clock instead of the shader clock for timing.
    pub fn is_gfx11(&self) -> bool {
        self.arch_name.contains("gfx11")
    }

    /// Whether page-fault based host memory access is enabled.
    pub fn xnack_enabled(&self) -> bool {
        self.arch_name.contains("xnack+")
    }
}

impl Default for DeviceProps {
    fn default() -> Self {
        Self {
            name: "host".to_string(),
            arch_name: "host".to_string(),
            multi_processor_count: 1,
            clock_rate_khz: 1_000_000,
            managed_memory: false,
            max_shared_memory_per_block: 64 * 1024,
        }
    }
}

/// Capability probing seam.
pub trait DeviceQuery: Send + Sync {
    fn device_count(&self) -> Result<usize, Status>;

    fn current_device(&self) -> Result<usize, Status>;

    fn properties(&self, ordinal: usize) -> Result<DeviceProps, Status>;
}

/// A fixed set of devices with caller-chosen properties.
#[derive(Debug, Clone, Default)]
pub struct HostDevices {
    devices: Vec<DeviceProps>,
}

impl HostDevices {
    pub fn new(devices: Vec<DeviceProps>) -> Self {
        Self { devices }
    }

    /// One device with the given properties.
    pub fn single(props: DeviceProps) -> Self {
        Self::new(vec![props])
    }
}

impl DeviceQuery for HostDevices {
    fn device_count(&self) -> Result<usize, Status> {
        Ok(self.devices.len())
    }

    fn current_device(&self) -> Result<usize, Status> {
        if self.devices.is_empty() {
            Err(Status::ErrorInvalidDevice)
        } else {
            Ok(0)
        }
    }

    fn properties(&self, ordinal: usize) -> Result<DeviceProps, Status> {
        self.devices
            .get(ordinal)
            .cloned()
            .ok_or(Status::ErrorInvalidDevice)
    }
}
