//! Device manager configuration.

use serde::Deserialize;

/// Environment variable overriding the derived device name.
pub const DEVICE_NAME_ENV: &str = "EXAMSEAL_DEVICE_NAME";

/// Configuration for a [`DeviceManager`](crate::DeviceManager).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Replaces the derived `"<platform> (<arch>)"` label.
    pub device_name: Option<String>,
    /// Run RSA key generation on the blocking pool instead of the caller's
    /// task.
    pub offload_key_generation: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            offload_key_generation: true,
        }
    }
}

impl DeviceConfig {
    /// Defaults, with the device name taken from `EXAMSEAL_DEVICE_NAME` when
    /// it is set and non-empty.
    pub fn from_env() -> Self {
        let device_name = std::env::var(DEVICE_NAME_ENV)
            .ok()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        Self {
            device_name,
            ..Self::default()
        }
    }

    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }
}
