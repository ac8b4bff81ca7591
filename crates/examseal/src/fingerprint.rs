//! Device fingerprinting from environment characteristics.
//!
//! The fingerprint is deterministic for one installation so that
//! re-initialization needs no server round-trip. It is a lookup key with
//! little entropy, never a credential.

use examseal_core::DeviceId;
use serde::{Deserialize, Serialize};

/// BLAKE3 derive-key context for device fingerprints.
const FINGERPRINT_CONTEXT: &str = "examseal 2024-06 device fingerprint v1";

/// The stable signals a device id is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentSignals {
    /// Operating system, e.g. `linux`.
    pub platform: String,
    /// CPU architecture, e.g. `x86_64`.
    pub arch: String,
    /// OS family, e.g. `unix`.
    pub family: String,
    pub locale: String,
    pub timezone: String,
    pub hostname: String,
}

impl EnvironmentSignals {
    /// Derive the device identifier.
    ///
    /// Fields are length-prefixed so that moving bytes between adjacent
    /// fields changes the digest.
    pub fn device_id(&self) -> DeviceId {
        let mut hasher = blake3::Hasher::new_derive_key(FINGERPRINT_CONTEXT);
        for field in [
            &self.platform,
            &self.arch,
            &self.family,
            &self.locale,
            &self.timezone,
            &self.hostname,
        ] {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        DeviceId::from_fingerprint(hasher.finalize().as_bytes())
    }

    /// Human-readable platform label.
    pub fn device_name(&self) -> String {
        format!("{} ({})", self.platform, self.arch)
    }
}

/// Source of environment signals.
pub trait EnvironmentProbe: Send + Sync {
    fn signals(&self) -> EnvironmentSignals;
}

/// Reads signals from the running process and host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl EnvironmentProbe for SystemEnvironment {
    fn signals(&self) -> EnvironmentSignals {
        EnvironmentSignals {
            platform: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            family: std::env::consts::FAMILY.to_string(),
            locale: first_env(&["LC_ALL", "LANG"]).unwrap_or_else(|| "C".to_string()),
            timezone: first_env(&["TZ"]).unwrap_or_else(|| "UTC".to_string()),
            hostname: hostname().unwrap_or_default(),
        }
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn hostname() -> Option<String> {
    first_env(&["HOSTNAME", "COMPUTERNAME"]).or_else(|| {
        std::fs::read_to_string("/etc/hostname")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Fixed signals, for tests and for embedding hosts that know their own
/// identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticEnvironment(pub EnvironmentSignals);

impl StaticEnvironment {
    /// A Linux host with the given hostname and neutral locale settings.
    pub fn named(hostname: impl Into<String>) -> Self {
        Self(EnvironmentSignals {
            platform: "linux".into(),
            arch: "x86_64".into(),
            family: "unix".into(),
            locale: "en_US.UTF-8".into(),
            timezone: "UTC".into(),
            hostname: hostname.into(),
        })
    }
}

impl EnvironmentProbe for StaticEnvironment {
    fn signals(&self) -> EnvironmentSignals {
        self.0.clone()
    }
}
