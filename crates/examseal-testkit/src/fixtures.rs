//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use examseal::{DeviceConfig, DeviceManager, ManualClock, StaticEnvironment};
use examseal_core::{DeviceId, DeviceInfo};
use examseal_keystore::MemoryKeystore;

/// Start time for fixture clocks: 2024-06-01T09:00:00Z.
pub const FIXTURE_EPOCH_MS: i64 = 1_717_232_400_000;

/// A device backed by an in-memory keystore, a fixed environment and a
/// manual clock.
pub struct TestDevice {
    pub manager: DeviceManager<Arc<MemoryKeystore>>,
    pub keystore: Arc<MemoryKeystore>,
    pub clock: Arc<ManualClock>,
    pub hostname: String,
}

impl TestDevice {
    /// An uninitialized device whose fingerprint is derived from `hostname`.
    pub fn new(hostname: &str) -> Self {
        let keystore = Arc::new(MemoryKeystore::new());
        let clock = Arc::new(ManualClock::new(FIXTURE_EPOCH_MS));
        let manager = DeviceManager::new(Arc::clone(&keystore), DeviceConfig::default())
            .with_environment(Arc::new(StaticEnvironment::named(hostname)))
            .with_clock(clock.clone());

        Self {
            manager,
            keystore,
            clock,
            hostname: hostname.to_string(),
        }
    }

    /// Create and initialize. Panics on failure.
    pub async fn initialized(hostname: &str) -> Self {
        let device = Self::new(hostname);
        device.initialize().await;
        device
    }

    /// Run `initialize_device`. Panics on failure.
    pub async fn initialize(&self) -> DeviceInfo {
        match self.manager.initialize_device().await {
            Ok(info) => info,
            Err(e) => panic!("failed to initialize {}: {}", self.hostname, e),
        }
    }

    /// The device id this fixture derives, whether or not it is initialized.
    pub fn expected_id(&self) -> DeviceId {
        StaticEnvironment::named(self.hostname.as_str()).0.device_id()
    }
}

/// Create `count` initialized devices with distinct fingerprints.
pub async fn device_fleet(count: usize) -> Vec<TestDevice> {
    let mut fleet = Vec::with_capacity(count);
    for i in 0..count {
        fleet.push(TestDevice::initialized(&format!("exam-device-{:02}", i)).await);
    }
    fleet
}
