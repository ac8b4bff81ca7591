//! Proptest generators for property-based testing.

use proptest::prelude::*;

use examseal::EnvironmentSignals;
use examseal_core::{ContentId, DeviceId, DeviceInfo};
use examseal_crypto::{ContentKey, CONTENT_KEY_LEN};

/// Plaintext bytes up to `max_len`.
pub fn plaintext(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// A content key from arbitrary bytes.
pub fn content_key() -> impl Strategy<Value = ContentKey> {
    any::<[u8; CONTENT_KEY_LEN]>().prop_map(ContentKey::from_bytes)
}

/// A fingerprint-shaped device id.
pub fn device_id() -> impl Strategy<Value = DeviceId> {
    any::<[u8; 16]>().prop_map(|bytes| DeviceId::from_fingerprint(&bytes))
}

/// A content id.
pub fn content_id() -> impl Strategy<Value = ContentId> {
    "[a-z][a-z0-9-]{0,31}".prop_filter_map("non-empty id", |s| ContentId::new(s).ok())
}

/// A reasonable Unix-millisecond timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=4_102_444_800_000
}

/// Environment signals with short printable fields.
pub fn environment_signals() -> impl Strategy<Value = EnvironmentSignals> {
    (
        prop_oneof![Just("linux"), Just("macos"), Just("windows"), Just("android")],
        prop_oneof![Just("x86_64"), Just("aarch64")],
        "[a-z]{2}_[A-Z]{2}\\.UTF-8",
        "[A-Z][a-z]{2,10}/[A-Z][a-z]{2,10}",
        "[a-z0-9-]{0,16}",
    )
        .prop_map(|(platform, arch, locale, timezone, hostname)| EnvironmentSignals {
            platform: platform.to_string(),
            arch: arch.to_string(),
            family: if platform == "windows" { "windows" } else { "unix" }.to_string(),
            locale,
            timezone,
            hostname,
        })
}

/// A device info record with arbitrary, ordered timestamps.
///
/// The public key field is opaque text here; record encoding does not
/// parse it.
pub fn device_info() -> impl Strategy<Value = DeviceInfo> {
    (
        device_id(),
        "[ -~]{0,40}",
        "[A-Za-z0-9+/]{8,64}",
        timestamp(),
        0i64..=1_000_000_000,
    )
        .prop_map(|(device_id, name, public_key, registered_at, delta)| {
            let mut info = DeviceInfo::new(device_id, name, public_key, registered_at);
            info.touch(registered_at + delta);
            info
        })
}
