//! Property tests for the primitives and persisted records.

use std::sync::OnceLock;

use proptest::prelude::*;

use examseal_core::{ContentId, DeviceId, PersistedRecord};
use examseal_crypto::{ContentKey, CryptoError, DeviceKeyPair, EncryptedPayload, Iv, IV_LEN};
use examseal_testkit::generators::{
    content_id, content_key, device_id, device_info, environment_signals, plaintext,
};

fn shared_pair() -> &'static DeviceKeyPair {
    static PAIR: OnceLock<DeviceKeyPair> = OnceLock::new();
    PAIR.get_or_init(|| DeviceKeyPair::generate().unwrap())
}

proptest! {
    #[test]
    fn symmetric_round_trip(key in content_key(), p in plaintext(2048)) {
        let payload = key.encrypt(&p).unwrap();
        prop_assert_eq!(payload.decrypt(&key).unwrap(), p);
    }

    #[test]
    fn ciphertext_bit_flip_is_detected(
        key in content_key(),
        p in plaintext(256),
        position in any::<prop::sample::Index>(),
    ) {
        let payload = key.encrypt(&p).unwrap();
        let mut ciphertext = payload.ciphertext.clone();
        let bit = position.index(ciphertext.len() * 8);
        ciphertext[bit / 8] ^= 1 << (bit % 8);

        let tampered = EncryptedPayload { ciphertext, ..payload };
        prop_assert!(matches!(
            tampered.decrypt(&key),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn iv_bit_flip_is_detected(
        key in content_key(),
        p in plaintext(256),
        position in any::<prop::sample::Index>(),
    ) {
        let payload = key.encrypt(&p).unwrap();
        let mut iv = *payload.iv.as_bytes();
        let bit = position.index(IV_LEN * 8);
        iv[bit / 8] ^= 1 << (bit % 8);

        prop_assert!(matches!(
            key.decrypt(&payload.ciphertext, &Iv::from_bytes(iv)),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn content_key_export_fidelity(key in content_key(), p in plaintext(512)) {
        let imported = ContentKey::import(&key.export()).unwrap();
        let payload = key.encrypt(&p).unwrap();
        prop_assert_eq!(payload.decrypt(&imported).unwrap(), p.clone());

        let payload = imported.encrypt(&p).unwrap();
        prop_assert_eq!(payload.decrypt(&key).unwrap(), p);
    }

    #[test]
    fn fingerprint_is_stable(signals in environment_signals()) {
        let id = signals.device_id();
        prop_assert_eq!(&signals.clone().device_id(), &id);
        prop_assert!(id.as_str().starts_with("dev_"));
        prop_assert_eq!(id.as_str().len(), 4 + 32);
    }

    #[test]
    fn fingerprint_tracks_hostname(signals in environment_signals()) {
        let mut other = signals.clone();
        other.hostname.push('x');
        prop_assert_ne!(other.device_id(), signals.device_id());
    }

    #[test]
    fn device_info_record_round_trip(info in device_info()) {
        let text = PersistedRecord::from(info.clone()).to_json().unwrap();
        let back = PersistedRecord::from_json(&text).unwrap().into_device_info().unwrap();
        prop_assert!(back.last_active >= back.registered_at);
        prop_assert_eq!(back, info);
    }

    #[test]
    fn ids_travel_as_plain_strings(content in content_id(), device in device_id()) {
        let text = serde_json::to_string(&content).unwrap();
        prop_assert_eq!(&text, &format!("\"{}\"", content.as_str()));
        prop_assert_eq!(serde_json::from_str::<ContentId>(&text).unwrap(), content);

        let text = serde_json::to_string(&device).unwrap();
        prop_assert_eq!(serde_json::from_str::<DeviceId>(&text).unwrap(), device);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn wrap_unwrap_preserves_key(key in content_key(), p in plaintext(128)) {
        let pair = shared_pair();
        let wrapped = pair.public_key().wrap_key(&key).unwrap();
        let unwrapped = pair.private_key().unwrap_key(&wrapped).unwrap();

        let payload = key.encrypt(&p).unwrap();
        prop_assert_eq!(payload.decrypt(&unwrapped).unwrap(), p);
    }
}
