//! Known-answer vectors.
//!
//! The AES-256-GCM cases are from the GCM specification's published test
//! cases (no associated data). The device key and wrap operations are
//! randomized and have no fixed outputs; they are covered by property tests
//! instead.

use examseal_core::{decode_base64, encode_base64};
use examseal_crypto::{ContentKey, Iv, CONTENT_KEY_LEN, IV_LEN};

/// An AES-256-GCM known-answer case.
#[derive(Debug, Clone)]
pub struct AeadVector {
    pub name: &'static str,
    /// Key (hex).
    pub key: &'static str,
    /// IV (hex).
    pub iv: &'static str,
    /// Plaintext (hex).
    pub plaintext: &'static str,
    /// Ciphertext with the 16-byte tag appended (hex).
    pub ciphertext: &'static str,
}

/// A base64 known-answer case (standard alphabet, padded).
#[derive(Debug, Clone)]
pub struct Base64Vector {
    pub input: &'static [u8],
    pub encoded: &'static str,
}

/// All AES-256-GCM vectors.
pub fn aead_vectors() -> Vec<AeadVector> {
    vec![
        AeadVector {
            name: "AES-256-GCM zero key, empty plaintext",
            key: "0000000000000000000000000000000000000000000000000000000000000000",
            iv: "000000000000000000000000",
            plaintext: "",
            ciphertext: "530f8afbc74536b9a963b4f1c4cb738b",
        },
        AeadVector {
            name: "AES-256-GCM zero key, one zero block",
            key: "0000000000000000000000000000000000000000000000000000000000000000",
            iv: "000000000000000000000000",
            plaintext: "00000000000000000000000000000000",
            ciphertext: "cea7403d4d606b6e074ec5d3baf39d18d0d1c8a799996bf0265b98b5d48ab919",
        },
    ]
}

/// RFC 4648 section 10 vectors.
pub fn base64_vectors() -> Vec<Base64Vector> {
    vec![
        Base64Vector { input: b"", encoded: "" },
        Base64Vector { input: b"f", encoded: "Zg==" },
        Base64Vector { input: b"fo", encoded: "Zm8=" },
        Base64Vector { input: b"foo", encoded: "Zm9v" },
        Base64Vector { input: b"foob", encoded: "Zm9vYg==" },
        Base64Vector { input: b"fooba", encoded: "Zm9vYmE=" },
        Base64Vector { input: b"foobar", encoded: "Zm9vYmFy" },
    ]
}

fn unhex<const N: usize>(text: &str) -> Option<[u8; N]> {
    hex::decode(text).ok()?.try_into().ok()
}

/// Check one AEAD vector: decrypting the expected ciphertext must yield the
/// plaintext, and a flipped tag bit must be rejected.
pub fn check_aead_vector(vector: &AeadVector) -> bool {
    let (Some(key), Some(iv)) = (
        unhex::<CONTENT_KEY_LEN>(vector.key),
        unhex::<IV_LEN>(vector.iv),
    ) else {
        return false;
    };
    let (Ok(plaintext), Ok(mut ciphertext)) =
        (hex::decode(vector.plaintext), hex::decode(vector.ciphertext))
    else {
        return false;
    };

    let key = ContentKey::from_bytes(key);
    let iv = Iv::from_bytes(iv);

    let opened = matches!(key.decrypt(&ciphertext, &iv), Ok(p) if p == plaintext);

    if let Some(last) = ciphertext.last_mut() {
        *last ^= 0x01;
    }
    let tamper_rejected = key.decrypt(&ciphertext, &iv).is_err();

    opened && tamper_rejected
}

/// Check one base64 vector in both directions.
pub fn check_base64_vector(vector: &Base64Vector) -> bool {
    encode_base64(vector.input) == vector.encoded
        && matches!(decode_base64(vector.encoded), Ok(bytes) if bytes == vector.input)
}

/// Run every vector, returning `(name, passed)` pairs.
pub fn verify_all_vectors() -> Vec<(String, bool)> {
    let aead = aead_vectors()
        .into_iter()
        .map(|v| (v.name.to_string(), check_aead_vector(&v)));
    let b64 = base64_vectors()
        .into_iter()
        .map(|v| (format!("base64 {:?}", v.encoded), check_base64_vector(&v)));
    aead.chain(b64).collect()
}
