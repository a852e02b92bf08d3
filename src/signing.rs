//! HMAC-SHA256 helpers shared by the session cookie and the Square webhook check.

use base64ct::{Base64, Base64UrlUnpadded, Encoding};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

fn mac(key: &[u8], parts: &[&[u8]]) -> HmacSha256 {
    let mut mac = <HmacSha256 as KeyInit>::new_from_slice(key)
        .expect("HMAC-SHA256 accepts keys of any length");
    for part in parts {
        mac.update(part);
    }
    mac
}

/// URL-safe signature used inside cookie values.
pub fn sign_urlsafe(key: &[u8], message: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(&mac(key, &[message]).finalize().into_bytes())
}

pub fn verify_urlsafe(key: &[u8], message: &[u8], signature: &str) -> bool {
    match Base64UrlUnpadded::decode_vec(signature) {
        Ok(raw) => mac(key, &[message]).verify_slice(&raw).is_ok(),
        Err(_) => false,
    }
}

/// Standard base64 signature over the concatenation of `parts`, as Square sends it.
pub fn sign_base64(key: &[u8], parts: &[&[u8]]) -> String {
    Base64::encode_string(&mac(key, parts).finalize().into_bytes())
}

pub fn verify_base64(key: &[u8], parts: &[&[u8]], signature: &str) -> bool {
    match Base64::decode_vec(signature.trim()) {
        Ok(raw) => mac(key, parts).verify_slice(&raw).is_ok(),
        Err(_) => false,
    }
}

/// Constant-time comparison of two secrets through their SHA-256 digests.
pub fn digest_eq(a: &str, b: &str) -> bool {
    let da = Sha256::digest(a.as_bytes());
    let db = Sha256::digest(b.as_bytes());
    da.iter().zip(db.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// 24 random bytes, base64url without padding.
pub fn random_id() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}
