//! Salted password hashing
//!
//! PBKDF2-HMAC-SHA512, 10000 iterations, 128-byte output. The salt is 16
//! random bytes stored hex-encoded, and the hex string itself is the KDF
//! salt input. Both values are stored hex-encoded on the user record.

use rand::RngCore;
use sha2::Sha512;
use subtle::ConstantTimeEq;

pub const SALT_BYTES: usize = 16;
pub const ITERATIONS: u32 = 10_000;
pub const HASH_BYTES: usize = 128;

/// Salt and hash of one password, always produced together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    pub salt: String,
    pub hash: String,
}

/// Hash `password` with a fresh random salt
pub fn set_password(password: &str) -> PasswordDigest {
    let mut salt_bytes = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = hex::encode(salt_bytes);
    let hash = hex::encode(derive(password, &salt));
    PasswordDigest { salt, hash }
}

/// Check `password` against a stored salt and hash
pub fn validate_password(password: &str, salt: &str, hash: &str) -> bool {
    let Ok(expected) = hex::decode(hash) else {
        return false;
    };
    let actual = derive(password, salt);
    actual[..].ct_eq(&expected[..]).into()
}

/// Password and its confirmation agree
pub fn passwords_match(password: &str, confirmation: &str) -> bool {
    password == confirmation
}

fn derive(password: &str, salt: &str) -> [u8; HASH_BYTES] {
    let mut out = [0u8; HASH_BYTES];
    pbkdf2::pbkdf2_hmac::<Sha512>(password.as_bytes(), salt.as_bytes(), ITERATIONS, &mut out);
    out
}
