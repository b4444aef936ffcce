use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use super::AuthError;

pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 32;

const SCHEME: &str = "pbkdf2-sha256";

/// Derived password hash, zeroed on drop
#[derive(Zeroize)]
#[zeroize(drop)]
struct DerivedHash([u8; HASH_LENGTH]);

impl DerivedHash {
    fn derive(password: &str, salt: &[u8], iterations: u32) -> Self {
        #[cfg(test)]
        DERIVATIONS.with(|n| n.set(n.get() + 1));
        let mut bytes = [0u8; HASH_LENGTH];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut bytes);
        Self(bytes)
    }
}

#[cfg(test)]
thread_local! {
    static DERIVATIONS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Key derivations run on this thread so far.
#[cfg(test)]
pub(crate) fn derivation_count() -> usize {
    DERIVATIONS.with(|n| n.get())
}

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Hashes `password` as `pbkdf2-sha256$<iterations>$<salt>$<hash>` (base64 parts).
pub fn hash_password(password: &str, iterations: u32) -> String {
    let salt = generate_salt();
    let hash = DerivedHash::derive(password, &salt, iterations);
    let b64 = base64::engine::general_purpose::STANDARD;
    format!("{SCHEME}${iterations}${}${}", b64.encode(salt), b64.encode(hash.0))
}

/// Checks `password` against an encoded hash in constant time.
///
/// Uses the iteration count stored in the hash, so raising the configured
/// cost does not lock out existing accounts.
pub fn verify_password(password: &str, encoded: &str) -> Result<bool, AuthError> {
    let malformed = || AuthError::MalformedHash;
    let mut parts = encoded.split('$');
    if parts.next() != Some(SCHEME) {
        return Err(malformed());
    }
    let iterations: u32 = parts.next().and_then(|s| s.parse().ok()).ok_or_else(malformed)?;
    let b64 = base64::engine::general_purpose::STANDARD;
    let salt = parts
        .next()
        .and_then(|s| b64.decode(s).ok())
        .ok_or_else(malformed)?;
    let expected = Zeroizing::new(
        parts
            .next()
            .and_then(|s| b64.decode(s).ok())
            .ok_or_else(malformed)?,
    );
    if parts.next().is_some() || iterations == 0 || expected.len() != HASH_LENGTH {
        return Err(malformed());
    }

    let actual = DerivedHash::derive(password, &salt, iterations);
    Ok(actual.0.as_slice().ct_eq(expected.as_slice()).unwrap_u8() == 1)
}

/// Runs one derivation at `iterations` and throws it away.
///
/// Login calls this for unknown or inactive accounts so they cost the same
/// as a wrong password and response time does not reveal which usernames exist.
pub fn dummy_verify(password: &str, iterations: u32) {
    std::hint::black_box(DerivedHash::derive(password, &[0u8; SALT_LENGTH], iterations));
}
