//! Cryptographic helpers: token encryption at rest and webhook MACs.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;

/// Environment variable holding base64-encoded token encryption keys.
pub(crate) const TOKEN_KEY_ENV: &str = "TOOLYARD_TOKEN_KEYS";

const KEY_LEN: usize = 32;
/// Stored form: `ty1.<nonce>.<ciphertext+tag>`, both parts base64url.
const ENVELOPE_TAG: &str = "ty1";
/// Associated data tying ciphertexts to the GitHub token column.
const GITHUB_TOKEN_AAD: &[u8] = b"toolyard:github-token";

/// AES-256-GCM cipher for GitHub tokens at rest.
///
/// The first key encrypts; every key is tried on decrypt, so keys can be
/// rotated by prepending a new one.
#[derive(Clone)]
pub(crate) struct TokenCipher {
    keys: Arc<Vec<LessSafeKey>>,
    rng: SystemRandom,
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher")
            .field("keys", &self.keys.len())
            .finish_non_exhaustive()
    }
}

impl TokenCipher {
    /// Build a cipher from `TOOLYARD_TOKEN_KEYS` (comma-separated base64 32-byte keys).
    #[cfg_attr(test, allow(dead_code))]
    pub(crate) fn from_env() -> Result<Self, String> {
        let raw = std::env::var(TOKEN_KEY_ENV)
            .map_err(|_| format!("{TOKEN_KEY_ENV} must be set to base64-encoded 32-byte keys"))?;
        Self::from_base64_keys(raw.split(','))
    }

    /// Build a cipher from base64-encoded keys, newest first. Blank entries are ignored.
    pub(crate) fn from_base64_keys<I, S>(keys: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .filter_map(|key| {
                let key = key.as_ref().trim();
                (!key.is_empty()).then(|| sealing_key(key))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if keys.is_empty() {
            return Err("no token encryption keys provided".to_string());
        }
        Ok(Self {
            keys: Arc::new(keys),
            rng: SystemRandom::new(),
        })
    }

    /// Seal a token with the newest key.
    pub(crate) fn encrypt(&self, plaintext: &str) -> Result<String, String> {
        let mut nonce = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce)
            .map_err(|_| "nonce generation failed".to_string())?;
        let mut sealed = plaintext.as_bytes().to_vec();
        self.keys[0]
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce),
                Aad::from(GITHUB_TOKEN_AAD),
                &mut sealed,
            )
            .map_err(|_| "token encryption failed".to_string())?;
        Ok(format!(
            "{ENVELOPE_TAG}.{}.{}",
            URL_SAFE_NO_PAD.encode(nonce),
            URL_SAFE_NO_PAD.encode(sealed)
        ))
    }

    /// Open a stored token. Values without the envelope tag predate
    /// encryption and are returned unchanged.
    pub(crate) fn decrypt(&self, stored: &str) -> Result<String, String> {
        let mut parts = stored.splitn(3, '.');
        let (Some(ENVELOPE_TAG), Some(nonce), Some(sealed)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Ok(stored.to_string());
        };
        let nonce: [u8; NONCE_LEN] = URL_SAFE_NO_PAD
            .decode(nonce)
            .map_err(|err| format!("token nonce base64 decode failed: {err}"))?
            .try_into()
            .map_err(|_| "token nonce has the wrong length".to_string())?;
        let sealed = URL_SAFE_NO_PAD
            .decode(sealed)
            .map_err(|err| format!("token payload base64 decode failed: {err}"))?;
        let plaintext = self
            .keys
            .iter()
            .find_map(|key| open_with(key, nonce, &sealed))
            .ok_or_else(|| "token decryption failed".to_string())?;
        String::from_utf8(plaintext).map_err(|_| "decrypted token is not UTF-8".to_string())
    }

    /// Whether a stored value carries the encryption envelope.
    #[cfg(test)]
    pub(crate) fn is_encrypted(stored: &str) -> bool {
        stored
            .strip_prefix(ENVELOPE_TAG)
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

fn sealing_key(encoded: &str) -> Result<LessSafeKey, String> {
    let bytes = decode_key_bytes(encoded)?;
    if bytes.len() != KEY_LEN {
        return Err(format!(
            "token key must be {KEY_LEN} bytes, got {}",
            bytes.len()
        ));
    }
    let unbound =
        UnboundKey::new(&AES_256_GCM, &bytes).map_err(|_| "token key rejected".to_string())?;
    Ok(LessSafeKey::new(unbound))
}

/// Keys are configured in standard base64, unlike the url-safe envelope.
fn decode_key_bytes(encoded: &str) -> Result<Vec<u8>, String> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|err| format!("token key base64 decode failed: {err}"))
}

fn open_with(key: &LessSafeKey, nonce: [u8; NONCE_LEN], sealed: &[u8]) -> Option<Vec<u8>> {
    let mut in_out = sealed.to_vec();
    let plaintext = key
        .open_in_place(
            Nonce::assume_unique_for_key(nonce),
            Aad::from(GITHUB_TOKEN_AAD),
            &mut in_out,
        )
        .ok()?;
    Some(plaintext.to_vec())
}

/// Hex-encoded HMAC-SHA256 of `message`.
pub(crate) fn hmac_sha256_hex(secret: &[u8], message: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    let tag = hmac::sign(&key, message);
    hex::encode(tag.as_ref())
}

/// Constant-time check of a hex-encoded HMAC-SHA256 signature.
pub(crate) fn verify_hmac_sha256_hex(secret: &[u8], message: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    hmac::verify(&key, message, &signature).is_ok()
}
