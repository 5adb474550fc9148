//! API-key generation and verification. Grounded on spec.md §4.9: 32+ random
//! bytes, surfaced once as plaintext, persisted as `{prefix, hash(salted)}`,
//! matched by prefix then constant-time hash comparison. Stateless — this
//! service does no storage of its own; a `SessionStore`-style port for
//! `ApiKey` persistence is left to the caller, since spec.md names only the
//! cryptographic operations, not a new store abstraction.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use fleet_types::apikey::{ApiKey, IssuedApiKey};
use fleet_types::error::{FleetError, Result};
use rand::RngCore;
use std::collections::{HashMap, HashSet};

const KEY_BYTES: usize = 32;
const PREFIX_CHARS: usize = 8;

pub struct ApiKeyService;

impl ApiKeyService {
    /// Generates a new key for `user_id`, returning both the persisted record
    /// and the plaintext (visible to the caller exactly this once).
    pub fn generate(
        user_id: &str,
        name: &str,
        roles: HashSet<String>,
        scopes: HashSet<String>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<IssuedApiKey> {
        let mut raw = [0u8; KEY_BYTES];
        rand::thread_rng().fill_bytes(&mut raw);
        let plaintext = hex::encode(raw);
        let prefix = plaintext[..PREFIX_CHARS].to_string();

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| FleetError::System(format!("api key hash failed: {e}")))?
            .to_string();

        let record = ApiKey {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            prefix: prefix.clone(),
            hash,
            roles,
            scopes,
            created_at: now,
            last_used_at: None,
            expires_at,
            active: true,
            metadata: HashMap::new(),
        };

        Ok(IssuedApiKey { record, plaintext: format!("{prefix}.{plaintext}") })
    }

    /// Verifies `presented` (the full `{prefix}.{rest}` string) against the
    /// candidate whose `prefix` field already matched during lookup.
    pub fn verify(candidate: &ApiKey, presented: &str, now: DateTime<Utc>) -> Result<()> {
        if !candidate.is_usable(now) {
            return Err(FleetError::Authentication("api key is inactive or expired".into()));
        }
        let (prefix, rest) = presented.split_once('.').ok_or_else(|| FleetError::Authentication("malformed api key".into()))?;
        if prefix != candidate.prefix {
            return Err(FleetError::Authentication("api key prefix mismatch".into()));
        }
        let parsed = PasswordHash::new(&candidate.hash)
            .map_err(|e| FleetError::System(format!("stored api key hash is corrupt: {e}")))?;
        Argon2::default()
            .verify_password(rest.as_bytes(), &parsed)
            .map_err(|_| FleetError::Authentication("api key does not match".into()))
    }

    /// Extracts the lookup prefix from a presented key without verifying it,
    /// for callers that look the record up by prefix before calling `verify`.
    pub fn prefix_of(presented: &str) -> Option<&str> {
        presented.split_once('.').map(|(prefix, _)| prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_verifies_against_its_own_record() {
        let now = Utc::now();
        let issued = ApiKeyService::generate("u1", "ci", HashSet::new(), HashSet::new(), None, now).unwrap();
        ApiKeyService::verify(&issued.record, &issued.plaintext, now).unwrap();
    }

    #[test]
    fn tampered_key_fails_verification() {
        let now = Utc::now();
        let issued = ApiKeyService::generate("u1", "ci", HashSet::new(), HashSet::new(), None, now).unwrap();
        let tampered = format!("{}x", issued.plaintext);
        assert!(ApiKeyService::verify(&issued.record, &tampered, now).is_err());
    }

    #[test]
    fn expired_key_is_rejected_even_with_correct_secret() {
        let now = Utc::now();
        let issued = ApiKeyService::generate(
            "u1",
            "ci",
            HashSet::new(),
            HashSet::new(),
            Some(now - chrono::Duration::seconds(1)),
            now,
        )
        .unwrap();
        assert!(ApiKeyService::verify(&issued.record, &issued.plaintext, now).is_err());
    }
}
