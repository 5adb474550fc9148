//! Access/refresh token issuance and rotation. Grounded on spec.md §4.9: tokens
//! carry `{sub, sid, roles, exp, iat, kind}`, signed with `jsonwebtoken`.
//! Refresh-token reuse after rotation fails (`jti` tracking) because a bare
//! JWT alone is stateless and would otherwise be replayable.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fleet_types::error::{FleetError, Result};
use fleet_types::ports::Clock;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub sid: String,
    pub roles: HashSet<String>,
    pub exp: i64,
    pub iat: i64,
    pub kind: TokenKind,
    /// Unique per refresh token; consumed on redemption to enforce single-use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone, Debug)]
pub struct TokenConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub access_ttl: chrono::Duration,
    pub refresh_ttl: chrono::Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            algorithm: Algorithm::HS256,
            access_ttl: chrono::Duration::minutes(15),
            refresh_ttl: chrono::Duration::days(7),
        }
    }
}

pub struct TokenService {
    config: TokenConfig,
    clock: Arc<dyn Clock>,
    /// Refresh-token jtis already redeemed, with the time they were consumed
    /// (so a sweep could later evict entries past `refresh_ttl`).
    consumed_refresh_jtis: DashMap<String, DateTime<Utc>>,
}

impl TokenService {
    pub fn new(config: TokenConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock, consumed_refresh_jtis: DashMap::new() }
    }

    pub fn issue(&self, user_id: &str, session_id: &str, roles: HashSet<String>) -> Result<IssuedTokens> {
        let now = self.clock.now();
        let access = self.encode(Claims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            roles: roles.clone(),
            iat: now.timestamp(),
            exp: (now + self.config.access_ttl).timestamp(),
            kind: TokenKind::Access,
            jti: None,
        })?;
        let refresh = self.encode(Claims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            roles,
            iat: now.timestamp(),
            exp: (now + self.config.refresh_ttl).timestamp(),
            kind: TokenKind::Refresh,
            jti: Some(uuid::Uuid::new_v4().to_string()),
        })?;
        Ok(IssuedTokens { access_token: access, refresh_token: refresh })
    }

    /// Verifies `refresh_token`, rejects if already redeemed, then issues a
    /// fresh access/refresh pair and marks the old `jti` consumed.
    pub fn refresh(&self, refresh_token: &str) -> Result<IssuedTokens> {
        let claims = self.decode(refresh_token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(FleetError::Authentication("token is not a refresh token".into()));
        }
        let jti = claims.jti.clone().ok_or_else(|| FleetError::Authentication("refresh token missing jti".into()))?;
        if self.consumed_refresh_jtis.contains_key(&jti) {
            return Err(FleetError::Authentication("refresh token already redeemed".into()));
        }
        self.consumed_refresh_jtis.insert(jti, self.clock.now());
        self.issue(&claims.sub, &claims.sid, claims.roles)
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        self.decode(token)
    }

    fn encode(&self, claims: Claims) -> Result<String> {
        jsonwebtoken::encode(
            &Header::new(self.config.algorithm),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
        .map_err(|e| FleetError::System(format!("token encode failed: {e}")))
    }

    fn decode(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.config.algorithm);
        validation.validate_exp = true;
        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(self.config.secret.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(|e| FleetError::Authentication(format!("invalid token: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_testutil::FakeClock;

    fn service(clock: Arc<dyn Clock>) -> TokenService {
        TokenService::new(TokenConfig { secret: "test-secret".into(), ..TokenConfig::default() }, clock)
    }

    #[test]
    fn issued_access_token_verifies_as_access_kind() {
        let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(Utc::now()));
        let svc = service(clock);
        let tokens = svc.issue("u1", "s1", HashSet::from(["user".to_string()])).unwrap();
        let claims = svc.verify(&tokens.access_token).unwrap();
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.sub, "u1");
    }

    #[test]
    fn refresh_rotates_and_old_token_cannot_be_redeemed_again() {
        let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(Utc::now()));
        let svc = service(clock);
        let first = svc.issue("u1", "s1", HashSet::new()).unwrap();

        let second = svc.refresh(&first.refresh_token).unwrap();
        assert_ne!(second.access_token, first.access_token);
        assert_ne!(second.refresh_token, first.refresh_token);

        let err = svc.refresh(&first.refresh_token).unwrap_err();
        assert!(matches!(err, FleetError::Authentication(_)));
    }

    #[test]
    fn refreshing_with_an_access_token_is_rejected() {
        let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(Utc::now()));
        let svc = service(clock);
        let tokens = svc.issue("u1", "s1", HashSet::new()).unwrap();
        assert!(svc.refresh(&tokens.access_token).is_err());
    }
}
