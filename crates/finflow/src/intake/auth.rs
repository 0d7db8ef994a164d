use std::collections::HashMap;
use std::sync::Mutex;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::domain::{Agent, AgentView};

pub const TOKEN_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("session registry unavailable")]
    Poisoned,
    #[error("session expiry is out of range")]
    ExpiryOutOfRange,
}

/// Hash a password into an Argon2id PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| CredentialError::Hash(err.to_string()))
}

/// Check `password` against a stored PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Proof that the caller presented a live token for an active agent.
///
/// Only `IntakeService::authenticate` constructs this, and every agent-only
/// operation takes one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedAgent {
    pub(crate) id: u64,
    pub(crate) email: String,
    pub(crate) name: String,
}

impl AuthenticatedAgent {
    pub(crate) fn from_agent(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            email: agent.email.clone(),
            name: agent.name.clone(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn view(&self) -> AgentView {
        AgentView {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// Successful login payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub agent: AgentView,
}

#[derive(Debug, Clone, Copy)]
struct Session {
    agent_id: u64,
    expires_at: DateTime<Utc>,
}

/// Bearer tokens issued at login. Only the SHA-256 digest of each token is kept.
pub struct SessionRegistry {
    ttl: Duration,
    sessions: Mutex<HashMap<[u8; 32], Session>>,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a new token for `agent_id`, returning it with its expiry.
    pub fn issue(
        &self,
        agent_id: u64,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), CredentialError> {
        let mut raw = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut raw);
        let token = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw);
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or(CredentialError::ExpiryOutOfRange)?;

        let mut sessions = self.sessions.lock().map_err(|_| CredentialError::Poisoned)?;
        sessions.insert(
            digest(&token),
            Session {
                agent_id,
                expires_at,
            },
        );
        Ok((token, expires_at))
    }

    /// Agent id behind a live token. Expired sessions are dropped on the way.
    pub fn resolve(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<u64>, CredentialError> {
        let mut sessions = self.sessions.lock().map_err(|_| CredentialError::Poisoned)?;
        sessions.retain(|_, session| session.expires_at > now);
        Ok(sessions.get(&digest(token)).map(|session| session.agent_id))
    }

    /// Returns whether a session was removed.
    pub fn revoke(&self, token: &str) -> Result<bool, CredentialError> {
        let mut sessions = self.sessions.lock().map_err(|_| CredentialError::Poisoned)?;
        Ok(sessions.remove(&digest(token)).is_some())
    }
}

fn digest(token: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(token.as_bytes()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn hashes_verify_only_the_hashed_password() {
        let hash = hash_password("admin123").expect("hash succeeds");
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("admin123"));
        assert!(verify_password("admin123", &hash));
        assert!(!verify_password("admin124", &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let first = hash_password("admin123").expect("hash succeeds");
        let second = hash_password("admin123").expect("hash succeeds");
        assert_ne!(first, second);
    }

    #[test]
    fn plaintext_stored_value_never_verifies() {
        assert!(!verify_password("admin123", "admin123"));
    }

    #[test]
    fn issued_tokens_resolve_until_expiry() {
        let registry = SessionRegistry::new(Duration::minutes(30));
        let (token, expires_at) = registry.issue(7, noon()).expect("issue");
        assert_eq!(expires_at, noon() + Duration::minutes(30));
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        assert_eq!(registry.resolve(&token, noon()).expect("resolve"), Some(7));
        assert_eq!(
            registry
                .resolve(&token, noon() + Duration::minutes(30))
                .expect("resolve"),
            None
        );
    }

    #[test]
    fn expiry_overflow_is_an_error() {
        let registry = SessionRegistry::new(Duration::minutes(30));
        let late = DateTime::<Utc>::MAX_UTC - Duration::minutes(1);
        assert!(matches!(
            registry.issue(1, late),
            Err(CredentialError::ExpiryOutOfRange)
        ));
    }

    #[test]
    fn revoked_tokens_stop_resolving() {
        let registry = SessionRegistry::new(Duration::minutes(30));
        let (token, _) = registry.issue(3, noon()).expect("issue");
        assert!(registry.revoke(&token).expect("revoke"));
        assert!(!registry.revoke(&token).expect("second revoke"));
        assert_eq!(registry.resolve(&token, noon()).expect("resolve"), None);
    }

    #[test]
    fn unknown_tokens_do_not_resolve() {
        let registry = SessionRegistry::new(Duration::minutes(30));
        assert_eq!(registry.resolve("not-a-token", noon()).expect("resolve"), None);
    }
}
