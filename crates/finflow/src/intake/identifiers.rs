use std::sync::Mutex;

use chrono::{DateTime, Datelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::domain::{ApplicationId, CibilRequestId};

pub const APPLICATION_PREFIX: &str = "LN";
pub const CIBIL_REQUEST_PREFIX: &str = "CB";
pub const APPLICATION_DIGITS: usize = 6;
pub const CIBIL_REQUEST_DIGITS: usize = 8;

/// Source of "now" for record timestamps and identifier years.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentifierError {
    #[error("identifier source unavailable")]
    Poisoned,
}

/// Candidate public identifiers. Uniqueness is the caller's concern; the
/// record store draws again on collision.
pub trait IdentifierSource: Send + Sync {
    fn application_id(&self, at: DateTime<Utc>) -> Result<ApplicationId, IdentifierError>;

    fn cibil_request_id(&self, at: DateTime<Utc>) -> Result<CibilRequestId, IdentifierError>;
}

/// Produces public identifiers of the form `<prefix><year><digits>`, with
/// digits from a non-cryptographic RNG.
pub struct IdentifierGenerator {
    rng: Mutex<StdRng>,
}

impl IdentifierGenerator {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn generate(&self, prefix: &str, year: i32, digits: usize) -> Result<String, IdentifierError> {
        let mut rng = self.rng.lock().map_err(|_| IdentifierError::Poisoned)?;
        let mut id = String::with_capacity(prefix.len() + 4 + digits);
        id.push_str(prefix);
        id.push_str(&format!("{year:04}"));
        for _ in 0..digits {
            let digit: u32 = rng.gen_range(0..10);
            id.push(char::from_digit(digit, 10).unwrap_or('0'));
        }
        Ok(id)
    }
}

impl IdentifierSource for IdentifierGenerator {
    fn application_id(&self, at: DateTime<Utc>) -> Result<ApplicationId, IdentifierError> {
        self.generate(APPLICATION_PREFIX, at.year(), APPLICATION_DIGITS)
            .map(ApplicationId)
    }

    fn cibil_request_id(&self, at: DateTime<Utc>) -> Result<CibilRequestId, IdentifierError> {
        self.generate(CIBIL_REQUEST_PREFIX, at.year(), CIBIL_REQUEST_DIGITS)
            .map(CibilRequestId)
    }
}

impl Default for IdentifierGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// `true` when `raw` has the shape produced for `prefix` with `digits` digits.
pub fn matches_format(raw: &str, prefix: &str, digits: usize) -> bool {
    let Some(rest) = raw.strip_prefix(prefix) else {
        return false;
    };
    rest.len() == 4 + digits && rest.bytes().all(|byte| byte.is_ascii_digit())
}
