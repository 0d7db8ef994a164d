//! Placeholder credit score for the public CIBIL check form.
//!
//! This is not a credit model and no bureau is consulted. The value is a
//! checksum of the PAN so repeat lookups for the same PAN agree with each
//! other, nothing more.

pub const MIN_SCORE: u16 = 300;
pub const MAX_SCORE: u16 = 900;

/// Derive the demo score for a PAN-like identity string.
///
/// Sums UTF-16 code units, folds into `[300, 900)`, then pulls values below
/// 550 into `[550, 650)` and values above 850 into `[750, 850)`.
pub fn mock_cibil_score(identity: &str) -> u16 {
    let hash: u64 = identity.encode_utf16().map(u64::from).sum();
    let base = 300 + hash % 600;

    let score = if base < 550 {
        550 + hash % 100
    } else if base > 850 {
        750 + hash % 100
    } else {
        base
    };

    score as u16
}
