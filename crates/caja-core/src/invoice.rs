//! # Invoice Numbers
//!
//! Format: `FAC-YYYYMMDD-NNN`, where `NNN` is a random three-digit suffix.
//!
//! The suffix space is only 1000 per day, so uniqueness is not guaranteed
//! here. The `sales.invoice_number` UNIQUE constraint catches collisions and
//! the sale workflow retries with a fresh number.

use chrono::{DateTime, Utc};
use rand::Rng;

/// Prefix shared by all invoice numbers.
pub const INVOICE_PREFIX: &str = "FAC";

/// How many fresh numbers the workflow tries before giving up.
pub const INVOICE_RETRY_LIMIT: usize = 5;

/// Formats an invoice number from a timestamp and a suffix (taken mod 1000).
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use caja_core::invoice::format_invoice_number;
///
/// let at = Utc.with_ymd_and_hms(2026, 3, 7, 15, 30, 0).unwrap();
/// assert_eq!(format_invoice_number(at, 42), "FAC-20260307-042");
/// ```
pub fn format_invoice_number(at: DateTime<Utc>, suffix: u16) -> String {
    format!(
        "{}-{}-{:03}",
        INVOICE_PREFIX,
        at.format("%Y%m%d"),
        suffix % 1000
    )
}

/// Generates an invoice number for `at` with a random suffix.
pub fn generate_invoice_number(at: DateTime<Utc>) -> String {
    let suffix = rand::rng().random_range(0..1000u16);
    format_invoice_number(at, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format() {
        let at = Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(format_invoice_number(at, 0), "FAC-20261231-000");
        assert_eq!(format_invoice_number(at, 999), "FAC-20261231-999");
        assert_eq!(format_invoice_number(at, 1234), "FAC-20261231-234");
    }

    #[test]
    fn test_generated_shape() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        for _ in 0..50 {
            let number = generate_invoice_number(at);
            assert_eq!(number.len(), "FAC-20260102-000".len());
            assert!(number.starts_with("FAC-20260102-"));
            assert!(number[13..].chars().all(|c| c.is_ascii_digit()));
        }
    }
}
