use crate::prelude::*;

/// Money is stored in cents.
pub const CENTS: i64 = 100;
/// `commission_rate` is stored in basis points.
pub const BPS: i64 = 10_000;

pub fn format_money(cents: i64) -> String {
  let sign = if cents < 0 { "-" } else { "" };
  let cents = cents.unsigned_abs();
  format!("{sign}{}.{:02}", cents / CENTS as u64, cents % CENTS as u64)
}

/// `amount * bps / 10_000`, rounded half away from zero to the cent.
pub fn apply_bps(amount: i64, bps: i32) -> i64 {
  let raw = amount as i128 * bps as i128;
  let half = BPS as i128 / 2;
  let rounded = if raw >= 0 { raw + half } else { raw - half };
  (rounded / BPS as i128) as i64
}

/// Percentage rounded to two decimals, `0.0` for an empty denominator.
pub fn percent(part: i64, whole: i64) -> f64 {
  if whole == 0 {
    return 0.0;
  }
  (part as f64 / whole as f64 * 10_000.0).round() / 100.0
}

/// Result of a `checked_*` money operation, overflow is a bad request.
pub fn checked(amount: Option<i64>) -> Result<i64> {
  amount.ok_or_else(|| Error::InvalidArgs("Amount out of range".into()))
}

pub fn now() -> DateTime {
  Utc::now().naive_utc()
}
