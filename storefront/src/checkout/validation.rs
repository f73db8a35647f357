// storefront/src/checkout/validation.rs

use once_cell::sync::Lazy;
use regex::Regex;

// ASCII digits only; `\d` would also accept other Unicode digits.
static PHONE_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^(\+380[0-9]{9}|0[0-9]{9})$").ok());

/// Ukrainian mobile number in either `+380XXXXXXXXX` or `0XXXXXXXXX` form.
pub fn is_valid_phone(input: &str) -> bool {
  PHONE_RE.as_ref().is_some_and(|re| re.is_match(input))
}

/// Trimmed free text, or `None` when nothing but whitespace was sent.
pub fn non_blank(input: &str) -> Option<String> {
  let trimmed = input.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_string())
}
