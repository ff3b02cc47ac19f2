//! Passwords
//!
//! - PBKDF2-HMAC-SHA256 hashing (100 000 iterations, 16-byte salt, 32-byte key)
//! - Composition policy (digit, lower, upper, symbol) on top of length checks
//! - Clear text zeroized on drop, hashes compared in constant time
//!
//! Stored format: `"{iterations}:{salt_b64}:{hash_b64}"`. The iteration count
//! travels with the hash so it can be raised without invalidating old hashes
//! (see [`HashedPassword::needs_rehash`]).

use std::fmt;

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{constant_time_eq, from_base64, random_bytes, to_base64};

// ============================================================================
// Constants
// ============================================================================

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Current PBKDF2 work factor
pub const PBKDF2_ITERATIONS: u32 = 100_000;

const SALT_LENGTH: usize = 16;

const HASH_LENGTH: usize = 32;

/// Password policy violation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,

    #[error("Password must contain at least one digit")]
    MissingDigit,

    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one non-alphanumeric character")]
    MissingSymbol,

    #[error("Password is too common or follows a predictable pattern")]
    CommonPattern,
}

/// Stored hash could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordHashError {
    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// NFKC-normalised clear text, wiped on drop. Not `Clone`; `Debug` is
/// redacted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Create a password for a new credential, enforcing the full policy.
    ///
    /// Returns the first violation; use [`ClearTextPassword::policy_violations`]
    /// to report every rule at once.
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let normalized: String = raw.nfkc().collect();
        match policy_violations(&normalized).into_iter().next() {
            Some(violation) => Err(violation),
            None => Ok(Self(normalized)),
        }
    }

    /// Password to check against an existing hash; no policy is applied.
    pub fn for_verification(raw: String) -> Self {
        Self(raw.nfkc().collect())
    }

    /// Every policy rule `raw` breaks, in a stable order
    pub fn policy_violations(raw: &str) -> Vec<PasswordPolicyError> {
        let normalized: String = raw.nfkc().collect();
        policy_violations(&normalized)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Hash with the current work factor and a fresh random salt
    pub fn hash(&self) -> HashedPassword {
        self.hash_with_iterations(PBKDF2_ITERATIONS)
    }

    /// Hash with an explicit work factor
    pub fn hash_with_iterations(&self, iterations: u32) -> HashedPassword {
        let salt = random_bytes(SALT_LENGTH);
        let mut derived = [0u8; HASH_LENGTH];
        pbkdf2_hmac::<Sha256>(self.as_bytes(), &salt, iterations, &mut derived);

        let encoded = format!("{}:{}:{}", iterations, to_base64(&salt), to_base64(&derived));
        derived.zeroize();

        HashedPassword { encoded }
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    encoded: String,
}

struct ParsedHash {
    iterations: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

impl HashedPassword {
    /// Load a stored hash, rejecting anything not in `iterations:salt:hash` form
    pub fn from_stored(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let encoded = s.into();
        parse(&encoded)?;
        Ok(Self { encoded })
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    pub fn iterations(&self) -> u32 {
        parse(&self.encoded).map(|p| p.iterations).unwrap_or(0)
    }

    /// Verify in constant time. A corrupt hash never verifies.
    pub fn verify(&self, password: &ClearTextPassword) -> bool {
        let Ok(parsed) = parse(&self.encoded) else {
            return false;
        };

        let mut derived = vec![0u8; parsed.hash.len()];
        pbkdf2_hmac::<Sha256>(
            password.as_bytes(),
            &parsed.salt,
            parsed.iterations,
            &mut derived,
        );

        let ok = constant_time_eq(&derived, &parsed.hash);
        derived.zeroize();
        ok
    }

    /// True when the hash was produced with fewer iterations than today's
    pub fn needs_rehash(&self) -> bool {
        self.needs_rehash_for(PBKDF2_ITERATIONS)
    }

    pub fn needs_rehash_for(&self, iterations: u32) -> bool {
        self.iterations() < iterations
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

fn parse(encoded: &str) -> Result<ParsedHash, PasswordHashError> {
    let mut parts = encoded.split(':');
    let (Some(iterations), Some(salt), Some(hash), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(PasswordHashError::InvalidHashFormat);
    };

    let iterations: u32 = iterations
        .parse()
        .map_err(|_| PasswordHashError::InvalidHashFormat)?;
    if iterations == 0 {
        return Err(PasswordHashError::InvalidHashFormat);
    }

    let salt = from_base64(salt).map_err(|_| PasswordHashError::InvalidHashFormat)?;
    let hash = from_base64(hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
    if salt.is_empty() || hash.is_empty() {
        return Err(PasswordHashError::InvalidHashFormat);
    }

    Ok(ParsedHash {
        iterations,
        salt,
        hash,
    })
}

// ============================================================================
// Policy
// ============================================================================

type Check = fn(&str) -> bool;

/// Composition rules; each fails when its predicate is false.
const COMPOSITION: [(Check, PasswordPolicyError); 5] = [
    (
        |p| !p.chars().any(|c| c.is_control() && c != '\t' && c != '\n'),
        PasswordPolicyError::InvalidCharacter,
    ),
    (|p| p.bytes().any(|b| b.is_ascii_digit()), PasswordPolicyError::MissingDigit),
    (|p| p.chars().any(char::is_lowercase), PasswordPolicyError::MissingLowercase),
    (|p| p.chars().any(char::is_uppercase), PasswordPolicyError::MissingUppercase),
    (|p| p.chars().any(|c| !c.is_alphanumeric()), PasswordPolicyError::MissingSymbol),
];

fn policy_violations(normalized: &str) -> Vec<PasswordPolicyError> {
    if normalized.trim().is_empty() {
        return vec![PasswordPolicyError::EmptyOrWhitespace];
    }

    let actual = normalized.chars().count();
    let length = if actual < MIN_PASSWORD_LENGTH {
        Some(PasswordPolicyError::TooShort {
            min: MIN_PASSWORD_LENGTH,
            actual,
        })
    } else if actual > MAX_PASSWORD_LENGTH {
        Some(PasswordPolicyError::TooLong {
            max: MAX_PASSWORD_LENGTH,
            actual,
        })
    } else {
        None
    };

    length
        .into_iter()
        .chain(
            COMPOSITION
                .iter()
                .filter(|(holds, _)| !holds(normalized))
                .map(|(_, violation)| violation.clone()),
        )
        .chain(is_predictable(normalized).then_some(PasswordPolicyError::CommonPattern))
        .collect()
}

const KEYBOARD_RUNS: &[&str] = &["qwerty", "asdfgh", "zxcvbn", "qazwsx", "1qaz2wsx"];

/// Compared after stripping everything but letters
const COMMON_WORDS: &[&str] = &[
    "password", "letmein", "welcome", "admin", "iloveyou", "sunshine", "princess", "football",
    "monkey", "shadow", "master", "dragon", "baseball", "trustno1", "senha",
];

fn is_predictable(password: &str) -> bool {
    let lower = password.to_lowercase();
    let letters: String = lower.chars().filter(|c| c.is_alphabetic()).collect();

    repeats_one_char(&lower)
        || is_digit_run(&lower)
        || KEYBOARD_RUNS.iter().any(|run| lower.contains(run))
        || COMMON_WORDS.contains(&letters.as_str())
}

fn repeats_one_char(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => s.chars().nth(2).is_some() && chars.all(|c| c == first),
        None => false,
    }
}

/// `1234`, `7890`, `4321`: four or more digits stepping by one, wrapping at 9/0
fn is_digit_run(s: &str) -> bool {
    let Some(digits) = s
        .chars()
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<u32>>>()
    else {
        return false;
    };
    if digits.len() < 4 {
        return false;
    }

    let steps: Vec<u32> = digits.windows(2).map(|w| (w[1] + 10 - w[0]) % 10).collect();
    steps.iter().all(|&d| d == 1) || steps.iter().all(|&d| d == 9)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = 1_000;

    fn pw(s: &str) -> ClearTextPassword {
        ClearTextPassword::for_verification(s.to_string())
    }

    #[test]
    fn test_password_too_short() {
        let result = ClearTextPassword::new("Ab1!".to_string());
        assert!(matches!(result, Err(PasswordPolicyError::TooShort { .. })));
    }

    #[test]
    fn test_password_too_long() {
        let long_password = format!("Aa1!{}", "x".repeat(MAX_PASSWORD_LENGTH));
        let result = ClearTextPassword::new(long_password);
        assert!(matches!(result, Err(PasswordPolicyError::TooLong { .. })));
    }

    #[test]
    fn test_password_whitespace_only() {
        let result = ClearTextPassword::new("        ".to_string());
        assert_eq!(result.unwrap_err(), PasswordPolicyError::EmptyOrWhitespace);
    }

    #[test]
    fn test_composition_rules_reported_together() {
        let violations = ClearTextPassword::policy_violations("abcdefghij");
        assert!(violations.contains(&PasswordPolicyError::MissingDigit));
        assert!(violations.contains(&PasswordPolicyError::MissingUppercase));
        assert!(violations.contains(&PasswordPolicyError::MissingSymbol));
        assert!(!violations.contains(&PasswordPolicyError::MissingLowercase));
    }

    #[test]
    fn test_password_common_pattern() {
        let result = ClearTextPassword::new("Password123!".to_string());
        assert_eq!(result.unwrap_err(), PasswordPolicyError::CommonPattern);

        let result = ClearTextPassword::new("Qwerty#2024x".to_string());
        assert_eq!(result.unwrap_err(), PasswordPolicyError::CommonPattern);

        assert!(is_digit_run("12345678"));
        assert!(is_digit_run("7890"));
        assert!(is_digit_run("4321"));
        assert!(!is_digit_run("1235"));
        assert!(!is_digit_run("1234a"));
        assert!(repeats_one_char("aaaaaaaa"));
        assert!(!repeats_one_char("aa"));
    }

    #[test]
    fn test_valid_password() {
        assert!(ClearTextPassword::new("MySecure#Pass2024!".to_string()).is_ok());
        assert!(ClearTextPassword::policy_violations("Tr0ub4dor&3x").is_empty());
    }

    #[test]
    fn test_hash_format() {
        let hashed = pw("TestPassword123!").hash_with_iterations(FAST);
        let parts: Vec<&str> = hashed.as_str().split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "1000");
        assert_eq!(from_base64(parts[1]).unwrap().len(), SALT_LENGTH);
        assert_eq!(from_base64(parts[2]).unwrap().len(), HASH_LENGTH);
    }

    #[test]
    fn test_hash_and_verify() {
        let password = pw("TestPassword123!");
        let hashed = password.hash_with_iterations(FAST);

        assert!(hashed.verify(&password));
        assert!(!hashed.verify(&pw("WrongPassword123!")));
    }

    #[test]
    fn test_salt_is_random() {
        let password = pw("TestPassword123!");
        let a = password.hash_with_iterations(FAST);
        let b = password.hash_with_iterations(FAST);
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn test_known_pbkdf2_vector() {
        // RFC 7914 section 11, first 32 bytes of PBKDF2-HMAC-SHA256("passwd", "salt", 1)
        let stored = format!(
            "1:{}:{}",
            to_base64(b"salt"),
            to_base64(
                &hex::decode("55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc")
                    .unwrap()
            )
        );
        let hashed = HashedPassword::from_stored(stored).unwrap();
        assert!(hashed.verify(&pw("passwd")));
    }

    #[test]
    fn test_stored_roundtrip() {
        let password = pw("TestPassword123!");
        let hashed = password.hash_with_iterations(FAST);

        let restored = HashedPassword::from_stored(hashed.as_str().to_string()).unwrap();
        assert!(restored.verify(&password));
        assert_eq!(restored.iterations(), FAST);
    }

    #[test]
    fn test_invalid_stored_hash() {
        assert!(HashedPassword::from_stored("not_a_valid_hash").is_err());
        assert!(HashedPassword::from_stored("0:AAAA:AAAA").is_err());
        assert!(HashedPassword::from_stored("abc:AAAA:AAAA").is_err());
        assert!(HashedPassword::from_stored("1:AAAA:AAAA:AAAA").is_err());
    }

    #[test]
    fn test_needs_rehash() {
        let password = pw("TestPassword123!");
        assert!(password.hash_with_iterations(FAST).needs_rehash());
        assert!(!password.hash().needs_rehash());
    }

    #[test]
    fn test_debug_redaction() {
        let password = pw("secret");
        let debug_output = format!("{:?}", password);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("secret"));
    }
}
