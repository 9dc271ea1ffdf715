// Salted PBKDF2-SHA256 password hashes in the `pbkdf2:sha256:<iterations>$<salt>$<hex>` format

use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::Sha256;

const METHOD: &str = "pbkdf2:sha256";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Hashes passwords with a fixed iteration count
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    pub const DEFAULT_ITERATIONS: u32 = 600_000;

    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash with a fresh random salt
    pub fn hash(&self, password: &str) -> String {
        let salt: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SALT_LEN)
            .map(char::from)
            .collect();

        let digest = derive(password, &salt, self.iterations);
        format!("{}:{}${}${}", METHOD, self.iterations, salt, digest)
    }

    /// Check a password against a stored hash. Malformed hashes never match.
    pub fn verify(stored: &str, password: &str) -> bool {
        let mut parts = stored.splitn(3, '$');
        let (Some(method), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next()) else {
            return false;
        };

        let Some(iterations) = method
            .strip_prefix(METHOD)
            .and_then(|rest| rest.strip_prefix(':'))
            .and_then(|n| n.parse::<u32>().ok())
        else {
            return false;
        };

        let actual = derive(password, salt, iterations);
        constant_time_eq(actual.as_bytes(), expected.as_bytes())
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ITERATIONS)
    }
}

fn derive(password: &str, salt: &str, iterations: u32) -> String {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut key);
    hex::encode(key)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
