//! Password hashing with bcrypt.

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct HashingError(#[from] bcrypt::BcryptError);

#[derive(Debug, Clone)]
pub struct Credentials {
    cost: u32,
    /// Hash at the same cost, verified against when an account doesn't exist
    /// so that path takes as long as a wrong password.
    dummy_hash: String,
}

impl Credentials {
    pub fn new(cost: u32) -> Result<Self, HashingError> {
        let dummy_hash = bcrypt::hash("paphos-dummy-password", cost)?;
        Ok(Self { cost, dummy_hash })
    }

    /// Salted one-way hash of `password`.
    pub fn hash(&self, password: &str) -> Result<String, HashingError> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    /// `Ok(false)` on a wrong password. `Err` only when `stored_hash` is not a
    /// bcrypt hash at all.
    pub fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, HashingError> {
        Ok(bcrypt::verify(password, stored_hash)?)
    }

    /// Verify against the stored hash, or burn an equivalent verify when there
    /// is no account. Always `false` for a missing account.
    pub fn verify_account(&self, password: &str, stored_hash: Option<&str>) -> Result<bool, HashingError> {
        match stored_hash {
            Some(hash) => self.verify(password, hash),
            None => {
                self.verify(password, &self.dummy_hash)?;
                Ok(false)
            }
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> Credentials {
        Credentials::new(4).unwrap()
    }

    #[test]
    fn hash_verifies_against_same_password() {
        let credentials = fast();
        let hash = credentials.hash("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(credentials.verify("correct horse", &hash).unwrap());
    }

    #[test]
    fn wrong_password_is_false_not_error() {
        let credentials = fast();
        let hash = credentials.hash("correct horse").unwrap();
        assert!(!credentials.verify("battery staple", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let credentials = fast();
        let a = credentials.hash("same").unwrap();
        let b = credentials.hash("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_stored_hash_is_an_error() {
        assert!(fast().verify("anything", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn missing_account_still_runs_a_verify_at_the_same_cost() {
        let credentials = fast();
        assert_eq!(credentials.cost(), 4);
        assert!(credentials.dummy_hash.starts_with("$2b$04$"));

        // Even the dummy password itself never authenticates a missing account.
        assert!(!credentials.verify_account("paphos-dummy-password", None).unwrap());

        let hash = credentials.hash("correct horse").unwrap();
        assert!(credentials.verify_account("correct horse", Some(&hash)).unwrap());
        assert!(!credentials.verify_account("wrong", Some(&hash)).unwrap());
    }
}
