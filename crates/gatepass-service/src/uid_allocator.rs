//! Short unique code allocation.

use gatepass_core::{GatepassError, GatepassResult};
use gatepass_repository::UserRepository;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, warn};

/// Symbols a uid is drawn from. `0`, `1`, `I` and `O` are left out.
pub const UID_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generates a random candidate of `length` symbols.
#[must_use]
pub fn generate_candidate(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..UID_ALPHABET.len());
            char::from(UID_ALPHABET[idx])
        })
        .collect()
}

/// Allocates uids that are not yet taken in the repository.
///
/// Two allocators may still pick the same free candidate concurrently; the
/// store's unique constraint turns that into a `Conflict` on insert.
#[derive(Clone)]
pub struct UidAllocator {
    user_repository: Arc<dyn UserRepository>,
    length: usize,
    max_attempts: u32,
}

impl UidAllocator {
    /// Creates an allocator.
    #[must_use]
    pub fn new(user_repository: Arc<dyn UserRepository>, length: usize, max_attempts: u32) -> Self {
        Self {
            user_repository,
            length,
            max_attempts,
        }
    }

    /// Returns a uid that did not exist at the time of the check.
    pub async fn allocate(&self) -> GatepassResult<String> {
        for attempt in 1..=self.max_attempts {
            let candidate = generate_candidate(self.length);
            if !self.user_repository.exists_by_uid(&candidate).await? {
                debug!("Allocated uid {} on attempt {}", candidate, attempt);
                return Ok(candidate);
            }
            debug!("uid {} already taken", candidate);
        }

        warn!("uid allocation exhausted after {} attempts", self.max_attempts);
        Err(GatepassError::internal(format!(
            "Could not allocate a unique uid after {} attempts",
            self.max_attempts
        )))
    }
}

impl std::fmt::Debug for UidAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UidAllocator")
            .field("length", &self.length)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_user, InMemoryUserRepository};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn candidate_has_requested_length_and_alphabet(length in 1usize..32) {
            let candidate = generate_candidate(length);
            prop_assert_eq!(candidate.len(), length);
            prop_assert!(candidate.bytes().all(|b| UID_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_alphabet_has_no_ambiguous_symbols() {
        for ambiguous in [b'0', b'1', b'I', b'O'] {
            assert!(!UID_ALPHABET.contains(&ambiguous));
        }
        assert_eq!(UID_ALPHABET.len(), 32);
    }

    #[tokio::test]
    async fn test_allocate_returns_free_uid() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let allocator = UidAllocator::new(repo, 6, 10);

        let uid = allocator.allocate().await.unwrap();
        assert_eq!(uid.len(), 6);
    }

    #[tokio::test]
    async fn test_allocate_exhausts_when_every_candidate_is_taken() {
        // Single-symbol uids over a saturated alphabet can never be free.
        let repo = Arc::new(InMemoryUserRepository::new());
        for (i, symbol) in UID_ALPHABET.iter().enumerate() {
            let mut user = test_user(&format!("u{i}"), &format!("08{i:08}"));
            user.uid = char::from(*symbol).to_string();
            repo.insert(user);
        }
        let allocator = UidAllocator::new(repo.clone(), 1, 5);

        let err = allocator.allocate().await.unwrap_err();
        assert!(matches!(err, GatepassError::Internal(_)));
        assert_eq!(repo.exists_calls(), 5);
    }
}
