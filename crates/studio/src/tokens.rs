//! Monotonically increasing request tokens.
//!
//! In-flight poll/refresh requests carry a token; a response whose token
//! is no longer the latest issued is discarded, so a superseded request
//! never overwrites fresher state regardless of arrival order.

use std::sync::atomic::{AtomicU64, Ordering};

/// Issues tokens and answers whether a given token is still the latest.
#[derive(Debug, Default)]
pub struct TokenIssuer {
    latest: AtomicU64,
}

impl TokenIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next token, superseding all previously issued ones.
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// `true` while no newer token has been issued.
    pub fn is_current(&self, token: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_increase() {
        let issuer = TokenIssuer::new();
        assert_eq!(issuer.issue(), 1);
        assert_eq!(issuer.issue(), 2);
    }

    #[test]
    fn newer_token_supersedes_older() {
        let issuer = TokenIssuer::new();
        let first = issuer.issue();
        assert!(issuer.is_current(first));
        let second = issuer.issue();
        assert!(!issuer.is_current(first));
        assert!(issuer.is_current(second));
    }
}
