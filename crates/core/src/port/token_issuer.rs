// Token Issuer Port (credential signing/verification)

use crate::domain::Claims;
use crate::error::Result;

/// Signs and verifies bearer tokens
///
/// Implementations reject expired or tampered tokens in `verify` with
/// `AppError::Unauthenticated`.
pub trait TokenIssuer: Send + Sync {
    /// Sign claims into an opaque token string
    fn issue(&self, claims: &Claims) -> Result<String>;

    /// Verify a token and return its claims
    fn verify(&self, token: &str) -> Result<Claims>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;

    /// Unsigned "user_id|role|iat|exp" tokens, for tests only
    pub struct PlainTokenIssuer;

    impl TokenIssuer for PlainTokenIssuer {
        fn issue(&self, claims: &Claims) -> Result<String> {
            Ok(format!(
                "{}|{}|{}|{}",
                claims.user_id, claims.role, claims.iat, claims.exp
            ))
        }

        fn verify(&self, token: &str) -> Result<Claims> {
            let parts: Vec<&str> = token.split('|').collect();
            let invalid = || AppError::Unauthenticated("Invalid/Malformed auth token".to_string());
            if parts.len() != 4 {
                return Err(invalid());
            }
            Ok(Claims {
                user_id: parts[0].parse().map_err(|_| invalid())?,
                role: parts[1].to_string(),
                iat: parts[2].parse().map_err(|_| invalid())?,
                exp: parts[3].parse().map_err(|_| invalid())?,
            })
        }
    }
}
