// Auth Service - login and token validation

use crate::domain::{Account, Claims, Identity};
use crate::error::Result;
use crate::port::{AccountStore, TimeProvider, TokenIssuer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Token lifetime (12 hours)
pub const TOKEN_TTL_SECS: i64 = 12 * 60 * 60;

/// Answer to a login attempt; failures are reported here, not as errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub status: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,
}

impl LoginOutcome {
    fn refused(message: &str) -> Self {
        Self {
            status: false,
            message: message.to_string(),
            account: None,
        }
    }
}

pub struct AuthService {
    accounts: Arc<dyn AccountStore>,
    issuer: Arc<dyn TokenIssuer>,
    time_provider: Arc<dyn TimeProvider>,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        issuer: Arc<dyn TokenIssuer>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            accounts,
            issuer,
            time_provider,
        }
    }

    /// Check credentials and hand out a signed token.
    ///
    /// Only a token signing failure is returned as `Err`.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let account = match self.accounts.find_by_email(email.trim()).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                warn!(email, "Login for unknown email");
                return Ok(LoginOutcome::refused("Email address not found"));
            }
            Err(e) => {
                error!(error = %e, "Login lookup failed");
                return Ok(LoginOutcome::refused("Connection error. Please retry"));
            }
        };

        if account.password != password {
            warn!(account_id = account.id, "Login with wrong password");
            return Ok(LoginOutcome::refused(
                "Invalid login credentials. Please try again",
            ));
        }

        let iat = self.time_provider.now_secs();
        let claims = Claims {
            user_id: account.id,
            role: account.role.clone(),
            iat,
            exp: iat + TOKEN_TTL_SECS,
        };
        let token = self.issuer.issue(&claims)?;

        info!(account_id = account.id, "User logged in");
        let mut account = account.redacted();
        account.token = Some(token);
        Ok(LoginOutcome {
            status: true,
            message: "Logged In".to_string(),
            account: Some(account),
        })
    }

    pub fn validate(&self, token: &str) -> Result<Identity> {
        Ok(self.issuer.verify(token)?.identity())
    }
}
