// Account & Identity Domain Model

use serde::{Deserialize, Serialize};

/// Role allowed to manage accounts
pub const ADMIN_ROLE: &str = "admin";

/// Account ID (assigned by the store on insert, 0 means "not yet stored")
pub type AccountId = i64;

/// User account
///
/// `password` is only populated on the login path. Every other read path
/// returns it blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub id: AccountId,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Account {
    pub fn is_new(&self) -> bool {
        self.id == 0
    }

    /// Same account with the password blanked
    pub fn redacted(mut self) -> Self {
        self.password.clear();
        self
    }
}

/// Caller identity extracted from a verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: AccountId,
    pub role: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Token payload: identity plus issue/expiry instants (unix seconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: AccountId,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            role: self.role.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_clears_password_only() {
        let account = Account {
            id: 7,
            email: "a@b.c".to_string(),
            password: "secret".to_string(),
            role: "admin".to_string(),
            token: None,
        };
        let redacted = account.clone().redacted();
        assert!(redacted.password.is_empty());
        assert_eq!(redacted.email, account.email);
        assert_eq!(redacted.id, 7);
    }

    #[test]
    fn test_password_not_serialized_when_blank() {
        let account = Account {
            id: 1,
            email: "x@y.z".to_string(),
            role: "user".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&account).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("token").is_none());
    }

    #[test]
    fn test_admin_check_is_exact() {
        let admin = Identity { user_id: 1, role: "admin".to_string() };
        let other = Identity { user_id: 2, role: "Admin".to_string() };
        assert!(admin.is_admin());
        assert!(!other.is_admin());
    }
}
