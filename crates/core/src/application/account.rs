// Account Service - admin-only user management

use crate::domain::{Account, AccountId, Identity, ADMIN_ROLE};
use crate::error::{AppError, Result};
use crate::port::{AccountStore, Transaction};
use std::sync::Arc;
use tracing::{info, warn};

pub struct AccountService {
    store: Arc<dyn AccountStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    fn require_admin(&self, identity: &Identity) -> Result<()> {
        if !identity.is_admin() {
            warn!(user_id = identity.user_id, role = %identity.role, "Non-admin user management attempt");
            return Err(AppError::Unauthorized("Unauthorized user".to_string()));
        }
        Ok(())
    }

    pub async fn list(&self, identity: &Identity) -> Result<Vec<Account>> {
        self.require_admin(identity)?;
        let accounts = self.store.list().await?;
        Ok(accounts.into_iter().map(Account::redacted).collect())
    }

    pub async fn get(&self, identity: &Identity, id: AccountId) -> Result<Option<Account>> {
        self.require_admin(identity)?;
        Ok(self.store.find_by_id(id).await?.map(Account::redacted))
    }

    /// Insert when `account.id` is 0, otherwise update the non-empty fields
    /// of the existing row. The result never carries a password.
    pub async fn upsert(&self, identity: &Identity, account: Account) -> Result<Account> {
        self.require_admin(identity)?;

        let account = Account {
            email: account.email.trim().to_lowercase(),
            token: None,
            ..account
        };

        if account.is_new() && account.email.is_empty() {
            return Err(AppError::Validation("email is required".to_string()));
        }
        if !account.is_new()
            && account.email.is_empty()
            && account.role.is_empty()
            && account.password.is_empty()
        {
            return Err(AppError::Validation(format!(
                "nothing to update for account {}",
                account.id
            )));
        }

        let mut tx = self.store.begin().await?;
        let stored = if account.is_new() {
            let stored = tx.insert(&account).await?;
            info!(account_id = stored.id, "Account created");
            stored
        } else {
            let affected = tx.update(&account).await?;
            if affected == 0 {
                return Err(AppError::Validation(format!("account {} does not exist", account.id)));
            }
            info!(account_id = account.id, "Account updated");
            account
        };
        tx.commit().await?;

        if stored.email.is_empty() || stored.role.is_empty() {
            // Partial update: answer with the row as now stored
            if let Some(current) = self.store.find_by_id(stored.id).await? {
                return Ok(current.redacted());
            }
        }
        Ok(stored.redacted())
    }

    /// Create an admin account with `email` unless one already exists.
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<bool> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation("admin email and password are required".to_string()));
        }
        if self.store.find_by_email(&email).await?.is_some() {
            return Ok(false);
        }

        let mut tx = self.store.begin().await?;
        let stored = tx
            .insert(&Account {
                email,
                password: password.to_string(),
                role: ADMIN_ROLE.to_string(),
                ..Default::default()
            })
            .await?;
        tx.commit().await?;

        info!(account_id = stored.id, "Bootstrap admin account created");
        Ok(true)
    }

    /// Returns whether a row was removed
    pub async fn delete(&self, identity: &Identity, id: AccountId) -> Result<bool> {
        self.require_admin(identity)?;

        let mut tx = self.store.begin().await?;
        let affected = tx.delete(id).await?;
        tx.commit().await?;

        info!(account_id = id, affected, "Account delete");
        Ok(affected > 0)
    }
}
