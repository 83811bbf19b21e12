// SQLite AccountStore Implementation

use crate::executor::SqliteExecutor;
use crate::query::{self, ValueSet};
use crate::rows::ACCOUNTS;
use crate::transaction::TxScope;
use async_trait::async_trait;
use batchdesk_core::domain::{Account, AccountId};
use batchdesk_core::error::Result;
use batchdesk_core::port::{AccountStore, AccountTransaction, Transaction};

/// Non-empty fields of an account, id excluded
fn account_values(account: &Account) -> ValueSet {
    let mut values = ValueSet::new();
    if !account.email.is_empty() {
        values.push("email", account.email.as_str());
    }
    if !account.role.is_empty() {
        values.push("role", account.role.as_str());
    }
    if !account.password.is_empty() {
        values.push("password", account.password.as_str());
    }
    values
}

pub struct SqliteAccountStore {
    executor: SqliteExecutor,
}

impl SqliteAccountStore {
    pub fn new(executor: SqliteExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn begin(&self) -> Result<Box<dyn AccountTransaction>> {
        let scope = self.executor.begin().await?;
        Ok(Box::new(SqliteAccountTransaction {
            executor: self.executor.clone(),
            scope,
        }))
    }

    async fn list(&self) -> Result<Vec<Account>> {
        let statement = query::select(
            format!("{} order by id", ACCOUNTS.select_all()),
            &ValueSet::new(),
        );
        self.executor.query_all(None, &statement).await
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        self.executor.find(None, id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let statement = query::select(
            format!("{} where email = lower($1)", ACCOUNTS.select_all()),
            &ValueSet::new().with("email", email),
        );
        self.executor.query_one(None, &statement).await
    }
}

pub struct SqliteAccountTransaction {
    executor: SqliteExecutor,
    scope: TxScope,
}

#[async_trait]
impl Transaction for SqliteAccountTransaction {
    async fn commit(&mut self) -> Result<()> {
        self.scope.commit().await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.scope.rollback().await
    }
}

#[async_trait]
impl AccountTransaction for SqliteAccountTransaction {
    async fn insert(&mut self, account: &Account) -> Result<Account> {
        self.executor
            .insert_returning(&mut self.scope, &account_values(account))
            .await
    }

    async fn update(&mut self, account: &Account) -> Result<u64> {
        let filters = ValueSet::new().with(ACCOUNTS.primary_key, account.id);
        let statement = query::update(ACCOUNTS.table, &account_values(account), &filters);
        self.executor.execute(&mut self.scope, &statement).await
    }

    async fn delete(&mut self, id: AccountId) -> Result<u64> {
        let filters = ValueSet::new().with(ACCOUNTS.primary_key, id);
        self.executor
            .execute(&mut self.scope, &query::delete(ACCOUNTS.table, &filters))
            .await
    }
}
