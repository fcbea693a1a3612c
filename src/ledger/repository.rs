//! Account Repository
//!
//! CRUD access to account records. Input validation only; every financial
//! rule lives in the transfer engine.

use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use rust_decimal::Decimal;

use crate::domain::{Account, AccountId, NewAccount};
use crate::store::{LedgerStore, StoreError};

use super::LedgerError;

/// Repository over a [`LedgerStore`]
#[derive(Debug, Clone)]
pub struct AccountRepository<S> {
    store: S,
}

impl<S: LedgerStore> AccountRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create an account. The initial balance is set here once and never
    /// written by the repository again.
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        initial_balance: Decimal,
    ) -> Result<Account, LedgerError> {
        let new_account = NewAccount::new(name, email, initial_balance)?;

        match self.store.insert_account(&new_account).await {
            Ok(account) => {
                tracing::info!(account_id = %account.id, "account created");
                Ok(account)
            }
            Err(StoreError::UniqueViolation(_)) => {
                Err(LedgerError::DuplicateEmail(new_account.email().to_string()))
            }
            Err(e) => {
                tracing::error!(operation = "create_account", error = ?e, "store failure");
                Err(e.into())
            }
        }
    }

    /// Get an account by id
    pub async fn get_by_id(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .find_account(id)
            .await
            .map_err(|e| {
                tracing::error!(operation = "get_account", account_id = %id, error = ?e, "store failure");
                LedgerError::from(e)
            })?
            .ok_or(LedgerError::NotFound(id))
    }

    /// Lazily stream all accounts ordered by id. Each call starts a fresh snapshot.
    pub fn list(&self) -> BoxStream<'_, Result<Account, LedgerError>> {
        self.store.stream_accounts().map_err(LedgerError::from).boxed()
    }

    /// Collect [`AccountRepository::list`] into a vector
    pub async fn list_all(&self) -> Result<Vec<Account>, LedgerError> {
        self.list().try_collect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use crate::ledger::ErrorKind;
    use crate::store::MemoryLedgerStore;
    use rust_decimal_macros::dec;

    fn repository() -> AccountRepository<MemoryLedgerStore> {
        AccountRepository::new(MemoryLedgerStore::new())
    }

    #[tokio::test]
    async fn test_create_then_get_returns_same_fields() {
        let repo = repository();
        let created = repo.create("Arman", "arman@kbtu.kz", dec!(1000)).await.unwrap();

        let fetched = repo.get_by_id(created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.name, "Arman");
        assert_eq!(fetched.email, "arman@kbtu.kz");
        assert_eq!(fetched.balance.value(), dec!(1000));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let repo = repository();

        let err = repo.create("", "arman@kbtu.kz", dec!(1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(DomainError::EmptyName)));

        let err = repo.create("Arman", "not-an-email", dec!(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = repo.create("Arman", "arman@kbtu.kz", dec!(-1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_case_insensitive() {
        let repo = repository();
        repo.create("Arman", "arman@kbtu.kz", dec!(1)).await.unwrap();

        let err = repo.create("Arman 2", "ARMAN@kbtu.kz", dec!(1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateEmail(email) if email == "arman@kbtu.kz"));
    }

    #[tokio::test]
    async fn test_get_missing_account() {
        let repo = repository();
        let err = repo.get_by_id(AccountId::new(404)).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(id) if id == AccountId::new(404)));
    }

    #[tokio::test]
    async fn test_list_returns_all_in_id_order() {
        let repo = repository();
        repo.create("Arman", "arman@kbtu.kz", dec!(1000)).await.unwrap();
        repo.create("Anara", "anara@kbtu.kz", dec!(500)).await.unwrap();

        let accounts = repo.list_all().await.unwrap();
        let names: Vec<&str> = accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["Arman", "Anara"]);
    }
}
