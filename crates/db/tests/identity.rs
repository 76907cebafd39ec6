use async_trait::async_trait;
use chrono::{DateTime, Utc};
use db::models::account::{Account, AccountStats, IdentityRequest, NewAccount};
use db::models::email::SweepReport;
use db::services::account::{issue_identity, MAX_EMAIL_ATTEMPTS};
use db::services::error::{ServiceError, StoreError};
use db::store::{AccountStore, MemoryStore};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

const DOMAIN: &str = "mail.example.test";

fn random_request() -> IdentityRequest {
    IdentityRequest::default()
}

fn custom_request(first: &str, last: &str) -> IdentityRequest {
    IdentityRequest {
        use_custom_name: true,
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
    }
}

/// Reports every candidate address as taken.
#[derive(Default)]
struct SaturatedStore {
    lookups: AtomicUsize,
}

#[async_trait]
impl AccountStore for SaturatedStore {
    async fn insert_account(&self, _account: &NewAccount<'_>) -> Result<Account, StoreError> {
        panic!("insert must not be reached when every address is taken");
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Account {
            id: Uuid::new_v4(),
            first_name: "Taken".to_string(),
            last_name: "Already".to_string(),
            email: email.to_string(),
            password: "x".to_string(),
            created_at: Utc::now(),
        }))
    }

    async fn find_account_by_id(&self, _id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(None)
    }

    async fn delete_accounts_created_before(
        &self,
        _cutoff: DateTime<Utc>,
    ) -> Result<SweepReport, StoreError> {
        Ok(SweepReport::default())
    }

    async fn account_stats(&self, _active_since: DateTime<Utc>) -> Result<AccountStats, StoreError> {
        Ok(AccountStats {
            total: 0,
            active: 0,
            expired: 0,
        })
    }
}

/// Loses the insert race a fixed number of times before delegating.
struct RacingStore {
    inner: MemoryStore,
    losses_left: AtomicUsize,
}

#[async_trait]
impl AccountStore for RacingStore {
    async fn insert_account(&self, account: &NewAccount<'_>) -> Result<Account, StoreError> {
        if self
            .losses_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::UniqueViolation(account.email.to_string()));
        }
        self.inner.insert_account(account).await
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.inner.find_account_by_email(email).await
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        self.inner.find_account_by_id(id).await
    }

    async fn delete_accounts_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<SweepReport, StoreError> {
        self.inner.delete_accounts_created_before(cutoff).await
    }

    async fn account_stats(&self, active_since: DateTime<Utc>) -> Result<AccountStats, StoreError> {
        self.inner.account_stats(active_since).await
    }
}

#[tokio::test]
async fn issued_account_is_findable_by_email() {
    let store = MemoryStore::new();
    let account = issue_identity(&store, &random_request(), DOMAIN).await.unwrap();

    assert!(account.email.ends_with("@mail.example.test"));
    let found = store
        .find_account_by_email(&account.email)
        .await
        .unwrap()
        .expect("account should be stored");
    assert_eq!(found.id, account.id);
    assert_eq!(found.password, account.password);
}

#[tokio::test]
async fn issued_addresses_never_reuse_existing_ones() {
    let store = MemoryStore::new();
    let existing = store
        .insert_account(&NewAccount {
            first_name: "Ash",
            last_name: "Ashgrove",
            email: "ash.ashgrove1@mail.example.test",
            password: "Secret#123abc",
        })
        .await
        .unwrap();

    let mut seen = HashSet::from([existing.email.clone()]);
    for _ in 0..100 {
        let account = issue_identity(&store, &custom_request("Ash", "Ashgrove"), DOMAIN)
            .await
            .unwrap();
        assert!(seen.insert(account.email.clone()), "duplicate {}", account.email);
    }
}

#[tokio::test]
async fn custom_names_are_trimmed_and_used() {
    let store = MemoryStore::new();
    let account = issue_identity(&store, &custom_request("  Mary-Jane ", " O'Neil "), DOMAIN)
        .await
        .unwrap();

    assert_eq!(account.first_name, "Mary-Jane");
    assert_eq!(account.last_name, "O'Neil");
    assert!(account.email.starts_with("maryjane.oneil"));
}

#[tokio::test]
async fn blank_custom_name_is_rejected() {
    let store = MemoryStore::new();
    for (first, last) in [("   ", "Smith"), ("Jane", ""), ("", "")] {
        let err = issue_identity(&store, &custom_request(first, last), DOMAIN)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "{first:?} {last:?}");
    }
}

#[tokio::test]
async fn absent_custom_name_falls_back_to_random() {
    let store = MemoryStore::new();
    let missing = IdentityRequest {
        use_custom_name: true,
        first_name: Some("Jane".to_string()),
        last_name: None,
    };
    let account = issue_identity(&store, &missing, DOMAIN).await.unwrap();
    assert_ne!(account.first_name, "Jane");
    assert!(account.email.ends_with(&format!("@{DOMAIN}")));
}

#[tokio::test]
async fn mixed_case_domain_yields_lowercase_address() {
    let store = MemoryStore::new();
    let account = issue_identity(&store, &random_request(), "Mail.Example.Test")
        .await
        .unwrap();
    assert!(account.email.ends_with("@mail.example.test"), "{}", account.email);
    assert_eq!(account.email, account.email.to_lowercase());
}

#[tokio::test]
async fn names_without_letters_are_rejected() {
    let store = MemoryStore::new();
    let err = issue_identity(&store, &custom_request("123", "456"), DOMAIN)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn gives_up_after_ten_collisions() {
    let store = SaturatedStore::default();
    let err = issue_identity(&store, &random_request(), DOMAIN)
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::FailedToFindUniqueName(MAX_EMAIL_ATTEMPTS)));
    assert_eq!(store.lookups.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn lost_insert_race_is_retried() {
    let store = RacingStore {
        inner: MemoryStore::new(),
        losses_left: AtomicUsize::new(2),
    };
    let account = issue_identity(&store, &random_request(), DOMAIN).await.unwrap();
    assert!(store
        .inner
        .find_account_by_email(&account.email)
        .await
        .unwrap()
        .is_some());
}
