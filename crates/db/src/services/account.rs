use crate::models::account::{Account, AccountStats, IdentityRequest, NewAccount};
use crate::services::error::{ServiceError, StoreError};
use crate::services::generator::{
    clean_name_part, generate_email_address, generate_password, random_name,
};
use crate::store::{AccountStore, Store};
use crate::ACCOUNT_TTL_HOURS;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub const MAX_EMAIL_ATTEMPTS: usize = 10;

/// Issues a new disposable identity: names, a unique address under `domain`
/// and a fresh password. This is the only path that creates accounts.
///
/// Each attempt generates a new address, looks it up and inserts it when
/// free. A unique violation on insert (another request took the address in
/// between) counts as a collision and the loop tries again, up to
/// `MAX_EMAIL_ATTEMPTS` times.
#[instrument(skip(store, request))]
pub async fn issue_identity<S: AccountStore + ?Sized>(
    store: &S,
    request: &IdentityRequest,
    domain: &str,
) -> Result<Account, ServiceError> {
    let (first_name, last_name) = resolve_names(request)?;
    let password = generate_password();

    for attempt in 1..=MAX_EMAIL_ATTEMPTS {
        let email = generate_email_address(&first_name, &last_name, domain);

        if store.find_account_by_email(&email).await?.is_some() {
            debug!(attempt, %email, "Generated address already taken");
            continue;
        }

        let new_account = NewAccount {
            first_name: &first_name,
            last_name: &last_name,
            email: &email,
            password: &password,
        };
        match store.insert_account(&new_account).await {
            Ok(account) => {
                info!(account_id = %account.id, email = %account.email, "Issued identity");
                return Ok(account);
            }
            Err(StoreError::UniqueViolation(_)) => {
                debug!(attempt, %email, "Address claimed concurrently");
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ServiceError::FailedToFindUniqueName(MAX_EMAIL_ATTEMPTS))
}

fn resolve_names(request: &IdentityRequest) -> Result<(String, String), ServiceError> {
    // Custom names apply only when both fields are present.
    let (first, last) = match (request.first_name.as_deref(), request.last_name.as_deref()) {
        (Some(first), Some(last)) if request.use_custom_name => (first.trim(), last.trim()),
        _ => {
            let (first, last) = random_name();
            return Ok((first.to_string(), last.to_string()));
        }
    };
    if first.is_empty() || last.is_empty() {
        return Err(ServiceError::Validation(
            "Both first name and last name are required when using custom names".to_string(),
        ));
    }
    if clean_name_part(first).is_empty() || clean_name_part(last).is_empty() {
        return Err(ServiceError::Validation(
            "Names must contain at least one letter.".to_string(),
        ));
    }
    Ok((first.to_string(), last.to_string()))
}

pub fn account_ttl() -> Duration {
    Duration::hours(ACCOUNT_TTL_HOURS)
}

/// Loads an account that exists and has not outlived its TTL.
pub async fn find_live_account<S: AccountStore + ?Sized>(
    store: &S,
    account_id: Uuid,
) -> Result<Account, ServiceError> {
    let account = store
        .find_account_by_id(account_id)
        .await?
        .ok_or(ServiceError::NotFound("Account"))?;
    if account.is_expired_at(Utc::now(), account_ttl()) {
        return Err(ServiceError::Expired);
    }
    Ok(account)
}

#[derive(Debug, Serialize)]
pub struct SystemStats {
    pub accounts: AccountStats,
    pub emails: EmailTotals,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct EmailTotals {
    pub total: i64,
}

/// Account totals split by TTL plus the overall email count.
pub async fn collect_stats<S: Store + ?Sized>(store: &S) -> Result<SystemStats, ServiceError> {
    let now = Utc::now();
    let accounts = store.account_stats(now - account_ttl()).await?;
    let total = store.count_emails().await?;
    Ok(SystemStats {
        accounts,
        emails: EmailTotals { total },
        timestamp: now,
    })
}
