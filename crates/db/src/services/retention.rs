use crate::models::email::SweepReport;
use crate::services::error::ServiceError;
use crate::store::AccountStore;
use chrono::{Duration, Utc};
use tracing::{info, instrument};

/// Deletes every account created more than `ttl_hours` ago. Emails go with
/// their accounts. Running it again with nothing newly expired reports zero.
#[instrument(skip(store))]
pub async fn sweep_expired_accounts<S: AccountStore + ?Sized>(
    store: &S,
    ttl_hours: i64,
) -> Result<SweepReport, ServiceError> {
    let cutoff = Utc::now() - Duration::hours(ttl_hours);
    let report = store.delete_accounts_created_before(cutoff).await?;

    info!(
        deleted_accounts = report.deleted_accounts,
        deleted_emails = report.deleted_emails,
        %cutoff,
        "Retention sweep finished"
    );
    Ok(report)
}
