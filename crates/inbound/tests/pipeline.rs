use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use db::models::account::{Account, AccountStats, IdentityRequest, NewAccount};
use db::services::account::issue_identity;
use db::models::email::{Email, NewEmail, SweepReport};
use db::services::error::StoreError;
use db::store::{AccountStore, EmailStore, MemoryStore};
use http::{HeaderMap, HeaderValue};
use inbound::signature::sign_hex;
use inbound::{DeployMode, IngestError, InboundProcessor, RecipientStatus, SignatureVerifier};
use serde_json::json;
use uuid::Uuid;

const SECRET: &str = "relay-shared-secret";

fn dev_processor() -> InboundProcessor {
    InboundProcessor::new(SignatureVerifier::new(None, DeployMode::Development))
}

fn signed_processor() -> InboundProcessor {
    InboundProcessor::new(SignatureVerifier::new(
        Some(SECRET.to_string()),
        DeployMode::Production,
    ))
}

fn signed_headers(body: &[u8]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let value = format!("sha256={}", sign_hex(body, SECRET));
    headers.insert("webhook-signature", HeaderValue::from_str(&value).unwrap());
    headers
}

async fn seed_account(store: &MemoryStore, email: &str, age_hours: i64) -> Account {
    store
        .insert_account_at(
            &NewAccount {
                first_name: "Vesper",
                last_name: "Crowley",
                email,
                password: "Pa55word!xyz",
            },
            Utc::now() - Duration::hours(age_hours),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn stores_for_known_recipient_and_reports_unknown() {
    let store = MemoryStore::new();
    let known = seed_account(&store, "known@svc.com", 1).await;
    let body = json!({"from": "a@x.com", "to": ["known@svc.com", "ghost@svc.com"]}).to_string();

    let report = dev_processor()
        .ingest(&store, body.as_bytes(), &HeaderMap::new())
        .await
        .unwrap();

    assert!(report.success);
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results[0].recipient, "known@svc.com");
    assert_eq!(report.results[0].status, RecipientStatus::Stored);
    assert_eq!(report.results[1].recipient, "ghost@svc.com");
    assert_eq!(report.results[1].status, RecipientStatus::NoAccount);
    assert_eq!(store.count_emails().await.unwrap(), 1);

    let email_id = report.results[0].email_id.unwrap();
    let stored = store.find_email_by_id(email_id).await.unwrap().unwrap();
    assert_eq!(stored.account_id, known.id);
    assert_eq!(stored.sender, "a@x.com");
    assert_eq!(stored.subject.as_deref(), Some("No Subject"));
    assert_eq!(stored.recipient.as_deref(), Some("known@svc.com"));
    assert_eq!(stored.is_sent, Some(false));
}

#[tokio::test]
async fn blank_recipient_is_reported_in_place() {
    let store = MemoryStore::new();
    seed_account(&store, "known@svc.com", 1).await;
    let body = json!({"from": "a@x.com", "to": ["known@svc.com", "", "ghost@svc.com"]}).to_string();

    let report = dev_processor()
        .ingest(&store, body.as_bytes(), &HeaderMap::new())
        .await
        .unwrap();

    let statuses: Vec<RecipientStatus> = report.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            RecipientStatus::Stored,
            RecipientStatus::NoAccount,
            RecipientStatus::NoAccount
        ]
    );
    assert_eq!(report.results[1].recipient, "");
    assert_eq!(store.count_emails().await.unwrap(), 1);
}

#[tokio::test]
async fn identity_issued_under_mixed_case_domain_receives_mail() {
    let store = MemoryStore::new();
    let account = issue_identity(&store, &IdentityRequest::default(), "Mail.Example.Test")
        .await
        .unwrap();
    let body = json!({"from": "a@x.com", "to": account.email.to_uppercase()}).to_string();

    let report = dev_processor()
        .ingest(&store, body.as_bytes(), &HeaderMap::new())
        .await
        .unwrap();

    assert_eq!(report.results[0].status, RecipientStatus::Stored);
    assert_eq!(store.email_count_for(account.id).await, 1);
}

#[tokio::test]
async fn expired_account_accepts_no_mail() {
    let store = MemoryStore::new();
    let stale = seed_account(&store, "stale@svc.com", 25).await;
    let body = json!({
        "type": "email.received",
        "data": {"from": "a@x.com", "to": ["stale@svc.com"], "subject": "late", "text": "hi"}
    })
    .to_string();

    let report = dev_processor()
        .ingest(&store, body.as_bytes(), &HeaderMap::new())
        .await
        .unwrap();

    assert_eq!(report.results[0].status, RecipientStatus::Expired);
    assert_eq!(store.email_count_for(stale.id).await, 0);
}

#[tokio::test]
async fn body_is_sanitized_before_storage() {
    let store = MemoryStore::new();
    seed_account(&store, "reader@svc.com", 1).await;
    let body = json!({
        "from": "a@x.com",
        "to": "reader@svc.com",
        "subject": "html only",
        "html": "<html><style>p{}</style><p>Hi</p>&nbsp;<b>you</b><script>x()</script></html>"
    })
    .to_string();

    let report = dev_processor()
        .ingest(&store, body.as_bytes(), &HeaderMap::new())
        .await
        .unwrap();
    let id = report.results[0].email_id.unwrap();
    let stored = store.find_email_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.body.as_deref(), Some("Hi you"));

    let scripted = json!({
        "from": "a@x.com",
        "to": "reader@svc.com",
        "text": "click <script>steal()</script>here"
    })
    .to_string();
    let report = dev_processor()
        .ingest(&store, scripted.as_bytes(), &HeaderMap::new())
        .await
        .unwrap();
    let id = report.results[0].email_id.unwrap();
    let stored = store.find_email_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.body.as_deref(), Some("click here"));
}

#[tokio::test]
async fn recipient_lookup_ignores_case_and_display_name() {
    let store = MemoryStore::new();
    seed_account(&store, "nyx.grimshaw12@svc.com", 1).await;
    let body = json!({"from": "a@x.com", "to": "Nyx <Nyx.Grimshaw12@SVC.com>"}).to_string();

    let report = dev_processor()
        .ingest(&store, body.as_bytes(), &HeaderMap::new())
        .await
        .unwrap();
    assert_eq!(report.results[0].status, RecipientStatus::Stored);
    assert_eq!(report.results[0].recipient, "Nyx <Nyx.Grimshaw12@SVC.com>");
}

#[tokio::test]
async fn bad_signature_persists_nothing() {
    let store = MemoryStore::new();
    seed_account(&store, "known@svc.com", 1).await;
    let body = json!({"from": "a@x.com", "to": ["known@svc.com"]}).to_string();

    let mut headers = signed_headers(body.as_bytes());
    headers.insert("svix-signature", HeaderValue::from_static("v1,AAAA"));
    let err = signed_processor()
        .ingest(&store, body.as_bytes(), &headers)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Unauthorized));

    let err = signed_processor()
        .ingest(&store, body.as_bytes(), &HeaderMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Unauthorized));
    assert_eq!(store.count_emails().await.unwrap(), 0);
}

#[tokio::test]
async fn valid_signature_is_accepted() {
    let store = MemoryStore::new();
    seed_account(&store, "known@svc.com", 1).await;
    let body = json!({"from": "a@x.com", "to": ["known@svc.com"]}).to_string();

    let report = signed_processor()
        .ingest(&store, body.as_bytes(), &signed_headers(body.as_bytes()))
        .await
        .unwrap();
    assert_eq!(report.stored_count(), 1);
}

#[tokio::test]
async fn production_without_secret_fails_closed() {
    let store = MemoryStore::new();
    let processor =
        InboundProcessor::new(SignatureVerifier::new(None, DeployMode::Production));
    let body = json!({"from": "a@x.com", "to": ["known@svc.com"]}).to_string();

    let err = processor
        .ingest(&store, body.as_bytes(), &HeaderMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Unauthorized));
}

#[tokio::test]
async fn invalid_payload_persists_nothing() {
    let store = MemoryStore::new();
    seed_account(&store, "known@svc.com", 1).await;

    for body in [
        "not json".to_string(),
        json!({"to": ["known@svc.com"]}).to_string(),
        json!({"from": "a@x.com"}).to_string(),
    ] {
        let err = dev_processor()
            .ingest(&store, body.as_bytes(), &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Payload(_)), "{body}");
    }
    assert_eq!(store.count_emails().await.unwrap(), 0);
}

/// Fails email inserts for one account and delegates everything else.
struct FlakyStore {
    inner: MemoryStore,
    broken_account: Uuid,
}

#[async_trait]
impl AccountStore for FlakyStore {
    async fn insert_account(&self, account: &NewAccount<'_>) -> Result<Account, StoreError> {
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

#[async_trait]
impl EmailStore for FlakyStore {
    async fn insert_email(&self, email: &NewEmail<'_>) -> Result<Email, StoreError> {
        if email.account_id == self.broken_account {
            return Err(StoreError::MissingAccount(email.account_id));
        }
        self.inner.insert_email(email).await
    }

    async fn find_email_by_id(&self, id: Uuid) -> Result<Option<Email>, StoreError> {
        self.inner.find_email_by_id(id).await
    }

    async fn list_emails_by_account(&self, account_id: Uuid) -> Result<Vec<Email>, StoreError> {
        self.inner.list_emails_by_account(account_id).await
    }

    async fn delete_email(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete_email(id).await
    }

    async fn count_emails(&self) -> Result<i64, StoreError> {
        self.inner.count_emails().await
    }
}

#[tokio::test]
async fn one_failing_recipient_does_not_block_others() {
    let inner = MemoryStore::new();
    let broken = seed_account(&inner, "broken@svc.com", 1).await;
    let healthy = seed_account(&inner, "healthy@svc.com", 1).await;
    let store = FlakyStore {
        inner,
        broken_account: broken.id,
    };
    let body = json!({
        "from": "a@x.com",
        "to": ["broken@svc.com", "ghost@svc.com", "healthy@svc.com"]
    })
    .to_string();

    let report = dev_processor()
        .ingest(&store, body.as_bytes(), &HeaderMap::new())
        .await
        .unwrap();

    let statuses: Vec<RecipientStatus> = report.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            RecipientStatus::Error,
            RecipientStatus::NoAccount,
            RecipientStatus::Stored
        ]
    );
    assert!(report.success);
    assert_eq!(report.results[0].error.as_deref(), Some("Failed to store email"));
    assert_eq!(store.inner.email_count_for(healthy.id).await, 1);
}

#[tokio::test]
async fn report_serializes_with_wire_names() {
    let store = MemoryStore::new();
    seed_account(&store, "known@svc.com", 1).await;
    let body = json!({"from": "a@x.com", "to": ["known@svc.com", "ghost@svc.com"]}).to_string();

    let report = dev_processor()
        .ingest(&store, body.as_bytes(), &HeaderMap::new())
        .await
        .unwrap();
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["success"], true);
    assert!(value["processed_at"].is_string());
    assert_eq!(value["results"][0]["status"], "stored");
    assert!(value["results"][0]["emailId"].is_string());
    assert_eq!(value["results"][1]["status"], "no_account");
    assert!(value["results"][1].get("emailId").is_none());
}
