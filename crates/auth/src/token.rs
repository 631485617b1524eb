use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind,
};
use thiserror::Error;

use crate::claims::{TokenClaims, WindowError, validate_window};
use crate::store::{CredentialStore, RevocationStore, StoreError};
use crate::{Principal, UserId};

/// Verification failure, surfaced as data for callers to branch on.
///
/// The boundary layer maps these to HTTP statuses: 401 for the token family,
/// 503 for `StoreUnavailable`, 500 for `Signing`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token structure could not be parsed.
    #[error("malformed token")]
    Malformed,

    /// The signature does not validate against the shared secret.
    #[error("invalid token signature")]
    BadSignature,

    /// The token is past its expiry.
    #[error("token has expired")]
    Expired,

    /// The token's jti appears in the revocation store.
    #[error("token has been revoked")]
    Revoked,

    /// No record exists for the token's subject.
    #[error("principal not found")]
    PrincipalNotFound,

    /// The subject's record exists but is deactivated.
    #[error("principal is deactivated")]
    PrincipalInactive,

    /// Credential or revocation store I/O failed. Never conflated with
    /// `PrincipalNotFound`: an outage means retry, a missing principal means
    /// re-authenticate.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Signing failed while issuing. Should not happen with an HS256 secret.
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<StoreError> for TokenError {
    fn from(err: StoreError) -> Self {
        TokenError::StoreUnavailable(err.0)
    }
}

/// Issues, verifies, and revokes signed identity tokens.
///
/// Validity is self-certifying: a valid token never touches a store except
/// for the single revocation lookup. The ordering inside [`verify_at`] is
/// strict — structural and signature checks run before any store I/O, so a
/// token that cannot possibly be valid costs nothing.
///
/// [`verify_at`]: TokenService::verify_at
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    credentials: Arc<dyn CredentialStore>,
    revocations: Arc<dyn RevocationStore>,
}

impl TokenService {
    pub fn new(
        secret: &[u8],
        ttl: Duration,
        credentials: Arc<dyn CredentialStore>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        // Claims carry RFC 3339 timestamps, so the library's numeric `exp`
        // validation is disabled; expiry is checked by `validate_window`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = Default::default();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
            credentials,
            revocations,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject`: fresh jti, `expires_at = now + ttl`,
    /// signed payload. No storage side effect.
    pub fn issue(&self, subject: UserId) -> Result<String, TokenError> {
        self.issue_at(subject, Utc::now())
    }

    pub fn issue_at(&self, subject: UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = TokenClaims::issue(subject, now, self.ttl);
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a presented token and resolve its principal.
    ///
    /// Check order: parse/signature, expiry, revocation, principal lookup.
    pub async fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        self.verify_at(token, Utc::now()).await
    }

    pub async fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Principal, TokenError> {
        let claims = self.decode(token)?;

        match validate_window(&claims, now) {
            Ok(()) => {}
            Err(WindowError::Expired) => return Err(TokenError::Expired),
            Err(WindowError::InvalidWindow) => return Err(TokenError::Malformed),
        }

        if self.revocations.contains(claims.jti).await? {
            return Err(TokenError::Revoked);
        }

        let principal = self
            .credentials
            .find_by_id(claims.sub)
            .await?
            .ok_or(TokenError::PrincipalNotFound)?;

        if !principal.active {
            return Err(TokenError::PrincipalInactive);
        }

        Ok(principal)
    }

    /// Revoke a token by inserting its jti into the revocation store.
    ///
    /// The signature is still required (a forged token must not seed
    /// revocation entries) but expiry is not: logging out with a token that
    /// just expired is a no-op, not an error. Idempotent via upsert.
    pub async fn revoke(&self, token: &str) -> Result<(), TokenError> {
        let claims = self.decode(token)?;
        self.revocations.upsert(claims.jti, claims.expires_at).await?;
        tracing::debug!(jti = %claims.jti, sub = %claims.sub, "token revoked");
        Ok(())
    }

    /// Delete revocation entries whose tokens have expired on their own.
    ///
    /// Pure space reclamation; expired tokens fail the expiry check with or
    /// without a revocation row.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, TokenError> {
        let removed = self.revocations.delete_expired(now).await?;
        if removed > 0 {
            tracing::info!(removed, "swept expired revocation entries");
        }
        Ok(removed)
    }

    fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Credential store double: a map of principals plus an outage switch.
    #[derive(Default)]
    struct FakeCredentials {
        principals: Mutex<HashMap<UserId, Principal>>,
        unavailable: Mutex<bool>,
    }

    impl FakeCredentials {
        fn with(principals: &[Principal]) -> Arc<Self> {
            let store = Self::default();
            {
                let mut map = store.principals.lock().unwrap();
                for p in principals {
                    map.insert(p.id, *p);
                }
            }
            Arc::new(store)
        }

        fn set_unavailable(&self) {
            *self.unavailable.lock().unwrap() = true;
        }

        fn deactivate(&self, id: UserId) {
            if let Some(p) = self.principals.lock().unwrap().get_mut(&id) {
                p.active = false;
            }
        }
    }

    #[async_trait]
    impl CredentialStore for FakeCredentials {
        async fn find_by_id(&self, id: UserId) -> Result<Option<Principal>, StoreError> {
            if *self.unavailable.lock().unwrap() {
                return Err(StoreError::new("connection refused"));
            }
            Ok(self.principals.lock().unwrap().get(&id).copied())
        }

        async fn find_active_by_id(&self, id: UserId) -> Result<Option<Principal>, StoreError> {
            Ok(self.find_by_id(id).await?.filter(|p| p.active))
        }
    }

    #[derive(Default)]
    struct FakeRevocations {
        entries: Mutex<HashMap<Uuid, DateTime<Utc>>>,
        unavailable: Mutex<bool>,
    }

    impl FakeRevocations {
        fn set_unavailable(&self) {
            *self.unavailable.lock().unwrap() = true;
        }

        fn snapshot(&self) -> HashMap<Uuid, DateTime<Utc>> {
            self.entries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RevocationStore for FakeRevocations {
        async fn contains(&self, jti: Uuid) -> Result<bool, StoreError> {
            if *self.unavailable.lock().unwrap() {
                return Err(StoreError::new("connection refused"));
            }
            Ok(self.entries.lock().unwrap().contains_key(&jti))
        }

        async fn upsert(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
            let mut entries = self.entries.lock().unwrap();
            let slot = entries.entry(jti).or_insert(expires_at);
            if expires_at > *slot {
                *slot = expires_at;
            }
            Ok(())
        }

        async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|_, exp| *exp > now);
            Ok((before - entries.len()) as u64)
        }
    }

    const SECRET: &[u8] = b"test-secret";

    fn active(id: i64) -> Principal {
        Principal::new(UserId::new(id), Role::User, true)
    }

    fn service(
        ttl: Duration,
        credentials: Arc<FakeCredentials>,
        revocations: Arc<FakeRevocations>,
    ) -> TokenService {
        TokenService::new(SECRET, ttl, credentials, revocations)
    }

    #[tokio::test]
    async fn issued_token_verifies_to_matching_principal() {
        let creds = FakeCredentials::with(&[active(42)]);
        let svc = service(Duration::days(7), creds, Arc::new(FakeRevocations::default()));

        let token = svc.issue(UserId::new(42)).unwrap();
        let principal = svc.verify(&token).await.unwrap();
        assert_eq!(principal.id, UserId::new(42));
        assert!(principal.active);
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_fails_bad_signature() {
        let creds = FakeCredentials::with(&[active(42)]);
        let revs = Arc::new(FakeRevocations::default());
        let svc = service(Duration::days(7), creds.clone(), revs.clone());

        let other = TokenService::new(b"other-secret", Duration::days(7), creds, revs);
        let token = other.issue(UserId::new(42)).unwrap();

        assert_eq!(svc.verify(&token).await, Err(TokenError::BadSignature));
    }

    #[tokio::test]
    async fn garbage_fails_malformed() {
        let creds = FakeCredentials::with(&[active(42)]);
        let svc = service(Duration::days(7), creds, Arc::new(FakeRevocations::default()));

        assert_eq!(
            svc.verify("not-a-token").await,
            Err(TokenError::Malformed)
        );
    }

    #[tokio::test]
    async fn one_second_ttl_is_expired_two_seconds_later() {
        let creds = FakeCredentials::with(&[active(42)]);
        let svc = service(Duration::seconds(1), creds, Arc::new(FakeRevocations::default()));

        let now = Utc::now();
        let token = svc.issue_at(UserId::new(42), now).unwrap();

        assert_eq!(
            svc.verify_at(&token, now + Duration::seconds(2)).await,
            Err(TokenError::Expired)
        );
    }

    #[tokio::test]
    async fn revoked_token_fails_revoked_before_expiry() {
        let creds = FakeCredentials::with(&[active(42)]);
        let svc = service(Duration::days(7), creds, Arc::new(FakeRevocations::default()));

        let token = svc.issue(UserId::new(42)).unwrap();
        svc.revoke(&token).await.unwrap();

        assert_eq!(svc.verify(&token).await, Err(TokenError::Revoked));
    }

    #[tokio::test]
    async fn expiry_wins_over_revocation() {
        let creds = FakeCredentials::with(&[active(42)]);
        let svc = service(Duration::seconds(1), creds, Arc::new(FakeRevocations::default()));

        let now = Utc::now();
        let token = svc.issue_at(UserId::new(42), now).unwrap();
        svc.revoke(&token).await.unwrap();

        assert_eq!(
            svc.verify_at(&token, now + Duration::seconds(5)).await,
            Err(TokenError::Expired)
        );
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let creds = FakeCredentials::with(&[active(42)]);
        let revs = Arc::new(FakeRevocations::default());
        let svc = service(Duration::days(7), creds, revs.clone());

        let token = svc.issue(UserId::new(42)).unwrap();
        svc.revoke(&token).await.unwrap();
        let after_first = revs.snapshot();
        svc.revoke(&token).await.unwrap();

        assert_eq!(revs.snapshot(), after_first);
        assert_eq!(after_first.len(), 1);
    }

    #[tokio::test]
    async fn deactivated_subject_fails_principal_inactive() {
        let creds = FakeCredentials::with(&[active(42)]);
        let svc = service(
            Duration::days(7),
            creds.clone(),
            Arc::new(FakeRevocations::default()),
        );

        let token = svc.issue(UserId::new(42)).unwrap();
        creds.deactivate(UserId::new(42));

        assert_eq!(svc.verify(&token).await, Err(TokenError::PrincipalInactive));
    }

    #[tokio::test]
    async fn unknown_subject_fails_principal_not_found() {
        let creds = FakeCredentials::with(&[]);
        let svc = service(Duration::days(7), creds, Arc::new(FakeRevocations::default()));

        let token = svc.issue(UserId::new(7)).unwrap();
        assert_eq!(svc.verify(&token).await, Err(TokenError::PrincipalNotFound));
    }

    #[tokio::test]
    async fn credential_outage_is_store_unavailable_not_principal_not_found() {
        let creds = FakeCredentials::with(&[active(42)]);
        let svc = service(
            Duration::days(7),
            creds.clone(),
            Arc::new(FakeRevocations::default()),
        );

        let token = svc.issue(UserId::new(42)).unwrap();
        creds.set_unavailable();

        assert!(matches!(
            svc.verify(&token).await,
            Err(TokenError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn signature_checked_before_any_store_io() {
        let creds = FakeCredentials::with(&[active(42)]);
        let revs = Arc::new(FakeRevocations::default());
        creds.set_unavailable();
        revs.set_unavailable();
        let svc = service(Duration::days(7), creds, revs);

        // Both stores are down, but a token that cannot be valid still fails
        // on structure, not on store I/O.
        assert_eq!(svc.verify("junk").await, Err(TokenError::Malformed));
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_entries() {
        let creds = FakeCredentials::with(&[active(1), active(2)]);
        let revs = Arc::new(FakeRevocations::default());
        let now = Utc::now();

        let short = TokenService::new(SECRET, Duration::seconds(1), creds.clone(), revs.clone());
        let long = TokenService::new(SECRET, Duration::days(7), creds, revs.clone());

        let stale = short.issue_at(UserId::new(1), now).unwrap();
        let live = long.issue_at(UserId::new(2), now).unwrap();
        long.revoke(&stale).await.unwrap();
        long.revoke(&live).await.unwrap();

        let removed = long.sweep_expired(now + Duration::minutes(1)).await.unwrap();
        assert_eq!(removed, 1);

        // The still-live token stays revoked after the sweep.
        assert_eq!(
            long.verify_at(&live, now + Duration::minutes(1)).await,
            Err(TokenError::Revoked)
        );
    }
}
