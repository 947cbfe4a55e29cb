use std::sync::Arc;

use event_schema::api::{LoginRequest, PublicUser, RegisterRequest};
use jwt_security::{IssuedToken, RevocationGuard, RevocationOutcome};
use uuid::Uuid;

use crate::db::FeedStore;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{NewUser, User};
use crate::security::{hash_password, verify_password};
use crate::validators::validate;

/// Registration, login and logout
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn FeedStore>,
    guard: Arc<RevocationGuard>,
}

impl AuthService {
    pub fn new(store: Arc<dyn FeedStore>, guard: Arc<RevocationGuard>) -> Self {
        Self { store, guard }
    }

    pub async fn register(&self, req: RegisterRequest) -> AppResult<PublicUser> {
        validate(&req)?;

        let password = req.password;
        // argon2 is deliberately slow; keep it off the async workers
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))??;

        let user = self
            .store
            .create_user(NewUser {
                name: req.name.trim().to_string(),
                email: req.email.trim().to_lowercase(),
                password_hash,
                bio: req.bio.filter(|b| !b.trim().is_empty()),
            })
            .await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user.to_public())
    }

    /// 404 for an unknown email, 400 for a wrong password
    pub async fn login(&self, req: LoginRequest) -> AppResult<(IssuedToken, PublicUser)> {
        validate(&req)?;

        let user: User = self
            .store
            .find_user_by_email(req.email.trim())
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        let password = req.password;
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))??;
        if !matches {
            tracing::warn!(user_id = %user.id, "login with wrong password");
            return Err(AppError::Validation("Invalid credentials".into()));
        }

        let issued = self.guard.issue(user.id)?;
        tracing::info!(user_id = %user.id, expires_at = issued.expires_at, "login succeeded");
        Ok((issued, user.to_public()))
    }

    /// Revoke `token`. Tokens that are already unusable are accepted and
    /// not stored.
    pub async fn logout(&self, token: &str) -> AppResult<RevocationOutcome> {
        let outcome = self.guard.revoke(token)?;
        match &outcome {
            RevocationOutcome::Revoked { .. } => {
                metrics::REVOCATIONS_TOTAL.inc();
                metrics::REVOCATION_SET_SIZE.set(self.guard.revoked_count() as i64);
            }
            RevocationOutcome::AlreadyRevoked => {
                tracing::debug!("logout for an already revoked token");
            }
            RevocationOutcome::AlreadyUnusable(reason) => {
                tracing::debug!(%reason, "logout for an unusable token");
            }
        }
        Ok(outcome)
    }

    pub async fn get_user(&self, id: Uuid) -> AppResult<PublicUser> {
        self.store
            .find_user_by_id(id)
            .await?
            .map(|u| u.to_public())
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryFeedStore;
    use jwt_security::test_utils::test_guard;
    use jwt_security::TokenError;

    fn service() -> AuthService {
        AuthService::new(Arc::new(MemoryFeedStore::new()), Arc::new(test_guard()))
    }

    fn register_req(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "alice".into(),
            email: email.into(),
            password: "hunter22".into(),
            bio: Some("hi".into()),
        }
    }

    #[tokio::test]
    async fn register_then_login_issues_a_valid_token() {
        let auth = service();
        let user = auth.register(register_req("alice@example.com")).await.unwrap();

        let (issued, logged_in) = auth
            .login(LoginRequest {
                email: "Alice@Example.com".into(),
                password: "hunter22".into(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(
            auth.guard.authorize(&issued.token).unwrap().user_id().unwrap(),
            user.id
        );
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_validation_error() {
        let auth = service();
        auth.register(register_req("alice@example.com")).await.unwrap();
        let err = auth
            .register(register_req("alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "Email already registered"));
    }

    #[tokio::test]
    async fn login_failures_are_distinguished() {
        let auth = service();
        auth.register(register_req("alice@example.com")).await.unwrap();

        let unknown = auth
            .login(LoginRequest {
                email: "bob@example.com".into(),
                password: "hunter22".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(unknown, AppError::NotFound(_)));

        let wrong = auth
            .login(LoginRequest {
                email: "alice@example.com".into(),
                password: "hunter23".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(wrong, AppError::Validation(msg) if msg == "Invalid credentials"));
    }

    #[tokio::test]
    async fn logout_revokes_only_that_session() {
        let auth = service();
        let user = auth.register(register_req("alice@example.com")).await.unwrap();
        let a = auth.guard.issue(user.id).unwrap();
        let b = auth.guard.issue(user.id).unwrap();

        assert!(matches!(
            auth.logout(&a.token).await.unwrap(),
            RevocationOutcome::Revoked { .. }
        ));
        assert_eq!(auth.guard.authorize(&a.token), Err(TokenError::Revoked));
        assert!(auth.guard.is_valid(&b.token));

        assert_eq!(
            auth.logout(&a.token).await.unwrap(),
            RevocationOutcome::AlreadyRevoked
        );
    }

    #[tokio::test]
    async fn missing_token_cannot_log_out() {
        let err = service().logout("").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn public_user_hides_the_hash() {
        let auth = service();
        let user = auth.register(register_req("alice@example.com")).await.unwrap();
        let json = serde_json::to_string(&auth.get_user(user.id).await.unwrap()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }
}
