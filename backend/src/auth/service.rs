//! Core business logic for the authentication system.

use crate::auth::models::*;
use crate::config::Config;
use crate::database::models::{CreatePendingUser, CreateUser, Role, User};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::metric_repository::MetricRepository;
use crate::repositories::pending_user_repository::PendingUserRepository;
use crate::repositories::user_repository::UserRepository;
use crate::services::email_service::EmailService;
use crate::utils::jwt::JwtUtils;
use crate::utils::otp::generate_otp;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

/// Authentication service for handling registration, OTP verification,
/// login, and password reset
pub struct AuthService<'a> {
    pool: &'a SqlitePool,
    jwt_utils: JwtUtils,
    email_service: Option<EmailService>,
    config: Config,
}

impl<'a> AuthService<'a> {
    /// Create a new AuthService instance
    pub fn new(pool: &'a SqlitePool, config: &Config) -> Self {
        let email_service = match config.email_config() {
            Some(email_config) => match EmailService::new(email_config) {
                Ok(service) => Some(service),
                Err(e) => {
                    tracing::warn!(
                        "Failed to initialize email service: {}. OTP delivery will be disabled.",
                        e
                    );
                    None
                }
            },
            None => {
                tracing::warn!("Email configuration not found. OTP delivery will be disabled.");
                None
            }
        };

        AuthService {
            pool,
            jwt_utils: JwtUtils::new(&config.jwt_secret, config.jwt_expires_in_seconds),
            email_service,
            config: config.clone(),
        }
    }

    /// Start a registration: store a provisional record and mail the OTP.
    ///
    /// An email that already belongs to a verified user is a conflict and
    /// leaves no pending row behind. Repeating the request for an
    /// unverified email overwrites the previous pending row.
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<()> {
        validate_request(&request)?;

        let user_repo = UserRepository::new(self.pool);
        if user_repo.email_exists(&request.email).await? {
            return Err(ServiceError::already_exists("User", &request.email));
        }

        let password_hash = Self::hash_password(&request.password)?;
        let otp = generate_otp();
        let expires_at = Utc::now() + Duration::minutes(self.config.otp_ttl_minutes);

        let pending_repo = PendingUserRepository::new(self.pool);
        pending_repo
            .upsert(CreatePendingUser {
                email: request.email.clone(),
                username: request.username,
                name: request.name.clone(),
                password_hash,
                phone: request.phone,
                role: request.role.unwrap_or(Role::User),
                otp: otp.clone(),
                expires_at,
            })
            .await?;

        self.deliver_verification_otp(&request.email, request.name.as_deref(), &otp)
            .await
    }

    /// Confirm a registration: promote the pending row into a user.
    ///
    /// The per-day user metric is bumped best-effort; a failure there is
    /// logged and never fails the verification.
    pub async fn verify_registration(&self, request: VerifyRequest) -> ServiceResult<User> {
        validate_request(&request)?;

        let pending_repo = PendingUserRepository::new(self.pool);
        let pending = pending_repo
            .get_by_email(&request.email)
            .await?
            .ok_or_else(|| {
                ServiceError::validation("No pending registration for this email")
            })?;

        if pending.otp != request.otp {
            return Err(ServiceError::unauthorized("Invalid OTP"));
        }

        if pending.expires_at < Utc::now() {
            return Err(ServiceError::unauthorized("OTP has expired"));
        }

        // A verified user may have appeared for this email since the
        // registration was submitted.
        let user_repo = UserRepository::new(self.pool);
        if user_repo.email_exists(&pending.email).await? {
            pending_repo.delete_by_email(&pending.email).await?;
            return Err(ServiceError::already_exists("User", &pending.email));
        }

        let user = user_repo
            .create_user(CreateUser {
                id: Uuid::now_v7().to_string(),
                username: pending.username,
                name: pending.name,
                email: pending.email.clone(),
                password_hash: pending.password_hash,
                phone: pending.phone,
                role: pending.role,
            })
            .await?;

        let metric_repo = MetricRepository::new(self.pool);
        if let Err(e) = metric_repo.increment_users(Utc::now().date_naive()).await {
            tracing::warn!("Failed to update daily metrics for new user: {}", e);
        }

        pending_repo.delete_by_email(&pending.email).await?;

        Ok(user)
    }

    /// Authenticate a user and issue a signed token
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<LoginResponse> {
        validate_request(&request)?;

        let user_repo = UserRepository::new(self.pool);
        let user = user_repo
            .get_user_by_email(&request.email)
            .await?
            .ok_or_else(|| ServiceError::unauthorized("Invalid email or password"))?;

        if !Self::verify_password(&request.password, &user.password_hash)? {
            return Err(ServiceError::unauthorized("Invalid email or password"));
        }

        let token = self.jwt_utils.generate_token(&user)?;

        Ok(LoginResponse {
            token,
            expires_in: self.config.jwt_expires_in_seconds,
            user: UserInfo::from(user),
        })
    }

    /// Regenerate and re-send the OTP for an existing pending registration
    pub async fn resend_otp(&self, request: ResendOtpRequest) -> ServiceResult<()> {
        validate_request(&request)?;

        let pending_repo = PendingUserRepository::new(self.pool);
        let pending = pending_repo
            .get_by_email(&request.email)
            .await?
            .ok_or_else(|| ServiceError::not_found("Pending registration", &request.email))?;

        let otp = generate_otp();
        let expires_at = Utc::now() + Duration::minutes(self.config.otp_ttl_minutes);
        pending_repo
            .update_otp(&pending.email, &otp, expires_at)
            .await?;

        self.deliver_verification_otp(&pending.email, pending.name.as_deref(), &otp)
            .await
    }

    /// Store a password-reset OTP on the user row and mail it
    pub async fn forgot_password(&self, request: ForgotPasswordRequest) -> ServiceResult<()> {
        validate_request(&request)?;

        let user_repo = UserRepository::new(self.pool);
        let user = user_repo
            .get_user_by_email(&request.email)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", &request.email))?;

        let otp = generate_otp();
        let expires_at = Utc::now() + Duration::minutes(self.config.otp_ttl_minutes);
        user_repo.set_otp(&user.id, &otp, expires_at).await?;

        match &self.email_service {
            Some(service) => {
                service
                    .send_password_reset_email(
                        &user.email,
                        user.name.as_deref(),
                        &otp,
                        self.config.otp_ttl_minutes,
                    )
                    .await
            }
            None => {
                tracing::warn!(
                    "Email delivery disabled; password reset OTP for {} not sent",
                    user.email
                );
                Ok(())
            }
        }
    }

    /// Overwrite the password after checking the OTP stored on the user
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> ServiceResult<()> {
        validate_request(&request)?;

        let user_repo = UserRepository::new(self.pool);
        let user = user_repo
            .get_user_by_email(&request.email)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", &request.email))?;

        match user.otp.as_deref() {
            Some(stored) if stored == request.otp => {}
            _ => return Err(ServiceError::unauthorized("Invalid OTP")),
        }

        match user.otp_expires {
            Some(expires) if expires >= Utc::now() => {}
            _ => return Err(ServiceError::unauthorized("OTP has expired")),
        }

        let password_hash = Self::hash_password(&request.new_password)?;
        user_repo.update_password(&user.id, &password_hash).await?;

        Ok(())
    }

    async fn deliver_verification_otp(
        &self,
        email: &str,
        name: Option<&str>,
        otp: &str,
    ) -> ServiceResult<()> {
        match &self.email_service {
            Some(service) => {
                service
                    .send_verification_email(email, name, otp, self.config.otp_ttl_minutes)
                    .await
            }
            None => {
                tracing::warn!("Email delivery disabled; verification OTP for {} not sent", email);
                Ok(())
            }
        }
    }

    /// Function to hash a password before storing in database
    fn hash_password(password: &str) -> ServiceResult<String> {
        hash(password, DEFAULT_COST)
            .map_err(|e| ServiceError::internal(format!("Password hashing failed: {}", e)))
    }

    /// Function to verify a password against the stored hash
    fn verify_password(password: &str, hash: &str) -> ServiceResult<bool> {
        verify(password, hash)
            .map_err(|e| ServiceError::internal(format!("Password verification failed: {}", e)))
    }
}

/// Flattens validator errors into a single ServiceError
fn validate_request<T: Validate>(request: &T) -> ServiceResult<()> {
    if let Err(validation_errors) = request.validate() {
        let error_messages: Vec<String> = validation_errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    format!(
                        "{}: {}",
                        field,
                        error.message.as_ref().unwrap_or(&"Invalid value".into())
                    )
                })
            })
            .collect();
        return Err(ServiceError::validation(error_messages.join(", ")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> (SqlitePool, Config) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        (pool, Config::for_tests("test-secret"))
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            username: "alice".to_string(),
            name: Some("Alice".to_string()),
            email: email.to_string(),
            password: "hunter2".to_string(),
            phone: None,
            role: None,
        }
    }

    async fn stored_otp(pool: &SqlitePool, email: &str) -> String {
        PendingUserRepository::new(pool)
            .get_by_email(email)
            .await
            .unwrap()
            .unwrap()
            .otp
    }

    fn wrong_otp(otp: &str) -> String {
        if otp == "123456" {
            "654321".to_string()
        } else {
            "123456".to_string()
        }
    }

    #[tokio::test]
    async fn test_register_then_verify_promotes_pending() {
        let (pool, config) = setup().await;
        let service = AuthService::new(&pool, &config);
        let email = "alice@example.com";

        service.register(register_request(email)).await.unwrap();
        let otp = stored_otp(&pool, email).await;

        let user = service
            .verify_registration(VerifyRequest {
                email: email.to_string(),
                otp: otp.clone(),
            })
            .await
            .unwrap();

        assert_eq!(user.email, email);
        assert_eq!(user.role, Role::User);

        // Pending row is consumed; the metric row for today records the signup.
        let pending = PendingUserRepository::new(&pool)
            .get_by_email(email)
            .await
            .unwrap();
        assert!(pending.is_none());

        let metric = MetricRepository::new(&pool)
            .get_by_date(Utc::now().date_naive())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metric.total_users, 1);

        // Re-using the consumed OTP fails as a plain validation error.
        let again = service
            .verify_registration(VerifyRequest {
                email: email.to_string(),
                otp,
            })
            .await;
        assert!(matches!(again, Err(ServiceError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_register_existing_email_conflicts_without_side_effects() {
        let (pool, config) = setup().await;
        let service = AuthService::new(&pool, &config);
        let email = "bob@example.com";

        service.register(register_request(email)).await.unwrap();
        let otp = stored_otp(&pool, email).await;
        service
            .verify_registration(VerifyRequest {
                email: email.to_string(),
                otp,
            })
            .await
            .unwrap();

        let conflict = service.register(register_request(email)).await;
        assert!(matches!(conflict, Err(ServiceError::AlreadyExists { .. })));

        // No pending row was written on the conflicting attempt.
        let pending = PendingUserRepository::new(&pool)
            .get_by_email(email)
            .await
            .unwrap();
        assert!(pending.is_none());
    }

    #[tokio::test]
    async fn test_verify_with_wrong_otp_is_rejected() {
        let (pool, config) = setup().await;
        let service = AuthService::new(&pool, &config);
        let email = "carol@example.com";

        service.register(register_request(email)).await.unwrap();
        let otp = stored_otp(&pool, email).await;

        let result = service
            .verify_registration(VerifyRequest {
                email: email.to_string(),
                otp: wrong_otp(&otp),
            })
            .await;
        assert!(matches!(result, Err(ServiceError::Unauthorized { .. })));

        // The pending row survives a failed attempt.
        assert!(
            PendingUserRepository::new(&pool)
                .get_by_email(email)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_verify_with_expired_otp_fails_despite_match() {
        let (pool, config) = setup().await;
        let service = AuthService::new(&pool, &config);
        let email = "dave@example.com";

        service.register(register_request(email)).await.unwrap();
        let otp = stored_otp(&pool, email).await;

        let past = Utc::now() - Duration::minutes(1);
        sqlx::query("UPDATE pending_users SET expires_at = ? WHERE email = ?")
            .bind(past)
            .bind(email)
            .execute(&pool)
            .await
            .unwrap();

        let result = service
            .verify_registration(VerifyRequest {
                email: email.to_string(),
                otp,
            })
            .await;
        assert!(matches!(result, Err(ServiceError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_verify_succeeds_when_metric_update_fails() {
        let (pool, config) = setup().await;
        let service = AuthService::new(&pool, &config);
        let email = "heidi@example.com";

        service.register(register_request(email)).await.unwrap();
        let otp = stored_otp(&pool, email).await;

        // Break the metric path entirely; the signup must still go through.
        sqlx::query("DROP TABLE metrics")
            .execute(&pool)
            .await
            .unwrap();

        let user = service
            .verify_registration(VerifyRequest {
                email: email.to_string(),
                otp,
            })
            .await
            .unwrap();
        assert_eq!(user.email, email);

        // The pending row is still consumed.
        let pending = PendingUserRepository::new(&pool)
            .get_by_email(email)
            .await
            .unwrap();
        assert!(pending.is_none());
    }

    #[tokio::test]
    async fn test_login_token_claims_match_stored_user() {
        let (pool, config) = setup().await;
        let service = AuthService::new(&pool, &config);
        let email = "erin@example.com";

        service.register(register_request(email)).await.unwrap();
        let otp = stored_otp(&pool, email).await;
        let user = service
            .verify_registration(VerifyRequest {
                email: email.to_string(),
                otp,
            })
            .await
            .unwrap();

        let response = service
            .login(LoginRequest {
                email: email.to_string(),
                password: "hunter2".to_string(),
            })
            .await
            .unwrap();

        let claims = JwtUtils::new("test-secret", 3600)
            .validate_token(&response.token)
            .unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, user.role);

        let rejected = service
            .login(LoginRequest {
                email: email.to_string(),
                password: "not-hunter2".to_string(),
            })
            .await;
        assert!(matches!(rejected, Err(ServiceError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_resend_otp_refreshes_pending_row() {
        let (pool, config) = setup().await;
        let service = AuthService::new(&pool, &config);
        let email = "frank@example.com";

        service.register(register_request(email)).await.unwrap();
        let before = PendingUserRepository::new(&pool)
            .get_by_email(email)
            .await
            .unwrap()
            .unwrap();

        service
            .resend_otp(ResendOtpRequest {
                email: email.to_string(),
            })
            .await
            .unwrap();

        let after = PendingUserRepository::new(&pool)
            .get_by_email(email)
            .await
            .unwrap()
            .unwrap();
        assert!(after.expires_at >= before.expires_at);

        let missing = service
            .resend_otp(ResendOtpRequest {
                email: "nobody@example.com".to_string(),
            })
            .await;
        assert!(matches!(missing, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_forgot_then_reset_password_flow() {
        let (pool, config) = setup().await;
        let service = AuthService::new(&pool, &config);
        let email = "grace@example.com";

        service.register(register_request(email)).await.unwrap();
        let otp = stored_otp(&pool, email).await;
        service
            .verify_registration(VerifyRequest {
                email: email.to_string(),
                otp,
            })
            .await
            .unwrap();

        service
            .forgot_password(ForgotPasswordRequest {
                email: email.to_string(),
            })
            .await
            .unwrap();

        let user = UserRepository::new(&pool)
            .get_user_by_email(email)
            .await
            .unwrap()
            .unwrap();
        let reset_otp = user.otp.clone().unwrap();

        // Wrong code first: password stays untouched.
        let rejected = service
            .reset_password(ResetPasswordRequest {
                email: email.to_string(),
                otp: wrong_otp(&reset_otp),
                new_password: "swordfish".to_string(),
            })
            .await;
        assert!(matches!(rejected, Err(ServiceError::Unauthorized { .. })));

        service
            .reset_password(ResetPasswordRequest {
                email: email.to_string(),
                otp: reset_otp,
                new_password: "swordfish".to_string(),
            })
            .await
            .unwrap();

        // Old password no longer works, new one does, OTP is cleared.
        let old_login = service
            .login(LoginRequest {
                email: email.to_string(),
                password: "hunter2".to_string(),
            })
            .await;
        assert!(old_login.is_err());

        service
            .login(LoginRequest {
                email: email.to_string(),
                password: "swordfish".to_string(),
            })
            .await
            .unwrap();

        let user = UserRepository::new(&pool)
            .get_user_by_email(email)
            .await
            .unwrap()
            .unwrap();
        assert!(user.otp.is_none());
        assert!(user.otp_expires.is_none());
    }

    #[tokio::test]
    async fn test_register_rejects_missing_fields() {
        let (pool, config) = setup().await;
        let service = AuthService::new(&pool, &config);

        let mut request = register_request("henry@example.com");
        request.password = String::new();

        let result = service.register(request).await;
        assert!(matches!(result, Err(ServiceError::Validation { .. })));
    }
}
