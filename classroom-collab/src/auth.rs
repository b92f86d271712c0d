use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::Utc;
use log::{info, warn};
use rand::rngs::OsRng;
use thiserror::Error;

use crate::{
    util::require, CollabContext, CollabEvent, DatabaseError, DatabaseResult, NewUser, Query,
    Role, SessionData, SessionError, Status, User, UserProfile, ValidationError,
};

pub struct Auth {
    context: CollabContext,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Your account is inactive. Please contact an admin.")]
    InactiveAccount,
    #[error("Email already registered")]
    EmailTaken,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("HashError: {0}")]
    HashError(String),
}

impl From<DatabaseError> for AuthError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::Conflict { .. } => Self::EmailTaken,
            e => Self::Db(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// What a new user fills in to register
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
}

impl Registration {
    pub const MIN_PASSWORD_LENGTH: usize = 6;

    /// Checks everything that can be checked without the store
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("email", &self.email)?;

        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }

        if self.password.chars().count() < Self::MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort {
                min: Self::MIN_PASSWORD_LENGTH,
            });
        }

        if self.role == Role::Admin {
            return Err(ValidationError::AdminRegistration);
        }

        Ok(())
    }
}

impl Auth {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
            argon: Argon2::default(),
        }
    }

    /// Logs in a user, returning a new session
    pub async fn login(&self, credentials: Credentials) -> Result<SessionData, AuthError> {
        self.clear_expired();

        let user = self
            .user_by_email(&credentials.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.verify_password(&user, &credentials.password)? {
            return Err(AuthError::InvalidCredentials);
        }

        if !user.status.is_active() {
            return Err(AuthError::InactiveAccount);
        }

        info!("{} logged in as {}", user.email, user.role.as_str());
        self.start_session(&user)
    }

    /// Registers a student or instructor and logs them in
    pub async fn register(&self, registration: Registration) -> Result<SessionData, AuthError> {
        registration.validate()?;

        let email = registration.email.trim().to_string();

        self.user_by_email(&email)
            .await
            .conflict_or_ok("user", "email", &email)?;

        let password = self.hash_password(&registration.password)?;

        let user = self
            .context
            .table::<User>()
            .create(&NewUser {
                name: registration.name.trim().to_string(),
                email,
                password,
                role: registration.role,
                status: Status::Active,
                created_at: Utc::now(),
            })
            .await?;

        info!("Registered {} as {}", user.email, user.role.as_str());
        self.start_session(&user)
    }

    /// Deletes the associated session, if it exists
    pub fn logout(&self, token: &str) -> Result<(), SessionError> {
        if let Some(session) = self.context.sessions.load(token) {
            self.context.sessions.clear(token)?;
            self.context.emit(CollabEvent::SessionEnded {
                user_id: session.user.id,
            });
        }

        Ok(())
    }

    /// Returns a session if it exists and hasn't expired
    pub fn session(&self, token: &str) -> Option<SessionData> {
        self.context.sessions.load(token)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        self.context
            .table::<User>()
            .first(&Query::new().eq("email", email))
            .await
    }

    fn start_session(&self, user: &User) -> Result<SessionData, AuthError> {
        let session =
            SessionData::issue(UserProfile::from(user), self.context.config.session_duration);

        self.context.sessions.save(session.clone())?;
        self.context.emit(CollabEvent::SessionStarted {
            user_id: user.id,
            role: user.role,
        });

        Ok(session)
    }

    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::HashError(e.to_string()))
    }

    fn verify_password(&self, user: &User, password: &str) -> Result<bool, AuthError> {
        match PasswordHash::new(&user.password) {
            Ok(hash) => Ok(self
                .argon
                .verify_password(password.as_bytes(), &hash)
                .is_ok()),
            Err(_) => {
                warn!(
                    "User {} has a plaintext password, it should be reset",
                    user.id
                );
                Ok(user.password == password)
            }
        }
    }

    fn clear_expired(&self) {
        if let Err(e) = self.context.sessions.clear_expired() {
            warn!("Could not clear expired sessions: {}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{AuthError, Credentials, Registration};
    use crate::{
        test_util::{collab, collab_with},
        Collection, Database, Query, Role, User, ValidationError,
    };

    fn registration(name: &str, email: &str, role: Role) -> Registration {
        Registration {
            name: name.to_string(),
            email: email.to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn registering_ada_with_no_users() {
        let collab = collab();

        let session = collab
            .auth
            .register(registration("Ada", "ada@example.com", Role::Student))
            .await
            .unwrap();

        assert_eq!(session.user.id, 1);
        assert_eq!(session.user.name, "Ada");
        assert_eq!(session.user.role, Role::Student);
        assert_eq!(session.user.role.home_path(), "/my-courses");
        assert_eq!(collab.auth.session(&session.token), Some(session.clone()));

        let stored: User = collab.context().table().get(1).await.unwrap();
        assert_ne!(stored.password, "secret1");
    }

    #[tokio::test]
    async fn invalid_registrations_write_nothing() {
        let collab = collab();

        let mut admin = registration("Eve", "eve@example.com", Role::Admin);
        let result = collab.auth.register(admin.clone()).await;
        assert!(matches!(
            result,
            Err(AuthError::Validation(ValidationError::AdminRegistration))
        ));

        admin.role = Role::Student;
        admin.confirm_password = "different".to_string();
        let result = collab.auth.register(admin.clone()).await;
        assert!(matches!(
            result,
            Err(AuthError::Validation(ValidationError::PasswordMismatch))
        ));

        admin.password = "abc".to_string();
        admin.confirm_password = "abc".to_string();
        let result = collab.auth.register(admin).await;
        assert!(matches!(
            result,
            Err(AuthError::Validation(ValidationError::PasswordTooShort { .. }))
        ));

        let users = collab
            .context()
            .database
            .list(Collection::Users, &Query::new())
            .await
            .unwrap();
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn existing_email_blocks_registration() {
        let collab = collab();

        collab
            .auth
            .register(registration("Ada", "ada@example.com", Role::Student))
            .await
            .unwrap();

        let result = collab
            .auth
            .register(registration("Imposter", "ada@example.com", Role::Instructor))
            .await;

        assert!(matches!(result, Err(AuthError::EmailTaken)));
    }

    #[tokio::test]
    async fn login_and_logout() {
        let collab = collab();

        collab
            .auth
            .register(registration("Grace", "grace@example.com", Role::Instructor))
            .await
            .unwrap();

        let wrong = collab
            .auth
            .login(Credentials {
                email: "grace@example.com".to_string(),
                password: "nope".to_string(),
            })
            .await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

        let unknown = collab
            .auth
            .login(Credentials {
                email: "nobody@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await;
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));

        let session = collab
            .auth
            .login(Credentials {
                email: "grace@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.user.role, Role::Instructor);

        collab.auth.logout(&session.token).unwrap();
        assert_eq!(collab.auth.session(&session.token), None);
    }

    #[tokio::test]
    async fn legacy_plaintext_and_inactive_accounts() {
        let collab = collab_with([
            (
                Collection::Users,
                json!({
                    "id": 1, "name": "Old", "email": "old@example.com", "password": "admin123",
                    "role": "admin", "status": "active", "createdAt": "2024-01-01T00:00:00Z"
                }),
            ),
            (
                Collection::Users,
                json!({
                    "id": 2, "name": "Gone", "email": "gone@example.com", "password": "pass123",
                    "role": "student", "status": "inactive", "createdAt": "2024-01-01T00:00:00Z"
                }),
            ),
        ]);

        let session = collab
            .auth
            .login(Credentials {
                email: "old@example.com".to_string(),
                password: "admin123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.user.role, Role::Admin);

        let inactive = collab
            .auth
            .login(Credentials {
                email: "gone@example.com".to_string(),
                password: "pass123".to_string(),
            })
            .await;
        assert!(matches!(inactive, Err(AuthError::InactiveAccount)));
    }
}
