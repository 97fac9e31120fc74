//! # User Accounts
//!
//! Back-office users with argon2-hashed passwords.
//!
//! ```text
//! CreateUser { password } ──► hash_password ──► users.password_hash (PHC)
//!
//! login + password ──► find_by_login ──► verify_password ──► User
//!                                 └── missing, inactive or mismatch ──► None
//! ```
//!
//! Generic reads and deletes go through the record store; only the writes
//! that touch the password live here.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use market_core::{CreateUser, UpdateUser, User, Validate};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::store::{self, Bind, Changeset, NewRecord, Record};

/// Hashes a password into a PHC string with a random salt.
pub fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

/// Checks a password against a stored PHC string. A malformed hash never
/// verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

struct NewUser<'a> {
    req: &'a CreateUser,
    password_hash: String,
}

impl NewRecord for NewUser<'_> {
    type Target = User;

    fn values(&self) -> Vec<(&'static str, Bind)> {
        vec![
            ("first_name", self.req.first_name.trim().into()),
            ("last_name", self.req.last_name.trim().into()),
            ("login", self.req.login.trim().into()),
            ("password_hash", self.password_hash.as_str().into()),
            ("active", self.req.active.into()),
            ("client_type", self.req.client_type.as_str().into()),
        ]
    }
}

struct UserChanges<'a> {
    req: &'a UpdateUser,
    password_hash: Option<String>,
}

impl Changeset for UserChanges<'_> {
    type Target = User;

    fn changes(&self) -> Vec<(&'static str, Bind)> {
        let mut changes: Vec<(&'static str, Bind)> = Vec::new();
        if let Some(first_name) = &self.req.first_name {
            changes.push(("first_name", first_name.trim().into()));
        }
        if let Some(last_name) = &self.req.last_name {
            changes.push(("last_name", last_name.trim().into()));
        }
        if let Some(hash) = &self.password_hash {
            changes.push(("password_hash", hash.as_str().into()));
        }
        if let Some(active) = self.req.active {
            changes.push(("active", active.into()));
        }
        if let Some(client_type) = self.req.client_type {
            changes.push(("client_type", client_type.as_str().into()));
        }
        changes
    }
}

/// Password-aware user writes and login lookup.
#[derive(Debug, Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        UserStore { pool }
    }

    /// Creates a user, storing only the password hash.
    ///
    /// ## Errors
    /// - `Rule(Validation)` for a bad login, name or short password
    /// - `UniqueViolation` on `users.login` if the login is taken
    pub async fn create(&self, req: &CreateUser) -> DbResult<User> {
        req.validate()?;
        let password_hash = hash_password(&req.password)?;

        let mut conn = self.pool.acquire().await?;
        let user = store::insert(&mut conn, &NewUser { req, password_hash }).await?;

        info!(user_id = %user.id, login = %user.login, client_type = %user.client_type, "User created");
        Ok(user)
    }

    /// Applies an update, rehashing the password if one is given.
    pub async fn update(&self, id: &str, req: &UpdateUser) -> DbResult<User> {
        req.validate()?;
        let password_hash = req.password.as_deref().map(hash_password).transpose()?;

        let mut conn = self.pool.acquire().await?;
        store::update(&mut conn, id, &UserChanges { req, password_hash }).await
    }

    pub async fn find_by_login(&self, login: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {} FROM {} WHERE login = ?", User::COLUMNS, User::TABLE);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(login.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Resolves a login attempt to an active user.
    ///
    /// Unknown logins, inactive accounts and wrong passwords all yield
    /// `None`, so callers cannot tell them apart.
    pub async fn authenticate(&self, login: &str, password: &str) -> DbResult<Option<User>> {
        let Some(user) = self.find_by_login(login).await? else {
            debug!(login = %login, "Login for unknown user");
            return Ok(None);
        };

        if !user.active {
            debug!(user_id = %user.id, "Login for inactive user");
            return Ok(None);
        }

        if !verify_password(password, &user.password_hash) {
            debug!(user_id = %user.id, "Password mismatch");
            return Ok(None);
        }

        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use market_core::ClientType;

    fn cashier(login: &str) -> CreateUser {
        CreateUser {
            first_name: "Dilnoza".to_string(),
            last_name: "Karimova".to_string(),
            login: login.to_string(),
            password: "kassa-2024".to_string(),
            active: true,
            client_type: ClientType::Cassier,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret-pass").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret-pass", &hash));
        assert!(!verify_password("wrong-pass", &hash));
        assert!(!verify_password("secret-pass", "not-a-phc-string"));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let a = hash_password("secret-pass").unwrap();
        let b = hash_password("secret-pass").unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_create_stores_hash_not_password() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db.users().create(&cashier("kassir1")).await.unwrap();

        assert_ne!(user.password_hash, "kassa-2024");
        assert!(verify_password("kassa-2024", &user.password_hash));
        assert_eq!(user.client_type, ClientType::Cassier);
    }

    #[tokio::test]
    async fn test_duplicate_login_is_unique_violation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().create(&cashier("kassir1")).await.unwrap();
        let err = db.users().create(&cashier("kassir1")).await.unwrap_err();
        assert!(err.is_unique_on("users.login"), "got {err:?}");
    }

    #[tokio::test]
    async fn test_authenticate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();
        let user = users.create(&cashier("kassir1")).await.unwrap();

        let found = users.authenticate("kassir1", "kassa-2024").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id.clone()));

        assert!(users.authenticate("kassir1", "wrong").await.unwrap().is_none());
        assert!(users.authenticate("nobody", "kassa-2024").await.unwrap().is_none());

        users
            .update(
                &user.id,
                &UpdateUser {
                    active: Some(false),
                    ..UpdateUser::default()
                },
            )
            .await
            .unwrap();
        assert!(users.authenticate("kassir1", "kassa-2024").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_rehashes_password() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();
        let user = users.create(&cashier("kassir1")).await.unwrap();

        users
            .update(
                &user.id,
                &UpdateUser {
                    password: Some("new-secret".to_string()),
                    ..UpdateUser::default()
                },
            )
            .await
            .unwrap();

        assert!(users.authenticate("kassir1", "new-secret").await.unwrap().is_some());
        assert!(users.authenticate("kassir1", "kassa-2024").await.unwrap().is_none());
    }
}
