//! # User Repository
//!
//! Accounts and their credentials. [`User`] never carries the password
//! hash; code that needs it asks for [`UserCredentials`] explicitly.

use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use caja_core::filter::UserFilter;
use caja_core::pagination::{Page, PageRequest};
use caja_core::{Role, User, UserChanges};

const USER_COLUMNS: &str =
    "id, username, email, role, is_active, last_login_at, created_at, updated_at";

/// A user row together with its stored password hash.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// Everything needed to insert an account. The caller has already
/// validated the input and hashed the password.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Lists accounts, newest first.
    pub async fn list(&self, filter: &UserFilter, page: &PageRequest) -> DbResult<Page<User>> {
        debug!(role = ?filter.role, search = ?filter.search, "Listing users");

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, username LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let users: Vec<User> = select.build_query_as().fetch_all(&self.pool).await?;
        Ok(Page::new(users, page, total as u64))
    }

    /// Username/email substring search, capped at `limit` rows.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<User>> {
        let filter = UserFilter {
            role: None,
            search: Some(query.to_string()),
        };
        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_filter(&mut select, &filter);
        select.push(" ORDER BY username LIMIT ").push_bind(limit as i64);

        let users: Vec<User> = select.build_query_as().fetch_all(&self.pool).await?;
        Ok(users)
    }

    pub async fn active_cashiers(&self) -> DbResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = ?1 AND is_active = 1 ORDER BY username"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(Role::Cashier)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Loads an account and its hash by username (case-insensitive).
    pub async fn credentials_by_username(&self, username: &str) -> DbResult<Option<UserCredentials>> {
        let sql = format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE lower(username) = lower(?1)"
        );
        let creds = sqlx::query_as::<_, UserCredentials>(&sql)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(creds)
    }

    pub async fn credentials_by_id(&self, id: &str) -> DbResult<Option<UserCredentials>> {
        let sql = format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE id = ?1");
        let creds = sqlx::query_as::<_, UserCredentials>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(creds)
    }

    /// Inserts an account.
    ///
    /// ## Errors
    /// `UniqueViolation` on `users.username` or `users.email`.
    pub async fn create(&self, record: UserRecord) -> DbResult<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: record.username.trim().to_string(),
            email: record.email.trim().to_lowercase(),
            role: record.role,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %user.id, username = %user.username, role = %user.role, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, password_hash, role,
                is_active, last_login_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&record.password_hash)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_value(e.into(), &user))?;

        Ok(user)
    }

    /// Applies a partial update to an account.
    pub async fn update(&self, id: &str, changes: UserChanges) -> DbResult<User> {
        let mut user = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        changes.apply(&mut user);
        user.updated_at = Utc::now();

        debug!(id = %id, "Updating user");

        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = ?1, email = ?2, role = ?3, is_active = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_value(e.into(), &user))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(user)
    }

    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<User> {
        debug!(id = %id, active, "Setting user active flag");

        let result = sqlx::query("UPDATE users SET is_active = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    pub async fn set_password(&self, id: &str, password_hash: &str) -> DbResult<()> {
        debug!(id = %id, "Updating password hash");

        let result = sqlx::query("UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        Ok(())
    }

    /// Stamps `last_login_at` with the current time.
    pub async fn record_login(&self, id: &str) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_login_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &UserFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role);
    }

    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        qb.push(" AND (instr(lower(username), ")
            .push_bind(needle.clone())
            .push(") > 0 OR instr(lower(email), ")
            .push_bind(needle)
            .push(") > 0)");
    }
}

fn duplicate_value(err: DbError, user: &User) -> DbError {
    if err.is_unique_violation_on("users.email") {
        err.with_value(&user.email)
    } else {
        err.with_value(&user.username)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
