//! # Account Service
//!
//! Sign-in, registration and account administration. Tokens are issued by
//! the HTTP layer; this service only decides who is who.

use tracing::{debug, info, warn};

use crate::error::{DbError, ServiceResult};
use crate::pool::Database;
use crate::repository::user::UserRecord;
use caja_core::filter::UserFilter;
use caja_core::pagination::{Page, PageRequest};
use caja_core::password::{hash_password, verify_password};
use caja_core::policy::{self, require, Requester};
use caja_core::validation::validate_search_query;
use caja_core::{CoreError, Credentials, NewUser, PasswordChange, Role, User, UserChanges};

/// Upper bound on rows returned by the quick user search.
pub const USER_SEARCH_LIMIT: u32 = 20;

#[derive(Debug, Clone)]
pub struct AccountService {
    db: Database,
}

impl AccountService {
    pub fn new(db: Database) -> Self {
        AccountService { db }
    }

    /// Checks a username/password pair and stamps the login time.
    pub async fn login(&self, credentials: Credentials) -> ServiceResult<User> {
        credentials.validate()?;
        let users = self.db.users();

        let Some(found) = users.credentials_by_username(&credentials.username).await? else {
            warn!(username = %credentials.username, "Login rejected: unknown user");
            return Err(CoreError::InvalidCredentials.into());
        };

        if !verify_password(&credentials.password, &found.password_hash)? {
            warn!(user_id = %found.user.id, "Login rejected: wrong password");
            return Err(CoreError::InvalidCredentials.into());
        }
        if !found.user.is_active {
            warn!(user_id = %found.user.id, "Login rejected: account disabled");
            return Err(CoreError::AccountDisabled.into());
        }

        users.record_login(&found.user.id).await?;
        info!(user_id = %found.user.id, role = %found.user.role, "User logged in");

        Ok(users
            .get_by_id(&found.user.id)
            .await?
            .unwrap_or(found.user))
    }

    /// Public sign-up. The requested role only counts for the very first
    /// account; everyone after that becomes a cashier.
    pub async fn register(&self, input: NewUser) -> ServiceResult<User> {
        input.validate()?;

        let first = self.db.users().count().await? == 0;
        let role = if first {
            input.role.unwrap_or(Role::Admin)
        } else {
            Role::Cashier
        };

        let user = self.insert(input, role).await?;
        info!(user_id = %user.id, role = %user.role, first, "User registered");
        Ok(user)
    }

    /// Admin-created account.
    pub async fn create_user(&self, requester: &Requester, input: NewUser) -> ServiceResult<User> {
        require(policy::can_manage_users(requester), "managing users needs ADMIN")?;
        input.validate()?;

        let role = input.role.unwrap_or_default();
        let user = self.insert(input, role).await?;
        info!(user_id = %user.id, role = %user.role, created_by = %requester.user_id, "User created");
        Ok(user)
    }

    pub async fn get_user(&self, requester: &Requester, id: &str) -> ServiceResult<User> {
        require(
            policy::can_view_user(requester, id),
            "cashiers can only view their own account",
        )?;
        self.find(id).await
    }

    /// Partial update. Role and active flag need an admin, and nobody can
    /// deactivate themselves.
    pub async fn update_user(
        &self,
        requester: &Requester,
        id: &str,
        changes: UserChanges,
    ) -> ServiceResult<User> {
        require(
            policy::can_edit_user(requester, id),
            "cashiers can only edit their own account",
        )?;
        changes.validate()?;

        if changes.role.is_some() {
            require(policy::can_change_role(requester), "changing roles needs ADMIN")?;
        }
        if let Some(active) = changes.is_active {
            if !active {
                require(
                    policy::can_deactivate_user(requester, id),
                    "cannot deactivate this account",
                )?;
            } else {
                require(policy::can_manage_users(requester), "activating accounts needs ADMIN")?;
            }
        }

        debug!(user_id = %id, by = %requester.user_id, "Updating user");
        self.db.users().update(id, changes).await.map_err(|e| not_found_as_user(e, id))
    }

    /// Soft delete.
    pub async fn deactivate_user(&self, requester: &Requester, id: &str) -> ServiceResult<User> {
        require(
            policy::can_deactivate_user(requester, id),
            "cannot deactivate this account",
        )?;
        self.find(id).await?;

        let user = self.db.users().set_active(id, false).await?;
        info!(user_id = %id, by = %requester.user_id, "User deactivated");
        Ok(user)
    }

    pub async fn toggle_active(&self, requester: &Requester, id: &str) -> ServiceResult<User> {
        require(
            policy::can_deactivate_user(requester, id),
            "cannot change the active flag of this account",
        )?;
        let current = self.find(id).await?;

        let user = self.db.users().set_active(id, !current.is_active).await?;
        info!(user_id = %id, active = user.is_active, by = %requester.user_id, "User active flag toggled");
        Ok(user)
    }

    /// Self-service password change.
    pub async fn change_password(
        &self,
        requester: &Requester,
        id: &str,
        change: PasswordChange,
    ) -> ServiceResult<()> {
        require(
            policy::can_change_password(requester, id),
            "passwords can only be changed by their owner",
        )?;
        change.validate()?;

        let found = self
            .db
            .users()
            .credentials_by_id(id)
            .await?
            .ok_or_else(|| CoreError::UserNotFound(id.to_string()))?;

        if !verify_password(&change.current_password, &found.password_hash)? {
            warn!(user_id = %id, "Password change rejected: wrong current password");
            return Err(CoreError::InvalidCredentials.into());
        }

        let hash = hash_password(&change.new_password)?;
        self.db.users().set_password(id, &hash).await?;
        info!(user_id = %id, "Password changed");
        Ok(())
    }

    pub async fn list_users(
        &self,
        requester: &Requester,
        filter: UserFilter,
        page: &PageRequest,
    ) -> ServiceResult<Page<User>> {
        require(policy::can_manage_users(requester), "managing users needs ADMIN")?;
        let filter = filter.normalized()?;
        Ok(self.db.users().list(&filter, page).await?)
    }

    pub async fn search_users(&self, requester: &Requester, query: &str) -> ServiceResult<Vec<User>> {
        require(policy::can_manage_users(requester), "managing users needs ADMIN")?;
        let query = validate_search_query(query)?;
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.db.users().search(&query, USER_SEARCH_LIMIT).await?)
    }

    pub async fn active_cashiers(&self, requester: &Requester) -> ServiceResult<Vec<User>> {
        require(policy::can_manage_users(requester), "managing users needs ADMIN")?;
        Ok(self.db.users().active_cashiers().await?)
    }

    async fn find(&self, id: &str) -> ServiceResult<User> {
        self.db
            .users()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::UserNotFound(id.to_string()).into())
    }

    async fn insert(&self, input: NewUser, role: Role) -> ServiceResult<User> {
        let password_hash = hash_password(&input.password)?;
        Ok(self
            .db
            .users()
            .create(UserRecord {
                username: input.username,
                email: input.email,
                password_hash,
                role,
            })
            .await?)
    }
}

fn not_found_as_user(err: DbError, id: &str) -> crate::error::ServiceError {
    match err {
        DbError::NotFound { .. } => CoreError::UserNotFound(id.to_string()).into(),
        other => other.into(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
