//! User repository for database operations.
//!
//! All queries are runtime-checked `sqlx` queries mapped through row structs
//! into domain types. The password hash is only ever returned alongside an
//! account from [`UserRepository::credentials_by_email`] and
//! [`UserRepository::password_hash`]; it is not part of [`Account`].

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use harvesthub_core::{AddressId, CartItemId, Email, Phone, ProductId, Role, UserId};

use super::RepositoryError;
use crate::models::user::{Account, Address, AddressKind, CartItem, WishlistItem};
use crate::services::auth::lockout::LockoutPolicy;

/// Account columns selected by every query that returns an [`Account`].
const ACCOUNT_COLUMNS: &str = "id, name, email, phone, role, address, email_verified, \
     login_attempts, locked_until, last_login_at, is_active, created_at, updated_at";

/// Internal row type for account queries.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: i32,
    name: String,
    email: String,
    phone: String,
    role: Role,
    address: Option<String>,
    email_verified: bool,
    login_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let phone = Phone::parse(&row.phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            name: row.name,
            email,
            phone,
            role: row.role,
            address: row.address,
            email_verified: row.email_verified,
            login_attempts: row.login_attempts,
            locked_until: row.locked_until,
            last_login_at: row.last_login_at,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row type for credential lookups (account plus stored hash).
#[derive(Debug, sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    account: AccountRow,
    password_hash: String,
}

/// Internal row type for address queries.
#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: i32,
    user_id: i32,
    kind: AddressKind,
    street: String,
    city: String,
    state: String,
    pincode: String,
    is_default: bool,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: AddressId::new(row.id),
            user_id: UserId::new(row.user_id),
            kind: row.kind,
            street: row.street,
            city: row.city,
            state: row.state,
            pincode: row.pincode,
            is_default: row.is_default,
        }
    }
}

/// Fields required to create an account.
#[derive(Debug)]
pub struct NewAccount {
    /// Display name.
    pub name: String,
    /// Normalized email.
    pub email: Email,
    /// Phone number.
    pub phone: Phone,
    /// Pre-hashed password.
    pub password_hash: String,
}

/// Optional profile changes; `None` leaves the stored value untouched.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub phone: Option<Phone>,
    pub address: Option<String>,
}

/// Fields for creating or replacing a saved address.
#[derive(Debug)]
pub struct NewAddress {
    pub kind: AddressKind,
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub is_default: bool,
}

/// Repository for account database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a new account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` naming `email` or `phone` if a
    /// unique constraint is violated, `RepositoryError::Database` otherwise.
    pub async fn create(&self, new_account: &NewAccount) -> Result<Account, RepositoryError> {
        let sql = format!(
            "INSERT INTO users (name, email, phone, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING {ACCOUNT_COLUMNS}"
        );

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(&new_account.name)
            .bind(&new_account.email)
            .bind(&new_account.phone)
            .bind(&new_account.password_hash)
            .fetch_one(self.pool)
            .await
            .map_err(map_unique_violation)?;

        row.try_into()
    }

    /// Get an account by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if stored values fail to parse.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, RepositoryError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1");

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(Account::try_from).transpose()
    }

    /// Get an account by its email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if stored values fail to parse.
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = $1");

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;

        row.map(Account::try_from).transpose()
    }

    /// Get an account plus its stored password hash by email.
    ///
    /// Returns `None` if no account has this email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(Account, String)>, RepositoryError> {
        let sql =
            format!("SELECT {ACCOUNT_COLUMNS}, password_hash FROM users WHERE email = $1");

        let row = sqlx::query_as::<_, CredentialsRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let account = Account::try_from(row.account)?;
        Ok(Some((account, row.password_hash)))
    }

    /// Get an account's stored password hash by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let hash = sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(hash)
    }

    /// Record a failed login attempt as a single atomic update.
    ///
    /// The counter logic runs inside the UPDATE against the stored values, so
    /// concurrent failures cannot lose increments:
    /// - an expired lock clears and the count restarts at 1 (this failure
    ///   counts);
    /// - otherwise the count increments, and crossing the threshold sets the
    ///   lock expiry.
    ///
    /// Returns the resulting `(login_attempts, locked_until)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist,
    /// `RepositoryError::Database` for other failures.
    pub async fn record_failed_login(
        &self,
        id: UserId,
        now: DateTime<Utc>,
        policy: &LockoutPolicy,
    ) -> Result<(i32, Option<DateTime<Utc>>), RepositoryError> {
        let lock_until = now + policy.lock_duration;
        let max_attempts = i32::try_from(policy.max_attempts).unwrap_or(i32::MAX);

        let row = sqlx::query_as::<_, (i32, Option<DateTime<Utc>>)>(
            "UPDATE users SET
                 login_attempts = CASE
                     WHEN locked_until IS NOT NULL AND locked_until <= $2 THEN 1
                     ELSE login_attempts + 1
                 END,
                 locked_until = CASE
                     WHEN locked_until IS NOT NULL AND locked_until <= $2 THEN NULL
                     WHEN locked_until IS NULL AND login_attempts + 1 >= $3 THEN $4
                     ELSE locked_until
                 END,
                 updated_at = $2
             WHERE id = $1
             RETURNING login_attempts, locked_until",
        )
        .bind(id)
        .bind(now)
        .bind(max_attempts)
        .bind(lock_until)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)
    }

    /// Record a successful login: reset the failed-attempt counter, clear any
    /// lock, and stamp the last-login time, all in one update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    pub async fn record_successful_login(
        &self,
        id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Account, RepositoryError> {
        let sql = format!(
            "UPDATE users SET
                 login_attempts = 0,
                 locked_until = NULL,
                 last_login_at = $2,
                 updated_at = $2
             WHERE id = $1
             RETURNING {ACCOUNT_COLUMNS}"
        );

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .bind(now)
            .fetch_optional(self.pool)
            .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Store the hash of a freshly issued email verification token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    pub async fn store_verification_token(
        &self,
        id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET
                 email_verification_token_hash = $2,
                 email_verification_expires_at = $3,
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Consume an email verification token: marks the email verified and
    /// clears the token and its expiry in the same conditional update, so a
    /// token can never be used twice.
    ///
    /// Returns `None` when no account holds a matching, unexpired token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn consume_verification_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, RepositoryError> {
        let sql = format!(
            "UPDATE users SET
                 email_verified = TRUE,
                 email_verification_token_hash = NULL,
                 email_verification_expires_at = NULL,
                 updated_at = $2
             WHERE email_verification_token_hash = $1
               AND email_verification_expires_at > $2
             RETURNING {ACCOUNT_COLUMNS}"
        );

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(self.pool)
            .await?;

        row.map(Account::try_from).transpose()
    }

    /// Store the hash of a freshly issued password reset token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    pub async fn store_reset_token(
        &self,
        id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET
                 reset_password_token_hash = $2,
                 reset_password_expires_at = $3,
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Clear a stored reset token (used when the reset email cannot be sent).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_reset_token(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE users SET
                 reset_password_token_hash = NULL,
                 reset_password_expires_at = NULL,
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Consume a password reset token: replaces the password hash, clears the
    /// token, and resets lockout state in one conditional update.
    ///
    /// Returns `None` when no account holds a matching, unexpired token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn consume_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, RepositoryError> {
        let sql = format!(
            "UPDATE users SET
                 password_hash = $2,
                 reset_password_token_hash = NULL,
                 reset_password_expires_at = NULL,
                 login_attempts = 0,
                 locked_until = NULL,
                 updated_at = $3
             WHERE reset_password_token_hash = $1
               AND reset_password_expires_at > $3
             RETURNING {ACCOUNT_COLUMNS}"
        );

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(token_hash)
            .bind(new_password_hash)
            .bind(now)
            .fetch_optional(self.pool)
            .await?;

        row.map(Account::try_from).transpose()
    }

    /// Replace an account's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    pub async fn update_password(
        &self,
        id: UserId,
        new_password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(new_password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Apply profile changes; absent fields keep their stored values.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a changed email or phone is
    /// already claimed, `RepositoryError::NotFound` if the account does not
    /// exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<Account, RepositoryError> {
        let sql = format!(
            "UPDATE users SET
                 name = COALESCE($2, name),
                 email = COALESCE($3, email),
                 phone = COALESCE($4, phone),
                 address = COALESCE($5, address),
                 updated_at = now()
             WHERE id = $1
             RETURNING {ACCOUNT_COLUMNS}"
        );

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .bind(changes.name.as_deref())
            .bind(changes.email.as_ref())
            .bind(changes.phone.as_ref())
            .bind(changes.address.as_deref())
            .fetch_optional(self.pool)
            .await
            .map_err(map_unique_violation)?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Apply administrative changes (role, active flag).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    pub async fn update_admin_fields(
        &self,
        id: UserId,
        role: Option<Role>,
        is_active: Option<bool>,
    ) -> Result<Account, RepositoryError> {
        let sql = format!(
            "UPDATE users SET
                 role = COALESCE($2, role),
                 is_active = COALESCE($3, is_active),
                 updated_at = now()
             WHERE id = $1
             RETURNING {ACCOUNT_COLUMNS}"
        );

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .bind(role)
            .bind(is_active)
            .fetch_optional(self.pool)
            .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// List accounts, newest first, optionally filtered by role.
    ///
    /// Returns the page of accounts and the total matching count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        page: i64,
        per_page: i64,
        role: Option<Role>,
    ) -> Result<(Vec<Account>, i64), RepositoryError> {
        let offset = (page - 1) * per_page;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE ($1::user_role IS NULL OR role = $1)",
        )
        .bind(role)
        .fetch_one(self.pool)
        .await?;

        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users
             WHERE ($1::user_role IS NULL OR role = $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        );

        let rows = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(role)
            .bind(per_page)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;

        let accounts = rows
            .into_iter()
            .map(Account::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((accounts, total))
    }

    /// Delete an account.
    ///
    /// Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// List an account's saved addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn addresses(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, AddressRow>(
            "SELECT id, user_id, kind, street, city, state, pincode, is_default
             FROM addresses
             WHERE user_id = $1
             ORDER BY is_default DESC, id ASC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Address::from).collect())
    }

    /// Get a single address by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_address(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            "SELECT id, user_id, kind, street, city, state, pincode, is_default
             FROM addresses
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Address::from))
    }

    /// Add a saved address. When the new address is the default, any previous
    /// default is cleared in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn add_address(
        &self,
        user_id: UserId,
        address: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if address.is_default {
            sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query_as::<_, AddressRow>(
            "INSERT INTO addresses (user_id, kind, street, city, state, pincode, is_default)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, user_id, kind, street, city, state, pincode, is_default",
        )
        .bind(user_id)
        .bind(address.kind)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.pincode)
        .bind(address.is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Replace a saved address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not exist.
    pub async fn update_address(
        &self,
        id: AddressId,
        address: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if address.is_default {
            sqlx::query(
                "UPDATE addresses SET is_default = FALSE
                 WHERE user_id = (SELECT user_id FROM addresses WHERE id = $1)",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let row = sqlx::query_as::<_, AddressRow>(
            "UPDATE addresses
             SET kind = $2, street = $3, city = $4, state = $5, pincode = $6, is_default = $7
             WHERE id = $1
             RETURNING id, user_id, kind, street, city, state, pincode, is_default",
        )
        .bind(id)
        .bind(address.kind)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.pincode)
        .bind(address.is_default)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        row.map(Address::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete a saved address.
    ///
    /// Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_address(&self, id: AddressId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Cart & wishlist
    // =========================================================================

    /// List an account's cart entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, (i32, i32, i32, i32, DateTime<Utc>)>(
            "SELECT id, user_id, product_id, quantity, added_at
             FROM cart_items
             WHERE user_id = $1
             ORDER BY added_at ASC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, owner, product_id, quantity, added_at)| CartItem {
                id: CartItemId::new(id),
                user_id: UserId::new(owner),
                product: ProductId::new(product_id),
                quantity,
                added_at,
            })
            .collect())
    }

    /// List an account's wishlist entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn wishlist(&self, user_id: UserId) -> Result<Vec<WishlistItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, (i32, DateTime<Utc>)>(
            "SELECT product_id, added_at
             FROM wishlist_items
             WHERE user_id = $1
             ORDER BY added_at ASC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, added_at)| WishlistItem {
                product: ProductId::new(product_id),
                added_at,
            })
            .collect())
    }
}

/// Map a unique-constraint violation to a conflict naming the field.
fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let field = match db_err.constraint() {
            Some("users_email_key") => "email",
            Some("users_phone_key") => "phone",
            _ => "value",
        };
        return RepositoryError::Conflict(field.to_owned());
    }
    RepositoryError::Database(e)
}
