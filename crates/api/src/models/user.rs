//! Account domain types.
//!
//! These types represent validated domain objects separate from database row
//! types. The password hash never appears here: repositories hand it out
//! separately to the one service that verifies it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use harvesthub_core::{AddressId, CartItemId, Email, Phone, ProductId, Role, UserId};

/// A HarvestHub account (domain type).
#[derive(Debug, Clone)]
pub struct Account {
    /// Unique account ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Normalized email address.
    pub email: Email,
    /// Phone number.
    pub phone: Phone,
    /// Permission role.
    pub role: Role,
    /// Free-text address (legacy single-address field).
    pub address: Option<String>,
    /// Whether the email has been verified.
    pub email_verified: bool,
    /// Consecutive failed login attempts since the last success.
    pub login_attempts: i32,
    /// Lock expiry; the account is locked while this is in the future.
    pub locked_until: Option<DateTime<Utc>>,
    /// Last successful login.
    pub last_login_at: Option<DateTime<Utc>>,
    /// Soft-disable flag; inactive accounts cannot authenticate.
    pub is_active: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Whether the account is currently locked.
    ///
    /// Derived from `locked_until`; there is no stored boolean to drift out
    /// of sync with the timestamp.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Client-facing representation of this account.
    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            role: self.role,
            address: self.address.clone(),
            email_verified: self.email_verified,
            last_login: self.last_login_at,
            created_at: self.created_at,
        }
    }
}

/// Serialized account shape returned to clients.
///
/// Deliberately has no password-hash field: the hash is write-only from the
/// client's perspective.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub phone: Phone,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub email_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Saved address kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, sqlx::Type)]
#[sqlx(type_name = "address_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    #[default]
    Home,
    Work,
    Other,
}

/// A saved delivery address.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Database ID of this address.
    pub id: AddressId,
    /// Account that owns this address.
    #[serde(skip)]
    pub user_id: UserId,
    /// Address kind (home/work/other).
    pub kind: AddressKind,
    /// Street line.
    pub street: String,
    /// City.
    pub city: String,
    /// State.
    pub state: String,
    /// Six-digit postal code.
    pub pincode: String,
    /// Whether this is the default delivery address.
    pub is_default: bool,
}

/// A shopping cart entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Database ID of this entry.
    pub id: CartItemId,
    /// Account that owns this entry.
    #[serde(skip)]
    pub user_id: UserId,
    /// Referenced product.
    pub product: ProductId,
    /// Quantity, at least 1.
    pub quantity: i32,
    /// When the item was added.
    pub added_at: DateTime<Utc>,
}

/// A wishlist entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    /// Referenced product.
    pub product: ProductId,
    /// When the item was added.
    pub added_at: DateTime<Utc>,
}

/// Implemented by every entity subject to ownership checks.
///
/// Replaces runtime probing of `user`/`owner`/`createdBy`-style fields with
/// a capability resolved at compile time.
pub trait Ownable {
    /// The account that owns this resource.
    fn owner_id(&self) -> UserId;
}

impl Ownable for Address {
    fn owner_id(&self) -> UserId {
        self.user_id
    }
}

impl Ownable for CartItem {
    fn owner_id(&self) -> UserId {
        self.user_id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account(locked_until: Option<DateTime<Utc>>) -> Account {
        Account {
            id: UserId::new(1),
            name: "Asha Sharma".to_string(),
            email: Email::parse("asha@example.com").unwrap(),
            phone: Phone::parse("9876543210").unwrap(),
            role: Role::User,
            address: None,
            email_verified: true,
            login_attempts: 0,
            locked_until,
            last_login_at: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_locked_future_timestamp() {
        let now = Utc::now();
        let acct = account(Some(now + Duration::minutes(5)));
        assert!(acct.is_locked(now));
    }

    #[test]
    fn test_is_locked_past_timestamp() {
        let now = Utc::now();
        let acct = account(Some(now - Duration::seconds(1)));
        assert!(!acct.is_locked(now));
    }

    #[test]
    fn test_is_locked_unset() {
        let acct = account(None);
        assert!(!acct.is_locked(Utc::now()));
    }

    #[test]
    fn test_summary_has_no_password_field() {
        let acct = account(None);
        let json = serde_json::to_value(acct.summary()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("password"));
        assert!(!obj.contains_key("passwordHash"));
        assert!(obj.contains_key("emailVerified"));
    }

    #[test]
    fn test_ownable_address() {
        let addr = Address {
            id: AddressId::new(9),
            user_id: UserId::new(4),
            kind: AddressKind::Home,
            street: "12 Market Rd".to_string(),
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            pincode: "411001".to_string(),
            is_default: true,
        };
        assert_eq!(addr.owner_id(), UserId::new(4));
    }
}
