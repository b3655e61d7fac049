//! Authentication middleware and extractors.
//!
//! Provides extractors that turn a bearer credential into the request's
//! principal. The credential comes from the `Authorization: Bearer` header
//! or the `token` cookie (header wins). Verification is fail-closed: a
//! missing, malformed, or expired token, an unknown account, a deactivated
//! account, or a locked account all reject the request - except through
//! [`OptionalAuth`], which silently proceeds without a principal.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;

use harvesthub_core::Role;

use crate::db::users::UserRepository;
use crate::error::ApiError;
use crate::models::user::{Account, Ownable};
use crate::state::AppState;

/// Name of the session cookie.
pub const TOKEN_COOKIE: &str = "token";

/// Extractor that requires an authenticated principal.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(account): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", account.name)
/// }
/// ```
pub struct RequireAuth(pub Account);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        load_principal(parts, state).await.map(Self)
    }
}

/// Extractor that optionally resolves the principal.
///
/// Unlike [`RequireAuth`], this does not reject the request when the
/// credential is absent or fails any check; handlers see `None` instead.
pub struct OptionalAuth(pub Option<Account>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(load_principal(parts, state).await.ok()))
    }
}

/// Extractor that requires an administrator principal.
///
/// Runs the same checks as [`RequireAuth`], then rejects non-admin roles
/// with a 403 naming the actual role.
pub struct RequireAdmin(pub Account);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let account = load_principal(parts, state).await?;
        authorize(&account, &[Role::Admin])?;
        Ok(Self(account))
    }
}

/// Resolve the request's principal, fail-closed.
async fn load_principal(parts: &Parts, state: &AppState) -> Result<Account, ApiError> {
    let token = extract_token(&parts.headers)
        .ok_or(ApiError::Unauthenticated("Not authorized to access this route"))?;

    let claims = state.tokens().verify(&token).map_err(map_token_error)?;

    let id = claims
        .user_id()
        .ok_or(ApiError::Unauthenticated("Invalid token"))?;

    let account = UserRepository::new(state.pool())
        .find_by_id(id)
        .await?
        .ok_or(ApiError::Unauthenticated("No user found with this token"))?;

    if !account.is_active {
        return Err(ApiError::Unauthenticated(
            "User account has been deactivated",
        ));
    }

    if account.is_locked(Utc::now()) {
        return Err(ApiError::Unauthenticated(
            "Account is temporarily locked due to failed login attempts",
        ));
    }

    Ok(account)
}

/// Map token verification failures onto the two distinct client messages.
fn map_token_error(err: crate::services::auth::token::TokenError) -> ApiError {
    use crate::services::auth::token::TokenError;
    match err {
        TokenError::Expired => ApiError::Unauthenticated("Token expired"),
        _ => ApiError::Unauthenticated("Invalid token"),
    }
}

/// Pull the bearer credential off the request: `Authorization` header first,
/// then the `token` cookie.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION)
        && let Ok(value) = value.to_str()
        && let Some(token) = value.strip_prefix("Bearer ")
        && !token.is_empty()
    {
        return Some(token.to_owned());
    }

    cookie_value(headers, TOKEN_COOKIE)
}

/// Find a cookie by name across all `Cookie` headers.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header_value in headers.get_all(header::COOKIE) {
        let Ok(raw) = header_value.to_str() else {
            continue;
        };
        for pair in raw.split(';') {
            if let Some((key, value)) = pair.trim().split_once('=')
                && key == name
                && !value.is_empty()
            {
                return Some(value.to_owned());
            }
        }
    }
    None
}

/// Permit the principal when its role is in the allowed set; otherwise
/// reject with a 403 naming the actual role.
///
/// Pure predicate: assumes session verification has already run.
///
/// # Errors
///
/// Returns `ApiError::Forbidden` naming the principal's role.
pub fn authorize(account: &Account, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&account.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(account.role))
    }
}

/// Permit the principal when it owns the resource or is an administrator.
///
/// # Errors
///
/// Returns `ApiError::NotOwner` otherwise.
pub fn require_owner_or_admin<T: Ownable>(
    resource: &T,
    principal: &Account,
) -> Result<(), ApiError> {
    if principal.role.is_admin() || resource.owner_id() == principal.id {
        Ok(())
    } else {
        Err(ApiError::NotOwner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};
    use chrono::Utc;
    use harvesthub_core::{AddressId, Email, Phone, UserId};

    use crate::models::user::{Address, AddressKind};

    fn headers_of(request: Request<()>) -> HeaderMap {
        request.into_parts().0.headers
    }

    #[test]
    fn test_extract_token_from_bearer_header() {
        let headers = headers_of(
            Request::builder()
                .header(header::AUTHORIZATION, "Bearer abc.def.ghi")
                .body(())
                .unwrap(),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let headers = headers_of(
            Request::builder()
                .header(header::COOKIE, "theme=dark; token=abc.def.ghi; lang=en")
                .body(())
                .unwrap(),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_header_takes_precedence_over_cookie() {
        let headers = headers_of(
            Request::builder()
                .header(header::AUTHORIZATION, "Bearer from-header")
                .header(header::COOKIE, "token=from-cookie")
                .body(())
                .unwrap(),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_missing_token_is_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        // A non-bearer Authorization header does not count.
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(extract_token(&headers), None);
    }

    fn account(role: Role) -> Account {
        Account {
            id: UserId::new(7),
            name: "Asha".to_owned(),
            email: Email::parse("asha@example.com").unwrap(),
            phone: Phone::parse("9876543210").unwrap(),
            role,
            address: None,
            email_verified: true,
            login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_authorize_permits_member_role() {
        assert!(authorize(&account(Role::Admin), &[Role::Admin]).is_ok());
        assert!(authorize(&account(Role::Vendor), &[Role::Admin, Role::Vendor]).is_ok());
    }

    #[test]
    fn test_authorize_rejects_naming_role() {
        let err = authorize(&account(Role::User), &[Role::Admin]).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(Role::User)));
    }

    #[test]
    fn test_ownership_check() {
        let address = Address {
            id: AddressId::new(1),
            user_id: UserId::new(7),
            kind: AddressKind::Home,
            street: "12 Market Rd".to_owned(),
            city: "Pune".to_owned(),
            state: "Maharashtra".to_owned(),
            pincode: "411001".to_owned(),
            is_default: false,
        };

        let owner = account(Role::User);
        assert!(require_owner_or_admin(&address, &owner).is_ok());

        let mut stranger = account(Role::User);
        stranger.id = UserId::new(8);
        assert!(require_owner_or_admin(&address, &stranger).is_err());

        let mut admin = account(Role::Admin);
        admin.id = UserId::new(9);
        assert!(require_owner_or_admin(&address, &admin).is_ok());
    }
}
