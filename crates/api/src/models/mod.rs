//! Domain types for the API.
//!
//! These types represent validated domain objects separate from database
//! row types.

pub mod user;

pub use user::{Account, Address, AddressKind, CartItem, Ownable, UserSummary, WishlistItem};
