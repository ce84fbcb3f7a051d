//! Shared types for the billing service.
//!
//! Identifier newtypes prevent mixing up the different id spaces this
//! service deals with (internal user ids, account rows, provider-assigned
//! wallet and customer ids), and [`Money`] keeps price arithmetic in
//! integer cents.

pub mod types;

pub use types::{AccountId, CustomerId, Money, ProductId, UserId, WalletId};
