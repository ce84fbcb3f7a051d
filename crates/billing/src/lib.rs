//! Orchestration core of the billing service.
//!
//! This crate implements the flows that must keep the relational store,
//! the billing provider, the snapshot cache and the message broker
//! eventually consistent without a shared transaction:
//!
//! 1. The purchase saga: validate, mutate the provider, emit an outcome.
//! 2. The account provisioning saga: create wallet and customer on the
//!    provider, persist the account, compensating on partial failure.
//!
//! Around them sit the pure pricing engine, the cache-aside snapshot
//! resolver, read-side queries, usage handlers for consumed barcode
//! events, and the periodic maintenance jobs that expire provider-side
//! entities and repopulate the cache.

pub mod error;
pub mod jobs;
pub mod locks;
pub mod pricing;
pub mod provisioning;
pub mod purchase;
pub mod queries;
pub mod resolver;
pub mod usage;

pub use error::BillingError;
pub use jobs::{MaintenanceJobs, TerminationReport};
pub use locks::AccountLocks;
pub use pricing::{PriceQuote, PriceRequest, PricingEngine};
pub use provisioning::{AccountProvisioningSaga, NewUser};
pub use purchase::{PURCHASE_SUCCESS_MESSAGE, PurchaseReceipt, PurchaseSaga};
pub use queries::{BillingQueries, CouponView, CreditsView, SubscriptionView};
pub use resolver::SnapshotResolver;
pub use usage::{BarcodeEvent, UsageHandler};
