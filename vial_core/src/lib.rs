#![forbid(unsafe_code)]

//! Core domain model and business logic for the vial tracker.
//!
//! This crate provides:
//! - Domain types (vials, dose logs, ledger snapshot)
//! - Dosing math (concentration, syringe units, mass conversions)
//! - The inventory ledger and its change notifications
//! - Persistence (locked, atomic JSON store)
//! - Dose calculator, input validation and usage history

pub mod types;
pub mod error;
pub mod math;
pub mod config;
pub mod logging;
pub mod ledger;
pub mod store;
pub mod calculator;
pub mod validation;
pub mod usage;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use ledger::{Ledger, LedgerEvent, LedgerObserver};
pub use store::{LedgerStore, STORAGE_NAME};
pub use calculator::{quote, DoseInput, DoseQuote};
pub use validation::{validate_dose, validate_new_vial, NewVial};
pub use usage::{depletion_series, usage_summary, UsagePoint, UsageSummary};
