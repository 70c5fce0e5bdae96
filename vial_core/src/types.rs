//! Core domain types for the vial tracker.
//!
//! This module defines the fundamental types used throughout the system:
//! - Vials of reconstituted compound and their running balance
//! - Dose logs (immutable history records)
//! - The persisted ledger document
//! - Mass units and stock levels used by the calculator and usage views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque identifier of a vial or a dose log.
///
/// New ids are v4 UUIDs, but any string read back from storage is accepted
/// as-is so documents written with other id schemes still load.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    /// A fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ============================================================================
// Vials and Logs
// ============================================================================

/// One reconstituted container.
///
/// Everything except `remaining_mg` is fixed at creation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vial {
    pub id: Id,
    pub name: String,
    pub total_mg: f64,
    pub water_ml: f64,
    /// mg per mL, derived once from `total_mg / water_ml`
    pub concentration: f64,
    pub remaining_mg: f64,
    pub date_added: DateTime<Utc>,
}

impl Vial {
    /// Remaining stock as a percentage of the initial load.
    ///
    /// Returns 0 for a vial created with a non-positive total.
    pub fn percent_remaining(&self) -> f64 {
        if self.total_mg <= 0.0 {
            return 0.0;
        }
        (self.remaining_mg / self.total_mg) * 100.0
    }

    /// Mass drawn from the vial so far.
    pub fn used_mg(&self) -> f64 {
        self.total_mg - self.remaining_mg
    }

    /// Classify remaining stock against the given thresholds
    pub fn stock_level(&self, thresholds: &StockThresholds) -> StockLevel {
        thresholds.classify(self.percent_remaining())
    }
}

/// One administered dose.
///
/// `peptide_name` is a snapshot of the vial's name at log time, so the
/// record stays readable after the vial is gone. `units_used` is likewise
/// recorded as drawn and never recomputed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DoseLog {
    pub id: Id,
    pub vial_id: Id,
    pub peptide_name: String,
    pub date: DateTime<Utc>,
    pub dose_mg: f64,
    pub units_used: f64,
}

/// The full persisted ledger state.
///
/// Both collections are stored newest-first, exactly as the ledger holds them.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub vials: Vec<Vial>,
    #[serde(default)]
    pub logs: Vec<DoseLog>,
}

// ============================================================================
// Units and Stock Levels
// ============================================================================

/// Mass unit accepted for dose entry
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MassUnit {
    #[default]
    Mg,
    Mcg,
}

impl fmt::Display for MassUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MassUnit::Mg => write!(f, "mg"),
            MassUnit::Mcg => write!(f, "mcg"),
        }
    }
}

impl FromStr for MassUnit {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mg" => Ok(MassUnit::Mg),
            "mcg" | "ug" | "µg" => Ok(MassUnit::Mcg),
            other => Err(crate::Error::Validation(format!(
                "Unknown mass unit '{}' (expected mg or mcg)",
                other
            ))),
        }
    }
}

/// How full a vial is, for display purposes
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for StockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockLevel::Low => write!(f, "low"),
            StockLevel::Medium => write!(f, "medium"),
            StockLevel::High => write!(f, "high"),
        }
    }
}

/// Percent-remaining cut-offs for [`StockLevel`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StockThresholds {
    pub low_percent: f64,
    pub medium_percent: f64,
}

impl Default for StockThresholds {
    fn default() -> Self {
        Self {
            low_percent: 20.0,
            medium_percent: 50.0,
        }
    }
}

impl StockThresholds {
    pub fn classify(&self, percent_remaining: f64) -> StockLevel {
        if percent_remaining < self.low_percent {
            StockLevel::Low
        } else if percent_remaining < self.medium_percent {
            StockLevel::Medium
        } else {
            StockLevel::High
        }
    }
}
