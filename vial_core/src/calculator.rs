//! Dose calculator.
//!
//! Two entry modes, both resolved against a vial's concentration:
//! - a target mass (mg or mcg) to convert into syringe units
//! - a syringe reading (units) to convert back into mass

use crate::{math, MassUnit, Vial};

/// What the user typed into the calculator
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DoseInput {
    /// Desired dose as a mass
    Mass { amount: f64, unit: MassUnit },
    /// Volume drawn, in U-100 syringe units
    Units(f64),
}

impl DoseInput {
    pub fn mg(amount: f64) -> Self {
        DoseInput::Mass {
            amount,
            unit: MassUnit::Mg,
        }
    }

    pub fn mcg(amount: f64) -> Self {
        DoseInput::Mass {
            amount,
            unit: MassUnit::Mcg,
        }
    }
}

/// A dose expressed in every unit the tracker knows about
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DoseQuote {
    pub units: f64,
    pub ml: f64,
    pub mg: f64,
    pub mcg: f64,
    /// More mass than the vial has left
    pub exceeds_remaining: bool,
}

impl DoseQuote {
    /// Whether this quote may be written to the ledger
    pub fn is_loggable(&self) -> bool {
        self.mg.is_finite() && self.units.is_finite() && self.mg > 0.0 && !self.exceeds_remaining
    }
}

/// Resolve a calculator input against a vial
pub fn quote(vial: &Vial, input: DoseInput) -> DoseQuote {
    let (units, ml, mg) = match input {
        DoseInput::Mass { amount, unit } => {
            let mg = match unit {
                MassUnit::Mg => amount,
                MassUnit::Mcg => math::mcg_to_mg(amount),
            };
            let units = math::dose_units(mg, vial.concentration);
            (units, math::units_to_ml(units), mg)
        }
        DoseInput::Units(units) => (
            units,
            math::units_to_ml(units),
            math::units_to_mg(units, vial.concentration),
        ),
    };

    DoseQuote {
        units,
        ml,
        mg,
        mcg: math::mg_to_mcg(mg),
        exceeds_remaining: mg > vial.remaining_mg,
    }
}
