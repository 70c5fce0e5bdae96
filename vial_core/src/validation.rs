//! Input checks applied by front ends before they touch the ledger.
//!
//! The ledger accepts anything numeric; these functions are where bad
//! input gets turned away with a message.

use crate::calculator::DoseQuote;
use crate::{Error, Result, Vial};

/// A validated request to add a vial
#[derive(Clone, Debug, PartialEq)]
pub struct NewVial {
    pub name: String,
    pub total_mg: f64,
    pub water_ml: f64,
}

/// Check the add-vial form: a name and two positive numbers.
///
/// The name is returned trimmed.
pub fn validate_new_vial(name: &str, total_mg: f64, water_ml: f64) -> Result<NewVial> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("vial name must not be empty".into()));
    }
    require_positive("total mg", total_mg)?;
    require_positive("water mL", water_ml)?;

    Ok(NewVial {
        name: name.to_string(),
        total_mg,
        water_ml,
    })
}

/// Check a calculated dose before logging it against `vial`.
pub fn validate_dose(vial: &Vial, quote: &DoseQuote) -> Result<()> {
    require_positive("dose", quote.mg)?;
    if quote.exceeds_remaining {
        return Err(Error::Validation(format!(
            "not enough in vial {} ({:.2}mg requested, {:.2}mg left)",
            vial.name, quote.mg, vial.remaining_mg
        )));
    }
    Ok(())
}

fn require_positive(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::Validation(format!(
            "{} must be a positive number, got {}",
            field, value
        )));
    }
    Ok(())
}
