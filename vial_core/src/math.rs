//! Dosing arithmetic.
//!
//! Conversions between mass (mg/mcg), volume (mL) and syringe units on a
//! U-100 insulin syringe, plus solution concentration. Every function is
//! total over finite input: degenerate denominators yield `0.0` instead of
//! `NaN` or infinity so nothing unrepresentable reaches persisted state.

/// Syringe graduations per millilitre (U-100 convention, not configurable).
pub const UNITS_PER_ML: f64 = 100.0;

/// Micrograms per milligram.
pub const MCG_PER_MG: f64 = 1000.0;

/// Concentration of the reconstituted solution in mg/mL.
///
/// Returns `0.0` when `water_ml <= 0`.
pub fn concentration(total_mg: f64, water_ml: f64) -> f64 {
    if water_ml <= 0.0 {
        return 0.0;
    }
    total_mg / water_ml
}

/// Syringe units to draw for a desired dose.
///
/// Returns `0.0` when `concentration_mg_ml <= 0`.
pub fn dose_units(desired_dose_mg: f64, concentration_mg_ml: f64) -> f64 {
    if concentration_mg_ml <= 0.0 {
        return 0.0;
    }
    let volume_ml = desired_dose_mg / concentration_mg_ml;
    volume_ml * UNITS_PER_ML
}

/// Volume in mL for a number of syringe units.
pub fn units_to_ml(units: f64) -> f64 {
    units / UNITS_PER_ML
}

/// Mass in mg contained in `units` of a solution at the given concentration.
pub fn units_to_mg(units: f64, concentration_mg_ml: f64) -> f64 {
    units_to_ml(units) * concentration_mg_ml
}

pub fn mg_to_mcg(mg: f64) -> f64 {
    mg * MCG_PER_MG
}

pub fn mcg_to_mg(mcg: f64) -> f64 {
    mcg / MCG_PER_MG
}
