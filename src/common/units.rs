// src/common/units.rs

// Weights are stored in kilograms; every external interface speaks tons.
// The conversion factor is exactly 1000 in both directions and conversion
// happens only at the boundary.

pub const KG_PER_TON: f64 = 1000.0;

pub fn tons_to_kg(tons: f64) -> f64 {
    tons * KG_PER_TON
}

pub fn kg_to_tons(kg: f64) -> f64 {
    kg / KG_PER_TON
}
