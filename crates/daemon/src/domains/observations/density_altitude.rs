//! Density altitude from field elevation, temperature and altimeter setting.
//!
//! Uses the FAA rule of thumb: pressure altitude is field elevation
//! corrected by the altimeter's deviation from the standard datum, and
//! every degree Celsius above the ISA temperature adds 120 ft.

/// Standard sea-level pressure, hPa.
pub const STANDARD_PRESSURE_HPA: f64 = 1013.25;

/// Pressure-altitude change per hPa of altimeter deviation
/// (1000 ft per inHg at 0.02953 inHg per hPa).
pub const FEET_PER_HPA: f64 = 29.53;

/// ISA temperature at mean sea level, °C.
pub const ISA_SEA_LEVEL_TEMPERATURE_C: f64 = 15.0;

/// ISA lapse rate, °C per 1000 ft.
pub const ISA_LAPSE_RATE_C_PER_1000_FT: f64 = 2.0;

/// Density altitude gained per °C above ISA.
pub const FEET_PER_DEGREE_C: f64 = 120.0;

pub fn pressure_altitude(elevation_ft: f64, altimeter_hpa: f64) -> f64 {
    elevation_ft + (STANDARD_PRESSURE_HPA - altimeter_hpa) * FEET_PER_HPA
}

pub fn isa_temperature(elevation_ft: f64) -> f64 {
    ISA_SEA_LEVEL_TEMPERATURE_C - ISA_LAPSE_RATE_C_PER_1000_FT * (elevation_ft / 1000.0)
}

/// Density altitude in feet. Altimeter is in hPa (equivalently mb).
///
/// Inputs are not range checked; implausible inputs give implausible but
/// finite results.
pub fn compute_density_altitude(elevation_ft: f64, temperature_c: f64, altimeter_hpa: f64) -> f64 {
    pressure_altitude(elevation_ft, altimeter_hpa)
        + FEET_PER_DEGREE_C * (temperature_c - isa_temperature(elevation_ft))
}
