//! Precursor mass errors, corrected for selection of a non monoisotopic peak

use serde::{Deserialize, Serialize};

use crate::mass::{C13_C12_DIFFERENCE, mz_to_neutral};

/// The largest mass difference in Dalton that is not seen as an isotope error
pub const ISOTOPE_WINDOW: f64 = 0.5;

/// A precursor mass error after isotope correction
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct MassError {
    /// The corrected error in Dalton (observed minus theoretical)
    pub da: f64,
    /// The corrected error in parts per million of the theoretical mass
    pub ppm: f64,
    /// The number of C13 isotopes corrected for, negative if the observed mass was too low
    pub isotopes: i32,
}

/// Shift a mass difference by whole C13 isotopes until it is within [`ISOTOPE_WINDOW`].
/// A difference already within the window is returned unchanged with zero isotopes.
pub fn correct_isotopes(delta: f64) -> (f64, i32) {
    if !delta.is_finite() {
        return (delta, 0);
    }
    let mut delta = delta;
    let mut isotopes = 0;
    while delta > ISOTOPE_WINDOW {
        delta -= C13_C12_DIFFERENCE;
        isotopes += 1;
    }
    while delta < -ISOTOPE_WINDOW {
        delta += C13_C12_DIFFERENCE;
        isotopes -= 1;
    }
    (delta, isotopes)
}

/// Get the isotope corrected mass error of a neutral observed mass.
/// Unknown observed masses and a zero theoretical mass give a zero error.
pub fn corrected_error_from_mass(
    observed_neutral_mass: Option<f64>,
    theoretical_neutral_mass: f64,
) -> MassError {
    let Some(observed) = observed_neutral_mass.filter(|m| m.is_finite()) else {
        return MassError::default();
    };
    if theoretical_neutral_mass == 0.0 || !theoretical_neutral_mass.is_finite() {
        return MassError::default();
    }
    let (da, isotopes) = correct_isotopes(observed - theoretical_neutral_mass);
    MassError {
        da,
        ppm: da / theoretical_neutral_mass * 1e6,
        isotopes,
    }
}

/// Get the isotope corrected mass error of an observed precursor m/z.
pub fn corrected_error(
    observed_mz: Option<f64>,
    charge: u8,
    theoretical_neutral_mass: f64,
) -> MassError {
    corrected_error_from_mass(
        observed_mz.map(|mz| mz_to_neutral(mz, charge)),
        theoretical_neutral_mass,
    )
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::mass::neutral_to_mz;

    #[test]
    fn one_isotope() {
        let error = corrected_error_from_mass(Some(1000.50), 999.50);
        assert_eq!(error.isotopes, 1);
        assert!((error.da - (1.0 - C13_C12_DIFFERENCE)).abs() < 1e-9);
        assert!((error.da + 0.00335483).abs() < 1e-6);
        assert!((error.ppm - error.da / 999.50 * 1e6).abs() < 1e-9);
    }

    #[test]
    fn negative_isotopes() {
        let (delta, isotopes) = correct_isotopes(-2.01);
        assert_eq!(isotopes, -2);
        assert!(delta.abs() <= ISOTOPE_WINDOW);
    }

    #[test]
    fn idempotent_within_window() {
        for delta in [-0.5, -0.2, 0.0, 0.3, 0.5] {
            let (corrected, isotopes) = correct_isotopes(delta);
            assert_eq!(corrected, delta);
            assert_eq!(isotopes, 0);
            let (again, isotopes) = correct_isotopes(corrected);
            assert_eq!(again, corrected);
            assert_eq!(isotopes, 0);
        }
    }

    #[test]
    fn no_error_without_data() {
        assert_eq!(corrected_error(None, 2, 1000.0), MassError::default());
        assert_eq!(corrected_error(Some(500.0), 2, 0.0), MassError::default());
    }

    #[test]
    fn from_mz() {
        let mz = neutral_to_mz(1001.0, 3);
        let error = corrected_error(Some(mz), 3, 1000.0);
        assert_eq!(error.isotopes, 1);
        assert!((error.da - (1.0 - C13_C12_DIFFERENCE)).abs() < 1e-6);
    }
}
