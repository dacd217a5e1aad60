//! Monoisotopic masses, all values in Dalton

/// The mass of a proton
pub const PROTON: f64 = 1.007276466812;

/// The mass of water, added once per peptide for the termini
pub const WATER: f64 = 18.0105646863;

/// The mass difference between carbon 13 and carbon 12
pub const C13_C12_DIFFERENCE: f64 = 1.00335483;

/// Get the monoisotopic residue mass of an amino acid (one letter code, case insensitive).
/// `B`, `Z`, and `X` and any non amino acid characters have no mass.
pub const fn residue_mass(residue: char) -> Option<f64> {
    Some(match residue.to_ascii_uppercase() {
        'G' => 57.02146372,
        'A' => 71.03711381,
        'S' => 87.03202840,
        'P' => 97.05276388,
        'V' => 99.06841395,
        'T' => 101.04767846,
        'C' => 103.00918451,
        'L' | 'I' | 'J' => 113.08406401,
        'N' => 114.04292744,
        'D' => 115.02694303,
        'Q' => 128.05857750,
        'K' => 128.09496302,
        'E' => 129.04259309,
        'M' => 131.04048491,
        'H' => 137.05891186,
        'F' => 147.06841391,
        'U' => 150.95363559,
        'R' => 156.10111105,
        'Y' => 163.06332853,
        'W' => 186.07931298,
        'O' => 237.14772638,
        _ => return None,
    })
}

/// Convert a neutral mass to a m/z
pub fn neutral_to_mz(mass: f64, charge: u8) -> f64 {
    let z = f64::from(charge.max(1));
    (mass + z * PROTON) / z
}

/// Convert a m/z to a neutral mass
pub fn mz_to_neutral(mz: f64, charge: u8) -> f64 {
    (mz - PROTON) * f64::from(charge.max(1))
}
