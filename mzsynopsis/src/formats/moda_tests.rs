#![allow(clippy::missing_panics_doc)]
use std::io::BufReader;

use crate::{
    formats::{MODaHit, MODaVersion, test_format, test_registry},
    mass::neutral_to_mz,
};

#[test]
fn moda() {
    let mut registry = test_registry();
    match test_format::<MODaHit>(
        BufReader::new(MODA.as_bytes()),
        &mut registry,
        true,
        Some(MODaVersion::V1_2),
    ) {
        Ok(hits) => {
            assert_eq!(hits.len(), 3);
            assert_eq!(hits[0].canonical_peptide, "K.AAM*EIK.A");
            assert_eq!(hits[1].canonical_peptide, "K.N&EQVK.G");
            assert_eq!(hits[2].canonical_peptide, "R.SGK@LTR.-");
            // Not reported by MODa so calculated from the flanking residues
            assert_eq!(hits[0].ntt, 2);
            assert_eq!(hits[2].ntt, 2);
            assert!(
                (hits[0].precursor_mz.unwrap() - neutral_to_mz(1046.5152, 2)).abs() < 1e-9
            );
            assert!((hits[0].primary - 0.9812).abs() < 1e-9);
            assert!((hits[0].delta_score - 42.0).abs() < 1e-9);
        }
        Err(e) => {
            println!("{e}");
            panic!("Failed search hits test");
        }
    }
    let registered = registry.definitions().last().unwrap();
    assert_eq!(registry.registered(), 1);
    assert_eq!(registered.symbol, '@');
    assert_eq!(registered.name, "Unnamed+28.0000");
}

#[test]
fn moda_unresolved_is_reported() {
    let mut registry = test_registry();
    let result = test_format::<MODaHit>(
        BufReader::new(MODA.as_bytes()),
        &mut registry,
        false,
        None,
    );
    assert!(result.unwrap_err().contains("Line 3"));
}

const MODA: &str = "SpectrumFile\tIndex\tObservedMonoMass\tCharge\tCalculatedMonoMass\tDeltaMass\tScore\tProbability\tPeptide\tProtein\tPeptidePosition
QC_Shew.mgf\t12\t1046.5152\t2\t1046.5123\t0.0029\t42\t0.9812\tK.AAM+16EIK.A\tSO_0001\t120~126
QC_Shew.mgf\t12\t1046.5152\t2\t1045.4301\t1.0851\t17\t0.1204\tK.N+1EQVK.G\tSO_0213\t14~18
QC_Shew.mgf\t15\t804.4450\t3\t804.4452\t-0.0002\t31\t0.8720\tR.SGK+28LTR.-\tSO_2210\t402~407
";
