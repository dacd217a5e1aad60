#![allow(clippy::missing_panics_doc)]
use std::io::BufReader;

use crate::{
    formats::{SageHit, SageVersion, test_format, test_registry},
    mass::neutral_to_mz,
};

#[test]
fn sage() {
    let mut registry = test_registry();
    match test_format::<SageHit>(
        BufReader::new(SAGE.as_bytes()),
        &mut registry,
        false,
        Some(SageVersion::V0_14),
    ) {
        Ok(hits) => {
            assert_eq!(hits.len(), 3);
            assert_eq!(hits[0].scan, 30069);
            assert_eq!(hits[0].canonical_peptide, "-.#MEPCK.-");
            assert_eq!(hits[0].protein, "sp|P00001|ALBU");
            assert_eq!(hits[0].ntt, 2);
            assert!(
                (hits[0].precursor_mz.unwrap() - neutral_to_mz(779.3315, 2)).abs() < 1e-9
            );
            assert_eq!(hits[1].canonical_peptide, "-.AAM*EIK.-");
            assert_eq!(hits[1].ntt, 1);
            assert_eq!(hits[2].canonical_peptide, "-.N&EQVK.-");
            assert!((hits[2].primary - 21.4).abs() < 1e-9);
            assert!((hits[2].secondary - 0.31).abs() < 1e-9);
        }
        Err(e) => {
            println!("{e}");
            panic!("Failed search hits test");
        }
    }
}

#[test]
fn sage_minimal_columns() {
    let data = "peptide\tproteins\tscannr\tlabel\texpmass\tcalcmass\tcharge\thyperscore\tdelta_next\tpoisson\tsage_discriminant_score\tposterior_error\tspectrum_q
PEPTIDEK\tsp|P00002|TEST\t17\t1\t927.4549\t927.4549\t2\t30.0\t5.0\t-5.0\t0.8\t-3.0\t0.01
";
    let mut registry = test_registry();
    let hits =
        test_format::<SageHit>(BufReader::new(data.as_bytes()), &mut registry, false, None)
            .unwrap();
    assert_eq!(hits[0].scan, 17);
    assert!(hits[0].scores[5].is_missing());
}

const SAGE: &str = "psm_id\tpeptide\tproteins\tfilename\tscannr\trank\tlabel\texpmass\tcalcmass\tcharge\tsemi_enzymatic\thyperscore\tdelta_next\tpoisson\tsage_discriminant_score\tposterior_error\tspectrum_q\tpeptide_q\tprotein_q
1\t[+42.0106]-MEPC[+57.0215]K\tsp|P00001|ALBU;sp|P00009|ALBU2\tQC_Shew.mzML\tcontrollerType=0 controllerNumber=1 scan=30069\t1\t1\t779.3315\t779.3301\t2\t0\t45.2\t12.1\t-8.3\t1.2\t-4.1\t0.0001\t0.0002\t0.001
2\tAAM[+15.9949]EIK\trev_sp|P00420|DECOY\tQC_Shew.mzML\tcontrollerType=0 controllerNumber=1 scan=30012\t1\t-1\t692.3546\t692.3520\t2\t1\t18.0\t0.4\t-2.0\t-0.3\t-0.1\t0.6\t0.58\t0.7
3\tN[+0.9840]EQVK\tsp|P00213|NUCL\tQC_Shew.mzML\tcontrollerType=0 controllerNumber=1 scan=30069\t2\t1\t616.3011\t616.3009\t2\t0\t21.4\t0.0\t-3.1\t0.2\t-1.0\t0.31\t0.2\t0.01
";
