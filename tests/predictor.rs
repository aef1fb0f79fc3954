mod common;

use proptest::prelude::*;
use rstest::rstest;

use common::*;
use vpred::*;

#[test]
fn end_to_end_scenario() {
    let mut p = SingleStrideConfig::default().build();
    for v in [100, 104, 108] {
        assert!(!step(&mut p, 0x40, v).speculate);
    }
    let e = p.find_entry(&op(0x40, 0)).unwrap();
    assert_eq!((e.confidence(), e.stride(), e.last_value()), (4, Some(4), 108));

    let mut next = op(0x40, 0);
    assert_eq!(p.lookup(&mut next, 1), Prediction::value(112));
}

#[test]
fn extrapolates_across_inflight_occurrences() {
    let mut p = SingleStrideConfig::default().build();
    train(&mut p, 0x40, &[92, 96, 100]);
    let mut next = op(0x40, 0);
    assert_eq!(p.lookup(&mut next, 3), Prediction::value(112));
    assert_eq!(p.find_entry(&next).unwrap().predict_ptr(), 3);
}

#[rstest]
#[case::increasing(&[1, 2, 3], Some(4))]
#[case::constant(&[5, 5, 5], Some(5))]
#[case::decreasing(&[10, 8, 6], Some(4))]
#[case::wraps_below_zero(&[1, 0, u64::MAX], Some(u64::MAX - 1))]
#[case::too_short(&[1, 2], None)]
#[case::single_value(&[7], None)]
#[case::pattern_break(&[1, 2, 4], None)]
#[case::relearned(&[1, 2, 4, 6], Some(8))]
fn speculation_gating(#[case] values: &[u64], #[case] expected: Option<u64>) {
    let mut p = SingleStrideConfig::default().build();
    train(&mut p, 0x80, values);
    let mut next = op(0x80, 0);
    let pred = p.lookup(&mut next, 1);
    assert_eq!(pred.speculate.then_some(pred.predicted_value), expected);
}

#[test]
fn pattern_break_resets_confidence() {
    let mut p = SingleStrideConfig::default().build();
    train(&mut p, 0x40, &[0, 8, 16, 24, 32]);
    assert!(p.find_entry(&op(0x40, 0)).unwrap().confidence() >= 4);

    // Predicted 40, retired 100: weakened at execute, reset at retire
    assert_eq!(step(&mut p, 0x40, 100), Prediction::value(40));
    let e = p.find_entry(&op(0x40, 0)).unwrap();
    assert_eq!((e.confidence(), e.stride()), (2, Some(68)));
    assert_eq!(p.stat.mis_preds, 1);
}

#[test]
fn tags_are_isolated() {
    // Same set, different tags
    let mut p = SingleStrideConfig::default().build();
    train(&mut p, 0x40, &[1, 2, 3]);
    assert!(p.find_entry(&op(0x140, 0)).is_none());
    let mut other = op(0x140, 0);
    assert!(!p.lookup(&mut other, 1).speculate);
    assert!(!other.single_stride_hit);

    train(&mut p, 0x140, &[100, 90, 80]);
    let mut a = op(0x40, 0);
    let mut b = op(0x140, 0);
    assert_eq!(p.lookup(&mut a, 1), Prediction::value(4));
    assert_eq!(p.lookup(&mut b, 1), Prediction::value(70));
    assert_eq!(p.get_index(&a), p.get_index(&b));
}

#[test]
fn lookup_is_idempotent() {
    let mut p = SingleStrideConfig::default().build();
    train(&mut p, 0x40, &[1, 2, 3]);
    let mut next = op(0x40, 0);
    let first = p.lookup(&mut next, 2);
    let second = p.lookup(&mut next, 2);
    assert_eq!(first, second);
    let e = p.find_entry(&next).unwrap();
    assert_eq!((e.confidence(), e.pending()), (4, 1));
}

#[test]
fn eviction_skips_pinned_entries() {
    let cfg = SingleStrideConfig { num_sets: 1, num_ways: 2, conf: CONF };
    let mut p = cfg.build();
    p.final_update(&op(0x10, 1));
    p.final_update(&op(0x20, 1));

    // Pin 0x10 under the round-robin cursor
    let mut pinned = op(0x10, 0);
    p.lookup(&mut pinned, 1);
    p.final_update(&op(0x30, 1));
    assert!(p.find_entry(&op(0x10, 0)).is_some());
    assert!(p.find_entry(&op(0x20, 0)).is_none());
    assert!(p.find_entry(&op(0x30, 0)).is_some());
    assert_eq!(p.stat.evictions, 1);

    p.spec_update(&mut pinned).unwrap();
    p.final_update(&op(0x40, 1));
    assert_eq!(p.stat.evictions, 2);
    assert_eq!(p.table().occupancy(), 2);
}

#[test]
fn fuzzy_predictor_observes_mispredictions() {
    let mut ss = SingleStrideConfig::default().build();
    let mut fms = FuzzyMultiStrideConfig::default().build();
    train(&mut ss, 0x40, &[0, 4, 8]);

    let mut next = op(0x40, 0);
    let pred = ss.lookup(&mut next, 1);
    assert!(pred.speculate && !fms.lookup(&mut next, 1).speculate);
    next.prediction_result = PredictionOutcome::Incorrect;
    ss.spec_update(&mut next).unwrap();
    fms.spec_update(&mut next).unwrap();
    assert!(next.single_stride_mis_pred);
    assert_eq!(fms.stat.mis_pred_signals, 1);
}

proptest! {
    #[test]
    fn confidence_stays_in_bounds(outcomes in prop::collection::vec(any::<bool>(), 0..64)) {
        let mut e = SingleStrideEntry::new(&op(0x40, 0), CONF, None);
        e.final_update(&op(0x40, 4));
        e.final_update(&op(0x40, 8));
        prop_assert_eq!(e.confidence(), CONF.thd);

        for correct in outcomes {
            let mut next = op(0x40, 12);
            let pred = e.lookup(&mut next, 1);
            prop_assert_eq!(pred.speculate, next.single_stride_conf_hit);
            next.prediction_result = if correct {
                PredictionOutcome::Correct
            } else if next.single_stride_conf_hit {
                PredictionOutcome::Incorrect
            } else {
                PredictionOutcome::Unknown
            };
            prop_assert!(e.spec_update(&next).is_ok());
            prop_assert!(e.confidence() >= CONF.min && e.confidence() <= CONF.max);
            prop_assert_eq!(e.lookup(&mut op(0x40, 0), 1).speculate,
                e.confidence() >= CONF.thd);
        }
    }

    #[test]
    fn training_is_deterministic(values in prop::collection::vec(any::<u64>(), 1..32)) {
        let mut a = SingleStrideConfig::default().build();
        let mut b = SingleStrideConfig::default().build();
        train(&mut a, 0x40, &values);
        train(&mut b, 0x40, &values);
        let ea = a.find_entry(&op(0x40, 0)).unwrap();
        let eb = b.find_entry(&op(0x40, 0)).unwrap();
        prop_assert_eq!(ea.to_string(), eb.to_string());
        prop_assert_eq!(ea.last_value(), *values.last().unwrap());
    }

    #[test]
    fn learns_any_stride(base in any::<u64>(), stride in any::<i64>(), n in 1u32..8) {
        let mut p = SingleStrideConfig::default().build();
        let vals: Vec<u64> = (0..3)
            .map(|i| base.wrapping_add(stride.wrapping_mul(i) as u64))
            .collect();
        train(&mut p, 0x40, &vals);
        let mut next = op(0x40, 0);
        let expected = vals[2].wrapping_add(stride.wrapping_mul(n as i64) as u64);
        prop_assert_eq!(p.lookup(&mut next, n), Prediction::value(expected));
    }
}
