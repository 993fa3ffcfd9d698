use proptest::prelude::*;

use sunxi_dram::{
    DramGeometry, DramType,
    param::TimingOverrides,
    size::calculate_size,
    timing::{BOUNDARY_LITERALS, Timings, rules},
};

const NONE: TimingOverrides = TimingOverrides { dram_tpr0: 0, dram_tpr1: 0, dram_tpr2: 0 };

fn any_kind() -> impl Strategy<Value = DramType> {
    prop_oneof![
        Just(DramType::Ddr3),
        Just(DramType::Ddr4),
        Just(DramType::Lpddr3),
        Just(DramType::Lpddr4),
    ]
}

fn any_geometry() -> impl Strategy<Value = DramGeometry> {
    (0u8..=1, any::<bool>(), 8u8..=12, 14u8..=18, 0u8..=3, 0u8..=2).prop_map(
        |(rank_bits, full_width, cols, rows, banks, bank_groups)| DramGeometry {
            rank_bits,
            full_width,
            cols: cols + u8::from(!full_width),
            rows,
            banks,
            bank_groups,
        },
    )
}

proptest! {
    #[test]
    fn rules_hold_away_from_boundaries(kind in any_kind(), freq in 100u32..=600) {
        prop_assume!(!BOUNDARY_LITERALS.iter().any(|b| b.0 == freq));

        let t = Timings::derive(kind, freq, &NONE);
        for (name, value, rule) in t.constrained(rules(kind, freq)) {
            prop_assert!(value >= rule.min, "{} = {} below floor {}", name, value, rule.min);
            prop_assert_eq!(value, rule.cycles(freq), "{}", name);
        }
    }

    #[test]
    fn derivation_is_deterministic(kind in any_kind(), freq in 100u32..=800) {
        prop_assert_eq!(Timings::derive(kind, freq, &NONE), Timings::derive(kind, freq, &NONE));
    }

    #[test]
    fn packed_words_reproduce_the_set(kind in any_kind(), freq in 100u32..=600) {
        let derived = Timings::derive(kind, freq, &NONE);
        let replayed = Timings::derive(kind, freq, &derived.packed());

        prop_assert_eq!(replayed.tfaw, derived.tfaw);
        prop_assert_eq!(replayed.trc, derived.trc);
        prop_assert_eq!(replayed.tras, derived.tras);
        prop_assert_eq!(replayed.twr2rd, derived.twr2rd);
        prop_assert_eq!(replayed.trd2wr, derived.trd2wr);
    }

    #[test]
    fn size_is_pure(g in any_geometry()) {
        prop_assert_eq!(calculate_size(&g), calculate_size(&g));
        prop_assert!(calculate_size(&g).is_power_of_two());
        prop_assert_eq!(calculate_size(&g), 1u64 << (g.rank_shift() + g.rank_bits as u32));
    }
}

#[test]
fn boundary_literals_win() {
    for kind in [DramType::Ddr3, DramType::Ddr4, DramType::Lpddr3, DramType::Lpddr4] {
        for (freq, twtr_sa, tcksrea) in BOUNDARY_LITERALS {
            let t = Timings::derive(kind, freq, &NONE);
            assert_eq!((t.twtr_sa, t.tcksrea), (twtr_sa, tcksrea));
        }
    }
}
