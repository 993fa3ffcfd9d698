//! Timing-parameter derivation.
//!
//! Every count is in controller clock cycles. The uMCTL2 runs at half the DRAM
//! clock, so the engine derives at `clk / 2`; the functions here take whatever
//! frequency the counts are to be expressed in.

use crate::param::{DramType, TimingOverrides};

pub const fn ns_to_t(nanoseconds: u32, freq_mhz: u32) -> u32 {
    (freq_mhz * nanoseconds).div_ceil(1000)
}

/// A nanosecond requirement with a floor in cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rule {
    pub ns: u32,
    pub min: u32,
}

impl Rule {
    pub const fn new(ns: u32, min: u32) -> Self {
        Self { ns, min }
    }

    /// `max(ceil(ns * freq / 1000), min)`
    pub const fn cycles(self, freq_mhz: u32) -> u32 {
        let t = ns_to_t(self.ns, freq_mhz);
        if t < self.min { self.min } else { t }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleSet {
    pub tfaw: Rule,
    pub trrd: Rule,
    pub trcd: Rule,
    pub trc: Rule,
    pub txp: Rule,
    pub twtr: Rule,
    pub trtp: Rule,
    pub twr: Rule,
    pub trp: Rule,
    pub tras: Rule,
    pub trfc: Rule,
    /// Refresh interval before the division into 32-cycle units.
    pub trefi: Rule,
    pub tmod: Rule,
    pub tcke: Rule,
    pub tcksrx: Rule,
    pub tcksre: Rule,
    pub txsr: Rule,
    pub twtr_sa: Rule,
    pub tcksrea: Rule,
}

/// DDR3 up to 800 MHz DRAM clock.
const DDR3_SLOW: RuleSet = RuleSet {
    tfaw: Rule::new(50, 4),
    trrd: Rule::new(10, 4),
    trcd: Rule::new(15, 2),
    trc: Rule::new(53, 2),
    txp: Rule::new(8, 3),
    twtr: Rule::new(8, 4),
    trtp: Rule::new(8, 2),
    twr: Rule::new(15, 2),
    trp: Rule::new(15, 2),
    tras: Rule::new(38, 2),
    trfc: Rule::new(350, 1),
    trefi: Rule::new(7800, 1),
    tmod: Rule::new(15, 12),
    tcke: Rule::new(5, 3),
    tcksrx: Rule::new(10, 5),
    tcksre: Rule::new(10, 5),
    txsr: Rule::new(220, 1),
    twtr_sa: Rule::new(5, 1),
    tcksrea: Rule::new(11, 1),
};

const DDR3_FAST: RuleSet = RuleSet {
    tfaw: Rule::new(35, 4),
    trcd: Rule::new(14, 2),
    trc: Rule::new(48, 2),
    trp: Rule::new(14, 2),
    tras: Rule::new(34, 2),
    ..DDR3_SLOW
};

const DDR4: RuleSet = RuleSet {
    tfaw: Rule::new(30, 4),
    trrd: Rule::new(7, 4),
    trcd: Rule::new(14, 2),
    trc: Rule::new(47, 2),
    txp: Rule::new(6, 4),
    twtr: Rule::new(8, 4),
    trtp: Rule::new(8, 4),
    twr: Rule::new(15, 2),
    trp: Rule::new(14, 2),
    tras: Rule::new(33, 2),
    trfc: Rule::new(350, 1),
    trefi: Rule::new(7800, 1),
    tmod: Rule::new(15, 12),
    tcke: Rule::new(5, 3),
    tcksrx: Rule::new(10, 5),
    tcksre: Rule::new(10, 5),
    txsr: Rule::new(360, 1),
    twtr_sa: Rule::new(5, 1),
    tcksrea: Rule::new(11, 1),
};

const LPDDR3: RuleSet = RuleSet {
    tfaw: Rule::new(50, 4),
    trrd: Rule::new(10, 1),
    trcd: Rule::new(24, 2),
    trc: Rule::new(70, 2),
    txp: Rule::new(8, 2),
    twtr: Rule::new(8, 2),
    trtp: Rule::new(8, 2),
    twr: Rule::new(15, 2),
    trp: Rule::new(17, 2),
    tras: Rule::new(42, 2),
    trfc: Rule::new(210, 1),
    trefi: Rule::new(3900, 1),
    tmod: Rule::new(15, 12),
    tcke: Rule::new(5, 3),
    tcksrx: Rule::new(10, 5),
    tcksre: Rule::new(10, 5),
    txsr: Rule::new(220, 1),
    twtr_sa: Rule::new(5, 1),
    tcksrea: Rule::new(11, 1),
};

const LPDDR4: RuleSet = RuleSet {
    tfaw: Rule::new(40, 4),
    trrd: Rule::new(10, 2),
    trcd: Rule::new(18, 2),
    trc: Rule::new(60, 2),
    txp: Rule::new(8, 3),
    twtr: Rule::new(10, 4),
    trtp: Rule::new(8, 4),
    twr: Rule::new(18, 2),
    trp: Rule::new(21, 2),
    tras: Rule::new(42, 2),
    trfc: Rule::new(280, 1),
    trefi: Rule::new(3900, 1),
    tmod: Rule::new(15, 12),
    tcke: Rule::new(8, 3),
    tcksrx: Rule::new(10, 5),
    tcksre: Rule::new(10, 5),
    txsr: Rule::new(290, 1),
    twtr_sa: Rule::new(5, 1),
    tcksrea: Rule::new(11, 1),
};

/// Fixed `(freq, twtr_sa, tcksrea)` for two controller clocks, 400 and 800 MHz
/// (DRAM clocks 800 and 1600). Only these two entries are special cased.
pub const BOUNDARY_LITERALS: [(u32, u32, u32); 2] = [(400, 3, 6), (800, 5, 10)];

pub fn rules(kind: DramType, freq_mhz: u32) -> &'static RuleSet {
    let dram_clk = freq_mhz * 2;

    match kind {
        DramType::Ddr3 if dram_clk <= 800 => &DDR3_SLOW,
        DramType::Ddr3 => &DDR3_FAST,
        DramType::Ddr4 => &DDR4,
        DramType::Lpddr3 => &LPDDR3,
        DramType::Lpddr4 => &LPDDR4,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timings {
    // dram_tpr0
    pub tccd: u32,
    pub tfaw: u32,
    pub trrd: u32,
    pub trcd: u32,
    pub trc: u32,

    // dram_tpr1
    pub txp: u32,
    pub twtr: u32,
    pub trtp: u32,
    pub twr: u32,
    pub trp: u32,
    pub tras: u32,

    // dram_tpr2
    pub trfc: u32,
    /// In units of 32 cycles.
    pub trefi: u32,

    pub tmod: u32,
    pub tmrd: u32,
    pub tmrw: u32,
    pub tcke: u32,
    pub tckesr: u32,
    pub tcksrx: u32,
    pub tcksre: u32,
    // PHY DTPR3 on the H6. This PHY has no such register, so they are
    // derived but never programmed.
    pub tcksrea: u32,
    pub twtr_sa: u32,
    pub txsr: u32,
    pub txs: u32,
    pub txsdll: u32,
    pub txsabort: u32,
    pub txsfast: u32,
    pub trasmax: u32,

    pub tcl: u32,
    pub tcwl: u32,
    pub t_rdata_en: u32,
    pub wr_latency: u32,

    pub twtp: u32,
    pub twr2rd: u32,
    pub trd2wr: u32,

    /// Mode-register values for MR0..MR3. `None` keeps the board value.
    pub mr: [Option<u32>; 4],
}

impl Timings {
    /// Derives the timing set for `kind` at `freq_mhz`.
    ///
    /// Non-zero override words replace every field they carry. Composite
    /// turnaround values are computed last, from whichever values won.
    pub fn derive(kind: DramType, freq_mhz: u32, overrides: &TimingOverrides) -> Self {
        let dram_clk = freq_mhz * 2;
        let r = rules(kind, freq_mhz);
        let ns = |rule: Rule| rule.cycles(freq_mhz);

        let (tcl, tcwl) = match kind {
            DramType::Ddr3 if dram_clk <= 800 => (6, 4),
            DramType::Ddr3 => (7, 5),
            DramType::Ddr4 if dram_clk <= 800 => (6, 5),
            DramType::Ddr4 => (8, 6),
            DramType::Lpddr3 if dram_clk < 800 => (7, 4),
            DramType::Lpddr3 => (7, 3),
            DramType::Lpddr4 if dram_clk <= 800 => (7, 4),
            DramType::Lpddr4 => (10, 5),
        };

        let (tmrd, tmrw) = match kind {
            DramType::Ddr3 | DramType::Ddr4 => (4, 0),
            DramType::Lpddr3 | DramType::Lpddr4 => (5, 5),
        };

        let trefi = match kind {
            DramType::Ddr3 => ns(r.trefi) / 32 + 1,
            _ => ns(r.trefi) / 32,
        };

        let trasmax = match kind {
            DramType::Ddr3 | DramType::Ddr4 => dram_clk / 30,
            DramType::Lpddr3 | DramType::Lpddr4 => dram_clk / 60,
        };

        let mr = match kind {
            DramType::Ddr3 if dram_clk <= 800 => [Some(0x1c70), None, Some(0x18), Some(0)],
            DramType::Ddr3 => [Some(0x1e14), None, Some(0x20), Some(0)],
            DramType::Ddr4 => [Some(0x520), None, Some(0x8), Some(0)],
            DramType::Lpddr3 if dram_clk < 800 => [Some(0), Some(195), Some(12), None],
            DramType::Lpddr3 => [Some(0), Some(195), Some(10), None],
            DramType::Lpddr4 if dram_clk <= 800 => [Some(0), Some(0x34), Some(0x12), Some(0x33)],
            DramType::Lpddr4 => [Some(0), Some(0x34), Some(0x1b), Some(0x33)],
        };

        let mut t = Timings {
            tccd: if kind == DramType::Lpddr4 { 4 } else { 2 },
            tfaw: ns(r.tfaw),
            trrd: ns(r.trrd),
            trcd: ns(r.trcd),
            trc: ns(r.trc),
            txp: ns(r.txp),
            twtr: ns(r.twtr),
            trtp: ns(r.trtp),
            twr: ns(r.twr),
            trp: ns(r.trp),
            tras: ns(r.tras),
            trfc: ns(r.trfc),
            trefi,
            tmod: ns(r.tmod),
            tmrd,
            tmrw,
            tcke: ns(r.tcke),
            tcksrx: ns(r.tcksrx),
            tcksre: ns(r.tcksre),
            tcksrea: ns(r.tcksrea),
            twtr_sa: ns(r.twtr_sa),
            txsr: ns(r.txsr),
            txs: 4,
            txsdll: 4,
            txsabort: 4,
            txsfast: 4,
            trasmax,
            tcl,
            tcwl,
            mr,
            ..Default::default()
        };

        if let Some(&(_, twtr_sa, tcksrea)) = BOUNDARY_LITERALS.iter().find(|b| b.0 == freq_mhz) {
            t.twtr_sa = twtr_sa;
            t.tcksrea = tcksrea;
        }

        t.apply_overrides(overrides);

        let half_burst = kind.burst_length() / 4;
        t.tckesr = t.tcke + 1;
        t.twtp = t.tcwl + half_burst + t.twr; // WL + BL/2 + tWR
        t.twr2rd = t.tcwl + half_burst + t.twtr; // WL + BL/2 + tWTR
        t.trd2wr = t.tcl + half_burst + 1 - t.tcwl; // RL + BL/2 + 2 - WL
        t.t_rdata_en = t.tcl - 2;
        t.wr_latency = t.tcwl.saturating_sub(2).max(1);

        t
    }

    fn apply_overrides(&mut self, o: &TimingOverrides) {
        if o.dram_tpr0 != 0 {
            self.tccd = (o.dram_tpr0 >> 21) & 0x7;
            self.tfaw = (o.dram_tpr0 >> 15) & 0x3f;
            self.trrd = (o.dram_tpr0 >> 11) & 0xf;
            self.trcd = (o.dram_tpr0 >> 6) & 0x1f;
            self.trc = o.dram_tpr0 & 0x3f;
        }

        if o.dram_tpr1 != 0 {
            self.txp = (o.dram_tpr1 >> 23) & 0x1f;
            self.twtr = (o.dram_tpr1 >> 20) & 0x7;
            self.trtp = (o.dram_tpr1 >> 15) & 0x1f;
            self.twr = (o.dram_tpr1 >> 11) & 0xf;
            self.trp = (o.dram_tpr1 >> 6) & 0x1f;
            self.tras = o.dram_tpr1 & 0x3f;
        }

        if o.dram_tpr2 != 0 {
            self.trfc = (o.dram_tpr2 >> 12) & 0x1ff;
            self.trefi = o.dram_tpr2 & 0xfff;
        }
    }

    /// The packed words describing this set, as a board would supply them.
    pub fn packed(&self) -> TimingOverrides {
        TimingOverrides {
            dram_tpr0: (self.tccd & 0x7) << 21
                | (self.tfaw & 0x3f) << 15
                | (self.trrd & 0xf) << 11
                | (self.trcd & 0x1f) << 6
                | (self.trc & 0x3f),
            dram_tpr1: (self.txp & 0x1f) << 23
                | (self.twtr & 0x7) << 20
                | (self.trtp & 0x1f) << 15
                | (self.twr & 0xf) << 11
                | (self.trp & 0x1f) << 6
                | (self.tras & 0x3f),
            dram_tpr2: (self.trfc & 0x1ff) << 12 | (self.trefi & 0xfff),
        }
    }

    /// Every field bound by a nanosecond rule, paired with that rule.
    pub fn constrained(&self, rules: &RuleSet) -> [(&'static str, u32, Rule); 18] {
        [
            ("tfaw", self.tfaw, rules.tfaw),
            ("trrd", self.trrd, rules.trrd),
            ("trcd", self.trcd, rules.trcd),
            ("trc", self.trc, rules.trc),
            ("txp", self.txp, rules.txp),
            ("twtr", self.twtr, rules.twtr),
            ("trtp", self.trtp, rules.trtp),
            ("twr", self.twr, rules.twr),
            ("trp", self.trp, rules.trp),
            ("tras", self.tras, rules.tras),
            ("trfc", self.trfc, rules.trfc),
            ("tmod", self.tmod, rules.tmod),
            ("tcke", self.tcke, rules.tcke),
            ("tcksrx", self.tcksrx, rules.tcksrx),
            ("tcksre", self.tcksre, rules.tcksre),
            ("txsr", self.txsr, rules.txsr),
            ("twtr_sa", self.twtr_sa, rules.twtr_sa),
            ("tcksrea", self.tcksrea, rules.tcksrea),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: TimingOverrides = TimingOverrides { dram_tpr0: 0, dram_tpr1: 0, dram_tpr2: 0 };

    #[test]
    fn ddr3_refresh_at_792() {
        let t = Timings::derive(DramType::Ddr3, 792, &NONE);
        assert_eq!(t.trfc, 278);
        assert_eq!(t.trefi, 194);
    }

    #[test]
    fn minimum_dominates_at_low_frequency() {
        let t = Timings::derive(DramType::Ddr3, 200, &NONE);
        // ceil(15 * 200 / 1000) = 3, floor is 12
        assert_eq!(t.tmod, 12);
        // ceil(10 * 200 / 1000) = 2, floor is 4
        assert_eq!(t.trrd, 4);
    }

    #[test]
    fn boundary_frequencies_use_literals() {
        let t = Timings::derive(DramType::Ddr4, 400, &NONE);
        assert_eq!((t.twtr_sa, t.tcksrea), (3, 6));
        let t = Timings::derive(DramType::Ddr4, 800, &NONE);
        assert_eq!((t.twtr_sa, t.tcksrea), (5, 10));
        let t = Timings::derive(DramType::Ddr4, 396, &NONE);
        assert_eq!((t.twtr_sa, t.tcksrea), (2, 5));
    }

    #[test]
    fn overrides_take_precedence_and_feed_composites() {
        let overrides = TimingOverrides {
            dram_tpr0: 0,
            dram_tpr1: 3 << 20 | 9 << 11,
            dram_tpr2: 300 << 12 | 100,
        };
        let t = Timings::derive(DramType::Ddr3, 396, &overrides);
        assert_eq!(t.trfc, 300);
        assert_eq!(t.trefi, 100);
        assert_eq!(t.twtr, 3);
        assert_eq!(t.twr, 9);
        // dram_tpr1 carries tras as well; zero is taken literally.
        assert_eq!(t.tras, 0);
        assert_eq!(t.twr2rd, t.tcwl + 2 + 3);
        assert_eq!(t.twtp, t.tcwl + 2 + 9);

        let derived = Timings::derive(DramType::Ddr3, 396, &NONE);
        assert_eq!(t.tfaw, derived.tfaw);
        assert_eq!(t.trc, derived.trc);
    }

    #[test]
    fn packed_words_reproduce_the_set() {
        let t = Timings::derive(DramType::Lpddr3, 300, &NONE);
        let again = Timings::derive(DramType::Lpddr3, 300, &t.packed());
        assert_eq!(t, again);
    }

    #[test]
    fn lpddr4_uses_sixteen_beat_bursts() {
        let t = Timings::derive(DramType::Lpddr4, 396, &NONE);
        assert_eq!(t.tccd, 4);
        assert_eq!(t.twr2rd, t.tcwl + 4 + t.twtr);
    }
}
