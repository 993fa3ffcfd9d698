//! Board-supplied DRAM parameters.
//!
//! The words keep the layout of the vendor's parameter block. Most of them are
//! passed through to the PHY bit for bit; only the fields the engine needs to
//! interpret are decoded here.

use bitflags::bitflags;

use crate::geometry::DramGeometry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DramType {
    Ddr3,
    Ddr4,
    Lpddr3,
    Lpddr4,
}

impl DramType {
    pub const fn burst_length(self) -> u32 {
        match self {
            DramType::Lpddr4 => 16,
            _ => 8,
        }
    }

    /// Type code understood by the PHY.
    pub const fn phy_code(self) -> u32 {
        match self {
            DramType::Ddr3 => 2,
            DramType::Lpddr3 => 3,
            DramType::Ddr4 => 4,
            DramType::Lpddr4 => 5,
        }
    }

    pub const fn has_bank_groups(self) -> bool {
        matches!(self, DramType::Ddr4)
    }
}

bitflags! {
    /// Feature switches carried in `tpr10`. The low 16 bits are CA delay
    /// nibbles, see [`crate::phy`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Tpr10: u32 {
        const CA_BIT_DELAY = 1 << 16;
        const DX_BIT_DELAY0 = 1 << 17;
        const DX_BIT_DELAY1 = 1 << 18;
        const CA_DELAY_SHIFT = 1 << 19;
        const WRITE_LEVELING = 1 << 20;
        const READ_CALIBRATION = 1 << 21;
        const READ_TRAINING = 1 << 22;
        const WRITE_TRAINING = 1 << 23;
        const CA_DELAY_FROM_MR2 = 1 << 31;

        const _ = !0;
    }
}

impl Tpr10 {
    /// Training steps the engine does not run.
    pub const UNSUPPORTED_TRAINING: Self = Self::WRITE_LEVELING
        .union(Self::READ_TRAINING)
        .union(Self::WRITE_TRAINING);
}

/// Set in a mode-register word to keep the board value instead of the derived one.
pub const MR_KEEP: u32 = 1 << 31;

/// Mode-register payloads. MR0..MR3 with their upper half clear are replaced by
/// the timing calculator's values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModeRegisters {
    pub mr0: u32,
    pub mr1: u32,
    pub mr2: u32,
    pub mr3: u32,
    pub mr4: u32,
    pub mr5: u32,
    pub mr6: u32,
    pub mr11: u32,
    pub mr12: u32,
    pub mr13: u32,
    pub mr14: u32,
    pub mr22: u32,
}

impl ModeRegisters {
    /// Applies the "high half zero means derive" rule to MR0..MR3.
    pub fn apply_derived(&mut self, derived: [Option<u32>; 4]) {
        for (mr, value) in [&mut self.mr0, &mut self.mr1, &mut self.mr2, &mut self.mr3]
            .into_iter()
            .zip(derived)
        {
            match value {
                Some(value) if *mr & 0xffff_0000 == 0 => *mr = value,
                _ => {}
            }
        }
    }
}

/// Raw packed timing words. Zero means "derive".
///
/// - `dram_tpr0`: tccd[23:21] tfaw[20:15] trrd[14:11] trcd[10:6] trc[5:0]
/// - `dram_tpr1`: txp[27:23] twtr[22:20] trtp[19:15] twr[14:11] trp[10:6] tras[5:0]
/// - `dram_tpr2`: trfc[20:12] trefi[11:0]
///
/// Not to be confused with [`DramParameters::tpr2`], the CA delay word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimingOverrides {
    pub dram_tpr0: u32,
    pub dram_tpr1: u32,
    pub dram_tpr2: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DramParameters {
    /// DRAM clock in MHz.
    pub clk: u32,
    pub kind: DramType,

    pub dx_odt: u32,
    pub dx_dri: u32,
    pub ca_dri: u32,

    pub para0: u32,
    pub para1: u32,
    pub para2: u32,

    pub mode: ModeRegisters,

    /// CA delay base in bits [13:8].
    pub tpr2: u32,
    pub tpr3: u32,
    pub tpr6: u32,
    pub tpr10: u32,
    pub tpr11: u32,
    pub tpr12: u32,
    pub tpr13: u32,
    pub tpr14: u32,

    pub timing: TimingOverrides,

    /// Known geometry. `None` runs auto-detection.
    pub geometry: Option<DramGeometry>,
}

impl DramParameters {
    /// Parameter block used by A133 reference boards.
    pub const fn a133_defaults(kind: DramType, clk: u32) -> Self {
        Self {
            clk,
            kind,
            dx_odt: 0x0303_0303,
            dx_dri: 0x0c0c_0c0c,
            ca_dri: 0x1919,
            para0: 0x1213_1615,
            para1: 0x610a,
            para2: 0x0800_0000,
            mode: ModeRegisters {
                mr0: 0x520,
                mr1: 0x601,
                mr2: 0x8,
                mr3: 0,
                mr4: 0,
                mr5: 0x400,
                mr6: 0x862,
                mr11: 0,
                mr12: 0,
                mr13: 0,
                mr14: 0,
                mr22: 0,
            },
            tpr2: 0,
            tpr3: 0x8000_0000,
            tpr6: 0xa000,
            tpr10: 0x002f_7777,
            tpr11: 0x0d0f_1411,
            tpr12: 0x0b0b_110f,
            tpr13: 0x7501,
            tpr14: 0x1919_1c1c,
            timing: TimingOverrides { dram_tpr0: 0, dram_tpr1: 0, dram_tpr2: 0 },
            geometry: None,
        }
    }

    pub fn tpr10(&self) -> Tpr10 {
        Tpr10::from_bits_retain(self.tpr10)
    }

    /// Geometry encoded in `para1`/`para2`/`tpr13`, as written by vendor tools.
    pub const fn geometry_from_words(&self) -> DramGeometry {
        DramGeometry {
            cols: (self.para1 & 0xf) as u8,
            rows: ((self.para1 >> 4) & 0xff) as u8,
            banks: ((self.para1 >> 12) & 0x3) as u8,
            bank_groups: ((self.para1 >> 14) & 0x3) as u8,
            rank_bits: ((self.tpr13 >> 16) & 0x3) as u8,
            full_width: (self.para2 >> 3) & 1 == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_words_decode() {
        let para = DramParameters::a133_defaults(DramType::Ddr4, 792);
        let g = para.geometry_from_words();
        assert_eq!((g.cols, g.rows, g.banks, g.bank_groups), (10, 16, 2, 1));
        assert_eq!(g.rank_bits, 0);
        assert!(g.full_width);

        let tpr10 = para.tpr10();
        assert!(tpr10.contains(Tpr10::READ_CALIBRATION | Tpr10::CA_BIT_DELAY));
        assert!(!tpr10.intersects(Tpr10::WRITE_LEVELING | Tpr10::WRITE_TRAINING));
    }

    #[test]
    fn derived_mode_registers_respect_keep_marker() {
        let mut mode = ModeRegisters { mr0: 0x520, mr1: MR_KEEP | 0x44, ..Default::default() };
        mode.apply_derived([Some(0x1c70), Some(0x40), None, Some(0)]);
        assert_eq!(mode.mr0, 0x1c70);
        assert_eq!(mode.mr1, MR_KEEP | 0x44);
        assert_eq!(mode.mr2, 0);
        assert_eq!(mode.mr3, 0);
    }
}
