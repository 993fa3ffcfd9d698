//! PHY bring-up: reset, latency and VREF setup, drive strength and ODT, CA
//! bit-delay compensation, PHY PLL.
//!
//! The PHY is undocumented. Offsets and values come from the vendor boot0
//! and are kept as they are.

use embedded_hal::delay::DelayNs;

use crate::{
    Controller,
    error::{DramError, Phase},
    geometry::DramGeometry,
    mmio::RegisterFile,
    param::{DramType, Tpr10},
    regs::{com, ctl, phy, prcm},
};

/// Per-type pin remap loaded at PHY+0xc0.
const REMAP_DDR3: [u8; 27] = [
    0x03, 0x19, 0x18, 0x02, 0x10, 0x15, 0x16, 0x07, 0x06, //
    0x0e, 0x05, 0x08, 0x0d, 0x04, 0x17, 0x1a, 0x13, 0x11, //
    0x12, 0x14, 0x00, 0x01, 0x0c, 0x0a, 0x09, 0x0b, 0x0f,
];

const REMAP_DDR4: [u8; 27] = [
    0x13, 0x17, 0x0e, 0x01, 0x06, 0x12, 0x14, 0x07, 0x09, //
    0x02, 0x0f, 0x00, 0x0d, 0x05, 0x16, 0x0c, 0x0a, 0x11, //
    0x04, 0x03, 0x18, 0x15, 0x08, 0x10, 0x0b, 0x19, 0x1a,
];

const REMAP_LPDDR3: [u8; 27] = [
    0x05, 0x06, 0x17, 0x02, 0x19, 0x18, 0x04, 0x07, 0x03, //
    0x01, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, //
    0x12, 0x13, 0x14, 0x15, 0x16, 0x08, 0x09, 0x00, 0x1a,
];

const REMAP_LPDDR4: [u8; 27] = [
    0x01, 0x03, 0x02, 0x19, 0x17, 0x00, 0x06, 0x07, 0x08, //
    0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, //
    0x12, 0x13, 0x14, 0x15, 0x16, 0x04, 0x18, 0x05, 0x1a,
];

pub const fn remap_table(kind: DramType) -> &'static [u8; 27] {
    match kind {
        DramType::Ddr3 => &REMAP_DDR3,
        DramType::Ddr4 => &REMAP_DDR4,
        DramType::Lpddr3 => &REMAP_LPDDR3,
        DramType::Lpddr4 => &REMAP_LPDDR4,
    }
}

/// Latency register triples: (first, zero, second) per copy.
const LATENCY_REGS: [[u64; 3]; 4] = [
    [0x014, 0x018, 0x01c],
    [0x35c, 0x360, 0x364],
    [0x368, 0x36c, 0x370],
    [0x374, 0x378, 0x37c],
];

const fn latencies(kind: DramType) -> (u32, u32) {
    match kind {
        DramType::Ddr3 => (13, 9),
        DramType::Ddr4 => (13, 10),
        DramType::Lpddr3 => (14, 8),
        DramType::Lpddr4 => (22, 10),
    }
}

/// VREF byte from `tpr6`, one byte per type. Zero selects the default.
pub const fn vref(kind: DramType, tpr6: u32) -> u32 {
    let (shift, default) = match kind {
        DramType::Ddr3 => (0, 0x80),
        DramType::Ddr4 => (8, 0x80),
        DramType::Lpddr3 => (16, 0x80),
        DramType::Lpddr4 => (24, 0x33),
    };

    match (tpr6 >> shift) & 0xff {
        0 => default,
        v => v,
    }
}

/// CA delay nibbles of `tpr10`, spread to one 5-bit slot per byte.
pub const fn ca_delay(tpr10: u32, mr2: u32) -> u32 {
    if tpr10 & Tpr10::CA_DELAY_FROM_MR2.bits() != 0 {
        return mr2;
    }

    let v = ((tpr10 << 1) & 0x1e)
        | ((tpr10 << 5) & 0x1e00)
        | ((tpr10 << 9) & 0x1e_0000)
        | ((tpr10 << 13) & 0x1e00_0000);

    if tpr10 & Tpr10::CA_DELAY_SHIFT.bits() != 0 { v << 1 } else { v }
}

impl<R: RegisterFile, D: DelayNs> Controller<R, D> {
    pub(crate) fn phy_init(&mut self, g: &DramGeometry) -> Result<(), DramError> {
        let kind = self.params.kind;
        let clk = self.params.clk;

        // Auto refresh off, DBI mode on the DFI
        self.regs.setbits(ctl::RFSHCTL3, 1 << 0);
        self.regs.write32(ctl::PWRCTL, 0);
        self.regs.clrbits(ctl::DFIMISC, 1);
        self.regs.write32(ctl::PWRCTL, 0x20);

        // PHY cold reset
        self.regs.clrsetbits(com::PHY_CTRL, 1 << 24, 1 << 9);
        self.delay.delay_us(1);
        self.regs.setbits(com::PHY_CTRL, 1 << 24);

        self.regs.clrbits(prcm::SYS_PWROFF_GATING, 1 << 4);

        if kind == DramType::Lpddr4 {
            self.regs.clrbits(phy::TYPE_CTRL, 1 << 7);
        }

        let lanes = if g.full_width { 0xf } else { 0x3 };
        self.regs.clrsetbits(phy::LANE_ENABLE, 0xf, lanes);

        let (first, second) = latencies(kind);
        for [a, zero, b] in LATENCY_REGS {
            self.regs.write32(phy::BASE + a, first);
            self.regs.write32(phy::BASE + zero, 0);
            self.regs.write32(phy::BASE + b, second);
        }

        for (n, v) in remap_table(kind).iter().enumerate() {
            self.regs.write32(phy::REMAP + 4 * n as u64, *v as u32);
        }

        let vref = vref(kind, self.params.tpr6);
        for addr in phy::VREF {
            self.regs.write32(addr, vref);
        }

        self.drive_odt_config();

        if self.params.tpr10().contains(Tpr10::CA_BIT_DELAY) {
            self.ca_bit_delay_compensation();
        }

        self.regs.clrsetbits(phy::TYPE_CTRL, 0x7, kind.phy_code() | 8);

        if clk <= 672 {
            self.regs.write32(phy::LOW_FREQ, 0xf);
        }

        let (pll0, pll1) = if clk > 500 { (0, 0) } else { (0x80, 0x20) };
        self.regs.clrsetbits(phy::PLL_CTRL0, 0x80, pll0);
        self.regs.clrsetbits(phy::PLL_CTRL1, 0xe0, pll1);

        self.regs.clrbits(com::PHY_CTRL, 1 << 9);
        self.delay.delay_us(1);
        self.regs.clrbits(phy::PLL_CTRL1, 1 << 3);

        self.wait(phy::PLL_STATUS, phy::PLL_READY, phy::PLL_READY, Phase::PllLock)?;

        self.delay.delay_us(1000);
        self.regs.write32(phy::ZQ_CTRL, 0x37);

        self.regs.setbits(prcm::SYS_PWROFF_GATING, 1 << 4);

        Ok(())
    }

    fn drive_odt_config(&mut self) {
        let p = self.params;

        // DX drive
        for i in 0..4 {
            let base = phy::BASE + 0x388 + 0x20 * i as u64;
            let dri = (p.dx_dri >> (i * 8)) & 0x1f;
            self.regs.write32(base, dri);

            let second = match p.kind {
                DramType::Lpddr4 if p.tpr3 & 0x1f1f_1f1f != 0 => (p.tpr3 >> (i * 8)) & 0x1f,
                DramType::Lpddr4 => 4,
                _ => dri,
            };
            self.regs.write32(base + 4, second);
        }

        // CA drive
        for i in 0..2 {
            let base = phy::BASE + 0x340 + 0x8 * i as u64;
            let dri = (p.ca_dri >> (i * 8)) & 0x1f;
            self.regs.write32(base, dri);
            self.regs.write32(base + 4, dri);
        }

        // DX ODT
        for i in 0..4 {
            let base = phy::BASE + 0x380 + 0x40 * i as u64;
            let odt = (p.dx_odt >> (i * 8)) & 0x1f;

            let first = match p.kind {
                DramType::Ddr4 | DramType::Lpddr3 => 0,
                _ => odt,
            };
            let second = match p.kind {
                DramType::Lpddr4 => 0,
                _ => odt,
            };

            self.regs.write32(base, first);
            self.regs.write32(base + 4, second);
        }
    }

    fn ca_bit_delay_compensation(&mut self) {
        let p = self.params;
        let val = ca_delay(p.tpr10, p.mode.mr2);

        for i in 0..128 {
            self.regs.write32(phy::BASE + 0x780 + 4 * i, (p.tpr2 >> 8) & 0x3f);
        }

        self.regs.write32(phy::BASE + 0x7dc, val & 0x3f);
        self.regs.write32(phy::BASE + 0x7e0, val & 0x3f);

        let (hi, top): (u64, Option<u64>) = match p.kind {
            DramType::Ddr3 => (0x7b8, Some(0x784)),
            DramType::Ddr4 => (0x784, None),
            DramType::Lpddr3 => (0x788, Some(0x790)),
            DramType::Lpddr4 => (0x790, Some(0x78c)),
        };

        self.regs.write32(phy::BASE + hi, (val >> 16) & 0x3f);
        if let Some(top) = top {
            self.regs.write32(phy::BASE + top, (val >> 24) & 0x3f);
        }
    }
}
