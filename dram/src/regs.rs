//! Register map of the A133 DRAM subsystem.
//!
//! The controller is a DesignWare uMCTL2; the PHY is Allwinner's own and most
//! of its registers are only known by offset.

use tock_registers::register_bitfields;

pub const SDRAM_BASE: u64 = 0x4000_0000;

pub mod ccm {
    pub const BASE: u64 = 0x0300_1000;

    pub const PLL5_CFG: u64 = BASE + 0x010;
    pub const MBUS_CFG: u64 = BASE + 0x540;
    pub const DRAM_CLK_CFG: u64 = BASE + 0x800;
    pub const DRAM_GATE_RESET: u64 = BASE + 0x80c;

    pub const MBUS_ENABLE: u32 = 1 << 31;
    pub const MBUS_RESET: u32 = 1 << 30;

    pub const DRAM_MOD_RESET: u32 = 1 << 30;
    pub const DRAM_CLK_UPDATE: u32 = 1 << 27;

    pub const GATE: u32 = 1 << 0;
    pub const RESET: u32 = 1 << 16;
}

/// Undocumented SYS_CFG words touched before the first init.
pub mod sys_cfg {
    pub const RES_CAL_CTRL: u64 = 0x0300_0160;
    pub const RES240_CTRL: u64 = 0x0300_0168;
}

pub mod prcm {
    pub const BASE: u64 = 0x0701_0000;

    pub const SYS_PWROFF_GATING: u64 = BASE + 0x250;
}

pub mod com {
    pub const BASE: u64 = 0x0400_2000;

    /// Power and reset of the PHY side. Bit 24 is the PHY cold reset.
    pub const PHY_CTRL: u64 = BASE + 0x008;
    pub const MAER0: u64 = BASE + 0x020;

    pub const LPDDR4_ENABLE: u64 = 0x0310_2ea8;
}

pub mod ctl {
    pub const BASE: u64 = 0x0400_3000;

    pub const MSTR: u64 = BASE + 0x000;
    pub const STATR: u64 = BASE + 0x004;
    pub const MRCTRL0: u64 = BASE + 0x010;
    pub const MRCTRL1: u64 = BASE + 0x014;
    pub const PWRCTL: u64 = BASE + 0x030;
    pub const HWLPCTL: u64 = BASE + 0x038;
    pub const RFSHCTL3: u64 = BASE + 0x060;
    pub const RFSHTMG: u64 = BASE + 0x064;
    pub const INIT0: u64 = BASE + 0x0d0;
    pub const RANKCTL: u64 = BASE + 0x0f4;
    pub const ZQCTL0: u64 = BASE + 0x180;
    pub const DFITMG0: u64 = BASE + 0x190;
    pub const DFITMG1: u64 = BASE + 0x194;
    pub const DFIUPD0: u64 = BASE + 0x1a0;
    pub const DFIMISC: u64 = BASE + 0x1b0;
    pub const DFISTAT: u64 = BASE + 0x1bc;
    pub const DBICTL: u64 = BASE + 0x1c0;
    pub const ODTCFG: u64 = BASE + 0x240;
    pub const ODTMAP: u64 = BASE + 0x244;
    pub const SCHED0: u64 = BASE + 0x250;
    pub const SWCTL: u64 = BASE + 0x320;
    pub const SWSTAT: u64 = BASE + 0x324;

    /// Frequency-set shadows of ODTCFG.
    pub const ODTCFG_SHADOWS: [u64; 3] = [BASE + 0x2240, BASE + 0x3240, BASE + 0x4240];
    /// Frequency-set shadows of ZQCTL0.
    pub const ZQCTL_SHADOWS: [u64; 3] = [BASE + 0x2180, BASE + 0x3180, BASE + 0x4180];

    pub const fn dramtmg(n: u64) -> u64 {
        BASE + 0x100 + 4 * n
    }

    pub const fn addrmap(n: u64) -> u64 {
        BASE + 0x200 + 4 * n
    }

    pub const ADDRMAP_COUNT: usize = 9;
}

pub mod phy {
    pub const BASE: u64 = 0x0400_5000;

    /// DRAM type code in [2:0], bit 3 always set, bit 5 after read calibration,
    /// bit 7 cleared for LPDDR4.
    pub const TYPE_CTRL: u64 = BASE + 0x004;
    /// Training control: bit 0 starts read calibration, [5:4] selects the rank.
    pub const TRAINING: u64 = BASE + 0x008;
    pub const LOW_FREQ: u64 = BASE + 0x020;
    pub const READ_LATENCY: u64 = BASE + 0x038;
    pub const LANE_ENABLE: u64 = BASE + 0x03c;
    pub const DELAY_CTRL: u64 = BASE + 0x054;
    pub const ZQ_CTRL: u64 = BASE + 0x058;
    pub const DX_DELAY_CTRL: u64 = BASE + 0x060;
    pub const REMAP: u64 = BASE + 0x0c0;
    pub const PLL_CTRL0: u64 = BASE + 0x144;
    pub const PLL_CTRL1: u64 = BASE + 0x14c;
    pub const PLL_STATUS: u64 = BASE + 0x180;
    pub const TRAINING_STATUS: u64 = BASE + 0x184;
    pub const DELAY_STATUS: u64 = BASE + 0x190;
    pub const VREF: [u64; 2] = [BASE + 0x35c, BASE + 0x45c];

    pub const TRAINING_ERROR: u32 = 1 << 5;
    pub const PLL_READY: u32 = 1 << 2;

    /// Per-lane delays latched by read calibration.
    pub const LANE_READ_DELAYS: [u64; 4] = [BASE + 0x274, BASE + 0x26c, BASE + 0x32c, BASE + 0x334];
}

register_bitfields! {u32,
    pub PLL_DDR [
        EN OFFSET(31) NUMBITS(1) [],
        LDO_EN OFFSET(30) NUMBITS(1) [],
        LOCK_EN OFFSET(29) NUMBITS(1) [],
        LOCK OFFSET(28) NUMBITS(1) [],
        SDM_EN OFFSET(24) NUMBITS(1) [],
        N OFFSET(8) NUMBITS(8) [],
        M OFFSET(0) NUMBITS(2) []
    ],

    pub MSTR [
        DEVICE_CONFIG OFFSET(30) NUMBITS(2) [
            X32 = 3
        ],
        ACTIVE_RANKS OFFSET(24) NUMBITS(4) [],
        BURST_RDWR OFFSET(16) NUMBITS(4) [],
        DATA_BUS_WIDTH OFFSET(12) NUMBITS(2) [
            Full = 0,
            Half = 1
        ],
        T2_MODE OFFSET(10) NUMBITS(1) [],
        DEVICE_TYPE OFFSET(0) NUMBITS(6) [
            Ddr3 = 0x01,
            Lpddr3 = 0x08,
            Ddr4 = 0x10,
            Lpddr4 = 0x20
        ],
        /// Shares bit 0 with the DDR3 device type; only meaningful for DDR4.
        GEARDOWN OFFSET(0) NUMBITS(1) []
    ],

    pub MRCTRL0 [
        MR_WR OFFSET(31) NUMBITS(1) [],
        MR_ADDR OFFSET(12) NUMBITS(4) [],
        MR_RANK OFFSET(4) NUMBITS(2) [
            All = 3
        ],
        /// Set by the vendor code for LPDDR3 commands.
        LP3_CMD OFFSET(6) NUMBITS(2) []
    ],

    pub MRCTRL1 [
        MR_ADDR OFFSET(8) NUMBITS(8) [],
        MR_DATA OFFSET(0) NUMBITS(8) []
    ]
}
