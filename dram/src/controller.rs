//! uMCTL2 configuration: master mode, address map, ODT and timing registers.
//!
//! The register values are computed by pure functions so that unsupported
//! geometries are rejected before the first register write.

use embedded_hal::delay::DelayNs;
use tock_registers::{
    interfaces::{ReadWriteable, Readable, Writeable},
    registers::InMemoryRegister,
};

use crate::{
    Controller,
    error::DramError,
    geometry::DramGeometry,
    mmio::RegisterFile,
    param::{DramParameters, DramType},
    regs::{MSTR, com, ctl},
};

const COL_OFF: u32 = 0x1f;
const ROW_OFF: u32 = 0x0f;
const BANK_OFF: u32 = 0x3f;

const fn bytes(b: [u32; 4]) -> u32 {
    b[0] | b[1] << 8 | b[2] << 16 | b[3] << 24
}

/// ADDRMAP0..ADDRMAP8 for `g`.
///
/// Column bits are counted after the half-width adjustment: a 16-bit bus moves
/// one column bit into the byte offset.
pub fn address_map(g: &DramGeometry) -> Result<[u32; ctl::ADDRMAP_COUNT], DramError> {
    let cols = g.cols.wrapping_sub(u8::from(!g.full_width));
    if !(8..=12).contains(&cols) {
        return Err(DramError::UnsupportedColumns(cols));
    }
    if g.banks > 3 {
        return Err(DramError::UnsupportedBanks(g.banks));
    }
    if g.rank_bits > 2 {
        return Err(DramError::UnsupportedRanks(g.rank_bits));
    }

    let bg = g.bank_groups as u32;
    let banks = g.banks as u32;
    let rank_bits = g.rank_bits as u32;
    let rows = g.rows as u32;
    let cols = cols as u32;

    let bank_bx = bg + g.cols as u32 - 2;
    let row_bx = bg + banks + g.cols as u32 - 6;

    let mut map = [0u32; ctl::ADDRMAP_COUNT];

    map[8] = match bg {
        0 => BANK_OFF | BANK_OFF << 8,
        1 => 0x01 | BANK_OFF << 8,
        2 => 0x01 | 0x01 << 8,
        _ => return Err(DramError::UnsupportedBankGroups(g.bank_groups)),
    };

    map[2] = bytes([bg; 4]);
    (map[3], map[4]) = match cols {
        8 => (bytes([bg, bg, COL_OFF, COL_OFF]), COL_OFF | COL_OFF << 8),
        9 => (bytes([bg, bg, bg, COL_OFF]), COL_OFF | COL_OFF << 8),
        10 => (bytes([bg; 4]), COL_OFF | COL_OFF << 8),
        11 => (bytes([bg; 4]), bg | COL_OFF << 8),
        _ => (bytes([bg; 4]), bg | bg << 8),
    };

    let bank = |n: u32| if banks > n { bank_bx } else { BANK_OFF };
    map[1] = bank(0) | bank(1) << 8 | bank(2) << 16;

    map[5] = bytes([row_bx; 4]);
    (map[6], map[7]) = match rows {
        14 => (bytes([row_bx, row_bx, ROW_OFF, ROW_OFF]), ROW_OFF | ROW_OFF << 8),
        15 => {
            let hi = if (rank_bits == 1 && cols == 11) || (rank_bits == 2 && cols == 10) {
                row_bx + 1
            } else {
                row_bx
            };
            (bytes([row_bx, hi, hi, ROW_OFF]), ROW_OFF | ROW_OFF << 8)
        }
        16 => {
            let x = if rank_bits == 1 && cols == 10 { row_bx + 1 } else { row_bx };
            (bytes([x; 4]), ROW_OFF | ROW_OFF << 8)
        }
        17 => (bytes([row_bx; 4]), row_bx | ROW_OFF << 8),
        18 => (bytes([row_bx; 4]), row_bx | row_bx << 8),
        _ => return Err(DramError::UnsupportedRows(g.rows)),
    };

    map[0] = if rank_bits == 0 {
        0x1f
    } else if rank_bits + cols + rows == 27 {
        row_bx + rows - 2
    } else {
        row_bx + rows
    };

    Ok(map)
}

/// MSTR value for `kind` on `g`. Geardown and 2T are always on where the
/// type has them.
pub fn master_config(kind: DramType, g: &DramGeometry) -> u32 {
    let mstr = InMemoryRegister::<u32, MSTR::Register>::new(0);

    let width = if g.full_width {
        MSTR::DATA_BUS_WIDTH::Full
    } else {
        MSTR::DATA_BUS_WIDTH::Half
    };

    mstr.write(
        MSTR::DEVICE_CONFIG::X32
            + MSTR::ACTIVE_RANKS.val((1 << g.ranks()) - 1)
            + MSTR::BURST_RDWR.val(kind.burst_length() / 2)
            + width,
    );

    match kind {
        DramType::Ddr3 => mstr.modify(MSTR::DEVICE_TYPE::Ddr3 + MSTR::T2_MODE::SET),
        DramType::Ddr4 => {
            mstr.modify(MSTR::DEVICE_TYPE::Ddr4 + MSTR::GEARDOWN::SET + MSTR::T2_MODE::SET)
        }
        DramType::Lpddr3 => mstr.modify(MSTR::DEVICE_TYPE::Lpddr3),
        DramType::Lpddr4 => mstr.modify(MSTR::DEVICE_TYPE::Lpddr4),
    }

    mstr.get()
}

/// ODTCFG value; the same word goes to every frequency-set shadow.
pub fn odt_config(params: &DramParameters) -> u32 {
    match params.kind {
        DramType::Ddr3 => 0x0600_0400,
        DramType::Lpddr3 => {
            let rd = params.clk * 7 / 2000;
            let hold: u32 = if params.clk < 400 { 3 } else { 4 };
            0x400 | hold.wrapping_sub(rd) << 16 | rd << 24
        }
        DramType::Ddr4 | DramType::Lpddr4 => {
            let mr4 = params.mode.mr4;
            0x400 | (mr4 << 10 & 0x70000) | (((mr4 >> 12) & 1) + 6) << 24
        }
    }
}

impl<R: RegisterFile, D: DelayNs> Controller<R, D> {
    pub(crate) fn com_init(&mut self, g: &DramGeometry, addrmap: &[u32; ctl::ADDRMAP_COUNT]) {
        let kind = self.params.kind;

        self.regs.clrsetbits(com::PHY_CTRL, 1 << 24, 1 << 25 | 1 << 9);

        // Unlock controller registers
        self.regs.setbits(com::MAER0, 1 << 15);

        if kind == DramType::Lpddr4 {
            self.regs.setbits(com::LPDDR4_ENABLE, 1);
        }

        self.regs.clrsetbits(ctl::SCHED0, 0xff << 8, 0x30 << 8);
        self.regs.write32(ctl::HWLPCTL, 0);

        self.regs.write32(ctl::MSTR, master_config(kind, g));

        self.regs.write32(ctl::ODTMAP, if g.full_width { 0x0201 } else { 0x0303 });
        let odt = odt_config(&self.params);
        for addr in core::iter::once(ctl::ODTCFG).chain(ctl::ODTCFG_SHADOWS) {
            self.regs.write32(addr, odt);
        }

        for (n, v) in addrmap.iter().enumerate() {
            self.regs.write32(ctl::addrmap(n as u64), *v);
        }

        self.set_timing_params();

        self.regs.write32(ctl::PWRCTL, 0);

        for addr in [ctl::DFIUPD0, ctl::ZQCTL0].into_iter().chain(ctl::ZQCTL_SHADOWS) {
            self.regs.setbits(addr, 1 << 31 | 1 << 30);
        }

        // Data bus inversion
        if matches!(kind, DramType::Ddr4 | DramType::Lpddr4) {
            self.regs.setbits(ctl::DBICTL, 1 << 2);
        }
    }

    fn set_timing_params(&mut self) {
        let t = self.timings;
        let regs = &mut self.regs;

        regs.write32(ctl::dramtmg(0), t.twtp << 24 | t.tfaw << 16 | t.trasmax << 8 | t.tras);
        regs.write32(ctl::dramtmg(1), t.txp << 16 | t.trtp << 8 | t.trc);
        regs.write32(ctl::dramtmg(2), t.tcwl << 24 | t.tcl << 16 | t.trd2wr << 8 | t.twr2rd);
        regs.write32(ctl::dramtmg(3), t.tmrw << 20 | t.tmrd << 12 | t.tmod);
        regs.write32(ctl::dramtmg(4), t.trcd << 24 | t.tccd << 16 | t.trrd << 8 | t.trp);
        regs.write32(ctl::dramtmg(5), t.tcksrx << 24 | t.tcksre << 16 | t.tckesr << 8 | t.tcke);
        regs.write32(ctl::dramtmg(6), (t.txp + 2) | 0x0202_0000);
        regs.write32(ctl::dramtmg(8), t.txsfast << 24 | t.txsabort << 16 | t.txsdll << 8 | t.txs);
        regs.write32(ctl::dramtmg(14), t.txsr);

        regs.write32(ctl::DFITMG0, t.wr_latency | 0x0200_0200 | t.t_rdata_en << 16 | 0x0080_8000);
        regs.write32(ctl::DFITMG1, 0x0004_0201);

        regs.write32(ctl::RFSHTMG, t.trefi << 16 | t.trfc);

        regs.clrsetbits(ctl::INIT0, 3 << 30, 1 << 30);
        regs.write32(ctl::DFIMISC, 0);
        regs.clrsetbits(ctl::RANKCTL, 0xff0, 0x660);
    }
}
