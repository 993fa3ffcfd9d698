//! A simulated board: just enough controller, PHY and memory behaviour to
//! drive the full bring-up on the host.
//!
//! Registers read back what was written, with the status bits the sequence
//! polls for reported as ready. Read calibration passes only when the
//! programmed rank count and bus width fit the simulated chip. Memory keeps
//! the address lines the chip really has and drops the rest, so probing a
//! larger geometry wraps around exactly like real DRAM does.

use std::collections::HashMap;

use embedded_hal::delay::DelayNs;
use log::trace;

use crate::{
    dfi::MrCommand,
    geometry::DramGeometry,
    mmio::RegisterFile,
    regs::{MSTR, PLL_DDR, SDRAM_BASE, ccm, ctl, phy},
};

use tock_registers::{interfaces::Readable, registers::InMemoryRegister};

const PHY_INIT_REQUEST: u32 = 1 << 5;
const MR_WR: u32 = 1 << 31;
const TRAINING_DONE: u32 = 0xf;

pub struct SimBoard {
    chip: DramGeometry,
    regs: HashMap<u64, u32>,
    memory: HashMap<u64, u32>,
    pll_locks: bool,
    read_failures: u32,
    corrupt: Vec<u64>,
    mr_log: Vec<MrCommand>,
    read_calibrations: u32,
    configured: Vec<DramGeometry>,
}

impl SimBoard {
    pub fn new(chip: DramGeometry) -> Self {
        Self {
            chip,
            regs: HashMap::new(),
            memory: HashMap::new(),
            pll_locks: true,
            read_failures: 0,
            corrupt: Vec::new(),
            mr_log: Vec::new(),
            read_calibrations: 0,
            configured: Vec::new(),
        }
    }

    /// The DRAM PLL never reports lock.
    pub fn with_stuck_pll(mut self) -> Self {
        self.pll_locks = false;
        self
    }

    /// The next `n` read calibration passes on rank 0 fail.
    pub fn with_read_calibration_failures(mut self, n: u32) -> Self {
        self.read_failures = n;
        self
    }

    /// The word at byte `offset` into DRAM reads back with bit 0 flipped.
    pub fn with_corrupt_word(mut self, offset: u64) -> Self {
        self.corrupt.push(offset);
        self
    }

    pub fn chip(&self) -> &DramGeometry {
        &self.chip
    }

    /// Every mode-register command issued, MR_WR stripped.
    pub fn mr_log(&self) -> &[MrCommand] {
        &self.mr_log
    }

    /// Rank 0 read calibration passes started.
    pub fn read_calibrations(&self) -> u32 {
        self.read_calibrations
    }

    /// Geometries programmed at each PHY init request, oldest first.
    pub fn configured(&self) -> &[DramGeometry] {
        &self.configured
    }

    fn reg(&self, addr: u64) -> u32 {
        self.regs.get(&addr).copied().unwrap_or(0)
    }

    /// Decodes MSTR and the address map back into a geometry.
    pub fn configured_geometry(&self) -> DramGeometry {
        let mstr = InMemoryRegister::<u32, MSTR::Register>::new(self.reg(ctl::MSTR));
        let full_width = mstr.read(MSTR::DATA_BUS_WIDTH) == 0;
        let rank_bits = mstr.read(MSTR::ACTIVE_RANKS).count_ones().max(1).ilog2() as u8;

        let map = |n: u64| self.reg(ctl::addrmap(n));
        let count = |word: u32, bytes: &[u32], off: u32| {
            bytes.iter().filter(|&&b| (word >> (8 * b)) & 0xff != off).count() as u8
        };

        let bank_groups = count(map(8), &[0, 1], 0x3f);
        let banks = count(map(1), &[0, 1, 2], 0x3f);
        let cols = 8 + count(map(3), &[2, 3], 0x1f) + count(map(4), &[0, 1], 0x1f);
        let rows = 14 + count(map(6), &[2, 3], 0x0f) + count(map(7), &[0, 1], 0x0f);

        DramGeometry {
            rank_bits,
            full_width,
            cols: cols + u8::from(!full_width),
            rows,
            banks,
            bank_groups,
        }
    }

    fn train(&mut self) {
        let cfg = self.configured_geometry();
        let rank = (self.reg(phy::TRAINING) >> 4) & 0x3;

        let mut ok = self.chip.full_width || !cfg.full_width;
        match rank {
            2 => {
                self.read_calibrations += 1;
                if self.read_failures > 0 {
                    self.read_failures -= 1;
                    ok = false;
                }
            }
            1 => ok &= self.chip.rank_bits >= 1,
            _ => {}
        }

        trace!("sim: read calibration rank pass {} on {}: {}", rank, cfg, ok);
        self.regs
            .insert(phy::TRAINING_STATUS, if ok { TRAINING_DONE } else { phy::TRAINING_ERROR });
    }

    /// Byte offset into the chip for byte offset `offset` into the
    /// configured geometry.
    fn locate(&self, offset: u64) -> u64 {
        let cfg = self.configured.last().copied().unwrap_or(self.chip);
        let offset = offset & (cfg.size() - 1);

        let field = |shift: u32, bits: u8| (offset >> shift) & ((1u64 << bits) - 1);
        let fields = [
            (field(0, cfg.bus_bits() as u8), self.chip.bus_bits() as u8, 0),
            (field(cfg.col_shift(), cfg.cols), self.chip.cols, self.chip.col_shift()),
            (
                field(cfg.bank_group_shift(), cfg.bank_groups),
                self.chip.bank_groups,
                self.chip.bank_group_shift(),
            ),
            (field(cfg.bank_shift(), cfg.banks), self.chip.banks, self.chip.bank_shift()),
            (field(cfg.row_shift(), cfg.rows), self.chip.rows, self.chip.row_shift()),
            (field(cfg.rank_shift(), cfg.rank_bits), self.chip.rank_bits, self.chip.rank_shift()),
        ];

        fields
            .into_iter()
            .map(|(value, bits, shift)| (value & ((1u64 << bits) - 1)) << shift)
            .fold(0, |acc, part| acc | part)
    }
}

impl RegisterFile for SimBoard {
    fn read32(&mut self, addr: u64) -> u32 {
        if addr >= SDRAM_BASE {
            let cell = self.locate(addr - SDRAM_BASE);
            let v = self.memory.get(&cell).copied().unwrap_or(0);
            return if self.corrupt.contains(&cell) { v ^ 1 } else { v };
        }

        let v = self.reg(addr);
        match addr {
            ccm::PLL5_CFG if self.pll_locks => v | 1 << PLL_DDR::LOCK.shift,
            ctl::SWSTAT | ctl::DFISTAT => v | 1,
            ctl::STATR => 1,
            phy::PLL_STATUS => v | phy::PLL_READY,
            _ => v,
        }
    }

    fn write32(&mut self, addr: u64, v: u32) {
        if addr >= SDRAM_BASE {
            let cell = self.locate(addr - SDRAM_BASE);
            self.memory.insert(cell, v);
            return;
        }

        let old = self.reg(addr);

        match addr {
            ctl::MRCTRL0 if v & MR_WR != 0 => {
                let cmd = MrCommand {
                    ctrl0: v & !MR_WR,
                    ctrl1: self.reg(ctl::MRCTRL1),
                };
                trace!("sim: {:x?}", cmd);
                self.mr_log.push(cmd);
                self.regs.insert(addr, v & !MR_WR);
            }
            phy::TRAINING => {
                self.regs.insert(addr, v);
                if old & 1 == 0 && v & 1 != 0 {
                    self.train();
                }
            }
            ctl::DFIMISC => {
                self.regs.insert(addr, v);
                if old & PHY_INIT_REQUEST == 0 && v & PHY_INIT_REQUEST != 0 {
                    let cfg = self.configured_geometry();
                    trace!("sim: phy init with {}", cfg);
                    self.configured.push(cfg);
                }
            }
            _ => {
                self.regs.insert(addr, v);
            }
        }
    }
}

/// Delay that only counts.
#[derive(Debug, Default)]
pub struct SimDelay {
    pub elapsed_ns: u64,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{address_map, master_config};
    use crate::param::DramType;

    fn program(board: &mut SimBoard, g: &DramGeometry) {
        board.write32(ctl::MSTR, master_config(DramType::Ddr4, g));
        for (n, v) in address_map(g).unwrap().iter().enumerate() {
            board.write32(ctl::addrmap(n as u64), *v);
        }
    }

    #[test]
    fn address_map_decodes_back() {
        let mut board = SimBoard::new(DramGeometry {
            rank_bits: 0,
            full_width: true,
            cols: 10,
            rows: 16,
            banks: 2,
            bank_groups: 1,
        });

        for g in [
            DramGeometry { rank_bits: 1, full_width: true, cols: 10, rows: 15, banks: 2, bank_groups: 1 },
            DramGeometry { rank_bits: 0, full_width: false, cols: 11, rows: 17, banks: 3, bank_groups: 0 },
            DramGeometry { rank_bits: 1, full_width: false, cols: 9, rows: 14, banks: 0, bank_groups: 0 },
            DramGeometry { rank_bits: 0, full_width: true, cols: 12, rows: 18, banks: 3, bank_groups: 2 },
        ] {
            program(&mut board, &g);
            assert_eq!(board.configured_geometry(), g);
        }
    }

    #[test]
    fn missing_row_line_wraps() {
        let chip = DramGeometry {
            rank_bits: 0,
            full_width: true,
            cols: 10,
            rows: 15,
            banks: 3,
            bank_groups: 0,
        };
        let mut board = SimBoard::new(chip);
        let wide = DramGeometry { rows: 16, ..chip };
        program(&mut board, &wide);
        board.write32(ctl::DFIMISC, PHY_INIT_REQUEST);

        board.write32(SDRAM_BASE, 1);
        board.write32(SDRAM_BASE + (1 << (wide.rank_shift() - 1)), 2);
        assert_eq!(board.read32(SDRAM_BASE), 2);

        board.write32(SDRAM_BASE + (1 << (wide.rank_shift() - 2)), 3);
        assert_eq!(board.read32(SDRAM_BASE), 2);
    }

    #[test]
    fn status_bits_read_ready() {
        let mut board = SimBoard::new(DramGeometry {
            rank_bits: 0,
            full_width: true,
            cols: 10,
            rows: 14,
            banks: 3,
            bank_groups: 0,
        });
        assert_ne!(board.read32(ccm::PLL5_CFG) & 1 << 28, 0);
        assert_eq!(board.read32(ctl::STATR), 1);

        let mut stuck = SimBoard::new(*board.chip()).with_stuck_pll();
        assert_eq!(stuck.read32(ccm::PLL5_CFG) & 1 << 28, 0);
    }
}
