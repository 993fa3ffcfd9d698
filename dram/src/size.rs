use embedded_hal::delay::DelayNs;
use log::{debug, error};

use crate::{
    Controller,
    error::DramError,
    geometry::DramGeometry,
    mmio::RegisterFile,
    regs::SDRAM_BASE,
};

const PATTERN_LOW: u32 = 0x0123_4567;
const PATTERN_HIGH: u32 = 0x0123_4568;

/// Bytes addressable with `g`.
pub const fn calculate_size(g: &DramGeometry) -> u64 {
    g.size()
}

/// Word written at index `i` of the low and high self-test windows.
pub const fn test_patterns(i: u32) -> (u32, u32) {
    (i.wrapping_add(PATTERN_LOW), i.wrapping_sub(PATTERN_HIGH))
}

impl<R: RegisterFile, D: DelayNs> Controller<R, D> {
    /// Writes `words` words at the base of DRAM and as many at half its size,
    /// then reads both windows back.
    pub(crate) fn simple_wr_test(&mut self, size: u64, words: u32) -> Result<(), DramError> {
        let high = SDRAM_BASE + size / 2;

        for i in 0..words {
            let off = 4 * u64::from(i);
            let (lo, hi) = test_patterns(i);
            self.regs.write32(SDRAM_BASE + off, lo);
            self.regs.write32(high + off, hi);
        }

        for i in 0..words {
            let off = 4 * u64::from(i);
            let (lo, hi) = test_patterns(i);

            for (addr, expected) in [(SDRAM_BASE + off, lo), (high + off, hi)] {
                let found = self.regs.read32(addr);
                if found != expected {
                    error!("dram simple test failed at {:#x}", addr);
                    return Err(DramError::SelfTestFailed { addr, expected, found });
                }
            }
        }

        debug!("dram simple test OK");
        Ok(())
    }
}
