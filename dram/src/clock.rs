use embedded_hal::delay::DelayNs;
use tock_registers::{
    interfaces::{ReadWriteable, Readable},
    registers::InMemoryRegister,
};

use crate::{
    Controller,
    error::{DramError, Phase},
    mmio::RegisterFile,
    regs::{PLL_DDR, ccm},
};

/// PLL_DDR input clock.
const HOSC_MHZ: u32 = 24;

/// Multiplier that brings the PLL to twice `clk`, rounded down.
pub const fn pll_factor(clk: u32) -> u32 {
    clk * 2 / HOSC_MHZ
}

/// DRAM clock produced by `pll_factor(clk)`.
pub const fn achieved_clk(clk: u32) -> u32 {
    pll_factor(clk) * HOSC_MHZ / 2
}

impl<R: RegisterFile, D: DelayNs> Controller<R, D> {
    fn modify_pll(&mut self, f: tock_registers::fields::FieldValue<u32, PLL_DDR::Register>) {
        let pll = InMemoryRegister::<u32, PLL_DDR::Register>::new(self.regs.read32(ccm::PLL5_CFG));
        pll.modify(f);
        self.regs.write32(ccm::PLL5_CFG, pll.get());
    }

    /// Resets the DRAM clock domain and brings PLL_DDR up at `clk` MHz.
    /// Returns the clock actually achieved.
    pub(crate) fn clk_init(&mut self, clk: u32) -> Result<u32, DramError> {
        // Place all DRAM blocks into reset
        self.regs.clrbits(ccm::MBUS_CFG, ccm::MBUS_ENABLE);
        self.regs.clrbits(ccm::MBUS_CFG, ccm::MBUS_RESET);
        self.regs.clrbits(ccm::DRAM_GATE_RESET, ccm::GATE);
        self.regs.clrbits(ccm::DRAM_GATE_RESET, ccm::RESET);
        self.modify_pll(PLL_DDR::EN::CLEAR);
        self.regs.clrbits(ccm::DRAM_CLK_CFG, ccm::DRAM_MOD_RESET);
        self.delay.delay_us(5);

        let n = pll_factor(clk);
        self.modify_pll(PLL_DDR::N.val(n.saturating_sub(1)) + PLL_DDR::M.val(0) + PLL_DDR::EN::SET);
        self.modify_pll(PLL_DDR::SDM_EN::SET);
        self.modify_pll(PLL_DDR::M.val(0) + PLL_DDR::LOCK_EN::SET + PLL_DDR::EN::SET + PLL_DDR::LDO_EN::SET);
        self.modify_pll(PLL_DDR::M.val(0) + PLL_DDR::LDO_EN::CLEAR);

        let lock = 1 << PLL_DDR::LOCK.shift;
        self.wait(ccm::PLL5_CFG, lock, lock, Phase::PllLock)?;

        // Source PLL_DDR, M = 3
        self.regs.clrbits(ccm::DRAM_CLK_CFG, 1 << 24 | 1 << 25);
        self.regs.clrsetbits(ccm::DRAM_CLK_CFG, 0x1f, 1 << 1 | 1 << 0);
        self.regs.setbits(ccm::DRAM_CLK_CFG, ccm::DRAM_CLK_UPDATE);
        self.regs.setbits(ccm::DRAM_GATE_RESET, ccm::RESET);
        self.regs.setbits(ccm::DRAM_GATE_RESET, ccm::GATE);

        self.regs.setbits(ccm::MBUS_CFG, ccm::MBUS_RESET);
        self.regs.setbits(ccm::MBUS_CFG, ccm::MBUS_ENABLE);
        self.regs.setbits(ccm::DRAM_CLK_CFG, ccm::DRAM_MOD_RESET);
        self.delay.delay_us(5);

        let actual = achieved_clk(clk);
        log::debug!("PLL_DDR: N = {}, {} MHz requested, {} MHz achieved", n, clk, actual);

        Ok(actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divider_rounds_down() {
        assert_eq!(pll_factor(792), 66);
        assert_eq!(achieved_clk(792), 792);
        // 2 * 800 / 24 = 66.67
        assert_eq!(achieved_clk(800), 792);
        assert_eq!(achieved_clk(533), 528);
    }
}
