//! Geometry discovery.
//!
//! Every probe programs a candidate geometry, re-runs the whole bring-up and
//! then checks which address line wraps around onto the base of DRAM.

use core::ops::Range;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::{
    CalibrationResult, Controller,
    error::DramError,
    geometry::DramGeometry,
    mmio::RegisterFile,
    regs::SDRAM_BASE,
};

const PROBE_PATTERN: u32 = 0xaa55_aa55;

/// `(rank_bits, full_width)` candidates, most capable first.
pub const RANK_WIDTH_ORDER: [(u8, bool); 4] = [(1, true), (1, false), (0, true), (0, false)];

impl<R: RegisterFile, D: DelayNs> Controller<R, D> {
    /// Finds rank count, bus width, then rows, columns, banks and bank groups.
    pub fn auto_detect(&mut self) -> Result<DramGeometry, DramError> {
        let mut g = self.detect_ranks()?;
        self.detect_size(&mut g)?;
        Ok(g)
    }

    /// Tries every rank/width pair in [`RANK_WIDTH_ORDER`] until one trains.
    pub fn detect_ranks(&mut self) -> Result<DramGeometry, DramError> {
        for (rank_bits, full_width) in RANK_WIDTH_ORDER {
            let g = DramGeometry {
                rank_bits,
                full_width,
                cols: 9,
                rows: 14,
                banks: 0,
                bank_groups: 0,
            };

            debug!(
                "testing ranks = {}, {}-bit bus",
                rank_bits,
                if full_width { 32 } else { 16 }
            );

            if self.core_init(&g, true)? == CalibrationResult::Calibrated {
                info!("found ranks = {}, full_width = {}", rank_bits, full_width);
                return Ok(g);
            }
        }

        Err(DramError::DetectionExhausted)
    }

    fn detect_size(&mut self, g: &mut DramGeometry) -> Result<(), DramError> {
        let half = u8::from(!g.full_width);

        // Rows, with the narrowest column and bank layout below them
        g.cols = 8 + half;
        g.rows = 18;
        g.banks = 0;
        g.bank_groups = 0;
        self.reinit(g)?;
        g.rows = self.first_alias(g.row_shift(), 14..18).unwrap_or(18);

        g.cols = 12 + half;
        self.reinit(g)?;
        g.cols = self.first_alias(g.col_shift(), 8 + half..12 + half).unwrap_or(12 + half);

        g.banks = 3;
        self.reinit(g)?;
        g.banks = self.first_alias(g.bank_shift(), 0..3).unwrap_or(3);

        if self.params.kind.has_bank_groups() {
            g.bank_groups = 2;
            self.reinit(g)?;
            g.bank_groups = self.first_alias(g.bank_group_shift(), 0..2).unwrap_or(2);
        }

        info!("found {}", g);

        Ok(())
    }

    /// Re-runs bring-up for the next probe. A failed attempt is only logged:
    /// the aliasing test that follows decides.
    fn reinit(&mut self, g: &DramGeometry) -> Result<(), DramError> {
        if let CalibrationResult::Failed(phase) = self.core_init(g, false)? {
            warn!("re-init with {} failed during {:?}", g, phase);
        }
        Ok(())
    }

    /// First bit count in `bits` whose top address line, at `shift`, wraps
    /// back onto the base of DRAM.
    fn first_alias(&mut self, shift: u32, mut bits: Range<u8>) -> Option<u8> {
        bits.find(|&n| self.mem_matches(1 << (shift + n as u32)))
    }

    /// Whether `SDRAM_BASE + offset` is the same cell as `SDRAM_BASE`.
    pub(crate) fn mem_matches(&mut self, offset: u64) -> bool {
        self.regs.write32(SDRAM_BASE, 0);
        self.regs.write32(SDRAM_BASE + offset, PROBE_PATTERN);

        self.regs.read32(SDRAM_BASE) == PROBE_PATTERN
    }
}
