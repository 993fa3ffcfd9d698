//! Read calibration and DX bit-delay compensation.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::{
    Controller, SequencerState,
    error::{DramError, Phase},
    geometry::DramGeometry,
    mmio::RegisterFile,
    param::{DramType, Tpr10},
    regs::{ctl, phy},
};

pub const READ_CALIBRATION_ATTEMPTS: u32 = 5;

/// Rank select values for PHY+8 [5:4].
const RANK0_PASS: u32 = 0x20;
const RANK1_PASS: u32 = 0x10;

/// Per-lane DX delay block: the first of nine registers spaced 8 bytes apart,
/// and the four extra registers fed from the second word.
struct DxLane {
    first: u64,
    extra: [u64; 4],
}

/// Lanes fed from `tpr11` and `para0`.
const DX_LANES_TPR11: [DxLane; 4] = [
    DxLane { first: 0x484, extra: [0x4d0, 0x590, 0x4cc, 0x58c] },
    DxLane { first: 0x4d8, extra: [0x524, 0x5e4, 0x520, 0x5e0] },
    DxLane { first: 0x604, extra: [0x650, 0x710, 0x64c, 0x70c] },
    DxLane { first: 0x658, extra: [0x6a4, 0x764, 0x6a0, 0x760] },
];

/// Lanes fed from `tpr12` and `tpr14`.
const DX_LANES_TPR12: [DxLane; 4] = [
    DxLane { first: 0x480, extra: [0x528, 0x5e8, 0x4c8, 0x588] },
    DxLane { first: 0x4d4, extra: [0x52c, 0x5ec, 0x51c, 0x5dc] },
    DxLane { first: 0x600, extra: [0x6a8, 0x768, 0x648, 0x708] },
    DxLane { first: 0x654, extra: [0x6ac, 0x76c, 0x69c, 0x75c] },
];

impl<R: RegisterFile, D: DelayNs> Controller<R, D> {
    pub(crate) fn calibrate_phy(&mut self, g: &DramGeometry, force_read: bool) -> Result<(), DramError> {
        self.state = SequencerState::Calibrating;

        let tpr10 = self.params.tpr10();

        if force_read || tpr10.contains(Tpr10::READ_CALIBRATION) {
            let passed = (0..READ_CALIBRATION_ATTEMPTS).any(|attempt| {
                let ok = self.read_calibration(g);
                if !ok {
                    debug!("read calibration attempt {} failed", attempt + 1);
                }
                ok
            });

            if !passed {
                return Err(DramError::CalibrationFailed {
                    phase: Phase::ReadCalibration,
                });
            }
        }

        let untrained = tpr10 & Tpr10::UNSUPPORTED_TRAINING;
        if !untrained.is_empty() {
            if self.options.require_training {
                let phase = if untrained.intersects(Tpr10::WRITE_LEVELING | Tpr10::WRITE_TRAINING) {
                    Phase::WriteCalibration
                } else {
                    Phase::ReadCalibration
                };
                return Err(DramError::CalibrationFailed { phase });
            }
            warn!("{:?} requested but not supported, continuing untrained", untrained);
        }

        self.dx_bit_delay_compensation();
        self.regs.clrbits(phy::DX_DELAY_CTRL, 1 << 0);
        self.regs.clrbits(phy::DELAY_CTRL, 0x7);

        self.quasi_dynamic(Phase::DfiInit, |regs| regs.clrbits(ctl::RFSHCTL3, 1 << 1))?;

        self.state = SequencerState::Calibrated;
        Ok(())
    }

    /// Waits for the lanes in `done` to finish training. Returns false on the
    /// error bit or when the poll limit runs out.
    fn await_training(&mut self, done: u32) -> bool {
        let mut reads = 0u32;

        loop {
            let status = self.regs.read32(phy::TRAINING_STATUS);
            if status & done == done {
                return true;
            }
            if status & phy::TRAINING_ERROR != 0 {
                return false;
            }

            reads = reads.saturating_add(1);
            if self.options.poll_limit.is_some_and(|limit| reads >= limit) {
                return false;
            }

            core::hint::spin_loop();
        }
    }

    /// One read calibration pass over every configured rank.
    fn read_calibration(&mut self, g: &DramGeometry) -> bool {
        let done = if g.full_width { 0xf } else { 0x3 };
        let mut result = true;

        self.regs.clrsetbits(phy::TRAINING, 0x30, RANK0_PASS);
        self.regs.setbits(phy::TRAINING, 1);
        result &= self.await_training(done);
        self.regs.clrbits(phy::TRAINING, 1);
        self.regs.clrbits(phy::TRAINING, 0x30);

        if g.rank_bits >= 1 {
            self.regs.clrsetbits(phy::TRAINING, 0x30, RANK1_PASS);
            self.regs.setbits(phy::TRAINING, 1);
            result &= self.await_training(done);
            self.regs.clrbits(phy::TRAINING, 1);
        }

        self.regs.clrbits(phy::TRAINING, 0x30);

        let mut latency = 0u32;
        for lane in phy::LANE_READ_DELAYS {
            latency = latency.max(self.regs.read32(lane) & 0x7);
        }
        self.regs.clrsetbits(phy::READ_LATENCY, 0x7, (latency + 2) & 0x7);

        self.regs.setbits(phy::TYPE_CTRL, 0x20);

        result
    }

    fn write_dx_lane(&mut self, lane: &DxLane, delay: u32, extra: u32) {
        for i in 0..9 {
            let addr = phy::BASE + lane.first + 8 * i;
            self.regs.write32(addr, delay);
            self.regs.write32(addr + 0xc0, delay);
        }

        for addr in lane.extra {
            self.regs.write32(phy::BASE + addr, extra);
        }
    }

    fn dx_bit_delay_compensation(&mut self) {
        let p = self.params;
        let tpr10 = p.tpr10();

        if tpr10.contains(Tpr10::DX_BIT_DELAY1) {
            self.regs.clrbits(phy::DX_DELAY_CTRL, 1);
            self.regs.setbits(phy::TRAINING, 8);
            self.regs.clrbits(phy::DELAY_STATUS, 0x10);

            if p.kind == DramType::Lpddr4 {
                self.regs.clrbits(phy::TYPE_CTRL, 0x80);
            }

            for (n, lane) in DX_LANES_TPR11.iter().enumerate() {
                let shift = 8 * n;
                self.write_dx_lane(lane, (p.tpr11 >> shift) & 0x3f, (p.para0 >> shift) & 0x3f);
            }

            self.regs.setbits(phy::DX_DELAY_CTRL, 1);
        }

        if tpr10.contains(Tpr10::DX_BIT_DELAY0) {
            self.regs.clrbits(phy::DELAY_CTRL, 0x80);
            self.regs.clrbits(phy::DELAY_STATUS, 4);

            for (n, lane) in DX_LANES_TPR12.iter().enumerate() {
                let shift = 8 * n;
                self.write_dx_lane(lane, (p.tpr12 >> shift) & 0x3f, (p.tpr14 >> shift) & 0x3f);
            }
        }

        self.regs.setbits(phy::DELAY_CTRL, 0x80);
    }
}
