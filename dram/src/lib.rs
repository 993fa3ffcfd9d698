//! DRAM controller and PHY bring-up for Allwinner A133-class SoCs.
//!
//! The engine takes the memory subsystem out of reset, programs the DesignWare
//! uMCTL2 controller and the Allwinner PHY, runs DFI initialisation and read
//! calibration, and, when the board does not know its memory geometry,
//! discovers it by probing address aliasing. The only result a later boot
//! stage needs is the usable size, see [`init`].
//!
//! All hardware access goes through a [`RegisterFile`] and all waiting through
//! an [`embedded_hal::delay::DelayNs`], both injected by the caller.

#![cfg_attr(not(any(test, feature = "sim")), no_std)]

mod calibration;
mod clock;
pub mod controller;
mod detect;
mod dfi;
pub mod error;
pub mod geometry;
pub mod mmio;
pub mod param;
mod phy;
pub mod regs;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod size;
#[cfg(test)]
mod tests;
pub mod timing;

use embedded_hal::delay::DelayNs;
use log::{error, info};

pub use dfi::MrCommand;
pub use error::{DramError, Phase};
pub use geometry::DramGeometry;
pub use mmio::RegisterFile;
pub use param::{DramParameters, DramType};

use mmio::await_bits;
use timing::Timings;

/// Words written by the post-init self-test in each of its two windows.
pub const SELF_TEST_WORDS: u32 = 4096;

/// Knobs that change behaviour relative to the vendor firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitOptions {
    /// Upper bound on reads spent in any hardware poll. `None` waits forever.
    pub poll_limit: Option<u32>,
    /// Fail calibration when `tpr10` asks for write leveling, read training
    /// or write training. None of them is performed.
    pub require_training: bool,
}

impl InitOptions {
    pub const fn new() -> Self {
        Self {
            poll_limit: None,
            require_training: false,
        }
    }
}

impl Default for InitOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Last step the bring-up sequence reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerState {
    Reset,
    ClockEnabled,
    PhyInitRequested,
    DfiInitComplete,
    SelfRefreshExited,
    ModeRegistersWritten,
    RefreshEnabled,
    Calibrating,
    Calibrated,
    Failed(Phase),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationResult {
    Calibrated,
    Failed(Phase),
}

/// Outcome of a successful bring-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DramInfo {
    pub geometry: DramGeometry,
    pub size: u64,
    /// DRAM clock the PLL actually runs at.
    pub clk_mhz: u32,
}

pub struct Controller<R, D> {
    regs: R,
    delay: D,
    params: DramParameters,
    options: InitOptions,
    timings: Timings,
    state: SequencerState,
    clk_mhz: u32,
}

impl<R: RegisterFile, D: DelayNs> Controller<R, D> {
    /// Derives the timing set for `params` once; every re-init of this
    /// controller reuses it.
    pub fn new(regs: R, delay: D, mut params: DramParameters, options: InitOptions) -> Self {
        let timings = Timings::derive(params.kind, params.clk / 2, &params.timing);
        params.mode.apply_derived(timings.mr);

        Self {
            regs,
            delay,
            params,
            options,
            timings,
            state: SequencerState::Reset,
            clk_mhz: 0,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Full bring-up: detection if needed, final init, size and self-test.
    pub fn run(&mut self) -> Result<DramInfo, DramError> {
        self.prepare_sys_cfg();

        let geometry = match self.params.geometry {
            Some(geometry) => geometry,
            None => self.auto_detect()?,
        };

        self.attempt(&geometry, false)?;

        info!("{}", geometry);

        let size = size::calculate_size(&geometry);
        self.simple_wr_test(size, SELF_TEST_WORDS)?;

        Ok(DramInfo {
            geometry,
            size,
            clk_mhz: self.clk_mhz,
        })
    }

    /// One complete init attempt for `geometry`, from clock reset to the end
    /// of calibration.
    ///
    /// Hardware that does not answer or does not train yields
    /// `Ok(CalibrationResult::Failed)`; geometries the address map cannot
    /// express are an error and leave the hardware untouched.
    pub fn core_init(
        &mut self,
        geometry: &DramGeometry,
        force_read_calibration: bool,
    ) -> Result<CalibrationResult, DramError> {
        match self.attempt(geometry, force_read_calibration) {
            Ok(()) => Ok(CalibrationResult::Calibrated),
            Err(e) => match e.phase() {
                Some(phase) => Ok(CalibrationResult::Failed(phase)),
                None => Err(e),
            },
        }
    }

    fn attempt(&mut self, geometry: &DramGeometry, force_read_calibration: bool) -> Result<(), DramError> {
        let addrmap = controller::address_map(geometry)?;

        self.state = SequencerState::Reset;

        let result = self.try_core_init(geometry, &addrmap, force_read_calibration);
        if let Some(phase) = result.as_ref().err().and_then(DramError::phase) {
            self.state = SequencerState::Failed(phase);
        }

        result
    }

    fn try_core_init(
        &mut self,
        geometry: &DramGeometry,
        addrmap: &[u32; regs::ctl::ADDRMAP_COUNT],
        force_read_calibration: bool,
    ) -> Result<(), DramError> {
        self.clk_mhz = self.clk_init(self.params.clk)?;
        self.state = SequencerState::ClockEnabled;

        self.com_init(geometry, addrmap);
        self.phy_init(geometry)?;
        self.dfi_init()?;

        self.calibrate_phy(geometry, force_read_calibration)
    }

    fn prepare_sys_cfg(&mut self) {
        self.regs.setbits(regs::sys_cfg::RES_CAL_CTRL, 1 << 8);
        self.regs.clrbits(regs::sys_cfg::RES240_CTRL, 0x3f);
    }

    fn wait(&mut self, addr: u64, mask: u32, expected: u32, phase: Phase) -> Result<(), DramError> {
        if await_bits(&mut self.regs, addr, mask, expected, self.options.poll_limit) {
            Ok(())
        } else {
            Err(DramError::Timeout { phase })
        }
    }
}

/// Brings up DRAM and returns the detected size, or a typed error.
pub fn try_init<R, D>(
    regs: R,
    delay: D,
    params: DramParameters,
    options: InitOptions,
) -> Result<DramInfo, DramError>
where
    R: RegisterFile,
    D: DelayNs,
{
    Controller::new(regs, delay, params, options).run()
}

/// Brings up DRAM and returns its size in bytes, 0 on any failure.
pub fn init<R, D>(regs: R, delay: D, params: DramParameters, options: InitOptions) -> u64
where
    R: RegisterFile,
    D: DelayNs,
{
    match try_init(regs, delay, params, options) {
        Ok(info) => info.size,
        Err(e) => {
            error!("dram init failed: {}", e);
            0
        }
    }
}
