//! DFI initialisation handshake and mode-register programming.

use embedded_hal::delay::DelayNs;
use log::trace;
use tock_registers::{
    interfaces::{ReadWriteable, Readable, Writeable},
    registers::InMemoryRegister,
};

use crate::{
    Controller, SequencerState,
    error::{DramError, Phase},
    mmio::RegisterFile,
    param::DramType,
    regs::{MRCTRL0, MRCTRL1, com, ctl, phy},
};

/// MR6 bit that opens the DDR4 VrefDQ training window.
const MR6_VREFDQ_TRAINING: u32 = 1 << 7;

/// One mode-register command: MRCTRL0 and MRCTRL1 words, without MR_WR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MrCommand {
    pub ctrl0: u32,
    pub ctrl1: u32,
}

impl MrCommand {
    /// DDR3/DDR4: the address goes to MRCTRL0, the data fills MRCTRL1.
    fn ddr(mr: u32, data: u32) -> Self {
        let ctrl0 = InMemoryRegister::<u32, MRCTRL0::Register>::new(0);
        ctrl0.write(MRCTRL0::MR_ADDR.val(mr));

        Self {
            ctrl0: ctrl0.get(),
            ctrl1: data & 0x3ffff,
        }
    }

    /// LPDDR3/LPDDR4: address and data both travel in MRCTRL1.
    fn lpddr(kind: DramType, mr: u32, data: u32) -> Self {
        let ctrl0 = InMemoryRegister::<u32, MRCTRL0::Register>::new(0);
        if kind == DramType::Lpddr3 {
            ctrl0.write(MRCTRL0::LP3_CMD.val(3));
        }

        let ctrl1 = InMemoryRegister::<u32, MRCTRL1::Register>::new(0);
        ctrl1.write(MRCTRL1::MR_ADDR.val(mr) + MRCTRL1::MR_DATA.val(data & 0xff));

        Self {
            ctrl0: ctrl0.get(),
            ctrl1: ctrl1.get(),
        }
    }
}

/// Longest sequence any type needs.
const MAX_MR_COMMANDS: usize = 10;

impl<R: RegisterFile, D: DelayNs> Controller<R, D> {
    /// Opens the quasi-dynamic programming window, applies `f` and waits for
    /// the controller to acknowledge.
    pub(crate) fn quasi_dynamic(&mut self, phase: Phase, f: impl FnOnce(&mut R)) -> Result<(), DramError> {
        self.regs.write32(ctl::SWCTL, 0);
        f(&mut self.regs);
        self.regs.write32(ctl::SWCTL, 1);
        self.wait(ctl::SWSTAT, 1, 1, phase)
    }

    pub(crate) fn dfi_init(&mut self) -> Result<(), DramError> {
        self.regs.setbits(com::MAER0, 1 << 8);

        // Enable dfi_init_complete and request PHY init
        self.quasi_dynamic(Phase::DfiInit, |regs| {
            regs.setbits(ctl::DFIMISC, 1 << 0);
            regs.setbits(ctl::DFIMISC, 1 << 5);
        })?;
        self.state = SequencerState::PhyInitRequested;

        self.quasi_dynamic(Phase::DfiInit, |regs| regs.clrbits(ctl::DFIMISC, 1 << 5))?;
        self.wait(ctl::DFISTAT, 1, 1, Phase::DfiInit)?;
        self.state = SequencerState::DfiInitComplete;

        // Software exit from self refresh
        self.quasi_dynamic(Phase::DfiInit, |regs| regs.clrbits(ctl::PWRCTL, 1 << 5))?;
        self.wait(ctl::STATR, 0x3, 1, Phase::DfiInit)?;
        self.state = SequencerState::SelfRefreshExited;

        self.delay.delay_us(200);

        self.quasi_dynamic(Phase::DfiInit, |regs| regs.clrbits(ctl::DFIMISC, 1 << 0))?;

        for cmd in self.mode_register_sequence().into_iter().flatten() {
            self.write_mr(cmd)?;
        }
        self.state = SequencerState::ModeRegistersWritten;

        self.regs.write32(phy::DELAY_CTRL, 0);

        // Refresh back on. The vendor sequence does not wait for SWSTAT here.
        self.regs.write32(ctl::SWCTL, 0);
        self.regs.clrbits(ctl::RFSHCTL3, 1 << 0);
        self.regs.write32(ctl::SWCTL, 1);
        self.state = SequencerState::RefreshEnabled;

        Ok(())
    }

    /// Mode-register commands for the configured type, in issue order.
    pub fn mode_register_sequence(&self) -> [Option<MrCommand>; MAX_MR_COMMANDS] {
        let kind = self.params.kind;
        let m = &self.params.mode;
        let mut seq = [None; MAX_MR_COMMANDS];
        let mut n = 0;
        let mut push = |cmd: MrCommand| {
            seq[n] = Some(cmd);
            n += 1;
        };

        match kind {
            DramType::Ddr3 => {
                for (mr, data) in [(0, m.mr0), (1, m.mr1), (2, m.mr2), (3, m.mr3)] {
                    push(MrCommand::ddr(mr, data));
                }
            }
            DramType::Ddr4 => {
                for (mr, data) in [(0, m.mr0), (1, m.mr1), (2, m.mr2), (3, m.mr3), (4, m.mr4), (5, m.mr5)] {
                    push(MrCommand::ddr(mr, data));
                }
                push(MrCommand::ddr(6, m.mr6 | MR6_VREFDQ_TRAINING));
                push(MrCommand::ddr(6, m.mr6 | MR6_VREFDQ_TRAINING));
                push(MrCommand::ddr(6, m.mr6 & !MR6_VREFDQ_TRAINING));
            }
            DramType::Lpddr3 => {
                for (mr, data) in [(1, m.mr1), (2, m.mr2), (3, m.mr3), (11, m.mr11)] {
                    push(MrCommand::lpddr(kind, mr, data));
                }
            }
            DramType::Lpddr4 => {
                for (mr, data) in [
                    (0, m.mr0),
                    (1, m.mr1),
                    (2, m.mr2),
                    (3, m.mr3),
                    (4, m.mr4),
                    (11, m.mr11),
                    (12, m.mr12),
                    (13, m.mr13),
                    (14, m.mr14),
                    (22, m.mr22),
                ] {
                    push(MrCommand::lpddr(kind, mr, data));
                }
            }
        }

        seq
    }

    fn write_mr(&mut self, cmd: MrCommand) -> Result<(), DramError> {
        let ctrl0 = InMemoryRegister::<u32, MRCTRL0::Register>::new(cmd.ctrl0);
        ctrl0.modify(MRCTRL0::MR_WR::SET + MRCTRL0::MR_RANK::All);

        trace!("MR write: mrctrl0 = {:#010x}, mrctrl1 = {:#010x}", ctrl0.get(), cmd.ctrl1);

        self.regs.write32(ctl::MRCTRL1, cmd.ctrl1);
        self.regs.write32(ctl::MRCTRL0, ctrl0.get());
        self.wait(ctl::MRCTRL0, 1 << 31, 0, Phase::DfiInit)
    }
}
