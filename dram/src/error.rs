use thiserror::Error;

/// Step of the bring-up sequence a failure is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    PllLock,
    DfiInit,
    ReadCalibration,
    WriteCalibration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DramError {
    #[error("unsupported dram configuration (col_bits = {0})")]
    UnsupportedColumns(u8),
    #[error("unsupported dram configuration (row_bits = {0})")]
    UnsupportedRows(u8),
    #[error("unsupported dram configuration (bank_bits = {0})")]
    UnsupportedBanks(u8),
    #[error("unsupported dram configuration (bankgrp_bits = {0})")]
    UnsupportedBankGroups(u8),
    #[error("unsupported dram configuration (rank_bits = {0})")]
    UnsupportedRanks(u8),
    #[error("timed out waiting for hardware during {phase:?}")]
    Timeout { phase: Phase },
    #[error("calibration failed during {phase:?}")]
    CalibrationFailed { phase: Phase },
    #[error("no rank/width combination trained")]
    DetectionExhausted,
    #[error("self-test mismatch at 0x{addr:x}: wrote 0x{expected:08x}, read 0x{found:08x}")]
    SelfTestFailed { addr: u64, expected: u32, found: u32 },
}

impl DramError {
    /// Bring-up step a hardware failure is attributed to.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            DramError::Timeout { phase } | DramError::CalibrationFailed { phase } => Some(*phase),
            _ => None,
        }
    }

    /// Board-configuration mismatches that no amount of retrying can fix.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DramError::UnsupportedColumns(_)
                | DramError::UnsupportedRows(_)
                | DramError::UnsupportedBanks(_)
                | DramError::UnsupportedBankGroups(_)
                | DramError::UnsupportedRanks(_)
        )
    }
}
