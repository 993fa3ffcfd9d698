use aarch64_cpu::{asm::barrier, registers::*};
use embedded_hal::delay::DelayNs;

const NS_PER_S: u64 = 1_000_000_000;

/// Used when nothing before us programmed CNTFRQ_EL0. The A133 counter runs
/// off the 24 MHz oscillator.
const FALLBACK_HZ: u64 = 24_000_000;

/// Busy-waits on the ARMv8 generic timer.
pub struct GenericTimer;

impl GenericTimer {
    fn ticks() -> u64 {
        barrier::isb(barrier::SY);
        CNTPCT_EL0.get()
    }

    fn frequency() -> u64 {
        match CNTFRQ_EL0.get() {
            0 => FALLBACK_HZ,
            hz => hz,
        }
    }
}

impl DelayNs for GenericTimer {
    fn delay_ns(&mut self, ns: u32) {
        let ticks = (Self::frequency() * u64::from(ns)).div_ceil(NS_PER_S);
        let start = Self::ticks();

        while Self::ticks().wrapping_sub(start) < ticks {
            core::hint::spin_loop();
        }
    }
}
