//! Boot stage that brings up DRAM.
//!
//! On the board this is a bare-metal image entered from `boot.S`. Built for a
//! hosted target it runs the same flow against the simulated board.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

mod board;
mod logger;
#[cfg(target_os = "none")]
mod panic;
#[cfg(target_os = "none")]
mod time;
#[cfg(target_os = "none")]
mod uart;

use log::{error, info};
use spin::Once;

#[cfg(target_os = "none")]
core::arch::global_asm!(include_str!("boot.S"));

static DRAM_SIZE: Once<u64> = Once::new();

/// Usable DRAM in bytes, 0 until [`publish`] ran or when init failed.
pub fn dram_size() -> u64 {
    DRAM_SIZE.get().copied().unwrap_or(0)
}

pub fn dram_base() -> u64 {
    sunxi_dram::regs::SDRAM_BASE
}

/// Records the init result. Returns false when there is no usable memory.
fn publish(size: u64) -> bool {
    DRAM_SIZE.call_once(|| size);

    if dram_size() == 0 {
        error!("no usable DRAM, halting");
        return false;
    }

    info!("DRAM: {} MiB at {:#x}", dram_size() >> 20, dram_base());
    true
}

#[cfg(target_os = "none")]
#[unsafe(no_mangle)]
pub extern "C" fn _main() -> ! {
    uart::init();
    logger::init();

    info!("DRAM: {:?} at {} MHz", board::KIND, board::CLK_MHZ);

    // The boot stage is the only user of the memory subsystem
    let regs = unsafe { sunxi_dram::mmio::Mmio::new() };
    let size = sunxi_dram::init(regs, time::GenericTimer, board::PARAMS, board::OPTIONS);

    publish(size);

    panic::halt()
}

#[cfg(not(target_os = "none"))]
fn main() -> std::process::ExitCode {
    use sunxi_dram::sim::{SimBoard, SimDelay};

    logger::init();

    info!("dry run: {:?} at {} MHz, simulated {}", board::KIND, board::CLK_MHZ, board::SIM_CHIP);

    let mut sim = SimBoard::new(board::SIM_CHIP);
    let mut delay = SimDelay::default();
    let size = sunxi_dram::init(&mut sim, &mut delay, board::PARAMS, board::OPTIONS);

    info!(
        "dry run: {} controller inits, {} us of delays",
        sim.configured().len(),
        delay.elapsed_ns / 1000
    );

    if publish(size) {
        std::process::ExitCode::SUCCESS
    } else {
        std::process::ExitCode::FAILURE
    }
}
