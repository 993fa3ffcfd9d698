use core::panic::PanicInfo;

/// Stops this core for good.
pub fn halt() -> ! {
    loop {
        aarch64_cpu::asm::wfe();
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    log::error!("panic in bootloader: {}", info);
    halt()
}
