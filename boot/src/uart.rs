use core::fmt;

use sunxi_dram::mmio::{Mmio, Reg32, RegisterFile};

const CCU_BASE: u64 = 0x0300_1000;
const CCU_UART_BGR_REG: u64 = 0x090c;

const UART0_BASE: u64 = 0x0500_0000;
const UART_THR: u64 = 0x00;
const UART_DLL: u64 = 0x00;
const UART_DLH: u64 = 0x04;
const UART_FCR: u64 = 0x08;
const UART_LCR: u64 = 0x0c;
const UART_USR: u64 = 0x7c;
const UART_HALT: u64 = 0xa4;

const GPIO_BASE: u64 = 0x0300_b000;
const GPIO_PB_CFG1: u64 = 0x0028;
const GPIO_PB_PULL0: u64 = 0x0040;

fn mmio() -> Mmio {
    // Single core, nothing else touches the UART, CCU or pin controller
    unsafe { Mmio::new() }
}

/// UART0 on PB9/PB10, 115200 8N1 from the 24 MHz APB clock.
pub fn init() {
    let regs = &mut mmio();

    Reg32::read(regs, CCU_BASE + CCU_UART_BGR_REG)
        .set_bit::<0>(true) // UART0 gating
        .set_bit::<16>(true) // UART0 reset deassert
        .write(regs);

    Reg32::read(regs, GPIO_BASE + GPIO_PB_CFG1)
        .set_field::<4, 4>(0b0010) // PB9 = UART0-TX
        .set_field::<8, 4>(0b0010) // PB10 = UART0-RX
        .write(regs);

    Reg32::read(regs, GPIO_BASE + GPIO_PB_PULL0)
        .set_field::<18, 2>(1) // PB9 pull-up
        .set_field::<20, 2>(1) // PB10 pull-up
        .write(regs);

    Reg32::read(regs, UART0_BASE + UART_FCR).set_bit::<0>(true).write(regs);
    Reg32::read(regs, UART0_BASE + UART_HALT).set_bit::<0>(true).write(regs);

    // Divisor latch: 24 MHz / (16 * 13) = 115200
    Reg32::read(regs, UART0_BASE + UART_LCR).set_bit::<7>(true).write(regs);
    Reg32::zero(UART0_BASE + UART_DLL).set_field::<0, 8>(13).write(regs);
    Reg32::zero(UART0_BASE + UART_DLH).write(regs);
    Reg32::read(regs, UART0_BASE + UART_LCR).set_bit::<7>(false).write(regs);

    Reg32::read(regs, UART0_BASE + UART_HALT).set_bit::<0>(false).write(regs);

    Reg32::read(regs, UART0_BASE + UART_LCR)
        .set_field::<0, 2>(0b11) // 8 data bits
        .set_bit::<2>(false) // 1 stop bit
        .set_bit::<3>(false) // no parity
        .write(regs);

    Reg32::read(regs, UART0_BASE + UART_FCR)
        .set_bit::<0>(true) // FIFO enable
        .set_bit::<1>(true) // reset RX FIFO
        .set_bit::<2>(true) // reset TX FIFO
        .write(regs);
}

pub fn write_byte(b: u8) {
    let regs = &mut mmio();

    // Wait for room in the TX FIFO
    while !Reg32::read(regs, UART0_BASE + UART_USR).is_bit_set::<1>() {
        core::hint::spin_loop();
    }

    regs.write32(UART0_BASE + UART_THR, u32::from(b));
}

/// `core::fmt` sink on UART0. Newlines go out as CR LF.
pub struct Uart;

impl fmt::Write for Uart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            if b == b'\n' {
                write_byte(b'\r');
            }
            write_byte(b);
        }
        Ok(())
    }
}
