//! Register access.
//!
//! Everything the engine does to hardware goes through [`RegisterFile`], so the
//! same sequences run against real MMIO on the board and against the simulator
//! in tests.

pub unsafe fn write32(addr: u64, v: u32) {
    let p = addr as *mut u32;
    unsafe { core::ptr::write_volatile(p, v) };
}

pub unsafe fn read32(addr: u64) -> u32 {
    let p = addr as *const u32;
    unsafe { core::ptr::read_volatile(p) }
}

/// A 32-bit memory-mapped register space.
pub trait RegisterFile {
    fn read32(&mut self, addr: u64) -> u32;

    fn write32(&mut self, addr: u64, v: u32);

    fn setbits(&mut self, addr: u64, set: u32) {
        self.clrsetbits(addr, 0, set)
    }

    fn clrbits(&mut self, addr: u64, clr: u32) {
        self.clrsetbits(addr, clr, 0)
    }

    fn clrsetbits(&mut self, addr: u64, clr: u32, set: u32) {
        let mut v = self.read32(addr);
        v &= !clr;
        v |= set;
        self.write32(addr, v);
    }
}

impl<R: RegisterFile + ?Sized> RegisterFile for &mut R {
    fn read32(&mut self, addr: u64) -> u32 {
        (**self).read32(addr)
    }

    fn write32(&mut self, addr: u64, v: u32) {
        (**self).write32(addr, v)
    }
}

/// Busy-polls `addr` until `(value & mask) == expected`.
///
/// With `limit == None` the loop never gives up. Returns `false` once `limit`
/// reads have been spent without a match.
pub fn await_bits<R: RegisterFile + ?Sized>(
    regs: &mut R,
    addr: u64,
    mask: u32,
    expected: u32,
    limit: Option<u32>,
) -> bool {
    let mut reads = 0u32;

    loop {
        if regs.read32(addr) & mask == expected {
            return true;
        }

        reads = reads.saturating_add(1);
        if limit.is_some_and(|limit| reads >= limit) {
            return false;
        }

        core::hint::spin_loop();
    }
}

/// Volatile access to the physical address space.
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// # Safety
    ///
    /// The caller must be the only user of the DRAM controller, PHY and clock
    /// blocks, and those must be mapped as device memory at their physical
    /// addresses.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterFile for Mmio {
    fn read32(&mut self, addr: u64) -> u32 {
        unsafe { read32(addr) }
    }

    fn write32(&mut self, addr: u64, v: u32) {
        unsafe { write32(addr, v) }
    }
}

/// Read-modify-write builder over a single register.
#[derive(Clone, Copy)]
#[must_use]
pub struct Reg32 {
    addr: u64,
    v: u32,
}

impl Reg32 {
    pub fn read<R: RegisterFile + ?Sized>(regs: &mut R, addr: u64) -> Self {
        let v = regs.read32(addr);
        Self { addr, v }
    }

    pub fn zero(addr: u64) -> Self {
        Self { addr, v: 0 }
    }

    pub fn set_field<const SHIFT: u32, const LEN: u32>(mut self, v: u32) -> Self {
        let field = 1u32.checked_shl(LEN).unwrap_or(0).wrapping_sub(1);
        self.v &= !(field << SHIFT);
        self.v |= (v & field) << SHIFT;
        self
    }

    pub fn set_bit<const SHIFT: u32>(self, on: bool) -> Self {
        self.set_field::<SHIFT, 1>(on as u32)
    }

    pub fn is_bit_set<const SHIFT: u32>(&self) -> bool {
        (self.v & (1 << SHIFT)) != 0
    }

    pub fn write<R: RegisterFile + ?Sized>(self, regs: &mut R) {
        regs.write32(self.addr, self.v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Flat(HashMap<u64, u32>);

    impl RegisterFile for Flat {
        fn read32(&mut self, addr: u64) -> u32 {
            self.0.get(&addr).copied().unwrap_or(0)
        }

        fn write32(&mut self, addr: u64, v: u32) {
            self.0.insert(addr, v);
        }
    }

    #[test]
    fn clrsetbits_keeps_unrelated_bits() {
        let mut regs = Flat::default();
        regs.write32(0x100, 0xffff_00ff);
        regs.clrsetbits(0x100, 0xff, 0x12);
        assert_eq!(regs.read32(0x100), 0xffff_0012);
        regs.setbits(0x100, 1 << 8);
        regs.clrbits(0x100, 1 << 31);
        assert_eq!(regs.read32(0x100), 0x7fff_0112);
    }

    #[test]
    fn reg32_fields() {
        let mut regs = Flat::default();
        regs.write32(0x10, 0x8000_0007);

        let r = Reg32::read(&mut regs, 0x10);
        assert!(r.is_bit_set::<31>());
        assert!(!r.is_bit_set::<3>());

        r.set_field::<0, 3>(5).set_bit::<3>(true).write(&mut regs);
        assert_eq!(regs.read32(0x10), 0x8000_000d);
    }

    #[test]
    fn bounded_poll_gives_up() {
        let mut regs = Flat::default();
        assert!(!await_bits(&mut regs, 0x20, 1, 1, Some(16)));
        regs.write32(0x20, 1);
        assert!(await_bits(&mut regs, 0x20, 1, 1, Some(16)));
        assert!(await_bits(&mut regs, 0x20, 1, 1, None));
    }
}
