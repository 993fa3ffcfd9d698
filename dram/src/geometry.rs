/// Rank, bus width and address bit counts of one DRAM configuration.
///
/// `rank_bits` counts address bits, not ranks: 0 is a single rank, 1 is two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DramGeometry {
    pub rank_bits: u8,
    pub full_width: bool,
    pub cols: u8,
    pub rows: u8,
    pub banks: u8,
    pub bank_groups: u8,
}

impl DramGeometry {
    /// Bytes per beat: 4 on the 32-bit bus, 2 on the 16-bit bus.
    pub const fn bus_bytes(&self) -> u64 {
        if self.full_width { 4 } else { 2 }
    }

    pub const fn bus_bits(&self) -> u32 {
        if self.full_width { 2 } else { 1 }
    }

    pub const fn ranks(&self) -> u32 {
        1 << self.rank_bits
    }

    /// Total addressable bytes.
    pub const fn size(&self) -> u64 {
        let cells = self.cols as u32 + self.rows as u32 + self.banks as u32 + self.bank_groups as u32;
        (1u64 << cells) * self.bus_bytes() * (1u64 << self.rank_bits)
    }

    // Linear address layout, low to high: bus bytes, columns, bank groups,
    // banks, rows, rank.

    pub const fn col_shift(&self) -> u32 {
        self.bus_bits()
    }

    pub const fn bank_group_shift(&self) -> u32 {
        self.col_shift() + self.cols as u32
    }

    pub const fn bank_shift(&self) -> u32 {
        self.bank_group_shift() + self.bank_groups as u32
    }

    pub const fn row_shift(&self) -> u32 {
        self.bank_shift() + self.banks as u32
    }

    pub const fn rank_shift(&self) -> u32 {
        self.row_shift() + self.rows as u32
    }
}

impl core::fmt::Display for DramGeometry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "cols = {}, rows = {}, banks = {}, bankgrps = {}, ranks = {}, full_width = {}",
            self.cols,
            self.rows,
            self.banks,
            self.bank_groups,
            self.rank_bits,
            self.full_width
        )
    }
}
