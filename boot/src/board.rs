//! Static DRAM configuration of the board.

use sunxi_dram::{DramParameters, DramType, InitOptions};

pub const KIND: DramType = if cfg!(feature = "lpddr4") {
    DramType::Lpddr4
} else if cfg!(feature = "lpddr3") {
    DramType::Lpddr3
} else if cfg!(feature = "ddr3") {
    DramType::Ddr3
} else {
    DramType::Ddr4
};

pub const CLK_MHZ: u32 = 792;

/// Geometry is left to auto-detection unless the board trusts the geometry
/// packed into its vendor words.
pub const PARAMS: DramParameters = {
    let params = DramParameters::a133_defaults(KIND, CLK_MHZ);

    if cfg!(feature = "fixed-geometry") {
        DramParameters {
            geometry: Some(params.geometry_from_words()),
            ..params
        }
    } else {
        params
    }
};

pub const OPTIONS: InitOptions = InitOptions::new();

/// Chip the dry run simulates: the fixed geometry if there is one, otherwise
/// 2 GiB on a single rank with a 32-bit bus.
#[cfg(not(target_os = "none"))]
pub const SIM_CHIP: sunxi_dram::DramGeometry = match PARAMS.geometry {
    Some(geometry) => geometry,
    None => sunxi_dram::DramGeometry {
        rank_bits: 0,
        full_width: true,
        cols: 10,
        rows: 16,
        banks: if KIND.has_bank_groups() { 2 } else { 3 },
        bank_groups: if KIND.has_bank_groups() { 1 } else { 0 },
    },
};
