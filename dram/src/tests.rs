//! End-to-end bring-up against the simulated board.

use tock_registers::{interfaces::Readable, registers::InMemoryRegister};

use crate::{
    Controller, DramError, DramGeometry, DramParameters, DramType, InitOptions, Phase,
    RegisterFile, SequencerState, detect::RANK_WIDTH_ORDER, init,
    param::Tpr10,
    regs::{MRCTRL0, MRCTRL1, SDRAM_BASE, ccm, ctl},
    sim::{SimBoard, SimDelay},
    size::test_patterns,
    timing::Timings,
    try_init,
};

const fn geometry(rank_bits: u8, full_width: bool, cols: u8, rows: u8, banks: u8, bank_groups: u8) -> DramGeometry {
    DramGeometry {
        rank_bits,
        full_width,
        cols,
        rows,
        banks,
        bank_groups,
    }
}

fn params(kind: DramType, geometry: Option<DramGeometry>) -> DramParameters {
    DramParameters {
        geometry,
        ..DramParameters::a133_defaults(kind, 792)
    }
}

fn mr_addr(ctrl0: u32) -> u32 {
    InMemoryRegister::<u32, MRCTRL0::Register>::new(ctrl0).read(MRCTRL0::MR_ADDR)
}

#[test]
fn detects_chip_geometry() {
    let chips = [
        (DramType::Ddr4, geometry(0, true, 10, 16, 2, 1)),
        (DramType::Ddr4, geometry(1, true, 10, 15, 2, 1)),
        (DramType::Ddr4, geometry(0, false, 11, 16, 2, 0)),
        (DramType::Ddr3, geometry(0, true, 10, 15, 3, 0)),
        (DramType::Ddr3, geometry(1, false, 10, 17, 3, 0)),
        // Both ends of every probed range
        (DramType::Ddr3, geometry(0, true, 8, 14, 0, 0)),
        (DramType::Ddr3, geometry(0, false, 9, 14, 0, 0)),
        (DramType::Ddr3, geometry(1, false, 13, 18, 3, 0)),
        (DramType::Ddr4, geometry(1, true, 12, 18, 2, 2)),
        (DramType::Ddr4, geometry(0, true, 8, 14, 0, 0)),
    ];

    for (kind, chip) in chips {
        let mut board = SimBoard::new(chip);
        let info = try_init(&mut board, SimDelay::default(), params(kind, None), InitOptions::new())
            .unwrap();

        assert_eq!(info.geometry, chip, "{:?}", kind);
        assert_eq!(info.size, chip.size());
        assert_eq!(info.clk_mhz, 792);
    }
}

#[test]
fn single_rank_half_width_is_tried_last() {
    let chip = geometry(0, false, 11, 16, 3, 0);
    let mut board = SimBoard::new(chip);

    let size = init(&mut board, SimDelay::default(), params(DramType::Ddr3, None), InitOptions::new());
    assert_eq!(size, chip.size());

    let tried: Vec<_> = board.configured()[..4]
        .iter()
        .map(|g| (g.rank_bits, g.full_width))
        .collect();
    assert_eq!(tried, RANK_WIDTH_ORDER);

    // Four rank probes, rows, columns, banks, then the final init
    assert_eq!(board.configured().len(), 8);
    assert_eq!(*board.configured().last().unwrap(), chip);
}

#[test]
fn read_calibration_gets_five_attempts() {
    let chip = geometry(0, true, 10, 16, 2, 1);

    let mut board = SimBoard::new(chip).with_read_calibration_failures(4);
    let info = try_init(&mut board, SimDelay::default(), params(DramType::Ddr4, Some(chip)), InitOptions::new());
    assert!(info.is_ok());
    assert_eq!(board.read_calibrations(), 5);

    let mut board = SimBoard::new(chip).with_read_calibration_failures(5);
    let mut controller = Controller::new(
        &mut board,
        SimDelay::default(),
        params(DramType::Ddr4, Some(chip)),
        InitOptions::new(),
    );
    assert_eq!(
        controller.run(),
        Err(DramError::CalibrationFailed { phase: Phase::ReadCalibration })
    );
    assert_eq!(controller.state(), SequencerState::Failed(Phase::ReadCalibration));
    drop(controller);
    assert_eq!(board.read_calibrations(), 5);
}

#[test]
fn ddr4_mode_register_sequence() {
    let chip = geometry(0, true, 10, 16, 2, 1);
    let mut board = SimBoard::new(chip);

    let mut controller = Controller::new(
        &mut board,
        SimDelay::default(),
        params(DramType::Ddr4, Some(chip)),
        InitOptions::new(),
    );
    let expected: Vec<_> = controller.mode_register_sequence().into_iter().flatten().collect();
    controller.run().unwrap();
    assert_eq!(controller.state(), SequencerState::Calibrated);
    drop(controller);

    let log = board.mr_log();
    assert_eq!(log.len(), 9);
    assert_eq!(log.len(), expected.len());

    let addrs: Vec<_> = log.iter().map(|cmd| mr_addr(cmd.ctrl0)).collect();
    assert_eq!(addrs, [0, 1, 2, 3, 4, 5, 6, 6, 6]);

    for (issued, planned) in log.iter().zip(&expected) {
        assert_eq!(issued.ctrl1, planned.ctrl1);
    }

    // VrefDQ training window: open, open, close
    assert_ne!(log[6].ctrl1 & 0x80, 0);
    assert_ne!(log[7].ctrl1 & 0x80, 0);
    assert_eq!(log[8].ctrl1 & 0x80, 0);
}

#[test]
fn lpddr3_mode_registers_travel_in_mrctrl1() {
    let chip = geometry(0, true, 10, 15, 3, 0);
    let mut board = SimBoard::new(chip);

    try_init(&mut board, SimDelay::default(), params(DramType::Lpddr3, Some(chip)), InitOptions::new())
        .unwrap();

    let addrs: Vec<_> = board
        .mr_log()
        .iter()
        .map(|cmd| {
            assert_eq!(InMemoryRegister::<u32, MRCTRL0::Register>::new(cmd.ctrl0).read(MRCTRL0::LP3_CMD), 3);
            InMemoryRegister::<u32, MRCTRL1::Register>::new(cmd.ctrl1).read(MRCTRL1::MR_ADDR)
        })
        .collect();
    assert_eq!(addrs, [1, 2, 3, 11]);
}

#[test]
fn lpddr4_mode_registers_include_mr22() {
    let chip = geometry(0, true, 10, 16, 3, 0);
    let mut p = params(DramType::Lpddr4, Some(chip));
    p.mode.mr11 = 0x04;
    p.mode.mr22 = 0x26;

    let mut board = SimBoard::new(chip);
    try_init(&mut board, SimDelay::default(), p, InitOptions::new()).unwrap();

    let log = board.mr_log();
    let ctrl1: Vec<_> = log
        .iter()
        .map(|cmd| InMemoryRegister::<u32, MRCTRL1::Register>::new(cmd.ctrl1))
        .collect();

    let addrs: Vec<_> = ctrl1.iter().map(|r| r.read(MRCTRL1::MR_ADDR)).collect();
    assert_eq!(addrs, [0, 1, 2, 3, 4, 11, 12, 13, 14, 22]);

    assert_eq!(ctrl1[5].read(MRCTRL1::MR_DATA), 0x04);
    assert_eq!(ctrl1[9].read(MRCTRL1::MR_DATA), 0x26);
    assert!(log.iter().all(|cmd| mr_addr(cmd.ctrl0) == 0));
}

#[test]
fn timing_registers_follow_derived_set() {
    let chip = geometry(0, true, 10, 16, 2, 1);
    let p = params(DramType::Ddr4, Some(chip));
    let t = Timings::derive(p.kind, p.clk / 2, &p.timing);

    let mut board = SimBoard::new(chip);
    try_init(&mut board, SimDelay::default(), p, InitOptions::new()).unwrap();

    assert_eq!(board.read32(ctl::dramtmg(2)) & 0xff, t.twr2rd);
    assert_eq!((board.read32(ctl::dramtmg(5)) >> 16) & 0xff, t.tcksre);
    assert_eq!(board.read32(ctl::dramtmg(9)), 0);
    assert_eq!(board.read32(ctl::RFSHTMG), t.trefi << 16 | t.trfc);

    assert_eq!(board.read32(ccm::DRAM_CLK_CFG) & 0x1f, 3);
}

#[test]
fn corrupt_word_fails_self_test() {
    let chip = geometry(0, true, 10, 16, 2, 1);
    let offset = 0x40;

    let mut board = SimBoard::new(chip).with_corrupt_word(offset);
    let result = try_init(&mut board, SimDelay::default(), params(DramType::Ddr4, Some(chip)), InitOptions::new());

    let (expected, _) = test_patterns(0x10);
    assert_eq!(
        result,
        Err(DramError::SelfTestFailed {
            addr: SDRAM_BASE + offset,
            expected,
            found: expected ^ 1,
        })
    );

    let mut board = SimBoard::new(chip).with_corrupt_word(offset);
    assert_eq!(
        init(&mut board, SimDelay::default(), params(DramType::Ddr4, None), InitOptions::new()),
        0
    );
}

#[test]
fn training_requests_are_lenient_by_default() {
    let chip = geometry(0, true, 10, 16, 2, 1);
    let strict = InitOptions {
        require_training: true,
        ..InitOptions::new()
    };

    for (flag, phase) in [
        (Tpr10::WRITE_LEVELING, Phase::WriteCalibration),
        (Tpr10::WRITE_TRAINING, Phase::WriteCalibration),
        (Tpr10::READ_TRAINING, Phase::ReadCalibration),
    ] {
        let mut p = params(DramType::Ddr4, Some(chip));
        p.tpr10 |= flag.bits();

        let mut board = SimBoard::new(chip);
        assert!(try_init(&mut board, SimDelay::default(), p, InitOptions::new()).is_ok());

        let mut board = SimBoard::new(chip);
        let mut controller = Controller::new(&mut board, SimDelay::default(), p, strict);
        assert_eq!(controller.run(), Err(DramError::CalibrationFailed { phase }), "{:?}", flag);
        assert_eq!(controller.state(), SequencerState::Failed(phase));
    }
}

#[test]
fn stuck_pll_times_out_with_poll_limit() {
    let chip = geometry(0, true, 10, 16, 2, 1);
    let options = InitOptions {
        poll_limit: Some(100),
        ..InitOptions::new()
    };

    let mut board = SimBoard::new(chip).with_stuck_pll();
    let mut controller = Controller::new(&mut board, SimDelay::default(), params(DramType::Ddr4, Some(chip)), options);
    assert_eq!(controller.run(), Err(DramError::Timeout { phase: Phase::PllLock }));
    assert_eq!(controller.state(), SequencerState::Failed(Phase::PllLock));

    // Without a known geometry every rank probe fails the same way
    let mut board = SimBoard::new(chip).with_stuck_pll();
    let result = try_init(&mut board, SimDelay::default(), params(DramType::Ddr4, None), options);
    assert_eq!(result, Err(DramError::DetectionExhausted));
}

#[test]
fn unsupported_geometry_touches_nothing() {
    let chip = geometry(0, true, 10, 16, 2, 1);
    let bad = geometry(0, true, 10, 13, 2, 1);

    let mut board = SimBoard::new(chip);
    let mut controller = Controller::new(&mut board, SimDelay::default(), params(DramType::Ddr4, Some(bad)), InitOptions::new());
    let err = controller.run().unwrap_err();
    assert_eq!(err, DramError::UnsupportedRows(13));
    assert!(err.is_configuration());
    assert_eq!(controller.state(), SequencerState::Reset);
    drop(controller);

    assert!(board.configured().is_empty());
    assert!(board.mr_log().is_empty());
}

#[test]
fn board_mode_registers_survive_with_keep_marker() {
    let chip = geometry(0, true, 10, 16, 2, 1);
    let mut p = params(DramType::Ddr3, Some(chip));
    p.mode.mr0 = crate::param::MR_KEEP | 0x1234;

    let mut board = SimBoard::new(chip);
    try_init(&mut board, SimDelay::default(), p, InitOptions::new()).unwrap();

    let log = board.mr_log();
    assert_eq!(log.len(), 4);
    let addrs: Vec<_> = log.iter().map(|cmd| mr_addr(cmd.ctrl0)).collect();
    assert_eq!(addrs, [0, 1, 2, 3]);

    assert_eq!(log[0].ctrl1, 0x1234);
    assert_eq!(log[1].ctrl1, 0x601);
    assert_eq!(log[2].ctrl1, 0x18);
}
