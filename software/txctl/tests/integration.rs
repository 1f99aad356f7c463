//! End-to-end exercises of the control core over the in-memory hardware
//! mockups: full frames from raw samples to output channels, model
//! persistence across a simulated reboot, and phase switching through a
//! physical switch.

use std::sync::Arc;

use txctl::hal::{MemoryStorage, MockClock, MockPorts, Pin, ScriptedAdc, SystemClock};
use txctl::module::{
    ChannelReverse, FlightTimer, PhaseTrim, Phases, ServoLimit, ServoSubtrim,
};
use txctl::{BlockStatus, ConfigStore, Inputs, SamplingEngine, Transmitter, TransmitterCtx};

use txctl_shared::block::{CONFIG_BLOCK_SIZE, CONFIG_BLOCKS};
use txctl_shared::{ANALOG_INPUTS, SWITCHES, SwitchConf, SwitchState};

const SWITCH_PINS: [Pin; SWITCHES] = [10, 11, 12, 13, 14, 15, 16, 17];

struct Bench {
    tx: Transmitter,
    engine: SamplingEngine,
    ports: MockPorts,
    clock: MockClock,
}

fn bench_over(backing: MemoryStorage, switch_conf: [SwitchConf; SWITCHES]) -> Bench {
    let ports = MockPorts::new();
    let clock = MockClock::new();
    let (inputs, engine) = Inputs::new(
        Arc::new(ports.clone()),
        SWITCH_PINS,
        switch_conf,
        Box::new(ScriptedAdc::new()),
        0,
    );
    let store = ConfigStore::new(Box::new(backing.clone()));
    let tx = Transmitter::new(
        TransmitterCtx::default(),
        inputs,
        store,
        Arc::new(clock.clone()),
    );
    Bench {
        tx,
        engine,
        ports,
        clock,
    }
}

fn bench(switch_conf: [SwitchConf; SWITCHES]) -> Bench {
    bench_over(
        MemoryStorage::new(CONFIG_BLOCKS as usize * CONFIG_BLOCK_SIZE),
        switch_conf,
    )
}

/// Deliver one full ADC sweep with the same raw value everywhere.
fn sample_all(engine: &mut SamplingEngine, raw: u16) {
    engine.start_frame();
    for _ in 0..ANALOG_INPUTS {
        engine.on_conversion_complete(raw);
    }
}

#[test]
fn frame_flows_from_raw_samples_to_limited_outputs() {
    let mut b = bench([SwitchConf::Unused; SWITCHES]);
    b.tx.manager_mut().load_system_config();

    let mgr = b.tx.manager_mut();
    mgr.module_as_mut::<ChannelReverse>()
        .unwrap()
        .set_reversed(0, true);
    mgr.module_as_mut::<ServoSubtrim>().unwrap().set_subtrim(0, 10);
    mgr.module_as_mut::<ServoLimit>().unwrap().set_limits(0, -40, 125);

    sample_all(&mut b.engine, 600);
    b.tx.cycle();

    // 600 raw, reversed to -600, subtrim +100, limited below at -400
    assert_eq!(b.tx.controls().output_get(0), -400);

    // An untouched channel passes straight through
    assert_eq!(b.tx.controls().output_get(1), 600);
}

#[test]
fn model_configuration_survives_reboot() {
    let backing = MemoryStorage::new(CONFIG_BLOCKS as usize * CONFIG_BLOCK_SIZE);

    {
        let mut b = bench_over(backing.clone(), [SwitchConf::Unused; SWITCHES]);
        b.tx.manager_mut().load_system_config();
        b.tx.manager_mut()
            .module_as_mut::<PhaseTrim>()
            .unwrap()
            .set_trim(1, 2, 35);
        assert_eq!(b.tx.save_model(4), BlockStatus::Ok);
        assert_eq!(b.tx.selected_model(), 4);
    }

    // Fresh core over the same storage, as after power-up
    let mut b = bench_over(backing, [SwitchConf::Unused; SWITCHES]);
    b.tx.manager_mut().load_system_config();
    let model = b.tx.selected_model();
    assert_eq!(model, 4);
    assert_eq!(b.tx.manager_mut().load_model(model), BlockStatus::Ok);
    assert_eq!(
        b.tx.manager().module_as::<PhaseTrim>().unwrap().trim(1, 2),
        Some(35)
    );
}

#[test]
fn corrupted_model_block_degrades_to_defaults_on_reboot() {
    let backing = MemoryStorage::new(CONFIG_BLOCKS as usize * CONFIG_BLOCK_SIZE);

    {
        let mut b = bench_over(backing.clone(), [SwitchConf::Unused; SWITCHES]);
        b.tx.manager_mut()
            .module_as_mut::<PhaseTrim>()
            .unwrap()
            .set_trim(0, 0, 99);
        assert_eq!(b.tx.save_model(2), BlockStatus::Ok);
    }

    backing.corrupt(2 * CONFIG_BLOCK_SIZE + 20, 0x10);

    let mut b = bench_over(backing, [SwitchConf::Unused; SWITCHES]);
    assert_eq!(b.tx.manager_mut().load_model(2), BlockStatus::ChecksumMismatch);
    assert_eq!(
        b.tx.manager().module_as::<PhaseTrim>().unwrap().trim(0, 0),
        Some(0)
    );
}

#[test]
fn physical_phase_switch_drives_phased_trim() {
    let mut conf = [SwitchConf::Unused; SWITCHES];
    conf[0] = SwitchConf::ThreeState;
    let mut b = bench(conf);

    {
        let mgr = b.tx.manager_mut();
        mgr.module_as_mut::<Phases>().unwrap().set_switch(0);
        mgr.module_as_mut::<PhaseTrim>().unwrap().set_trim(2, 0, 40);
    }

    // Switch in the fully-low position reads as state 2
    b.ports.set_levels(SWITCH_PINS[0], false, false);

    sample_all(&mut b.engine, 512);
    b.tx.cycle(); // detects the phase change
    sample_all(&mut b.engine, 512);
    b.tx.cycle(); // runs in phase 2

    assert_eq!(b.tx.manager().module_as::<Phases>().unwrap().phase(), 2);
    assert_eq!(b.tx.controls().logical_get(0), 512 + 400);
}

#[test]
fn flight_timer_counts_against_a_switch_condition() {
    let mut conf = [SwitchConf::Unused; SWITCHES];
    conf[1] = SwitchConf::TwoState;
    let mut b = bench(conf);

    {
        let timer = b.tx.manager_mut().module_as_mut::<FlightTimer>().unwrap();
        timer.set_switch(1, SwitchState::State1);
        timer.set_time(120);
    }

    b.ports.set_level(SWITCH_PINS[1], true);
    b.clock.set(2000);
    sample_all(&mut b.engine, 512);
    b.tx.cycle(); // establishes the timer reference

    for _ in 0..5 {
        b.clock.advance(1100);
        sample_all(&mut b.engine, 512);
        b.tx.cycle();
    }

    let timer = b.tx.manager().module_as::<FlightTimer>().unwrap();
    assert_eq!(timer.countdown_sec(), 115);
    assert_eq!(timer.time_str(), "1:55");
}

#[test]
fn boot_initializes_logging_and_loads_configuration() {
    let mut ctx = TransmitterCtx::default();
    ctx.session_dir = std::env::temp_dir();
    ctx.session_name = format!("txctl-test-{}", std::process::id());

    let ports = MockPorts::new();
    let (inputs, mut engine) = Inputs::new(
        Arc::new(ports),
        SWITCH_PINS,
        [SwitchConf::Unused; SWITCHES],
        Box::new(ScriptedAdc::new()),
        0,
    );
    let backing = MemoryStorage::new(CONFIG_BLOCKS as usize * CONFIG_BLOCK_SIZE);
    let mut tx = Transmitter::new(
        ctx,
        inputs,
        ConfigStore::new(Box::new(backing)),
        Arc::new(SystemClock::new()),
    );

    tx.boot().unwrap();
    // Erased storage boots to factory defaults and stays operable
    sample_all(&mut engine, 512);
    tx.cycle();
    assert_eq!(tx.controls().output_get(0), 512);
}
