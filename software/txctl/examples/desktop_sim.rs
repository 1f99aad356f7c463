//! Run the control core against in-memory hardware for a few seconds,
//! sweeping a stick and toggling the flight phase switch, and print the
//! resulting output channels.

use std::sync::Arc;

use txctl::hal::{MemoryStorage, MockPorts, Pin, ScriptedAdc, SystemClock};
use txctl::module::{PhaseTrim, Phases, ServoLimit, modules_to_json};
use txctl::{ConfigStore, Inputs, Transmitter, TransmitterCtx};
use txctl_shared::block::{CONFIG_BLOCK_SIZE, CONFIG_BLOCKS};
use txctl_shared::{ANALOG_INPUTS, SWITCHES, SwitchConf};

const SWITCH_PINS: [Pin; SWITCHES] = [10, 11, 12, 13, 14, 15, 16, 17];

fn main() -> Result<(), String> {
    let mut ctx = TransmitterCtx::default();
    ctx.session_dir = std::env::temp_dir();

    let ports = MockPorts::new();
    let mut switch_conf = [SwitchConf::Unused; SWITCHES];
    switch_conf[0] = SwitchConf::ThreeState;

    let (inputs, mut engine) = Inputs::new(
        Arc::new(ports.clone()),
        SWITCH_PINS,
        switch_conf,
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
    tx.boot()?;

    // A model with a phase switch, thermal camber on channel 1, and a
    // tight travel limit on the first servo
    {
        let mgr = tx.manager_mut();
        mgr.module_as_mut::<Phases>()
            .ok_or("missing phases module")?
            .set_switch(0);
        mgr.module_as_mut::<PhaseTrim>()
            .ok_or("missing phase trim module")?
            .set_trim(1, 1, 20);
        mgr.module_as_mut::<ServoLimit>()
            .ok_or("missing servo limit module")?
            .set_limits(0, -80, 80);
    }
    tx.save_model(2);

    for frame in 0..100_u32 {
        // Sweep the sticks and flip the phase switch halfway through
        let raw = (frame * 10 % 1024) as u16;
        engine.start_frame();
        for _ in 0..ANALOG_INPUTS {
            engine.on_conversion_complete(raw);
        }
        if frame == 50 {
            ports.set_levels(SWITCH_PINS[0], false, true);
        }

        tx.cycle();

        if frame % 25 == 0 {
            let phase = tx
                .manager()
                .module_as::<Phases>()
                .map(|p| p.phase_name())
                .unwrap_or("?");
            println!(
                "frame {frame:3}  phase {phase:8}  out0 {:5}  out1 {:5}",
                tx.controls().output_get(0),
                tx.controls().output_get(1),
            );
        }
    }

    // Dump the configured chain for inspection
    println!("{}", modules_to_json(tx.manager().modules())?);
    Ok(())
}
