//! Raw operator input: analog samples from the latch and switch decoding
//! from digital pins.

mod sampler;

pub use sampler::{SampleLatch, SamplingEngine};

use std::sync::Arc;

use tracing::warn;

use txctl_shared::{
    AUX_INPUTS, ChannelValue, STICK_INPUTS, SWITCHES, SwitchConf, SwitchState, TRIM_INPUTS,
};

use crate::hal::{AdcSource, Pin, PinMode, Ports};

/// Read-side view of operator input.
///
/// Analog values come from the [`SampleLatch`] filled by the
/// [`SamplingEngine`]; switch positions are decoded on demand from digital
/// pins according to each switch's wiring classification.
pub struct Inputs {
    latch: SampleLatch,
    ports: Arc<dyn Ports>,
    switch_pins: [Pin; SWITCHES],
    switch_conf: [SwitchConf; SWITCHES],
}

impl Inputs {
    /// Build the input front end. Returns the read-side `Inputs` together
    /// with the [`SamplingEngine`] to be driven from the ADC completion
    /// context.
    ///
    /// Pins of wired switches are configured as plain inputs here.
    pub fn new(
        ports: Arc<dyn Ports>,
        switch_pins: [Pin; SWITCHES],
        switch_conf: [SwitchConf; SWITCHES],
        adc: Box<dyn AdcSource>,
        invert_mask: u16,
    ) -> (Self, SamplingEngine) {
        for (pin, conf) in switch_pins.iter().zip(switch_conf.iter()) {
            match conf {
                SwitchConf::TwoState | SwitchConf::ThreeState => {
                    ports.port_init(*pin, PinMode::Input)
                }
                _ => (),
            }
        }

        let latch = SampleLatch::new();
        let engine = SamplingEngine::new(latch.clone(), adc, invert_mask);
        let inputs = Self {
            latch,
            ports,
            switch_pins,
            switch_conf,
        };
        (inputs, engine)
    }

    /// Latest sample of a primary stick axis.
    pub fn get_stick_value(&self, ch: usize) -> ChannelValue {
        if ch >= STICK_INPUTS {
            warn!("stick index {ch} out of range");
            return 0;
        }
        self.latch.sample(ch)
    }

    /// Latest sample of a trim input.
    pub fn get_trim_value(&self, ch: usize) -> ChannelValue {
        if ch >= TRIM_INPUTS {
            warn!("trim index {ch} out of range");
            return 0;
        }
        self.latch.sample(STICK_INPUTS + ch)
    }

    /// Latest sample of an auxiliary analog input.
    pub fn get_aux_value(&self, ch: usize) -> ChannelValue {
        if ch >= AUX_INPUTS {
            warn!("aux input index {ch} out of range");
            return 0;
        }
        self.latch.sample(STICK_INPUTS + TRIM_INPUTS + ch)
    }

    pub fn switch_conf(&self, sw: usize) -> SwitchConf {
        if sw >= SWITCHES {
            warn!("switch index {sw} out of range");
            return SwitchConf::Unused;
        }
        self.switch_conf[sw]
    }

    /// Decode the current position of a switch.
    ///
    /// Only mechanically wired switches are decoded here; derived kinds
    /// (channel-derived, phase-reflecting, logic) are resolved downstream
    /// and read as don't-care at this level.
    pub fn get_switch_value(&self, sw: usize) -> SwitchState {
        if sw >= SWITCHES {
            warn!("switch index {sw} out of range");
            return SwitchState::DontCare;
        }
        let pin = self.switch_pins[sw];
        match self.switch_conf[sw] {
            SwitchConf::TwoState => {
                if self.ports.port_get(pin) {
                    SwitchState::State1
                } else {
                    SwitchState::State0
                }
            }
            SwitchConf::ThreeState => {
                // A three-position switch distinguishes its center position
                // by reading differently with and without the pullup.
                self.ports.port_init(pin, PinMode::Input);
                let plain = self.ports.port_get(pin);
                self.ports.port_init(pin, PinMode::InputPullup);
                let pulled = self.ports.port_get(pin);
                self.ports.port_init(pin, PinMode::Input);

                match (plain, pulled) {
                    (false, false) => SwitchState::State2,
                    (true, true) => SwitchState::State0,
                    _ => SwitchState::State1,
                }
            }
            _ => SwitchState::DontCare,
        }
    }
}
