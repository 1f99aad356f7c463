//! Central store of channel values and switch states for one cycle.
//!
//! Every module reads and writes through this store, so the pipeline's
//! dataflow is a straight line: raw input channels are acquired, modules
//! shape logical channels, and output channels leave for the pulse encoder.
//! All setters clamp to the legal channel range and all accessors tolerate
//! out-of-range indices, so a corrupt configuration can degrade values but
//! cannot take down the cycle.

use tracing::warn;

use txctl_shared::{
    ANALOG_INPUTS, CHANNEL_VALUE_MID, ChannelValue, LOGICAL_CHANNELS, OUTPUT_CHANNELS,
    STICK_INPUTS, SWITCH_NONE, SWITCHES, SwitchConf, SwitchSet, SwitchState, TRIM_INPUTS,
    clamp_channel,
};

use crate::input::Inputs;

pub struct Controls {
    input: [ChannelValue; ANALOG_INPUTS],
    logical: [ChannelValue; LOGICAL_CHANNELS],
    output: [ChannelValue; OUTPUT_CHANNELS],
    switches: SwitchSet,
    switch_conf: [SwitchConf; SWITCHES],
}

impl Controls {
    pub fn new() -> Self {
        Self {
            input: [CHANNEL_VALUE_MID; ANALOG_INPUTS],
            logical: [CHANNEL_VALUE_MID; LOGICAL_CHANNELS],
            output: [CHANNEL_VALUE_MID; OUTPUT_CHANNELS],
            switches: SwitchSet::all_dontcare(),
            switch_conf: [SwitchConf::Unused; SWITCHES],
        }
    }

    /// Start a cycle: copy the latest analog samples and decoded switch
    /// states in, and reset the logical and output channels to mid.
    pub fn acquire(&mut self, inputs: &Inputs) {
        for ch in 0..STICK_INPUTS {
            self.input[ch] = clamp_channel(inputs.get_stick_value(ch) as i32);
        }
        for ch in 0..TRIM_INPUTS {
            self.input[STICK_INPUTS + ch] = clamp_channel(inputs.get_trim_value(ch) as i32);
        }
        for ch in 0..(ANALOG_INPUTS - STICK_INPUTS - TRIM_INPUTS) {
            self.input[STICK_INPUTS + TRIM_INPUTS + ch] =
                clamp_channel(inputs.get_aux_value(ch) as i32);
        }

        for sw in 0..SWITCHES {
            self.switch_conf[sw] = inputs.switch_conf(sw);
            let state = match self.switch_conf[sw] {
                SwitchConf::FixedOn => SwitchState::State1,
                _ => inputs.get_switch_value(sw),
            };
            self.switches.set(sw, state);
        }

        self.logical = [CHANNEL_VALUE_MID; LOGICAL_CHANNELS];
        self.output = [CHANNEL_VALUE_MID; OUTPUT_CHANNELS];
    }

    pub fn input_get(&self, ch: usize) -> ChannelValue {
        match self.input.get(ch) {
            Some(v) => *v,
            None => {
                warn!("input channel {ch} out of range");
                CHANNEL_VALUE_MID
            }
        }
    }

    pub fn input_set(&mut self, ch: usize, value: ChannelValue) {
        match self.input.get_mut(ch) {
            Some(v) => *v = clamp_channel(value as i32),
            None => warn!("input channel {ch} out of range"),
        }
    }

    pub fn logical_get(&self, ch: usize) -> ChannelValue {
        match self.logical.get(ch) {
            Some(v) => *v,
            None => {
                warn!("logical channel {ch} out of range");
                CHANNEL_VALUE_MID
            }
        }
    }

    pub fn logical_set(&mut self, ch: usize, value: ChannelValue) {
        match self.logical.get_mut(ch) {
            Some(v) => *v = clamp_channel(value as i32),
            None => warn!("logical channel {ch} out of range"),
        }
    }

    pub fn output_get(&self, ch: usize) -> ChannelValue {
        match self.output.get(ch) {
            Some(v) => *v,
            None => {
                warn!("output channel {ch} out of range");
                CHANNEL_VALUE_MID
            }
        }
    }

    pub fn output_set(&mut self, ch: usize, value: ChannelValue) {
        match self.output.get_mut(ch) {
            Some(v) => *v = clamp_channel(value as i32),
            None => warn!("output channel {ch} out of range"),
        }
    }

    pub fn switch_get(&self, sw: usize) -> SwitchState {
        self.switches.get(sw)
    }

    pub fn switch_set(&mut self, sw: usize, state: SwitchState) {
        self.switches.set(sw, state);
    }

    pub fn switch_conf_get(&self, sw: usize) -> SwitchConf {
        match self.switch_conf.get(sw) {
            Some(conf) => *conf,
            None => SwitchConf::Unused,
        }
    }

    /// Whether a configured switch condition currently holds.
    ///
    /// `sw` is a stored switch number, with [`SWITCH_NONE`] meaning "no
    /// switch assigned" and evaluating false. An expected state of
    /// don't-care matches any position.
    pub fn eval_switch(&self, sw: u8, expected: SwitchState) -> bool {
        if sw == SWITCH_NONE {
            return false;
        }
        if expected == SwitchState::DontCare {
            return true;
        }
        self.switches.get(sw as usize) == expected
    }
}

impl Default for Controls {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txctl_shared::{CHANNEL_VALUE_MAX, CHANNEL_VALUE_MIN};

    #[test]
    fn setters_clamp_to_channel_range() {
        let mut controls = Controls::new();
        controls.logical_set(0, CHANNEL_VALUE_MAX + 500);
        assert_eq!(controls.logical_get(0), CHANNEL_VALUE_MAX);
        controls.output_set(0, CHANNEL_VALUE_MIN - 500);
        assert_eq!(controls.output_get(0), CHANNEL_VALUE_MIN);
        controls.input_set(0, 37);
        assert_eq!(controls.input_get(0), 37);
    }

    #[test]
    fn out_of_range_channels_read_mid_and_ignore_writes() {
        let mut controls = Controls::new();
        controls.logical_set(LOGICAL_CHANNELS, 100);
        assert_eq!(controls.logical_get(LOGICAL_CHANNELS), CHANNEL_VALUE_MID);
        assert_eq!(controls.output_get(OUTPUT_CHANNELS + 1), CHANNEL_VALUE_MID);
    }

    #[test]
    fn switch_condition_evaluation() {
        let mut controls = Controls::new();
        controls.switch_set(2, SwitchState::State1);

        assert!(controls.eval_switch(2, SwitchState::State1));
        assert!(!controls.eval_switch(2, SwitchState::State0));
        assert!(controls.eval_switch(2, SwitchState::DontCare));
        assert!(!controls.eval_switch(SWITCH_NONE, SwitchState::State1));
    }
}
