use byte_struct::*;
use serde::{Deserialize, Serialize};

use txctl_shared::{ANALOG_INPUTS, LOGICAL_CHANNELS, ModuleKind, Phase};

use crate::controls::Controls;

use super::{GlobalConfig, Module};

#[derive(ByteStruct, Serialize, Deserialize, Clone, Copy, Debug, Default)]
#[byte_struct_le]
pub struct AssignInputConfig {
    /// Analog input channel feeding each logical channel.
    pub source: [u8; LOGICAL_CHANNELS],
}

/// Maps analog input channels onto logical channels. First stage of the
/// pipeline; everything downstream works on logical channels only.
#[derive(Serialize, Deserialize, Default)]
pub struct AssignInput {
    config: GlobalConfig<AssignInputConfig>,
}

impl AssignInput {
    pub fn new() -> Self {
        let mut m = Self::default();
        m.set_defaults();
        m
    }

    pub fn source(&self, ch: usize) -> Option<u8> {
        self.config.active().source.get(ch).copied()
    }

    pub fn set_source(&mut self, ch: usize, source: u8) {
        if let Some(s) = self.config.active_mut().source.get_mut(ch) {
            *s = source;
        }
    }
}

#[typetag::serde]
impl Module for AssignInput {
    fn kind(&self) -> ModuleKind {
        ModuleKind::AssignInput
    }

    fn name(&self) -> &'static str {
        "Assign input"
    }

    fn run(&mut self, controls: &mut Controls) {
        for ch in 0..LOGICAL_CHANNELS {
            let source = self.config.active().source[ch] as usize;
            // A source outside the analog set is reported by input_get
            // and maps to mid position
            controls.logical_set(ch, controls.input_get(source));
        }
    }

    fn switch_phase(&mut self, phase: Phase) {
        self.config.switch_phase(phase);
    }

    fn set_defaults(&mut self) {
        let cfg = self.config.active_mut();
        for (ch, source) in cfg.source.iter_mut().enumerate() {
            // Identity mapping, with logical channels beyond the analog
            // set parked on the last aux input
            *source = ch.min(ANALOG_INPUTS - 1) as u8;
        }
    }

    fn config_size(&self) -> usize {
        self.config.byte_len()
    }

    fn export_config(&self, out: &mut [u8]) {
        self.config.export(out);
    }

    fn import_config(&mut self, bytes: &[u8]) -> Result<(), String> {
        self.config.import(bytes)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txctl_shared::STICK_INPUTS;

    #[test]
    fn default_mapping_is_identity_over_analog_inputs() {
        let mut m = AssignInput::new();
        let mut controls = Controls::new();
        for ch in 0..ANALOG_INPUTS {
            controls.input_set(ch, 100 + ch as i16);
        }

        m.run(&mut controls);
        for ch in 0..ANALOG_INPUTS.min(LOGICAL_CHANNELS) {
            assert_eq!(controls.logical_get(ch), 100 + ch as i16);
        }
    }

    #[test]
    fn remapped_source_is_followed() {
        let mut m = AssignInput::new();
        m.set_source(0, STICK_INPUTS as u8); // first trim input
        let mut controls = Controls::new();
        controls.input_set(STICK_INPUTS, 321);

        m.run(&mut controls);
        assert_eq!(controls.logical_get(0), 321);
    }

    #[test]
    fn corrupt_source_degrades_to_mid() {
        let mut m = AssignInput::new();
        m.set_source(2, 200);
        let mut controls = Controls::new();
        controls.input_set(2, 500);

        m.run(&mut controls);
        assert_eq!(controls.logical_get(2), 0);
    }
}
