use byte_struct::*;
use serde::{Deserialize, Serialize};

use txctl_shared::{LOGICAL_CHANNELS, ModuleKind, OUTPUT_CHANNELS, Phase};

use crate::controls::Controls;

use super::{GlobalConfig, Module};

#[derive(ByteStruct, Serialize, Deserialize, Clone, Copy, Debug, Default)]
#[byte_struct_le]
pub struct ServoRemapConfig {
    /// Logical channel feeding each output channel.
    pub source: [u8; OUTPUT_CHANNELS],
}

/// Maps logical channels onto output channels, decoupling receiver plug
/// order from the mixing logic. First stage of the servo group.
#[derive(Serialize, Deserialize, Default)]
pub struct ServoRemap {
    config: GlobalConfig<ServoRemapConfig>,
}

impl ServoRemap {
    pub fn new() -> Self {
        let mut m = Self::default();
        m.set_defaults();
        m
    }

    pub fn source(&self, out_ch: usize) -> Option<u8> {
        self.config.active().source.get(out_ch).copied()
    }

    pub fn set_source(&mut self, out_ch: usize, logical_ch: u8) {
        if let Some(s) = self.config.active_mut().source.get_mut(out_ch) {
            *s = logical_ch;
        }
    }
}

#[typetag::serde]
impl Module for ServoRemap {
    fn kind(&self) -> ModuleKind {
        ModuleKind::ServoRemap
    }

    fn name(&self) -> &'static str {
        "Servo remap"
    }

    fn run(&mut self, controls: &mut Controls) {
        for out_ch in 0..OUTPUT_CHANNELS {
            let source = self.config.active().source[out_ch] as usize;
            controls.output_set(out_ch, controls.logical_get(source));
        }
    }

    fn switch_phase(&mut self, phase: Phase) {
        self.config.switch_phase(phase);
    }

    fn set_defaults(&mut self) {
        let cfg = self.config.active_mut();
        for (out_ch, source) in cfg.source.iter_mut().enumerate() {
            *source = out_ch.min(LOGICAL_CHANNELS - 1) as u8;
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

    #[test]
    fn default_mapping_is_identity() {
        let mut m = ServoRemap::new();
        let mut controls = Controls::new();
        for ch in 0..LOGICAL_CHANNELS {
            controls.logical_set(ch, 10 * ch as i16);
        }

        m.run(&mut controls);
        for ch in 0..OUTPUT_CHANNELS {
            assert_eq!(controls.output_get(ch), 10 * ch as i16);
        }
    }

    #[test]
    fn one_logical_channel_can_feed_several_outputs() {
        let mut m = ServoRemap::new();
        m.set_source(0, 2);
        m.set_source(1, 2);
        let mut controls = Controls::new();
        controls.logical_set(2, 444);

        m.run(&mut controls);
        assert_eq!(controls.output_get(0), 444);
        assert_eq!(controls.output_get(1), 444);
    }
}
