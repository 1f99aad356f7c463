use byte_struct::*;
use serde::{Deserialize, Serialize};

use txctl_shared::{ModuleKind, OUTPUT_CHANNELS, Phase};

use crate::controls::Controls;

use super::{GlobalConfig, Module};

#[derive(ByteStruct, Serialize, Deserialize, Clone, Copy, Debug, Default)]
#[byte_struct_le]
pub struct ServoReverseConfig {
    /// Bit per output channel; set bits negate.
    pub rev_bits: u16,
}

/// Negates selected output channels to match servo installation direction.
#[derive(Serialize, Deserialize, Default)]
pub struct ServoReverse {
    config: GlobalConfig<ServoReverseConfig>,
}

impl ServoReverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_reversed(&self, ch: usize) -> bool {
        ch < OUTPUT_CHANNELS && self.config.active().rev_bits & (1 << ch) != 0
    }

    pub fn set_reversed(&mut self, ch: usize, reversed: bool) {
        if ch >= OUTPUT_CHANNELS {
            return;
        }
        let bits = &mut self.config.active_mut().rev_bits;
        if reversed {
            *bits |= 1 << ch;
        } else {
            *bits &= !(1 << ch);
        }
    }
}

#[typetag::serde]
impl Module for ServoReverse {
    fn kind(&self) -> ModuleKind {
        ModuleKind::ServoReverse
    }

    fn name(&self) -> &'static str {
        "Servo reverse"
    }

    fn run(&mut self, controls: &mut Controls) {
        for ch in 0..OUTPUT_CHANNELS {
            if self.config.active().rev_bits & (1 << ch) != 0 {
                controls.output_set(ch, -controls.output_get(ch));
            }
        }
    }

    fn switch_phase(&mut self, phase: Phase) {
        self.config.switch_phase(phase);
    }

    fn set_defaults(&mut self) {
        self.config.active_mut().rev_bits = 0;
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
    fn reverses_only_selected_outputs() {
        let mut m = ServoReverse::new();
        m.set_reversed(3, true);
        let mut controls = Controls::new();
        controls.output_set(2, 500);
        controls.output_set(3, 500);

        m.run(&mut controls);
        assert_eq!(controls.output_get(2), 500);
        assert_eq!(controls.output_get(3), -500);
    }
}
