use byte_struct::*;
use serde::{Deserialize, Serialize};

use txctl_shared::{LOGICAL_CHANNELS, ModuleKind, Phase};

use crate::controls::Controls;

use super::{GlobalConfig, Module};

#[derive(ByteStruct, Serialize, Deserialize, Clone, Copy, Debug, Default)]
#[byte_struct_le]
pub struct ChannelReverseConfig {
    /// Bit per logical channel; set bits negate.
    pub rev_bits: u16,
}

/// Negates selected logical channels, so stick direction can be corrected
/// per model before any mixing.
#[derive(Serialize, Deserialize, Default)]
pub struct ChannelReverse {
    config: GlobalConfig<ChannelReverseConfig>,
}

impl ChannelReverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_reversed(&self, ch: usize) -> bool {
        ch < LOGICAL_CHANNELS && self.config.active().rev_bits & (1 << ch) != 0
    }

    pub fn set_reversed(&mut self, ch: usize, reversed: bool) {
        if ch >= LOGICAL_CHANNELS {
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
impl Module for ChannelReverse {
    fn kind(&self) -> ModuleKind {
        ModuleKind::ChannelReverse
    }

    fn name(&self) -> &'static str {
        "Channel reverse"
    }

    fn run(&mut self, controls: &mut Controls) {
        for ch in 0..LOGICAL_CHANNELS {
            if self.config.active().rev_bits & (1 << ch) != 0 {
                controls.logical_set(ch, -controls.logical_get(ch));
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
    fn only_selected_channels_are_negated() {
        let mut m = ChannelReverse::new();
        m.set_reversed(1, true);
        let mut controls = Controls::new();
        controls.logical_set(0, 300);
        controls.logical_set(1, 300);

        m.run(&mut controls);
        assert_eq!(controls.logical_get(0), 300);
        assert_eq!(controls.logical_get(1), -300);
    }

    #[test]
    fn extreme_values_negate_within_range() {
        let mut m = ChannelReverse::new();
        m.set_reversed(0, true);
        let mut controls = Controls::new();
        controls.logical_set(0, txctl_shared::CHANNEL_VALUE_MIN);

        m.run(&mut controls);
        assert_eq!(controls.logical_get(0), txctl_shared::CHANNEL_VALUE_MAX);
    }
}
