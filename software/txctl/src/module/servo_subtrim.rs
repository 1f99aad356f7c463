use byte_struct::*;
use serde::{Deserialize, Serialize};

use txctl_shared::{ModuleKind, OUTPUT_CHANNELS, Percent, Phase, pct_to_channel};

use crate::controls::Controls;

use super::{GlobalConfig, Module};

#[derive(ByteStruct, Serialize, Deserialize, Clone, Copy, Debug, Default)]
#[byte_struct_le]
pub struct ServoSubtrimConfig {
    /// Per-output center offset in percent of full travel.
    pub subtrim_pct: [i8; OUTPUT_CHANNELS],
}

/// Shifts the center position of each output channel to compensate for
/// servo arm and linkage geometry.
#[derive(Serialize, Deserialize, Default)]
pub struct ServoSubtrim {
    config: GlobalConfig<ServoSubtrimConfig>,
}

impl ServoSubtrim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subtrim(&self, ch: usize) -> Option<Percent> {
        self.config.active().subtrim_pct.get(ch).copied()
    }

    pub fn set_subtrim(&mut self, ch: usize, pct: Percent) {
        if let Some(t) = self.config.active_mut().subtrim_pct.get_mut(ch) {
            *t = pct;
        }
    }
}

#[typetag::serde]
impl Module for ServoSubtrim {
    fn kind(&self) -> ModuleKind {
        ModuleKind::ServoSubtrim
    }

    fn name(&self) -> &'static str {
        "Subtrim"
    }

    fn run(&mut self, controls: &mut Controls) {
        let cfg = *self.config.active();
        for (ch, pct) in cfg.subtrim_pct.iter().enumerate() {
            if *pct != 0 {
                let shifted = controls.output_get(ch) as i32 + pct_to_channel(*pct) as i32;
                controls.output_set(ch, shifted as i16);
            }
        }
    }

    fn switch_phase(&mut self, phase: Phase) {
        self.config.switch_phase(phase);
    }

    fn set_defaults(&mut self) {
        self.config.active_mut().subtrim_pct = [0; OUTPUT_CHANNELS];
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
    use txctl_shared::CHANNEL_VALUE_MAX;

    #[test]
    fn shifts_center_by_percent() {
        let mut m = ServoSubtrim::new();
        m.set_subtrim(0, 5);
        m.set_subtrim(1, -5);
        let mut controls = Controls::new();

        m.run(&mut controls);
        assert_eq!(controls.output_get(0), 50);
        assert_eq!(controls.output_get(1), -50);
    }

    #[test]
    fn shifted_extreme_saturates() {
        let mut m = ServoSubtrim::new();
        m.set_subtrim(0, 20);
        let mut controls = Controls::new();
        controls.output_set(0, CHANNEL_VALUE_MAX);

        m.run(&mut controls);
        assert_eq!(controls.output_get(0), CHANNEL_VALUE_MAX);
    }
}
