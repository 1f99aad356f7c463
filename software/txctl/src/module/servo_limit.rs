use byte_struct::*;
use serde::{Deserialize, Serialize};

use txctl_shared::{ModuleKind, OUTPUT_CHANNELS, PERCENT_MAX, PERCENT_MIN, Percent, Phase,
    pct_to_channel};

use crate::controls::Controls;

use super::{GlobalConfig, Module};

#[derive(ByteStruct, Serialize, Deserialize, Clone, Copy, Debug)]
#[byte_struct_le]
pub struct ServoLimitConfig {
    /// Upper travel bound per output, in percent.
    pub pos_limit_pct: [i8; OUTPUT_CHANNELS],
    /// Lower travel bound per output, in percent.
    pub neg_limit_pct: [i8; OUTPUT_CHANNELS],
}

impl Default for ServoLimitConfig {
    fn default() -> Self {
        Self {
            pos_limit_pct: [PERCENT_MAX; OUTPUT_CHANNELS],
            neg_limit_pct: [PERCENT_MIN; OUTPUT_CHANNELS],
        }
    }
}

/// Hard-bounds each output channel so no mix can push a servo into its
/// mechanical stop. Runs as the last stage of the pipeline.
#[derive(Serialize, Deserialize, Default)]
pub struct ServoLimit {
    config: GlobalConfig<ServoLimitConfig>,
}

impl ServoLimit {
    pub fn new() -> Self {
        let mut m = Self::default();
        m.set_defaults();
        m
    }

    pub fn set_limits(&mut self, ch: usize, neg_pct: Percent, pos_pct: Percent) {
        let cfg = self.config.active_mut();
        if ch >= OUTPUT_CHANNELS {
            return;
        }
        cfg.neg_limit_pct[ch] = neg_pct.clamp(PERCENT_MIN, PERCENT_MAX);
        cfg.pos_limit_pct[ch] = pos_pct.clamp(PERCENT_MIN, PERCENT_MAX);
    }
}

#[typetag::serde]
impl Module for ServoLimit {
    fn kind(&self) -> ModuleKind {
        ModuleKind::ServoLimit
    }

    fn name(&self) -> &'static str {
        "Servo limit"
    }

    fn run(&mut self, controls: &mut Controls) {
        let cfg = *self.config.active();
        for ch in 0..OUTPUT_CHANNELS {
            let low = pct_to_channel(cfg.neg_limit_pct[ch]);
            let high = pct_to_channel(cfg.pos_limit_pct[ch]);
            let v = controls.output_get(ch);
            if high >= low {
                controls.output_set(ch, v.clamp(low, high));
            } else {
                // Inverted bounds from a corrupt record pin to the lower one
                controls.output_set(ch, high);
            }
        }
    }

    fn switch_phase(&mut self, phase: Phase) {
        self.config.switch_phase(phase);
    }

    fn set_defaults(&mut self) {
        *self.config.active_mut() = ServoLimitConfig::default();
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
