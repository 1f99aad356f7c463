use byte_struct::*;
use serde::{Deserialize, Serialize};

use txctl_shared::{
    CHANNEL_VALUE_MAX, CHANNEL_VALUE_MIN, ChannelValue, FRAME_TIME_US, Float1, LOGICAL_CHANNELS,
    ModuleKind, Phase,
};

use crate::controls::Controls;

use super::{GlobalConfig, Module};

/// Internal values are carried at 10x channel resolution so that slow
/// transitions accumulate sub-unit steps without drift.
const SCALING: i32 = 10;

/// Longest configurable transition time, 10.0 seconds. Beyond this the
/// per-cycle step would round down to nothing.
pub const DELAY_MAX_TENTHS: i16 = 100;

#[derive(ByteStruct, Serialize, Deserialize, Clone, Copy, Debug, Default)]
#[byte_struct_le]
pub struct ChannelDelayConfig {
    /// Full-travel transition time towards positive, in tenths of a second.
    /// Zero disables rate limiting in that direction.
    pub pos_delay_tenths: [i16; LOGICAL_CHANNELS],
    /// Same, towards negative.
    pub neg_delay_tenths: [i16; LOGICAL_CHANNELS],
}

/// Rate-limits logical channel transitions, e.g. for slow retract servos
/// or scale flap movement.
#[derive(Serialize, Deserialize, Default)]
pub struct ChannelDelay {
    config: GlobalConfig<ChannelDelayConfig>,
    #[serde(skip)]
    last_value10: [i16; LOGICAL_CHANNELS],
}

impl ChannelDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pos_delay(&self, ch: usize) -> Option<Float1> {
        self.config
            .active()
            .pos_delay_tenths
            .get(ch)
            .map(|t| Float1(*t))
    }

    pub fn neg_delay(&self, ch: usize) -> Option<Float1> {
        self.config
            .active()
            .neg_delay_tenths
            .get(ch)
            .map(|t| Float1(*t))
    }

    pub fn set_pos_delay(&mut self, ch: usize, delay: Float1) {
        if let Some(t) = self.config.active_mut().pos_delay_tenths.get_mut(ch) {
            *t = delay.0.clamp(0, DELAY_MAX_TENTHS);
        }
    }

    pub fn set_neg_delay(&mut self, ch: usize, delay: Float1) {
        if let Some(t) = self.config.active_mut().neg_delay_tenths.get_mut(ch) {
            *t = delay.0.clamp(0, DELAY_MAX_TENTHS);
        }
    }

    fn clamp_delays(&mut self) {
        let cfg = self.config.active_mut();
        for t in cfg
            .pos_delay_tenths
            .iter_mut()
            .chain(cfg.neg_delay_tenths.iter_mut())
        {
            *t = (*t).clamp(0, DELAY_MAX_TENTHS);
        }
    }

    /// Per-cycle step at 10x resolution for a full-travel transition time
    /// given in tenths of a second.
    fn step10(delay_tenths: i16) -> i32 {
        let delay_msec = delay_tenths as i32 * 100;
        ((CHANNEL_VALUE_MAX - CHANNEL_VALUE_MIN) as i32 * SCALING * (FRAME_TIME_US as i32 / 1000)
            / delay_msec)
            .max(1)
    }
}

#[typetag::serde]
impl Module for ChannelDelay {
    fn kind(&self) -> ModuleKind {
        ModuleKind::ChannelDelay
    }

    fn name(&self) -> &'static str {
        "Channel delay"
    }

    fn run(&mut self, controls: &mut Controls) {
        let cfg = *self.config.active();
        for ch in 0..LOGICAL_CHANNELS {
            let target10 = controls.logical_get(ch) as i32 * SCALING;
            let last10 = self.last_value10[ch] as i32;

            let next10 = if target10 > last10 && cfg.pos_delay_tenths[ch] > 0 {
                (last10 + Self::step10(cfg.pos_delay_tenths[ch])).min(target10)
            } else if target10 < last10 && cfg.neg_delay_tenths[ch] > 0 {
                (last10 - Self::step10(cfg.neg_delay_tenths[ch])).max(target10)
            } else {
                target10
            };

            self.last_value10[ch] = next10 as i16;
            controls.logical_set(ch, (next10 / SCALING) as ChannelValue);
        }
    }

    fn init(&mut self) {
        self.last_value10 = [0; LOGICAL_CHANNELS];
    }

    fn switch_phase(&mut self, phase: Phase) {
        self.config.switch_phase(phase);
    }

    fn set_defaults(&mut self) {
        *self.config.active_mut() = ChannelDelayConfig::default();
        self.last_value10 = [0; LOGICAL_CHANNELS];
    }

    fn config_size(&self) -> usize {
        self.config.byte_len()
    }

    fn export_config(&self, out: &mut [u8]) {
        self.config.export(out);
    }

    fn import_config(&mut self, bytes: &[u8]) -> Result<(), String> {
        self.config.import(bytes)?;
        self.clamp_delays();
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
