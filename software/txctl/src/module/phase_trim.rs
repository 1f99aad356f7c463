use byte_struct::*;
use serde::{Deserialize, Serialize};

use txctl_shared::{LOGICAL_CHANNELS, ModuleKind, Percent, Phase, pct_to_channel};

use crate::controls::Controls;

use super::{Module, PhasedConfig};

#[derive(ByteStruct, Serialize, Deserialize, Clone, Copy, Debug, Default)]
#[byte_struct_le]
pub struct PhaseTrimConfig {
    /// Per-channel offset in percent of full travel.
    pub trim_pct: [i8; LOGICAL_CHANNELS],
}

/// Adds a per-flight-phase trim offset to each logical channel, so e.g.
/// a glider can carry different camber in thermal and speed phases.
#[derive(Serialize, Deserialize, Default)]
pub struct PhaseTrim {
    config: PhasedConfig<PhaseTrimConfig>,
}

impl PhaseTrim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trim(&self, phase: Phase, ch: usize) -> Option<Percent> {
        self.config
            .phase(phase)
            .and_then(|cfg| cfg.trim_pct.get(ch).copied())
    }

    pub fn set_trim(&mut self, phase: Phase, ch: usize, pct: Percent) {
        if let Some(t) = self
            .config
            .phase_mut(phase)
            .and_then(|cfg| cfg.trim_pct.get_mut(ch))
        {
            *t = pct;
        }
    }
}

#[typetag::serde]
impl Module for PhaseTrim {
    fn kind(&self) -> ModuleKind {
        ModuleKind::PhaseTrim
    }

    fn name(&self) -> &'static str {
        "Phase trim"
    }

    fn run(&mut self, controls: &mut Controls) {
        let cfg = *self.config.active();
        for (ch, pct) in cfg.trim_pct.iter().enumerate() {
            if *pct != 0 {
                let trimmed = controls.logical_get(ch) as i32 + pct_to_channel(*pct) as i32;
                controls.logical_set(ch, trimmed as i16);
            }
        }
    }

    fn switch_phase(&mut self, phase: Phase) {
        self.config.switch_phase(phase);
    }

    fn set_defaults(&mut self) {
        for phase in 0..txctl_shared::PHASES {
            if let Some(cfg) = self.config.phase_mut(phase as Phase) {
                cfg.trim_pct = [0; LOGICAL_CHANNELS];
            }
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
    use txctl_shared::CHANNEL_VALUE_MAX;

    #[test]
    fn trim_follows_active_phase() {
        let mut m = PhaseTrim::new();
        m.set_trim(0, 0, 10);
        m.set_trim(2, 0, -20);

        let mut controls = Controls::new();
        controls.logical_set(0, 100);
        m.run(&mut controls);
        assert_eq!(controls.logical_get(0), 200);

        m.switch_phase(2);
        controls.logical_set(0, 100);
        m.run(&mut controls);
        assert_eq!(controls.logical_get(0), -100);
    }

    #[test]
    fn trim_saturates_at_travel_limit() {
        let mut m = PhaseTrim::new();
        m.set_trim(0, 0, 50);
        let mut controls = Controls::new();
        controls.logical_set(0, CHANNEL_VALUE_MAX);

        m.run(&mut controls);
        assert_eq!(controls.logical_get(0), CHANNEL_VALUE_MAX);
    }

    #[test]
    fn stored_record_covers_all_phases() {
        let mut m = PhaseTrim::new();
        m.set_trim(1, 3, 25);

        let mut record = vec![0_u8; m.config_size()];
        m.export_config(&mut record);

        let mut back = PhaseTrim::new();
        back.import_config(&record).unwrap();
        assert_eq!(back.trim(1, 3), Some(25));
        assert_eq!(back.trim(0, 3), Some(0));
    }
}
