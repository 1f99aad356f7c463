use byte_struct::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use txctl_shared::{
    ModuleKind, PHASES, Phase, SWITCH_NONE, SWITCHES, SwitchConf, SwitchState,
};

use crate::controls::Controls;

use super::{GlobalConfig, Module};

/// Selectable display names for a flight phase.
pub const PHASE_NAMES: [&str; 7] = [
    "Normal", "Thermal", "Speed", "Start", "Land", "Acro", "Acro 2",
];

#[derive(ByteStruct, Serialize, Deserialize, Clone, Copy, Debug)]
#[byte_struct_le]
pub struct PhasesConfig {
    /// Switch selecting the phase, or [`SWITCH_NONE`].
    pub sw: u8,
    /// Index into [`PHASE_NAMES`] for each phase.
    pub phase_name: [u8; PHASES],
}

impl Default for PhasesConfig {
    fn default() -> Self {
        Self {
            sw: SWITCH_NONE,
            phase_name: [0, 1, 2],
        }
    }
}

/// Tracks the flight phase selected by a switch. A detected change is not
/// applied directly; it is handed to the manager, which broadcasts it to
/// every module after the current pass.
#[derive(Serialize, Deserialize, Default)]
pub struct Phases {
    config: GlobalConfig<PhasesConfig>,
    #[serde(skip)]
    phase: Phase,
    #[serde(skip)]
    pending: Option<Phase>,
}

impl Phases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn phase_name(&self) -> &'static str {
        let index = self
            .config
            .active()
            .phase_name
            .get(self.phase as usize)
            .copied()
            .unwrap_or(0) as usize;
        PHASE_NAMES.get(index).copied().unwrap_or(PHASE_NAMES[0])
    }

    pub fn set_switch(&mut self, sw: u8) {
        self.config.active_mut().sw = sw;
    }

    pub fn set_phase_name(&mut self, phase: Phase, name_index: u8) {
        if let Some(n) = self
            .config
            .active_mut()
            .phase_name
            .get_mut(phase as usize)
        {
            *n = name_index.min(PHASE_NAMES.len() as u8 - 1);
        }
    }
}

#[typetag::serde]
impl Module for Phases {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Phases
    }

    fn name(&self) -> &'static str {
        "Phases"
    }

    fn run(&mut self, controls: &mut Controls) {
        let sw = self.config.active().sw;
        if sw != SWITCH_NONE {
            let state = controls.switch_get(sw as usize);
            let selected = u8::from(state);
            if (selected as usize) < PHASES && selected != self.phase {
                info!(phase = selected, "flight phase change requested");
                self.pending = Some(selected);
            }
        }

        // Phase-reflecting switches mirror the current phase so downstream
        // switch conditions can key on it
        for sw in 0..SWITCHES {
            if controls.switch_conf_get(sw) == SwitchConf::PhaseReflecting {
                controls.switch_set(sw, SwitchState::from(self.phase));
            }
        }
    }

    fn switch_phase(&mut self, phase: Phase) {
        if (phase as usize) < PHASES {
            self.phase = phase;
        }
    }

    fn set_defaults(&mut self) {
        *self.config.active_mut() = PhasesConfig::default();
        self.phase = 0;
        self.pending = None;
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

    fn take_phase_request(&mut self) -> Option<Phase> {
        self.pending.take()
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
    fn phase_change_is_requested_not_applied() {
        let mut m = Phases::new();
        m.set_switch(0);
        let mut controls = Controls::new();
        controls.switch_set(0, SwitchState::State2);

        m.run(&mut controls);
        assert_eq!(m.phase(), 0);
        assert_eq!(m.take_phase_request(), Some(2));
        // A second take yields nothing
        assert_eq!(m.take_phase_request(), None);

        m.switch_phase(2);
        assert_eq!(m.phase(), 2);
    }

    #[test]
    fn unchanged_switch_requests_nothing() {
        let mut m = Phases::new();
        m.set_switch(0);
        let mut controls = Controls::new();
        controls.switch_set(0, SwitchState::State0);

        m.run(&mut controls);
        assert_eq!(m.take_phase_request(), None);
    }

    #[test]
    fn dontcare_switch_state_is_ignored() {
        let mut m = Phases::new();
        m.set_switch(5);
        let mut controls = Controls::new();
        // Switch 5 was never acquired and reads don't-care

        m.run(&mut controls);
        assert_eq!(m.take_phase_request(), None);
        assert_eq!(m.phase(), 0);
    }

    #[test]
    fn phase_names_resolve() {
        let mut m = Phases::new();
        assert_eq!(m.phase_name(), "Normal");
        m.set_phase_name(0, 4);
        assert_eq!(m.phase_name(), "Land");
    }
}
