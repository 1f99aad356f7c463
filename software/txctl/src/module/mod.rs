//! Transformation stages that are run at each cycle during operation.
//!
//! `Module` objects are registered with the `ModuleManager` in processing
//! order. Each module reads and writes channel values in [`Controls`] and
//! carries its own configuration, which it can export to and import from
//! stored configuration blocks.

use std::any::Any;
use std::collections::BTreeMap;

use byte_struct::*;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::warn;

// Specific module implementations

mod assign_input;
mod channel_delay;
mod channel_reverse;
mod flight_timer;
mod model_select;
mod phase_trim;
mod phases;
mod servo_limit;
mod servo_remap;
mod servo_reverse;
mod servo_subtrim;

pub use assign_input::AssignInput;
pub use channel_delay::ChannelDelay;
pub use channel_reverse::ChannelReverse;
pub use flight_timer::FlightTimer;
pub use model_select::ModelSelect;
pub use phase_trim::PhaseTrim;
pub use phases::{PHASE_NAMES, Phases};
pub use servo_limit::ServoLimit;
pub use servo_remap::ServoRemap;
pub use servo_reverse::ServoReverse;
pub use servo_subtrim::ServoSubtrim;

use txctl_shared::{ModuleKind, PHASES, Phase};

use crate::controls::Controls;

/// Modules that can be prototyped
pub trait ModuleProto {
    fn prototype() -> (String, Box<dyn Module>);
}

impl<T> ModuleProto for T
where
    T: Module + Default + 'static,
{
    fn prototype() -> (String, Box<dyn Module>) {
        let name = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap()
            .to_owned();
        let proto: Box<dyn Module> = Box::new(T::default());

        (name, proto)
    }
}

/// Prototypes of each module
pub static PROTOTYPES: Lazy<BTreeMap<String, Box<dyn Module>>> = Lazy::new(|| {
    BTreeMap::<String, Box<dyn Module>>::from([
        AssignInput::prototype(),
        ChannelDelay::prototype(),
        ChannelReverse::prototype(),
        FlightTimer::prototype(),
        ModelSelect::prototype(),
        PhaseTrim::prototype(),
        Phases::prototype(),
        ServoLimit::prototype(),
        ServoRemap::prototype(),
        ServoReverse::prototype(),
        ServoSubtrim::prototype(),
    ])
});

/// One stage of the per-cycle processing chain, with persistent
/// configuration and possibly internal state.
#[typetag::serde(tag = "type")]
pub trait Module: Send + Sync {
    /// Stored-format identity of this module's configuration record.
    fn kind(&self) -> ModuleKind;

    /// Display name for menus and logs.
    fn name(&self) -> &'static str;

    /// Transform channel values for one cycle.
    fn run(&mut self, controls: &mut Controls);

    /// Re-derive internal state after configuration import. Called once
    /// after a block load, never per cycle.
    fn init(&mut self) {}

    /// Make the per-phase configuration slice for `phase` active. Modules
    /// without phased configuration ignore this.
    fn switch_phase(&mut self, phase: Phase);

    /// Reset configuration to factory values.
    fn set_defaults(&mut self);

    /// Stored size of this module's configuration record payload.
    fn config_size(&self) -> usize;

    /// Serialize configuration into a stored record payload of exactly
    /// [`config_size`](Self::config_size) bytes.
    fn export_config(&self, out: &mut [u8]);

    /// Replace configuration from a stored record payload.
    fn import_config(&mut self, bytes: &[u8]) -> Result<(), String>;

    /// Whether this module's configuration lives in the system block
    /// rather than in per-model blocks.
    fn is_system(&self) -> bool {
        false
    }

    /// Hand over a flight phase change requested during
    /// [`run`](Self::run), if any. The manager collects these after the
    /// pass and broadcasts exactly one [`switch_phase`](Self::switch_phase)
    /// to every module.
    fn take_phase_request(&mut self) -> Option<Phase> {
        None
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Configuration shared across all flight phases.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default)]
pub struct GlobalConfig<T> {
    cfg: T,
}

impl<T> GlobalConfig<T> {
    pub fn active(&self) -> &T {
        &self.cfg
    }

    pub fn active_mut(&mut self) -> &mut T {
        &mut self.cfg
    }

    pub fn switch_phase(&mut self, _phase: Phase) {}
}

impl<T> GlobalConfig<T>
where
    T: ByteStruct,
{
    pub fn byte_len(&self) -> usize {
        T::BYTE_LEN
    }

    pub fn export(&self, out: &mut [u8]) {
        self.cfg.write_bytes(out);
    }

    pub fn import(&mut self, bytes: &[u8]) -> Result<(), String> {
        if bytes.len() != T::BYTE_LEN {
            return Err(format!(
                "config record is {} B, expected {} B",
                bytes.len(),
                T::BYTE_LEN
            ));
        }
        self.cfg = T::read_bytes(bytes);
        Ok(())
    }
}

/// Configuration with one independent slice per flight phase. Reads and
/// writes go to the slice selected by the latest phase switch; all slices
/// are stored together.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default)]
pub struct PhasedConfig<T> {
    per_phase: [T; PHASES],
    #[serde(skip)]
    active: usize,
}

impl<T> PhasedConfig<T> {
    pub fn active(&self) -> &T {
        &self.per_phase[self.active]
    }

    pub fn active_mut(&mut self) -> &mut T {
        &mut self.per_phase[self.active]
    }

    pub fn phase(&self, phase: Phase) -> Option<&T> {
        self.per_phase.get(phase as usize)
    }

    pub fn phase_mut(&mut self, phase: Phase) -> Option<&mut T> {
        self.per_phase.get_mut(phase as usize)
    }

    pub fn switch_phase(&mut self, phase: Phase) {
        if (phase as usize) < PHASES {
            self.active = phase as usize;
        } else {
            warn!("phase {phase} out of range, keeping phase {}", self.active);
        }
    }
}

impl<T> PhasedConfig<T>
where
    T: ByteStruct,
{
    pub fn byte_len(&self) -> usize {
        PHASES * T::BYTE_LEN
    }

    pub fn export(&self, out: &mut [u8]) {
        for (slice, chunk) in self.per_phase.iter().zip(out.chunks_exact_mut(T::BYTE_LEN)) {
            slice.write_bytes(chunk);
        }
    }

    pub fn import(&mut self, bytes: &[u8]) -> Result<(), String> {
        if bytes.len() != self.byte_len() {
            return Err(format!(
                "config record is {} B, expected {} B",
                bytes.len(),
                self.byte_len()
            ));
        }
        for (slice, chunk) in self
            .per_phase
            .iter_mut()
            .zip(bytes.chunks_exact(T::BYTE_LEN))
        {
            *slice = T::read_bytes(chunk);
        }
        Ok(())
    }
}

/// Serialize a module chain to portable json, for desktop backup and
/// inspection.
pub fn modules_to_json(modules: &[Box<dyn Module>]) -> Result<String, String> {
    serde_json::to_string_pretty(modules).map_err(|e| format!("module serialization failed: {e}"))
}

/// Inverse of [`modules_to_json`].
pub fn modules_from_json(json: &str) -> Result<Vec<Box<dyn Module>>, String> {
    serde_json::from_str(json).map_err(|e| format!("module deserialization failed: {e}"))
}
