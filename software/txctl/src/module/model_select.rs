use byte_struct::*;
use serde::{Deserialize, Serialize};

use txctl_shared::{
    ModuleKind, Phase,
    block::{CONFIG_BLOCKS, FIRST_MODEL_BLOCK_ID},
};

use crate::controls::Controls;

use super::{GlobalConfig, Module};

#[derive(ByteStruct, Serialize, Deserialize, Clone, Copy, Debug)]
#[byte_struct_le]
pub struct ModelSelectConfig {
    /// Storage block of the model to load at boot.
    pub model_block: u8,
}

impl Default for ModelSelectConfig {
    fn default() -> Self {
        Self {
            model_block: FIRST_MODEL_BLOCK_ID,
        }
    }
}

/// Remembers which model block to load at boot. Lives in the system block,
/// not in any model block.
#[derive(Serialize, Deserialize, Default)]
pub struct ModelSelect {
    config: GlobalConfig<ModelSelectConfig>,
}

impl ModelSelect {
    pub fn new() -> Self {
        let mut m = Self::default();
        m.set_defaults();
        m
    }

    pub fn model_block(&self) -> u8 {
        self.config.active().model_block
    }

    /// Select another model block. Out-of-range selections are clamped
    /// into the model block range.
    pub fn set_model_block(&mut self, block: u8) {
        self.config.active_mut().model_block =
            block.clamp(FIRST_MODEL_BLOCK_ID, CONFIG_BLOCKS - 1);
    }
}

#[typetag::serde]
impl Module for ModelSelect {
    fn kind(&self) -> ModuleKind {
        ModuleKind::ModelSelect
    }

    fn name(&self) -> &'static str {
        "Model select"
    }

    fn run(&mut self, _controls: &mut Controls) {}

    fn switch_phase(&mut self, phase: Phase) {
        self.config.switch_phase(phase);
    }

    fn set_defaults(&mut self) {
        *self.config.active_mut() = ModelSelectConfig::default();
    }

    fn config_size(&self) -> usize {
        self.config.byte_len()
    }

    fn export_config(&self, out: &mut [u8]) {
        self.config.export(out);
    }

    fn import_config(&mut self, bytes: &[u8]) -> Result<(), String> {
        self.config.import(bytes)?;
        // Stored selection may predate a smaller block layout
        let block = self.config.active().model_block;
        self.set_model_block(block);
        Ok(())
    }

    fn is_system(&self) -> bool {
        true
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
    fn defaults_to_first_model_block() {
        assert_eq!(ModelSelect::new().model_block(), FIRST_MODEL_BLOCK_ID);
    }

    #[test]
    fn selection_is_clamped_to_model_range() {
        let mut m = ModelSelect::new();
        m.set_model_block(0);
        assert_eq!(m.model_block(), FIRST_MODEL_BLOCK_ID);
        m.set_model_block(200);
        assert_eq!(m.model_block(), CONFIG_BLOCKS - 1);
        m.set_model_block(3);
        assert_eq!(m.model_block(), 3);
    }

    #[test]
    fn lives_in_system_scope() {
        assert!(ModelSelect::new().is_system());
    }
}
