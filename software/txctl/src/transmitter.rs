//! Top-level assembly of the control core.

use std::sync::Arc;

use tracing::info;

use txctl_shared::block::FIRST_MODEL_BLOCK_ID;

use crate::context::TransmitterCtx;
use crate::controls::Controls;
use crate::hal::Clock;
use crate::input::Inputs;
use crate::logging::init_logging;
use crate::module::{
    AssignInput, ChannelDelay, ChannelReverse, FlightTimer, ModelSelect, PhaseTrim, Phases,
    ServoLimit, ServoRemap, ServoReverse, ServoSubtrim,
};
use crate::pipeline::ModuleManager;
use crate::storage::{BlockStatus, ConfigStore};

/// The transmitter control core: input acquisition, the module pipeline
/// and persistent configuration, wired together over a hardware
/// abstraction. All collaborators reach shared state through this object;
/// there are no globals.
pub struct Transmitter {
    pub ctx: TransmitterCtx,
    controls: Controls,
    inputs: Inputs,
    manager: ModuleManager,
}

impl Transmitter {
    /// Assemble the core with the standard module chain.
    ///
    /// Processing order is fixed here: input assignment and logical-channel
    /// shaping first, phase and timer bookkeeping, then the servo group
    /// with the travel limiter last.
    pub fn new(
        ctx: TransmitterCtx,
        inputs: Inputs,
        store: ConfigStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut manager = ModuleManager::new(store);
        manager.add(Box::new(ModelSelect::new()));
        manager.add(Box::new(AssignInput::new()));
        manager.add(Box::new(ChannelReverse::new()));
        manager.add(Box::new(PhaseTrim::new()));
        manager.add(Box::new(ChannelDelay::new()));
        manager.add(Box::new(Phases::new()));
        manager.add(Box::new(FlightTimer::new(clock)));
        manager.add(Box::new(ServoRemap::new()));
        manager.add(Box::new(ServoReverse::new()));
        manager.add(Box::new(ServoSubtrim::new()));
        manager.add(Box::new(ServoLimit::new()));

        Self {
            ctx,
            controls: Controls::new(),
            inputs,
            manager,
        }
    }

    /// Set up logging and bring stored configuration in: the system block
    /// first, then the model block it selects.
    pub fn boot(&mut self) -> Result<(), String> {
        let (log_path, _guards) = init_logging(&self.ctx.session_dir, &self.ctx.session_name)?;
        info!("logging to {:?}", log_path);

        self.manager.load_system_config();
        let model = self.selected_model();
        self.manager.load_model(model);
        Ok(())
    }

    /// Run one frame: acquire operator input, then one pass over the
    /// module chain. The resulting output channels stay readable through
    /// [`controls`](Self::controls) until the next cycle.
    pub fn cycle(&mut self) {
        self.controls.acquire(&self.inputs);
        self.manager.run_modules(&mut self.controls);
    }

    /// Persist the current model configuration and remember it as the one
    /// to load at boot.
    pub fn save_model(&mut self, id: u8) -> BlockStatus {
        let status = self.manager.save_model(id);
        if status != BlockStatus::Ok {
            return status;
        }
        if let Some(select) = self.manager.module_as_mut::<ModelSelect>() {
            select.set_model_block(id);
        }
        self.manager.save_system_config()
    }

    /// Switch to another stored model.
    pub fn select_model(&mut self, id: u8) -> BlockStatus {
        let status = self.manager.load_model(id);
        if status == BlockStatus::InvalidId {
            return status;
        }
        if let Some(select) = self.manager.module_as_mut::<ModelSelect>() {
            select.set_model_block(id);
        }
        self.manager.save_system_config()
    }

    pub fn selected_model(&self) -> u8 {
        self.manager
            .module_as::<ModelSelect>()
            .map(|m| m.model_block())
            .unwrap_or(FIRST_MODEL_BLOCK_ID)
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    pub fn manager(&self) -> &ModuleManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ModuleManager {
        &mut self.manager
    }
}
