//! Module scheduling and configuration block packing.
//!
//! The `ModuleManager` owns the module chain, runs it in run-list order
//! once per cycle, and moves module configuration in and out of stored
//! blocks through the [`ConfigStore`].

use tracing::{info, warn};

use txctl_shared::{
    MODULE_KIND_END, ModuleKind, Phase,
    block::SYSTEM_BLOCK_ID,
};

use crate::controls::Controls;
use crate::module::Module;
use crate::storage::{BlockStatus, ConfigStore};

pub struct ModuleManager {
    /// Registration order; stable identity for the two index orders below.
    modules: Vec<Box<dyn Module>>,
    /// Execution order of one pass. The chain is a designed dependency
    /// chain (reversing acts on mixed values, limiting acts last), so this
    /// is set deliberately, not cosmetically.
    run_order: Vec<usize>,
    /// Presentation order for configuration surfaces, independent of the
    /// execution order.
    menu_order: Vec<usize>,
    store: ConfigStore,
}

impl ModuleManager {
    pub fn new(store: ConfigStore) -> Self {
        Self {
            modules: Vec::new(),
            run_order: Vec::new(),
            menu_order: Vec::new(),
            store,
        }
    }

    /// Append a module to the chain. Both orders start out as the
    /// registration order.
    pub fn add(&mut self, module: Box<dyn Module>) {
        self.run_order.push(self.modules.len());
        self.menu_order.push(self.modules.len());
        self.modules.push(module);
    }

    fn check_order(&self, order: &[usize]) -> Result<(), String> {
        let mut seen = vec![false; self.modules.len()];
        for &i in order {
            if i >= seen.len() || seen[i] {
                return Err(format!("order entry {i} is out of range or repeated"));
            }
            seen[i] = true;
        }
        if !seen.iter().all(|s| *s) {
            return Err("order does not cover every module".to_string());
        }
        Ok(())
    }

    /// Change the execution order. The order must mention each registered
    /// module exactly once.
    pub fn set_run_order(&mut self, order: Vec<usize>) -> Result<(), String> {
        self.check_order(&order)?;
        self.run_order = order;
        Ok(())
    }

    /// Reorder the configuration menu; execution order is unaffected.
    pub fn set_menu_order(&mut self, order: Vec<usize>) -> Result<(), String> {
        self.check_order(&order)?;
        self.menu_order = order;
        Ok(())
    }

    /// Modules in menu order.
    pub fn menu_modules(&self) -> impl Iterator<Item = &dyn Module> {
        self.menu_order.iter().map(|&i| self.modules[i].as_ref())
    }

    pub fn modules(&self) -> &[Box<dyn Module>] {
        &self.modules
    }

    /// Borrow a module by concrete type, for display and configuration
    /// surfaces.
    pub fn module_as<T: Module + 'static>(&self) -> Option<&T> {
        self.modules
            .iter()
            .find_map(|m| m.as_any().downcast_ref::<T>())
    }

    pub fn module_as_mut<T: Module + 'static>(&mut self) -> Option<&mut T> {
        self.modules
            .iter_mut()
            .find_map(|m| m.as_any_mut().downcast_mut::<T>())
    }

    /// Run one pass over the module chain, then apply at most one flight
    /// phase change requested during the pass.
    ///
    /// Collecting requests after the pass keeps the broadcast out of the
    /// pass itself, so every module sees the same phase for a whole cycle
    /// and a change is applied exactly once.
    pub fn run_modules(&mut self, controls: &mut Controls) {
        for idx in 0..self.run_order.len() {
            let i = self.run_order[idx];
            self.modules[i].run(controls);
        }

        let mut request = None;
        for module in self.modules.iter_mut() {
            if let Some(phase) = module.take_phase_request() {
                request = Some(phase);
            }
        }
        if let Some(phase) = request {
            self.switch_phase(phase);
        }
    }

    /// Broadcast a flight phase change to every module, in run-list order.
    pub fn switch_phase(&mut self, phase: Phase) {
        info!(phase, "switching flight phase");
        for idx in 0..self.run_order.len() {
            let i = self.run_order[idx];
            self.modules[i].switch_phase(phase);
        }
    }

    /// Reset every module of one scope to factory configuration.
    pub fn set_defaults(&mut self, system: bool) {
        for module in self.modules.iter_mut() {
            if module.is_system() == system {
                module.set_defaults();
            }
        }
    }

    /// Load per-model configuration from a block. On checksum mismatch the
    /// model modules fall back to factory defaults; the stored block is
    /// left untouched for inspection.
    pub fn load_model(&mut self, id: u8) -> BlockStatus {
        let status = self.store.read_block(id);
        match status {
            BlockStatus::Ok => self.unpack_modules(false),
            BlockStatus::ChecksumMismatch => {
                warn!(block = id, "model block failed verification, using defaults");
                self.set_defaults(false);
            }
            BlockStatus::InvalidId => return status,
        }

        for module in self.modules.iter_mut() {
            if !module.is_system() {
                module.init();
            }
        }
        info!(block = id, "model configuration loaded");
        status
    }

    /// Pack per-model configuration and commit it to a block.
    pub fn save_model(&mut self, id: u8) -> BlockStatus {
        if !self.store.bind(id) {
            return BlockStatus::InvalidId;
        }
        self.pack_modules(false);
        let status = self.store.write_block();
        if status == BlockStatus::Ok {
            info!(block = id, "model configuration saved");
        }
        status
    }

    /// Load system-scope configuration. A failed verification restores
    /// factory defaults in memory; the stored block is left untouched.
    pub fn load_system_config(&mut self) -> BlockStatus {
        let status = self.store.read_block(SYSTEM_BLOCK_ID);
        match status {
            BlockStatus::Ok => self.unpack_modules(true),
            BlockStatus::ChecksumMismatch => {
                warn!("system block failed verification, using defaults");
                self.set_defaults(true);
            }
            BlockStatus::InvalidId => return status,
        }

        for module in self.modules.iter_mut() {
            if module.is_system() {
                module.init();
            }
        }
        status
    }

    pub fn save_system_config(&mut self) -> BlockStatus {
        if !self.store.bind(SYSTEM_BLOCK_ID) {
            return BlockStatus::InvalidId;
        }
        self.pack_modules(true);
        let status = self.store.write_block();
        if status == BlockStatus::Ok {
            info!("system configuration saved");
        }
        status
    }

    /// Serialize each module of one scope into the bound block payload as
    /// `(kind, size, bytes)` records with a terminator.
    ///
    /// A module that no longer fits is dropped from the stored image with
    /// an error log; the records before it stay intact.
    fn pack_modules(&mut self, system: bool) {
        let payload = self.store.payload_mut();
        let mut offset = 0;

        for &i in &self.run_order {
            let module = &self.modules[i];
            if module.is_system() != system {
                continue;
            }
            let size = module.config_size();
            debug_assert!(size < u8::MAX as usize);
            // Record plus room for the terminator
            if offset + 2 + size + 1 > payload.len() {
                tracing::error!(
                    module = module.name(),
                    "configuration does not fit the block, dropping from stored image"
                );
                break;
            }
            payload[offset] = u8::from(module.kind());
            payload[offset + 1] = size as u8;
            module.export_config(&mut payload[offset + 2..offset + 2 + size]);
            offset += 2 + size;
        }

        payload[offset] = MODULE_KIND_END;
        payload[offset + 1..].fill(txctl_shared::block::STORAGE_ERASED);
    }

    /// Walk the `(kind, size, bytes)` records of the bound block payload
    /// and hand each to its module. Unknown kinds are skipped by their
    /// recorded size, so blocks written by other firmware revisions load
    /// as far as they can.
    fn unpack_modules(&mut self, system: bool) {
        let payload = self.store.payload();
        let mut records: Vec<(ModuleKind, Vec<u8>)> = Vec::new();

        let mut offset = 0;
        while offset + 2 <= payload.len() {
            let kind_raw = payload[offset];
            if kind_raw == MODULE_KIND_END {
                break;
            }
            let size = payload[offset + 1] as usize;
            if offset + 2 + size > payload.len() {
                warn!("truncated configuration record, stopping");
                break;
            }
            records.push((
                ModuleKind::from(kind_raw),
                payload[offset + 2..offset + 2 + size].to_vec(),
            ));
            offset += 2 + size;
        }

        for (kind, bytes) in records {
            let module = self
                .modules
                .iter_mut()
                .find(|m| m.is_system() == system && m.kind() == kind);
            match module {
                Some(module) => {
                    if let Err(e) = module.import_config(&bytes) {
                        warn!(module = module.name(), "rejected stored configuration: {e}");
                        module.set_defaults();
                    }
                }
                None => warn!(kind = u8::from(kind), "skipping unknown configuration record"),
            }
        }
    }
}
