//! Control core of an RC transmitter.
//!
//! The core runs a fixed-period frame loop: analog sticks and switches are
//! acquired through a hardware abstraction, a chain of configurable
//! modules shapes the channel values, and the resulting output channels
//! are handed to the pulse encoder. Module configuration is persisted in
//! checksummed storage blocks, one system block plus one block per model.
//!
//! ```no_run
//! use std::sync::Arc;
//! use txctl::hal::{MemoryStorage, MockPorts, ScriptedAdc, SystemClock};
//! use txctl::{ConfigStore, Inputs, Transmitter, TransmitterCtx};
//! use txctl_shared::SwitchConf;
//!
//! let ports = Arc::new(MockPorts::new());
//! let (inputs, mut engine) = Inputs::new(
//!     ports,
//!     [0, 1, 2, 3, 4, 5, 6, 7],
//!     [SwitchConf::Unused; txctl_shared::SWITCHES],
//!     Box::new(ScriptedAdc::new()),
//!     0,
//! );
//! let store = ConfigStore::new(Box::new(MemoryStorage::new(4096)));
//! let mut tx = Transmitter::new(
//!     TransmitterCtx::default(),
//!     inputs,
//!     store,
//!     Arc::new(SystemClock::new()),
//! );
//! tx.boot().unwrap();
//! loop {
//!     engine.start_frame();
//!     // ... conversion completions are delivered to the engine ...
//!     tx.cycle();
//!     let _throttle = tx.controls().output_get(0);
//! }
//! ```

pub mod context;
pub mod controls;
pub mod hal;
pub mod input;
mod logging;
pub mod module;
pub mod pipeline;
pub mod storage;
pub mod transmitter;

pub use context::TransmitterCtx;
pub use controls::Controls;
pub use input::{Inputs, SampleLatch, SamplingEngine};
pub use module::Module;
pub use pipeline::ModuleManager;
pub use storage::{BlockStatus, ConfigStore};
pub use transmitter::Transmitter;
