//! Hardware access traits consumed by the control core, plus in-memory
//! mockups of each for desktop simulation and tests.
//!
//! The core never touches registers directly; a board support crate
//! implements these traits for the real target, and the mockups here stand
//! in everywhere else.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Identifies one digital I/O line of the board.
pub type Pin = u8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinMode {
    Input,
    InputPullup,
    Output,
}

/// Digital I/O lines.
///
/// Methods take `&self` because on real hardware these are single register
/// accesses; mockups use interior mutability.
pub trait Ports: Send + Sync {
    /// Configure the direction and pull of a pin.
    fn port_init(&self, pin: Pin, mode: PinMode);

    /// Drive an output pin.
    fn port_set(&self, pin: Pin, level: bool);

    /// Read the current level of a pin.
    fn port_get(&self, pin: Pin) -> bool;
}

/// One-conversion-at-a-time analog source behind a channel mux.
///
/// `select_and_start` returns immediately; the completion of the conversion
/// is delivered asynchronously to
/// [`SamplingEngine::on_conversion_complete`](crate::input::SamplingEngine::on_conversion_complete).
pub trait AdcSource: Send {
    fn select_and_start(&mut self, mux: usize);
}

/// Monotonic milliseconds since power-up. Wraps at `u32::MAX`.
pub trait Clock: Send + Sync {
    fn millis(&self) -> u32;
}

/// Byte-addressed non-volatile storage.
///
/// Mirrors an EEPROM interface: reads and writes of arbitrary ranges,
/// no erase cycle visible to the caller, no failure reporting.
pub trait Storage: Send {
    fn capacity(&self) -> usize;
    fn read(&self, offset: usize, buf: &mut [u8]);
    fn write(&mut self, offset: usize, bytes: &[u8]);
}

/// Wall-clock-backed [`Clock`] for desktop use.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn millis(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

#[derive(Clone, Copy, Debug)]
struct PinSim {
    mode: PinMode,
    /// Level seen when the pin floats (mode `Input`).
    plain_level: bool,
    /// Level seen with the internal pullup engaged.
    pullup_level: bool,
}

impl Default for PinSim {
    fn default() -> Self {
        Self {
            mode: PinMode::Input,
            plain_level: false,
            pullup_level: true,
        }
    }
}

/// Simulated digital I/O. Tests script the level a pin reads back in each
/// input mode, which is enough to model both two-position switches and the
/// plain/pullup discrimination of three-position ones.
#[derive(Clone, Default)]
pub struct MockPorts {
    pins: Arc<Mutex<HashMap<Pin, PinSim>>>,
}

impl MockPorts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the level a pin reads in both input modes.
    pub fn set_level(&self, pin: Pin, level: bool) {
        self.set_levels(pin, level, level);
    }

    /// Set the levels a pin reads in plain-input and pullup-input mode
    /// separately.
    pub fn set_levels(&self, pin: Pin, plain: bool, pullup: bool) {
        let mut pins = self.pins.lock().unwrap();
        let sim = pins.entry(pin).or_default();
        sim.plain_level = plain;
        sim.pullup_level = pullup;
    }

    pub fn mode(&self, pin: Pin) -> Option<PinMode> {
        self.pins.lock().unwrap().get(&pin).map(|sim| sim.mode)
    }
}

impl Ports for MockPorts {
    fn port_init(&self, pin: Pin, mode: PinMode) {
        self.pins.lock().unwrap().entry(pin).or_default().mode = mode;
    }

    fn port_set(&self, pin: Pin, level: bool) {
        let mut pins = self.pins.lock().unwrap();
        let sim = pins.entry(pin).or_default();
        sim.plain_level = level;
        sim.pullup_level = level;
    }

    fn port_get(&self, pin: Pin) -> bool {
        let pins = self.pins.lock().unwrap();
        match pins.get(&pin) {
            Some(sim) => match sim.mode {
                PinMode::InputPullup => sim.pullup_level,
                _ => sim.plain_level,
            },
            None => false,
        }
    }
}

/// Records which mux channels were selected, without producing results on
/// its own; tests deliver conversion results by hand.
#[derive(Clone, Default)]
pub struct ScriptedAdc {
    selections: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedAdc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selections(&self) -> Vec<usize> {
        self.selections.lock().unwrap().clone()
    }
}

impl AdcSource for ScriptedAdc {
    fn select_and_start(&mut self, mux: usize) {
        self.selections.lock().unwrap().push(mux);
    }
}

/// Manually advanced [`Clock`].
#[derive(Clone, Default)]
pub struct MockClock {
    now: Arc<Mutex<u32>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u32) {
        *self.now.lock().unwrap() += ms;
    }

    pub fn set(&self, ms: u32) {
        *self.now.lock().unwrap() = ms;
    }
}

impl Clock for MockClock {
    fn millis(&self) -> u32 {
        *self.now.lock().unwrap()
    }
}

/// In-memory [`Storage`] initialized to the erased pattern. Clones share
/// the same backing bytes, so a test can keep a handle to inspect or
/// corrupt storage that the config store owns.
#[derive(Clone)]
pub struct MemoryStorage {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: Arc::new(Mutex::new(vec![
                txctl_shared::block::STORAGE_ERASED;
                capacity
            ])),
        }
    }

    /// Flip bits of one stored byte, bypassing the [`Storage`] interface.
    pub fn corrupt(&self, offset: usize, mask: u8) {
        let mut bytes = self.bytes.lock().unwrap();
        if let Some(b) = bytes.get_mut(offset) {
            *b ^= mask;
        }
    }
}

impl Storage for MemoryStorage {
    fn capacity(&self) -> usize {
        self.bytes.lock().unwrap().len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) {
        let bytes = self.bytes.lock().unwrap();
        let end = (offset + buf.len()).min(bytes.len());
        if offset >= end {
            buf.fill(txctl_shared::block::STORAGE_ERASED);
            return;
        }
        let n = end - offset;
        buf[..n].copy_from_slice(&bytes[offset..end]);
        buf[n..].fill(txctl_shared::block::STORAGE_ERASED);
    }

    fn write(&mut self, offset: usize, data: &[u8]) {
        let mut bytes = self.bytes.lock().unwrap();
        let end = (offset + data.len()).min(bytes.len());
        if offset >= end {
            return;
        }
        let n = end - offset;
        bytes[offset..end].copy_from_slice(&data[..n]);
    }
}
