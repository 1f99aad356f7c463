use std::sync::Arc;

use byte_struct::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use txctl_shared::{ModuleKind, Phase, SWITCH_NONE, SwitchState};

use crate::controls::Controls;
use crate::hal::Clock;

use super::{GlobalConfig, Module};

#[derive(ByteStruct, Serialize, Deserialize, Clone, Copy, Debug)]
#[byte_struct_le]
pub struct FlightTimerConfig {
    /// Switch gating the countdown, or [`SWITCH_NONE`].
    pub sw: u8,
    /// Switch state in which the countdown runs.
    pub sw_state: u8,
    /// Countdown start value in seconds.
    pub time_sec: u16,
}

impl Default for FlightTimerConfig {
    fn default() -> Self {
        Self {
            sw: SWITCH_NONE,
            sw_state: u8::from(SwitchState::State1),
            time_sec: 0,
        }
    }
}

/// Counts flight time down while a switch condition holds, e.g. motor run
/// time limited by a competition rule.
///
/// The countdown tolerates cycle jitter by accumulating whole elapsed
/// seconds against a reference tick; a gap of more than half a second over
/// a full second resets the reference rather than bursting.
#[derive(Serialize, Deserialize, Default)]
pub struct FlightTimer {
    config: GlobalConfig<FlightTimerConfig>,
    #[serde(skip)]
    countdown_sec: u16,
    #[serde(skip)]
    last_millis: u32,
    #[serde(skip)]
    clock: Option<Arc<dyn Clock>>,
}

impl FlightTimer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock: Some(clock),
            ..Self::default()
        }
    }

    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = Some(clock);
    }

    pub fn set_switch(&mut self, sw: u8, sw_state: SwitchState) {
        let cfg = self.config.active_mut();
        cfg.sw = sw;
        cfg.sw_state = u8::from(sw_state);
    }

    pub fn set_time(&mut self, time_sec: u16) {
        self.config.active_mut().time_sec = time_sec;
        self.reset();
    }

    /// Seconds remaining on the countdown.
    pub fn countdown_sec(&self) -> u16 {
        self.countdown_sec
    }

    /// Remaining time as `m:ss` for the display.
    pub fn time_str(&self) -> String {
        format!("{}:{:02}", self.countdown_sec / 60, self.countdown_sec % 60)
    }

    pub fn reset(&mut self) {
        self.countdown_sec = self.config.active().time_sec;
        self.last_millis = 0;
    }
}

#[typetag::serde]
impl Module for FlightTimer {
    fn kind(&self) -> ModuleKind {
        ModuleKind::FlightTimer
    }

    fn name(&self) -> &'static str {
        "Timer"
    }

    fn run(&mut self, controls: &mut Controls) {
        let cfg = *self.config.active();
        if self.countdown_sec == 0
            || !controls.eval_switch(cfg.sw, SwitchState::from(cfg.sw_state))
        {
            return;
        }
        let Some(clock) = self.clock.as_ref() else {
            return;
        };

        // Wrapping arithmetic so a millisecond clock rollover reads as a
        // short elapsed interval rather than overflowing
        let now = clock.millis();
        let elapsed = now.wrapping_sub(self.last_millis);
        let mut expired_second = false;
        if elapsed > 1500 {
            // Reference is stale (first run, or the condition was off for
            // a while); restart the second measurement from here
            self.last_millis = now;
        } else if elapsed > 1000 {
            self.last_millis = self.last_millis.wrapping_add(1000);
            expired_second = true;
        }

        if expired_second {
            self.countdown_sec -= 1;
            if self.countdown_sec == 0 {
                info!("flight timer expired");
            }
        }
    }

    fn init(&mut self) {
        self.reset();
    }

    fn switch_phase(&mut self, phase: Phase) {
        self.config.switch_phase(phase);
    }

    fn set_defaults(&mut self) {
        *self.config.active_mut() = FlightTimerConfig::default();
        self.reset();
    }

    fn config_size(&self) -> usize {
        self.config.byte_len()
    }

    fn export_config(&self, out: &mut [u8]) {
        self.config.export(out);
    }

    fn import_config(&mut self, bytes: &[u8]) -> Result<(), String> {
        self.config.import(bytes)?;
        self.reset();
        Ok(())
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
    use crate::hal::MockClock;

    fn timer_at(sec: u16) -> (FlightTimer, MockClock, Controls) {
        let clock = MockClock::new();
        let mut m = FlightTimer::new(Arc::new(clock.clone()));
        m.set_switch(0, SwitchState::State1);
        m.set_time(sec);
        let mut controls = Controls::new();
        controls.switch_set(0, SwitchState::State1);
        (m, clock, controls)
    }

    #[test]
    fn counts_whole_seconds_while_condition_holds() {
        let (mut m, clock, mut controls) = timer_at(10);

        clock.set(5000);
        m.run(&mut controls); // establishes the reference
        assert_eq!(m.countdown_sec(), 10);

        clock.advance(1100);
        m.run(&mut controls);
        assert_eq!(m.countdown_sec(), 9);

        // Sub-second advance does not tick
        clock.advance(500);
        m.run(&mut controls);
        assert_eq!(m.countdown_sec(), 9);

        clock.advance(600);
        m.run(&mut controls);
        assert_eq!(m.countdown_sec(), 8);
    }

    #[test]
    fn long_gap_resets_reference_instead_of_bursting() {
        let (mut m, clock, mut controls) = timer_at(10);

        clock.set(2000);
        m.run(&mut controls); // establishes the reference
        clock.advance(1100);
        m.run(&mut controls);
        assert_eq!(m.countdown_sec(), 9);

        // 10 s gap only restarts measurement, it does not burn 10 ticks
        clock.advance(10_000);
        m.run(&mut controls);
        assert_eq!(m.countdown_sec(), 9);
    }

    #[test]
    fn holds_while_condition_is_off_and_stops_at_zero() {
        let (mut m, clock, mut controls) = timer_at(1);

        clock.set(2000);
        m.run(&mut controls);
        controls.switch_set(0, SwitchState::State0);
        clock.advance(5000);
        m.run(&mut controls);
        assert_eq!(m.countdown_sec(), 1);

        controls.switch_set(0, SwitchState::State1);
        m.run(&mut controls); // reference reset
        clock.advance(1100);
        m.run(&mut controls);
        assert_eq!(m.countdown_sec(), 0);

        clock.advance(1100);
        m.run(&mut controls);
        assert_eq!(m.countdown_sec(), 0);
        assert_eq!(m.time_str(), "0:00");
    }

    #[test]
    fn survives_millisecond_clock_wraparound() {
        let (mut m, clock, mut controls) = timer_at(10);

        clock.set(u32::MAX - 500);
        m.run(&mut controls); // reference just below the wrap point
        assert_eq!(m.countdown_sec(), 10);

        clock.set(100); // 601 ms elapsed across the wrap
        m.run(&mut controls);
        assert_eq!(m.countdown_sec(), 10);

        clock.set(600); // 1101 ms elapsed, one whole second
        m.run(&mut controls);
        assert_eq!(m.countdown_sec(), 9);
    }

    #[test]
    fn time_str_formats_minutes() {
        let (mut m, _clock, _controls) = timer_at(0);
        m.set_time(90);
        assert_eq!(m.time_str(), "1:30");
    }
}
