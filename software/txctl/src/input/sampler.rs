//! Interrupt-driven analog acquisition.
//!
//! One conversion is in flight at a time; its completion callback stores the
//! sample, advances the mux and starts the next conversion. The latch is the
//! only state shared between the interrupt context and the control loop, and
//! it is held only long enough to copy values in or out.

use std::sync::{Arc, Mutex};

use tracing::warn;

use txctl_shared::{ADC_RESOLUTION, ANALOG_INPUTS, ChannelValue};

use crate::hal::AdcSource;

/// Snapshot of the most recent conversion results plus the mux position of
/// the conversion currently in flight.
struct SampleFrame {
    samples: [ChannelValue; ANALOG_INPUTS],
    mux: usize,
    busy: bool,
}

/// Shared cell between the acquisition interrupt and the control loop.
///
/// Consumers read single samples under the lock; the lock is never held
/// across a conversion.
#[derive(Clone)]
pub struct SampleLatch {
    inner: Arc<Mutex<SampleFrame>>,
}

impl SampleLatch {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SampleFrame {
                samples: [0; ANALOG_INPUTS],
                mux: 0,
                busy: false,
            })),
        }
    }

    /// Most recent sample for one analog input. The index is checked by the
    /// caller; an out-of-range index here reads as mid position.
    pub fn sample(&self, index: usize) -> ChannelValue {
        let frame = match self.inner.lock() {
            Ok(frame) => frame,
            Err(poisoned) => poisoned.into_inner(),
        };
        frame.samples.get(index).copied().unwrap_or(0)
    }

    /// Whether a sweep over all inputs has finished and no conversion is
    /// in flight.
    pub fn idle(&self) -> bool {
        match self.inner.lock() {
            Ok(frame) => !frame.busy,
            Err(poisoned) => !poisoned.into_inner().busy,
        }
    }
}

impl Default for SampleLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives the ADC mux sweep. Owned by whichever context services the ADC
/// completion interrupt; the control loop sees only the [`SampleLatch`].
pub struct SamplingEngine {
    latch: SampleLatch,
    adc: Box<dyn AdcSource>,
    /// Bit per analog input; set bits report `ADC_RESOLUTION - raw` to
    /// account for inputs wired with reversed polarity.
    invert_mask: u16,
}

impl SamplingEngine {
    pub fn new(latch: SampleLatch, adc: Box<dyn AdcSource>, invert_mask: u16) -> Self {
        Self {
            latch,
            adc,
            invert_mask,
        }
    }

    /// Begin a sweep over all analog inputs. A sweep already in flight is
    /// restarted from mux 0.
    pub fn start_frame(&mut self) {
        {
            let mut frame = match self.latch.inner.lock() {
                Ok(frame) => frame,
                Err(poisoned) => poisoned.into_inner(),
            };
            frame.mux = 0;
            frame.busy = true;
        }
        // Conversion start happens outside the lock
        self.adc.select_and_start(0);
    }

    /// Deliver one finished conversion. Stores the sample for the input the
    /// mux currently selects, then steps the mux and starts the next
    /// conversion, or marks the sweep finished after the last input.
    pub fn on_conversion_complete(&mut self, raw: u16) {
        let next = {
            let mut frame = match self.latch.inner.lock() {
                Ok(frame) => frame,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !frame.busy {
                warn!("conversion result delivered outside a sweep, dropping");
                return;
            }
            let mux = frame.mux;
            let raw = raw.min(ADC_RESOLUTION);
            let value = if self.invert_mask & (1 << mux) != 0 {
                ADC_RESOLUTION - raw
            } else {
                raw
            };
            frame.samples[mux] = value as ChannelValue;

            frame.mux += 1;
            if frame.mux >= ANALOG_INPUTS {
                frame.busy = false;
                None
            } else {
                Some(frame.mux)
            }
        };

        if let Some(mux) = next {
            self.adc.select_and_start(mux);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::ScriptedAdc;

    fn engine(invert_mask: u16) -> (SamplingEngine, SampleLatch, ScriptedAdc) {
        let latch = SampleLatch::new();
        let adc = ScriptedAdc::new();
        let engine = SamplingEngine::new(latch.clone(), Box::new(adc.clone()), invert_mask);
        (engine, latch, adc)
    }

    #[test]
    fn sweep_steps_mux_over_all_inputs() {
        let (mut engine, latch, adc) = engine(0);
        engine.start_frame();
        assert!(!latch.idle());

        for i in 0..ANALOG_INPUTS {
            engine.on_conversion_complete(100 + i as u16);
        }

        assert!(latch.idle());
        assert_eq!(adc.selections(), (0..ANALOG_INPUTS).collect::<Vec<_>>());
        for i in 0..ANALOG_INPUTS {
            assert_eq!(latch.sample(i), 100 + i as i16);
        }
    }

    #[test]
    fn inverted_inputs_mirror_around_full_scale() {
        let (mut engine, latch, _adc) = engine(0b10);
        engine.start_frame();
        engine.on_conversion_complete(100);
        engine.on_conversion_complete(100);

        assert_eq!(latch.sample(0), 100);
        assert_eq!(latch.sample(1), (ADC_RESOLUTION - 100) as i16);
    }

    #[test]
    fn overrange_raw_value_saturates() {
        let (mut engine, latch, _adc) = engine(0);
        engine.start_frame();
        engine.on_conversion_complete(0xFFFF);
        assert_eq!(latch.sample(0), ADC_RESOLUTION as i16);
    }

    #[test]
    fn stray_completion_is_dropped() {
        let (mut engine, latch, adc) = engine(0);
        engine.on_conversion_complete(500);
        assert_eq!(latch.sample(0), 0);
        assert!(adc.selections().is_empty());
        assert!(latch.idle());
    }

    #[test]
    fn out_of_range_latch_read_is_mid() {
        let latch = SampleLatch::new();
        assert_eq!(latch.sample(ANALOG_INPUTS + 3), 0);
    }
}
