//! Shared value types and stored formats for the txctl transmitter core.
//!
//! Everything in this crate is consumed both by the control core and by
//! outside collaborators (display, output encoder, desktop tooling), so it
//! carries no behavior beyond value conversions and the stored block layout.

pub mod block;

pub use block::{block_checksum, StoredBlock};

/// Index of one logical axis of control (throttle, aileron, ...).
pub type Channel = usize;

/// Index of one physical or logical switch.
pub type Switch = usize;

/// Flight phase number, in `[0, PHASES)`.
pub type Phase = u8;

/// Internal representation of a channel position. 0 is mid position.
pub type ChannelValue = i16;

pub const CHANNEL_VALUE_MID: ChannelValue = 0;
pub const CHANNEL_VALUE_MIN: ChannelValue = -1250;
pub const CHANNEL_VALUE_MAX: ChannelValue = 1250;

/// Analog input geometry. Sticks, trims and aux inputs share one ADC
/// behind a channel mux; their raw samples land in one contiguous set.
pub const STICK_INPUTS: usize = 4;
pub const TRIM_INPUTS: usize = 4;
pub const AUX_INPUTS: usize = 1;
pub const ANALOG_INPUTS: usize = STICK_INPUTS + TRIM_INPUTS + AUX_INPUTS;

/// Logical (post-mixing) channels and output channels handed to the
/// pulse encoder.
pub const LOGICAL_CHANNELS: usize = 9;
pub const OUTPUT_CHANNELS: usize = 9;

pub const SWITCHES: usize = 8;
pub const PHASES: usize = 3;

/// Full scale of the sampling ADC.
pub const ADC_RESOLUTION: u16 = 1023;

/// Output frame period in microseconds. The module pipeline runs once
/// per frame, so rate-limited stages derive their per-cycle step from this.
pub const FRAME_TIME_US: u32 = 22_000;

/// Sentinel for "no switch assigned" in module configuration.
pub const SWITCH_NONE: u8 = 0xFF;

/// A percentage of full channel travel, [-125, 125].
pub type Percent = i8;

pub const PERCENT_MIN: Percent = -125;
pub const PERCENT_MAX: Percent = 125;

/// Convert a percentage to channel units (1% = 10 channel units).
pub fn pct_to_channel(p: Percent) -> ChannelValue {
    (p as ChannelValue) * 10
}

/// Convert a channel value to a (truncated) percentage.
pub fn channel_to_pct(v: ChannelValue) -> Percent {
    (v / 10) as Percent
}

/// Saturate a wide intermediate into the legal channel range.
pub fn clamp_channel(v: i32) -> ChannelValue {
    v.clamp(CHANNEL_VALUE_MIN as i32, CHANNEL_VALUE_MAX as i32) as ChannelValue
}

/// Fixed-point decimal with one fractional digit, stored scaled by 10.
///
/// Addition and subtraction are valid directly; multiplication and division
/// require explicit rescaling. Exists to keep float arithmetic off the
/// resource-constrained target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Float1(pub i16);

/// Fixed-point decimal with two fractional digits, stored scaled by 100.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Float2(pub i16);

macro_rules! fixed_point_ops {
    ($ty:ident, $scale:expr) => {
        impl $ty {
            pub const SCALE: i16 = $scale;

            pub fn from_parts(whole: i16, frac: i16) -> Self {
                if whole < 0 {
                    Self(whole * $scale - frac)
                } else {
                    Self(whole * $scale + frac)
                }
            }

            pub fn whole(self) -> i16 {
                self.0 / $scale
            }

            pub fn frac(self) -> i16 {
                (self.0 % $scale).abs()
            }
        }

        impl core::ops::Add for $ty {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl core::ops::Sub for $ty {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }
    };
}

fixed_point_ops!(Float1, 10);
fixed_point_ops!(Float2, 100);

/// Decoded position of a switch. Two bits per switch in [`SwitchSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchState {
    State0,
    State1,
    State2,
    /// Invalid position, or "don't care" in comparisons.
    DontCare,
}

impl From<u8> for SwitchState {
    fn from(value: u8) -> Self {
        match value {
            0 => SwitchState::State0,
            1 => SwitchState::State1,
            2 => SwitchState::State2,
            _ => SwitchState::DontCare,
        }
    }
}

impl From<SwitchState> for u8 {
    fn from(value: SwitchState) -> Self {
        match value {
            SwitchState::State0 => 0,
            SwitchState::State1 => 1,
            SwitchState::State2 => 2,
            SwitchState::DontCare => 3,
        }
    }
}

/// States of all switches, packed two bits per switch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SwitchSet(pub u16);

impl SwitchSet {
    /// All switches in the "don't care" position.
    pub fn all_dontcare() -> Self {
        SwitchSet(u16::MAX)
    }

    pub fn get(self, sw: Switch) -> SwitchState {
        if sw >= SWITCHES {
            return SwitchState::DontCare;
        }
        SwitchState::from(((self.0 >> (2 * sw)) & 0x3) as u8)
    }

    pub fn set(&mut self, sw: Switch, state: SwitchState) {
        if sw >= SWITCHES {
            return;
        }
        let shift = 2 * sw;
        self.0 = (self.0 & !(0x3 << shift)) | ((u8::from(state) as u16) << shift);
    }
}

/// Derive To/From with an added "Unknown" variant catch-all for converting
/// from numerical values that do not match a valid variant in order to
/// avoid either panicking or cumbersome error handling.
#[macro_export]
macro_rules! enum_with_unknown {
    (
        $( #[$enum_attr:meta] )*
        pub enum $name:ident($ty:ty) {
            $(
              $( #[$variant_attr:meta] )*
              $variant:ident = $value:expr
            ),+ $(,)?
        }
    ) => {
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
        $( #[$enum_attr] )*
        pub enum $name {
            $(
              $( #[$variant_attr] )*
              $variant
            ),*,
            /// Catch-all for values that do not match a variant
            Unknown($ty)
        }

        impl ::core::convert::From<$ty> for $name {
            fn from(value: $ty) -> Self {
                match value {
                    $( $value => $name::$variant ),*,
                    other => $name::Unknown(other)
                }
            }
        }

        impl ::core::convert::From<$name> for $ty {
            fn from(value: $name) -> Self {
                match value {
                    $( $name::$variant => $value ),*,
                    $name::Unknown(other) => other
                }
            }
        }
    }
}

enum_with_unknown! {
    /// Static wiring/behavior classification of a switch, which determines
    /// how its raw signal is decoded.
    pub enum SwitchConf(u8) {
        /// Not wired.
        Unused = 0,
        /// Mechanical two-position switch.
        TwoState = 1,
        /// Mechanical three-position switch.
        ThreeState = 2,
        /// Two-state switch derived from a channel value.
        ChannelDerived = 3,
        /// Always reports State1.
        FixedOn = 4,
        /// Boolean combination of other switches.
        Logic = 5,
        /// Three-state switch reflecting the current flight phase.
        PhaseReflecting = 6,
        /// Two-state switch reflecting one particular flight phase.
        SinglePhaseReflecting = 7,
    }
}

enum_with_unknown! {
    /// Identifies a module's configuration record inside a stored block.
    ///
    /// The numeric values are part of the stored format and must stay stable
    /// across versions.
    pub enum ModuleKind(u8) {
        ModelSelect = 1,
        AssignInput = 10,
        ChannelReverse = 11,
        PhaseTrim = 12,
        ChannelDelay = 13,
        Phases = 14,
        FlightTimer = 15,
        ServoRemap = 16,
        ServoReverse = 17,
        ServoSubtrim = 18,
        ServoLimit = 19,
    }
}

/// Stored-payload terminator, never a valid [`ModuleKind`].
pub const MODULE_KIND_END: u8 = 0;
