//! # gallery-target-unit
//!
//! Controller for one unit of a shooting-gallery attraction.
//!
//! A unit owns a row of IR-sensing targets and answers a scoring client over
//! Wi-Fi when a gun hits one of them:
//! - **Targets**: IR receiver modules on a shared I²C bus, see [`TargetRegistry`]
//! - **Scoring protocol**: `/shoot?gun_num=<n>` and `/init`, see [`protocol`]
//! - **Network**: static per-unit address, see [`network`]
//! - **LEDs**: per-target hit feedback, see [`HitFeedback`]
//! - **Lift**: DC motor between two photoreflector end stops, see [`lift`]
//! - **Servos**: random rack movement, see [`servo`]
//! - **Status panel**: motor and reflector readout on the LCD, see [`status`]
//!
//! The hardware-independent parts build on any target. The ESP32-S3 wiring
//! lives behind the `esp32s3` feature.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! let bus = RefCell::new(i2c);
//! let config = UnitConfig { unit_id: 2, target_count: 9, network: Some(credentials) };
//! let mut targets = TargetRegistry::begin(
//!     &config,
//!     |_| RefCellDevice::new(&bus),
//!     endpoint,
//!     HitFeedback::<9>::new(),
//!     &mut station,
//!     &mut delay,
//! )?;
//!
//! loop {
//!     targets.events_mut().advance(now());
//!     targets.update();
//!     leds.fill_from_iter(targets.events().frame());
//! }
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod buttons;
pub mod feedback;
pub mod ir_receiver;
pub mod lift;
pub mod network;
pub mod protocol;
pub mod registry;
pub mod servo;
pub mod status;
mod target;

#[cfg(feature = "esp32s3")]
mod board;
#[cfg(feature = "esp32s3")]
mod display;
#[cfg(feature = "esp32s3")]
mod leds;

#[cfg(feature = "esp32s3")]
pub use board::*;
pub use buttons::PowerButtons;
#[cfg(feature = "esp32s3")]
pub use display::Display;
pub use feedback::HitFeedback;
#[cfg(feature = "esp32s3")]
pub use leds::Leds;
pub use registry::{
    Error,
    MAX_TARGETS,
    TargetEvents,
    TargetRegistry,
    UnitConfig,
};
pub use target::Target;

/// Millisecond timestamp used by the animations.
pub type Instant = fugit::TimerInstantU64<1_000>;
pub type Duration = fugit::MillisDurationU64;
