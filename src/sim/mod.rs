//! In-memory substitutes for the hardware: virtual clock and heater.
//!
//! The control loop never branches on whether it is simulated; these types
//! simply implement the same traits as the real adapters.

pub mod clock;
pub mod heater;
