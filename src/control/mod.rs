//! Charge-target scheduling core: the components with real algorithmic content.

pub mod calendar;
pub mod duty;
pub mod ramp;
pub mod target;
pub mod tariff;
