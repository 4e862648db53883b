//! Application core: the sensing-actuation bridge and its ports.
//!
//! Hardware is reached only through the traits in [`ports`], so the
//! bridge, the sampler and the HTTP handlers are all testable with mock
//! adapters.

pub mod bridge;
pub mod events;
pub mod ports;
pub mod sampler;
