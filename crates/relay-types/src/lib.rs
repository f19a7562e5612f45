//! Shared types for the gasless relay.
//!
//! Contract bindings, forward request and domain types, transaction and
//! receipt types, relay states and events, plus the schema helpers used to
//! validate implementation configuration.

pub mod contracts;
pub mod delivery;
pub mod events;
pub mod relay;
pub mod request;
pub mod utils;
pub mod validation;

pub use contracts::*;
pub use delivery::*;
pub use events::*;
pub use relay::*;
pub use request::*;
pub use validation::*;
