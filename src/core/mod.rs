//! Core relay types shared by the extractor, the bus and the loops.

mod identity;
mod payload;
mod validation;

pub use identity::{ChannelIdentity, DEFAULT_INTERFACE, DEFAULT_MEMBER, DEFAULT_OBJECT_PATH};
pub use payload::{DEFAULT_MAX_PAYLOAD, LogPayload};
pub use validation::Validate;
