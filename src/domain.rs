//! Domain module - Core card entities and numbering rules
//!
//! Pure types with no I/O. Parsers in `infrastructure` produce these values
//! and the pipeline in `application` moves them through the stages.

pub mod card;
pub mod numbering;
pub mod set_descriptor;

pub use card::{CardRecord, TRAINER_CARD_TYPE, TRAINER_TYPE_TOKEN};
pub use numbering::{CardIdentifier, FailureOutcome, NumberingCursor, NumberingScheme};
pub use set_descriptor::SetDescriptor;
