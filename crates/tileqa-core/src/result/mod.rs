mod admin;
mod qa_error;

pub use admin::{AddOutcome, ErrorAdmin};
pub use qa_error::{ErrorGeometry, QaError};
