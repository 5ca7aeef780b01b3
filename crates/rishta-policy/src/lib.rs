pub mod evaluator;
pub mod redactor;

pub use evaluator::{can_contact, can_message, can_view, check_geographic_privacy};
pub use redactor::{ProfileView, redact};
