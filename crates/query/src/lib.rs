pub mod qa;
pub mod session;

pub use qa::{DocumentQa, Exchange, QaAnswer, relevant_sections};
pub use session::{SessionStore, SharedSession};
