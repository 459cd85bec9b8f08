// Library surface for the binary, headless drivers and integration tests.
// Terminal rendering stays in the binary.
pub mod answer_log;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod question;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod source;
pub mod summary;
pub mod validate;

pub use error::{ContractViolation, QuizError};
pub use session::{QuizMachine, SessionState, Status};
pub use summary::ResultSummary;
