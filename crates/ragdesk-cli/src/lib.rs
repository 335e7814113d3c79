//! Interactive chat interface for ragdesk
//!
//! Chat sessions with their transcripts, terminal helpers and logging setup.

pub mod logging;
mod session;
pub mod ui;

pub use session::{ChatCommand, ChatSession, Reply};
pub use ui::{display_banner, handle_input_with_history, print_answer, print_help};
