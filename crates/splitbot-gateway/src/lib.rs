pub mod context;
pub mod turn;

pub use context::ContextWindow;
pub use turn::{APOLOGY_REPLY, TurnHandler, TurnOutcome};
