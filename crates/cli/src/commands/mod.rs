//! Command handlers for the ragline CLI.

pub mod ask;
pub mod flow;
pub mod learn;
pub mod status;

pub use ask::AskCommand;
pub use flow::FlowCommand;
pub use learn::LearnCommand;
pub use status::StatusCommand;
