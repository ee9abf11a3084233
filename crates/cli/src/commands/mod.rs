//! Command handlers for the Tradewise CLI.

pub mod ask;
pub mod knowledge;
pub mod serve;
pub mod validate;

pub use ask::AskCommand;
pub use knowledge::KnowledgeCommand;
pub use serve::ServeCommand;
pub use validate::ValidateCommand;
