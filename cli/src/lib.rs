pub mod commands;
pub mod context;
pub mod logging;
pub mod observer;
pub mod repl;
pub mod tasks;

pub use context::CliContext;
pub use repl::readline;
