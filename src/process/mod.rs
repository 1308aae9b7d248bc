//! Process supervision: command construction, spawn, output piping,
//! runtime limit, and termination.

mod command;
mod supervisor;

pub use command::FetchCommand;
pub use supervisor::{ExitOutcome, ProcessSupervisor};
