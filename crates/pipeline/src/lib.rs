//! The dispatch loop: select, generate, publish, persist.
//!
//! [`Dispatcher`] runs exactly one attempt per call. It never schedules
//! itself; an external trigger (HTTP route, cron) drives it.

pub mod config;
pub mod dispatcher;
pub mod publish;
pub mod retry;

pub use config::DispatcherConfig;
pub use dispatcher::Dispatcher;
