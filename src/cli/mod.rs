pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod info;
pub mod inspect;
pub mod output;
pub mod resolve;
pub mod runtime;

pub use app::run;
pub use env::CliArgs;
