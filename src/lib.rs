// Library surface for headless/integration tests and reuse.
// The terminal UI and the App that drives it live in main.rs.
pub mod alert;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod error;
pub mod generator;
pub mod history;
pub mod loader;
pub mod planner;
pub mod pool;
pub mod practice;
pub mod recorder;
pub mod runtime;
pub mod session;
pub mod util;
