pub mod catalog;
pub mod config;
pub mod gemini;
pub mod history;
pub mod orchestrator;
pub mod platform;
pub mod protocol;
pub mod selection;
pub mod session;
pub mod state;
