pub mod cli;
pub mod commands;
pub mod display;
pub mod lock;
pub mod state;
pub mod workspace;
