//! Terminal output for the run command.
//!
//! Everything the user sees goes through [`console::Console`]; diagnostics go
//! through the `log` facade instead.

pub mod console;

pub use console::{Color, Console, SharedBuffer, Style};
