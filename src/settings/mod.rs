//! Layered settings: a TOML file picked by build profile, overridable with `--settings`.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
