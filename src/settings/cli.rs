use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "harmony", about = "Friend requests and friendship graph over HTTP")]
pub struct Cli {
    /// Settings file; defaults to `settings/dev.toml` or `settings/release.toml` by build profile.
    #[arg(long, value_name = "PATH")]
    pub settings: Option<String>,
}
