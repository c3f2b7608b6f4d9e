//! The `version` subcommand.

use anyhow::Result;

/// Print version information.
pub fn run() -> Result<()> {
    println!("weft {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
