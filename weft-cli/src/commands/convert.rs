//! The `convert` subcommand.

use anyhow::Result;
use std::path::{Path, PathBuf};
use weft_runtime::convert::{self, ConvertError, ConvertOptions, ConverterRegistry};

/// Convert a foreign configuration dialect to the Weft dialect.
pub fn run(
    file: Option<&str>,
    output: Option<&str>,
    report: Option<&str>,
    source_format: &str,
    bypass_errors: bool,
    extra_args: &str,
) -> Result<()> {
    let registry = ConverterRegistry::new();
    let options = ConvertOptions {
        format: source_format.to_string(),
        bypass_errors,
        extra_args: convert::parse_extra_args(extra_args),
        report: report.map(PathBuf::from),
    };

    // "-" and an absent argument both mean standard input.
    let input = file.filter(|f| *f != "-").map(Path::new);
    let output = output.map(Path::new);

    match registry.convert_file(&options, input, output) {
        Ok(()) => Ok(()),
        Err(ConvertError::Diagnostics(diags)) => {
            for diagnostic in diags.iter() {
                eprintln!("{diagnostic}");
            }
            anyhow::bail!("encountered errors during conversion")
        }
        Err(err) => Err(err.into()),
    }
}
