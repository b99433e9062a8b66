use clap::Parser;
use std::path::PathBuf;

use crate::memory::accessor::translate;

#[derive(Parser, Debug)]
#[command(name = "galaxygst")]
#[command(about = "Record GST object motion in SMG2 from Dolphin memory.")]
pub struct Args {
    /// Folder to save GST files to
    pub output_folder_path: PathBuf,

    /// Address from which the tool retrieves GstRecorderInfo*
    #[arg(long, default_value = "0x80003FF8", value_parser = parse_address)]
    pub address: u32,

    /// Optional TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Accept the single-dash `-address` spelling as `--address`
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| match arg.strip_prefix("-address") {
            Some(rest) if rest.is_empty() || rest.starts_with('=') => format!("--address{}", rest),
            _ => arg,
        })
        .collect()
}

/// Parse an integer with an optional `0x`/`0o`/`0b` prefix, like Python's `int(s, 0)`,
/// and check it points into emulated memory
pub fn parse_address(s: &str) -> Result<u32, String> {
    let digits = s.trim().replace('_', "");
    let lower = digits.to_ascii_lowercase();

    let parsed = if let Some(hex) = lower.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        u32::from_str_radix(oct, 8)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u32::from_str_radix(bin, 2)
    } else if lower.len() > 1 && lower.starts_with('0') {
        // int("010", 0) is rejected too
        return Err(format!("Address {:?} has an unknown number format", s));
    } else {
        lower.parse::<u32>()
    };

    let address = parsed.map_err(|_| format!("Address {:?} has an unknown number format", s))?;

    translate(address, 4)
        .map_err(|_| format!("Address 0x{:08X} is outside emulated memory", address))?;

    Ok(address)
}
