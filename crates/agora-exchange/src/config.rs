//! Command-line configuration.

use std::path::PathBuf;

use agora_core::FeeRate;
use clap::Parser;

/// Continuous-auction exchange for local trader processes.
#[derive(Parser, Debug, Clone)]
#[command(name = "agora-exchange", version, about)]
pub struct Cli {
    /// Multiplier applied to each trade's value to compute its fee
    /// (up to 6 decimal places; 0.01 is a one-percent fee).
    #[arg(long, value_name = "RATE", default_value = "1", value_parser = parse_fee_rate)]
    pub fee_rate: FeeRate,

    /// File listing the tradable products.
    #[arg(value_name = "PRODUCTS_FILE")]
    pub products_file: PathBuf,

    /// Trader executables, launched in order as trader 0, 1, ...
    #[arg(value_name = "TRADER_BINARY", required = true, num_args = 1..)]
    pub traders: Vec<PathBuf>,
}

/// Parse a non-negative decimal such as `1`, `0.01` or `2.5`.
pub fn parse_fee_rate(input: &str) -> Result<FeeRate, String> {
    let input = input.trim();
    let (whole, frac) = input.split_once('.').unwrap_or((input, ""));

    if whole.is_empty() && frac.is_empty() {
        return Err(format!("invalid fee rate '{}'", input));
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(format!("fee rate '{}' is not a non-negative decimal", input));
    }
    if frac.len() > FeeRate::DECIMAL_PLACES as usize {
        return Err(format!(
            "fee rate '{}' has more than {} decimal places",
            input,
            FeeRate::DECIMAL_PLACES
        ));
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| format!("fee rate '{}' is too large", input))?
    };

    let frac_ppm = frac
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(FeeRate::DECIMAL_PLACES as usize)
        .fold(0u64, |acc, b| acc * 10 + u64::from(b - b'0'));

    whole
        .checked_mul(FeeRate::SCALE)
        .and_then(|ppm| ppm.checked_add(frac_ppm))
        .map(FeeRate::from_ppm)
        .filter(|rate| *rate <= FeeRate::MAX)
        .ok_or_else(|| {
            format!(
                "fee rate '{}' is too large (at most {})",
                input,
                FeeRate::MAX
            )
        })
}
