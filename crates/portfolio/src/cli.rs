use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "portfolio",
    author,
    version,
    about = "Animated shader backgrounds for the portfolio site",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Theme file to load instead of the discovered `themes.toml`.
    #[arg(long, global = true, value_name = "FILE", env = "PORTFOLIO_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Theme key to open (e.g. `plasma`, `cybergrid`, or `random`).
    #[arg(value_name = "THEME")]
    pub theme: Option<String>,

    /// Animation speed multiplier (0.1-3.0).
    #[arg(long, value_name = "SPEED")]
    pub speed: Option<f32>,

    /// Hue rotation (0.0-1.0).
    #[arg(long, value_name = "HUE")]
    pub hue: Option<f32>,

    /// Colour saturation (0.0-1.0).
    #[arg(long, value_name = "SATURATION")]
    pub saturation: Option<f32>,

    /// Brightness multiplier (0.1-2.0).
    #[arg(long, value_name = "INTENSITY")]
    pub intensity: Option<f32>,

    /// Initial window size in logical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Seed for theme shuffling; omitted means a fresh seed per run.
    #[arg(long, value_name = "N", env = "PORTFOLIO_SEED")]
    pub seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the theme registry without opening a window.
    Themes(ThemesCommand),
}

#[derive(Args, Debug)]
pub struct ThemesCommand {
    #[command(subcommand)]
    pub action: ThemesAction,
}

#[derive(Subcommand, Debug)]
pub enum ThemesAction {
    /// List enabled themes in authoring order.
    List(ListArgs),
    /// Describe a single theme.
    Show(ShowArgs),
    /// Print the theme the shuffle key would switch to.
    Shuffle(ShuffleArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Include disabled themes.
    #[arg(long)]
    pub all: bool,

    /// Emit a JSON array instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Theme key to describe.
    #[arg(value_name = "KEY")]
    pub key: String,
}

#[derive(Args, Debug)]
pub struct ShuffleArgs {
    /// Theme currently shown; defaults to the registry default.
    #[arg(long, value_name = "KEY")]
    pub from: Option<String>,

    /// Seed for a reproducible pick.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

/// Parses `WIDTHxHEIGHT` into logical pixels.
pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{value}`"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .ok()
            .filter(|pixels| *pixels > 0)
            .ok_or_else(|| format!("invalid dimension `{part}` in `{value}`"))
    };
    Ok((parse(width)?, parse(height)?))
}
