use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, PartialEq)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding provinces.png, definition.csv and the optional
    /// terrain/water/rivers rasters, countries.json and ownership.txt
    #[arg(long, default_value = ".")]
    pub assets: PathBuf,

    /// JSON file overriding engine defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// TrueType font used to draw country labels
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Render the composited map view to a PNG.
    Render {
        #[arg(short, long, default_value = "map.png")]
        output: PathBuf,
        #[arg(long, default_value_t = 1280)]
        width: u32,
        #[arg(long, default_value_t = 720)]
        height: u32,
        /// Zoom level (default: the configured initial zoom)
        #[arg(long)]
        zoom: Option<f64>,
        /// World pixel to centre on, as `X,Y`
        #[arg(long, value_parser = parse_point)]
        center: Option<(f64, f64)>,
        /// Province id to highlight
        #[arg(long)]
        select: Option<u32>,
    },

    /// Write the political colour layer at raster resolution.
    Political {
        #[arg(short, long, default_value = "political.png")]
        output: PathBuf,
    },

    /// Write the country border layer, or one province's outline.
    Borders {
        #[arg(short, long, default_value = "borders.png")]
        output: PathBuf,
        #[arg(long)]
        province: Option<u32>,
    },

    /// Print label anchors and the labels visible at a zoom level as JSON.
    Labels {
        #[arg(long)]
        zoom: Option<f64>,
    },

    /// Look up the province at a world pixel.
    ///
    /// Example: `lookup 120 45` -> "120,45 -> province 17 (Land, owner RED)"
    Lookup {
        #[arg(allow_negative_numbers = true)]
        x: i64,
        #[arg(allow_negative_numbers = true)]
        y: i64,
    },

    /// Re-import ownership from `id;r;g;b;name` rows using keyword rules.
    Import {
        /// Delimited province list
        #[arg(long)]
        input: PathBuf,
        /// JSON list of `{ "country": TAG, "keywords": [...] }` rules
        #[arg(long)]
        rules: PathBuf,
        /// Where to write the resulting ownership snapshot
        #[arg(short, long, default_value = "ownership.txt")]
        output: PathBuf,
    },

    /// Write the ownership snapshot (stdout when no output is given).
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", s))?;
    let x = x.trim().parse().map_err(|e| format!("bad X in '{}': {}", s, e))?;
    let y = y.trim().parse().map_err(|e| format!("bad Y in '{}': {}", s, e))?;
    Ok((x, y))
}
