use std::path::PathBuf;

use quadstore::{RootExtent, TileKey};

/// Quad-tree tile index builder and inspector
#[derive(clap::Parser, Debug)]
#[command(name = "quadstore", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON configuration file; flags override its values
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Build an index from a GeoJSON sequence (.geojsonseq[.gz]) or OSM PBF file
    Build(BuildArgs),

    /// Print the header and populated tiles of an index
    Inspect(InspectArgs),

    /// List the features of one tile
    Resolve(ResolveArgs),

    /// Render one tile to PNG
    Render(RenderArgs),
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum ExtentArg {
    Dataset,
    World,
}

impl From<ExtentArg> for RootExtent {
    fn from(e: ExtentArg) -> Self {
        match e {
            ExtentArg::Dataset => RootExtent::Dataset,
            ExtentArg::World => RootExtent::World,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    /// Source dataset
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output index file, defaults to "./index.qst"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Deepest zoom level to subdivide (0-24)
    #[arg(short = 'd', long)]
    pub max_depth: Option<u8>,

    /// Box the quad-tree subdivides
    #[arg(short, long, value_enum)]
    pub extent: Option<ExtentArg>,

    /// Directory for the encoded-feature spill, defaults to the output's directory
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub scratch_dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct InspectArgs {
    /// Index file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub index: PathBuf,

    /// Number of populated tiles to list
    #[arg(short, long, default_value_t = 20)]
    pub tiles: usize,
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Index file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub index: PathBuf,

    /// Tile as zoom/x/y
    pub tile: TileKey,
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    /// Index file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub index: PathBuf,

    /// Tile as zoom/x/y
    pub tile: TileKey,

    /// Output PNG, defaults to "./<zoom>-<x>-<y>.png"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Edge length of the image in pixels
    #[arg(short = 's', long)]
    pub tile_size: Option<u32>,
}
