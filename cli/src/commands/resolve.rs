use anyhow::{Context, Result};
use quadstore::{MappedHandle, TileLookup};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::ResolveArgs) -> Result<()> {
    let handle = MappedHandle::open(&args.index)
        .with_context(|| format!("[cmd::resolve] opening {}", args.index.display()))?;

    let view = match handle.resolve(args.tile) {
        TileLookup::Populated(view) => view,
        TileLookup::Empty => {
            println!("{}: empty", args.tile);
            return Ok(());
        }
    };

    println!("{}: {} features", args.tile, view.feature_count());
    for feature in view.features() {
        let feature = feature.with_context(|| format!("[cmd::resolve] reading tile {}", args.tile))?;
        let tags: Vec<String> = feature.tags().map(|(k, v)| format!("{k}={v}")).collect();
        println!(
            "  {:>12} {:<5} {:>5} coords  {}",
            feature.id(), feature.kind().as_str(), feature.coord_count(), tags.join(" "),
        );
    }
    Ok(())
}
