use anyhow::{Context, Result};
use quadstore::MappedHandle;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::InspectArgs) -> Result<()> {
    let handle = MappedHandle::open(&args.index)
        .with_context(|| format!("[cmd::inspect] opening {}", args.index.display()))?;
    let root = handle.grid().root();

    println!("{}", handle.path().display());
    println!("  size       {} bytes", handle.len());
    println!("  max depth  {}", handle.max_depth());
    println!("  extent     {:?}", handle.extent());
    println!("  root       {} .. {}", root.min(), root.max());
    println!("  features   {}", handle.feature_count());
    println!("  tiles      {}", handle.tile_count());

    for key in handle.populated_keys().take(args.tiles) {
        let range = handle.locate(key).context("[cmd::inspect] populated key without range")?;
        println!("  {key:<16} {:>8} features  {:>10} bytes @ {}", handle.resolve(key).feature_count(), range.len, range.offset);
    }
    if handle.tile_count() > args.tiles as u64 {
        println!("  ... {} more", handle.tile_count() - args.tiles as u64);
    }
    Ok(())
}
