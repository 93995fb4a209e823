use anyhow::{Context, Result};
use quadstore::{build_index, decode::source_for_path};
use tracing::info;

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::BuildArgs) -> Result<()> {
    let mut config = super::load_config(cli)?.index;
    if let Some(depth) = args.max_depth { config = config.with_max_depth(depth) }
    if let Some(extent) = args.extent { config = config.with_extent(extent.into()) }
    if let Some(dir) = &args.scratch_dir { config = config.with_scratch_dir(dir) }
    config.validate().context("[cmd::build] invalid index configuration")?;

    let out_path = args.output.clone().unwrap_or("./index.qst".into());
    info!("[cmd::build] {} -> {} (max depth {})", args.input.display(), out_path.display(), config.max_depth);

    let source = source_for_path(&args.input);
    let artifact = build_index(source.as_ref(), &config, &out_path)
        .with_context(|| format!("[cmd::build] building {}", args.input.display()))?;

    println!("{}", artifact.path().display());
    println!("  size      {} bytes", artifact.size());
    println!("  features  {}", artifact.feature_count());
    println!("  tiles     {}", artifact.tile_count());
    println!("  sha256    {}", artifact.sha256());
    Ok(())
}
