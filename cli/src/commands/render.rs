use anyhow::{Context, Result};
use quadstore::{render_tile, MappedHandle, RasterRenderer, RenderContext};
use tracing::info;

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::RenderArgs) -> Result<()> {
    let mut config = super::load_config(cli)?.render;
    if let Some(size) = args.tile_size { config.tile_size = size }

    let handle = MappedHandle::open(&args.index)
        .with_context(|| format!("[cmd::render] opening {}", args.index.display()))?;
    let ctx = RenderContext::acquire(config).context("[cmd::render] invalid render configuration")?;
    let renderer = RasterRenderer::new(&ctx);

    let key = args.tile;
    let png = render_tile(&renderer, &handle, key)
        .with_context(|| format!("[cmd::render] rendering {key}"))?;

    let out_path = args.output.clone()
        .unwrap_or_else(|| format!("./{}-{}-{}.png", key.zoom(), key.x(), key.y()).into());
    std::fs::write(&out_path, &png)
        .with_context(|| format!("[cmd::render] writing {}", out_path.display()))?;
    info!("[cmd::render] wrote {} ({} bytes)", out_path.display(), png.len());
    Ok(())
}
