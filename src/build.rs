//! Offline pipeline: decode, partition, serialize.

use std::path::Path;
use std::time::Instant;

use tilegrid::BoundingBox;
use tracing::info;

use crate::config::{IndexConfig, RootExtent};
use crate::decode::FeatureSource;
use crate::error::{BuildError, DecodeError, PartitionError};
use crate::index::{serialize, serialize_ephemeral, IndexArtifact};
use crate::partition::{Partition, Partitioner, Survey};

/// Decode `source` and assign its features to cells.
///
/// The `dataset` extent scans the source twice: once to find the root box,
/// once to encode and assign. Both scans must yield the same features.
pub fn partition_source<S: FeatureSource + ?Sized>(source: &S, config: &IndexConfig) -> Result<Partition, BuildError> {
    config.validate()?;

    let (root, surveyed) = match config.extent {
        RootExtent::World => (BoundingBox::WORLD, None),
        RootExtent::Dataset => {
            let started = Instant::now();
            let mut survey = Survey::new();
            source.scan(&mut |feature| {
                survey.push(&feature);
                Ok(())
            })?;
            info!("[build] surveyed {} features in {:.2?}", survey.features(), started.elapsed());
            (survey.bounds(), Some(survey.features()))
        }
    };

    let started = Instant::now();
    let mut partitioner = Partitioner::new(config, root)?;
    let mut rejected = None;
    let scanned = source.scan(&mut |feature| {
        partitioner.push(&feature).map_err(|e| {
            rejected = Some(e);
            DecodeError::Interrupted
        })
    });
    if let Some(e) = rejected { return Err(e.into()) }
    let decoded = scanned?;
    if let Some(expected) = surveyed {
        if expected != decoded {
            return Err(PartitionError::CountChanged { expected, found: decoded }.into());
        }
    }
    info!("[build] decoded and assigned {decoded} features in {:.2?}", started.elapsed());

    Ok(partitioner.finish()?)
}

/// Build an index from `source` and persist it at `output`.
///
/// Nothing is written to `output` unless every stage succeeds.
pub fn build_index<S: FeatureSource + ?Sized>(
    source: &S,
    config: &IndexConfig,
    output: &Path,
) -> Result<IndexArtifact, BuildError> {
    let partition = match (&config.scratch_dir, output.parent()) {
        (None, Some(dir)) if !dir.as_os_str().is_empty() => {
            partition_source(source, &config.clone().with_scratch_dir(dir))?
        }
        _ => partition_source(source, config)?,
    };
    let artifact = serialize(&partition, output)?;
    info!(
        "[build] {}: {} features, {} tiles, {} bytes",
        artifact.path().display(), artifact.feature_count(), artifact.tile_count(), artifact.size(),
    );
    Ok(artifact)
}

/// Build an index into a temporary file owned by the returned artifact (in
/// `dir`, or the system temp directory).
pub fn build_ephemeral<S: FeatureSource + ?Sized>(
    source: &S,
    config: &IndexConfig,
    dir: Option<&Path>,
) -> Result<IndexArtifact, BuildError> {
    let partition = match (&config.scratch_dir, dir) {
        (None, Some(dir)) => partition_source(source, &config.clone().with_scratch_dir(dir))?,
        _ => partition_source(source, config)?,
    };
    Ok(serialize_ephemeral(&partition, dir)?)
}
