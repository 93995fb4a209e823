use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, info};
use zerocopy::little_endian::U32;
use zerocopy::IntoBytes;

use crate::error::SerializeError;
use crate::index::format::{RegionHeader, Sections, TileEntry, HEADER_SIZE, TILE_ENTRY_SIZE};
use crate::partition::Partition;

/// The persisted result of a build.
///
/// An ephemeral artifact owns its temporary file: the file is removed when the
/// artifact, or the `MappedHandle` it was handed to, is dropped.
#[derive(Debug)]
pub struct IndexArtifact {
    path: PathBuf,
    size: u64,
    feature_count: u64,
    tile_count: u64,
    sha256: String,
    temp: Option<TempPath>,
}

impl IndexArtifact {
    #[inline] pub fn path(&self) -> &Path { &self.path }

    /// Region size in bytes.
    #[inline] pub fn size(&self) -> u64 { self.size }

    #[inline] pub fn feature_count(&self) -> u64 { self.feature_count }

    /// Number of populated tiles.
    #[inline] pub fn tile_count(&self) -> u64 { self.tile_count }

    /// Lowercase hex SHA-256 of the region bytes.
    #[inline] pub fn sha256(&self) -> &str { &self.sha256 }

    #[inline] pub fn is_ephemeral(&self) -> bool { self.temp.is_some() }

    pub(crate) fn take_temp(&mut self) -> Option<TempPath> { self.temp.take() }
}

/// Write `partition` to `output`.
///
/// The region is written to a temporary file next to `output` and renamed over
/// it only once complete, so an existing file survives any failure.
pub fn serialize(partition: &Partition, output: &Path) -> Result<IndexArtifact, SerializeError> {
    let io_err = |source| SerializeError::Io { path: output.to_path_buf(), source };
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    let (size, sections) = write_region(partition, tmp.as_file(), output)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(output)
        .map_err(|e| SerializeError::Persist { path: output.to_path_buf(), source: e.error })?;

    let sha256 = sha256_file(output).map_err(io_err)?;
    info!("[index::write] wrote {} ({size} bytes, {} tiles, sha256 {sha256})", output.display(), sections.tile_count);

    Ok(IndexArtifact {
        path: output.to_path_buf(),
        size,
        feature_count: sections.feature_count,
        tile_count: sections.tile_count,
        sha256,
        temp: None,
    })
}

/// Write `partition` to a fresh temporary file (in `dir`, or the system temp
/// directory) owned by the returned artifact.
pub fn serialize_ephemeral(partition: &Partition, dir: Option<&Path>) -> Result<IndexArtifact, SerializeError> {
    let scratch = dir.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
    let tmp = NamedTempFile::new_in(&scratch)
        .map_err(|source| SerializeError::Io { path: scratch.clone(), source })?;
    let path = tmp.path().to_path_buf();
    let io_err = |source| SerializeError::Io { path: path.clone(), source };

    let (size, sections) = write_region(partition, tmp.as_file(), &path)?;
    let (file, temp) = tmp.into_parts();
    file.sync_all().map_err(io_err)?;
    drop(file);

    let sha256 = sha256_file(&path).map_err(io_err)?;
    debug!("[index::write] ephemeral region {} ({size} bytes)", path.display());

    Ok(IndexArtifact {
        path,
        size,
        feature_count: sections.feature_count,
        tile_count: sections.tile_count,
        sha256,
        temp: Some(temp),
    })
}

fn count32(n: usize, what: &'static str) -> Result<u32, SerializeError> {
    u32::try_from(n).map_err(|_| SerializeError::Overflow(what))
}

/// Header placeholder, zeroed offset table, payloads cell by cell, dictionary,
/// then the header and table are backfilled. Payload records are copied from
/// the partition's spill. Returns the total size.
fn write_region(partition: &Partition, file: &File, path: &Path) -> Result<(u64, Sections), SerializeError> {
    let io_err = |source| SerializeError::Io { path: path.to_path_buf(), source };
    let mut w = BufWriter::new(file);

    let tile_count = partition.cells().len();
    let table_len = (tile_count * TILE_ENTRY_SIZE) as u64;
    let payload_offset = HEADER_SIZE as u64 + table_len;

    w.write_all(&[0; HEADER_SIZE]).map_err(io_err)?;
    io::copy(&mut io::repeat(0).take(table_len), &mut w).map_err(io_err)?;

    let mut entries = Vec::with_capacity(tile_count);
    let mut pos = payload_offset;
    for cell in partition.cells() {
        let start = pos;
        for &index in cell.features() {
            let record = partition.encoded(index).ok_or(SerializeError::MissingFeature(index))?;
            w.write_all(record).map_err(io_err)?;
            pos += record.len() as u64;
        }
        entries.push(TileEntry::new(cell.key(), start, pos - start, count32(cell.features().len(), "tile feature count")?));
    }

    let dictionary_offset = pos;
    let strings = partition.dictionary().strings();
    w.write_all(U32::new(count32(strings.len(), "dictionary size")?).as_bytes()).map_err(io_err)?;
    let mut end: u64 = 0;
    w.write_all(U32::new(0).as_bytes()).map_err(io_err)?;
    for s in strings {
        end += s.len() as u64;
        let end = u32::try_from(end).map_err(|_| SerializeError::Overflow("dictionary bytes"))?;
        w.write_all(U32::new(end).as_bytes()).map_err(io_err)?;
    }
    for s in strings {
        w.write_all(s.as_bytes()).map_err(io_err)?;
    }
    let dictionary_len = 4 + 4 * (strings.len() as u64 + 1) + end;
    pos += dictionary_len;

    let sections = Sections {
        feature_count: partition.feature_count(),
        tile_count: tile_count as u64,
        payload_offset,
        dictionary_offset,
        dictionary_len,
    };
    let grid = partition.grid();
    let header = RegionHeader::new(grid.max_depth(), partition.extent(), grid.root(), sections);

    w.seek(SeekFrom::Start(0)).map_err(io_err)?;
    w.write_all(header.as_bytes()).map_err(io_err)?;
    w.write_all(entries.as_bytes()).map_err(io_err)?;
    w.flush().map_err(io_err)?;

    Ok((pos, sections))
}

/// Lowercase hex SHA-256 of a file's bytes.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 1 << 16];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 { break }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
