use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tempfile::TempPath;
use tilegrid::{TileGrid, MAX_ZOOM};
use tracing::{debug, info};
use zerocopy::FromBytes;

use crate::config::RootExtent;
use crate::error::MapError;
use crate::index::format::{RegionHeader, Sections, TileEntry, FORMAT_VERSION, HEADER_SIZE, MAGIC, TILE_ENTRY_SIZE};
use crate::index::{Dictionary, IndexArtifact};

/// A validated, read-only memory map of an index region.
///
/// Every view handed out borrows the handle, so the map cannot be released
/// while a view is alive. Dropping the handle unmaps the region, closes the
/// file, and removes the backing file if the handle owns an ephemeral one.
pub struct MappedHandle {
    // Field order is drop order: unmap, close, then delete.
    map: Mmap,
    _file: File,
    ephemeral: Option<TempPath>,
    path: PathBuf,
    grid: TileGrid,
    extent: RootExtent,
    sections: Sections,
}

impl MappedHandle {
    /// Map `path` and check its header, offset table and dictionary.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let io_err = |source| MapError::Io { path: path.to_path_buf(), source };
        let corrupt = |reason: String| MapError::Corrupt { path: path.to_path_buf(), reason };

        let file = File::open(path).map_err(io_err)?;
        let len = file.metadata().map_err(io_err)?.len();
        if len < MAGIC.len() as u64 { return Err(corrupt(format!("{len} bytes is too short for an index"))) }

        // SAFETY: the region is treated as immutable for the lifetime of the
        // map; writers never modify a persisted region in place.
        let map = unsafe { Mmap::map(&file) }.map_err(io_err)?;
        #[cfg(unix)]
        let _ = map.advise(memmap2::Advice::Random);

        let (grid, extent, sections) = validate(&map, path)?;
        info!(
            "[store::mapped] opened {} ({} bytes, {} tiles, {} features, depth {})",
            path.display(), map.len(), sections.tile_count, sections.feature_count, grid.max_depth(),
        );

        Ok(Self { map, _file: file, ephemeral: None, path: path.to_path_buf(), grid, extent, sections })
    }

    /// Map a freshly built artifact. An ephemeral artifact hands its temporary
    /// file over to the handle.
    pub fn open_artifact(mut artifact: IndexArtifact) -> Result<Self, MapError> {
        let mut handle = Self::open(artifact.path())?;
        handle.ephemeral = artifact.take_temp();
        Ok(handle)
    }

    /// Release the mapping. Equivalent to dropping the handle.
    pub fn close(self) {
        debug!("[store::mapped] closing {}", self.path.display());
    }

    #[inline] pub fn path(&self) -> &Path { &self.path }

    #[inline] pub fn grid(&self) -> &TileGrid { &self.grid }

    #[inline] pub fn max_depth(&self) -> u8 { self.grid.max_depth() }

    #[inline] pub fn extent(&self) -> RootExtent { self.extent }

    #[inline] pub fn feature_count(&self) -> u64 { self.sections.feature_count }

    /// Number of populated tiles.
    #[inline] pub fn tile_count(&self) -> u64 { self.sections.tile_count }

    /// Size of the mapped region in bytes.
    #[inline] pub fn len(&self) -> u64 { self.map.len() as u64 }

    #[inline] pub fn is_empty(&self) -> bool { self.sections.tile_count == 0 }

    #[inline] pub fn is_ephemeral(&self) -> bool { self.ephemeral.is_some() }

    #[inline] pub(crate) fn region(&self) -> &[u8] { &self.map }

    /// The offset table, sorted by packed key.
    pub(crate) fn table(&self) -> &[TileEntry] {
        let rest = self.map.get(HEADER_SIZE..).unwrap_or_default();
        <[TileEntry]>::ref_from_prefix_with_elems(rest, self.sections.tile_count as usize)
            .map(|(table, _)| table)
            .unwrap_or_default()
    }

    pub(crate) fn dictionary(&self) -> Dictionary<'_> {
        let start = self.sections.dictionary_offset as usize;
        let end = start + self.sections.dictionary_len as usize;
        self.map.get(start..end)
            .and_then(|section| Dictionary::split(section).ok())
            .unwrap_or(Dictionary::EMPTY)
    }
}

impl std::fmt::Debug for MappedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedHandle")
            .field("path", &self.path)
            .field("len", &self.map.len())
            .field("grid", &self.grid)
            .field("extent", &self.extent)
            .field("sections", &self.sections)
            .field("ephemeral", &self.ephemeral.is_some())
            .finish()
    }
}

/// Check everything a query relies on so that lookups never index out of
/// bounds: header fields, section bounds, table order and targets, dictionary.
fn validate(map: &[u8], path: &Path) -> Result<(TileGrid, RootExtent, Sections), MapError> {
    let corrupt = |reason: String| MapError::Corrupt { path: path.to_path_buf(), reason };

    if &map[..MAGIC.len()] != MAGIC { return Err(MapError::BadMagic { path: path.to_path_buf() }) }
    let (header, _) = RegionHeader::ref_from_prefix(map)
        .map_err(|_| corrupt(format!("{} bytes is too short for the header", map.len())))?;
    if header.version() != FORMAT_VERSION {
        return Err(MapError::Version { path: path.to_path_buf(), found: header.version(), expected: FORMAT_VERSION });
    }

    let max_depth = header.max_depth();
    if max_depth > MAX_ZOOM { return Err(corrupt(format!("max depth {max_depth} exceeds {MAX_ZOOM}"))) }
    let extent = header.extent().ok_or_else(|| corrupt("unknown root extent".into()))?;
    let root = header.root().ok_or_else(|| corrupt("root box min exceeds max".into()))?;
    let grid = TileGrid::new(root, max_depth).map_err(|e| corrupt(e.to_string()))?;

    let sections = header.sections();
    let len = map.len() as u64;
    let table_end = sections.tile_count
        .checked_mul(TILE_ENTRY_SIZE as u64)
        .and_then(|n| n.checked_add(HEADER_SIZE as u64))
        .ok_or_else(|| corrupt("tile count overflows".into()))?;
    if sections.payload_offset != table_end {
        return Err(corrupt(format!("payload starts at {} but the offset table ends at {table_end}", sections.payload_offset)));
    }
    let dictionary_end = sections.dictionary_offset.checked_add(sections.dictionary_len);
    if sections.dictionary_offset < sections.payload_offset || dictionary_end != Some(len) {
        return Err(corrupt(format!(
            "dictionary {}+{} does not end the {len}-byte region",
            sections.dictionary_offset, sections.dictionary_len,
        )));
    }

    let rest = &map[HEADER_SIZE..];
    let (table, _) = <[TileEntry]>::ref_from_prefix_with_elems(rest, sections.tile_count as usize)
        .map_err(|_| corrupt("offset table truncated".into()))?;

    let mut previous: Option<u64> = None;
    for entry in table {
        let key = entry.key().ok_or_else(|| corrupt(format!("invalid packed key {:#x}", entry.packed_key())))?;
        if previous.is_some_and(|p| p >= entry.packed_key()) {
            return Err(corrupt(format!("offset table not sorted at {key}")));
        }
        previous = Some(entry.packed_key());

        if key.zoom() > max_depth { return Err(corrupt(format!("tile {key} is deeper than {max_depth}"))) }
        let end = entry.offset().checked_add(entry.len());
        if entry.offset() < sections.payload_offset || end.is_none_or(|e| e > sections.dictionary_offset) {
            return Err(corrupt(format!("tile {key} payload {}+{} is outside the payload section", entry.offset(), entry.len())));
        }
    }

    let dictionary = &map[sections.dictionary_offset as usize..];
    Dictionary::parse(dictionary).map_err(corrupt)?;

    Ok((grid, extent, sections))
}
