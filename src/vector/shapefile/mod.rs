/*
This code is part of the geocodec library.
License: MIT

Notes: The logic behind working with the ESRI Shapefile format. Geometry lives
in the .shp, the .shx holds one (offset, length) entry per record, and both
open with the same 100-byte header.
*/

pub mod attributes;
pub mod geometry;
pub mod header;
pub mod index;
pub mod projection;
pub mod reader;
pub mod record;
pub mod rings;
pub mod writer;

use self::attributes::{AttributeSource, FieldData};
use self::geometry::{Shape, ShapeRange, ShapeType, ShapeView, VertexStore};
use self::header::{ShapefileHeader, HEADER_BYTES};
use self::index::{read_index, validate_against, ShapeHeader};
use self::projection::{PrjFile, ProjectionStore};
use self::record::decode_records;
use self::writer::ShapefileWriter;
use super::feature::{materialize, Feature};
use crate::configs::Configs;
use crate::error::{Result, ShapefileError};
use crate::io_utils::{BufferedBinaryReader, ByteOrderReader, Endianness};
use crate::progress::{LogProgress, NoProgress, ProgressHandler};
use crate::structures::Extent;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use std::fmt;
use std::fs::File;
use std::io::{Error, ErrorKind};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

type IndexedExtent = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Resolves the .shp and .shx paths for a path naming either file, or the
/// shared base name.
pub(crate) fn companion_paths(path: &Path) -> Result<(PathBuf, PathBuf)> {
    let (shp, shx) = match path.extension().and_then(|e| e.to_str()) {
        None => ("shp", "shx"),
        Some(ext) if ext.eq_ignore_ascii_case("shp") || ext.eq_ignore_ascii_case("shx") => {
            if ext.chars().all(|c| c.is_ascii_uppercase()) {
                ("SHP", "SHX")
            } else {
                ("shp", "shx")
            }
        }
        Some(ext) => {
            return Err(ShapefileError::NotSupported(format!(
                "unrecognized file extension .{}",
                ext
            )))
        }
    };
    Ok((path.with_extension(shp), path.with_extension(shx)))
}

fn progress_for(configs: &Configs, label: &str) -> Box<dyn ProgressHandler> {
    if configs.verbose_mode {
        Box::new(LogProgress::new(label))
    } else {
        Box::new(NoProgress)
    }
}

/// `Shapefile` is an in-memory ESRI Shapefile: the header, the index entries,
/// one `ShapeRange` per record and a single vertex arena holding every
/// coordinate.
///
/// Examples:
///
/// ```no_run
/// use geocodec::structures::Extent;
/// use geocodec::vector::Shapefile;
///
/// let input = Shapefile::open("roads.shp")?;
/// for feature in input.select(&Extent::new(0.0, 0.0, 10.0, 10.0), 100)? {
///     println!("{:?}", feature.geometry);
/// }
/// # Ok::<(), geocodec::ShapefileError>(())
/// ```
pub struct Shapefile {
    pub file_name: String,
    pub header: ShapefileHeader,
    /// Length of the .shx, in 16-bit words.
    pub shx_length: i32,
    pub index: Vec<ShapeHeader>,
    pub shapes: Vec<ShapeRange>,
    pub vertices: VertexStore,
    pub projection: Option<String>,
    pub configs: Configs,
    attributes: Option<Box<dyn AttributeSource + Send + Sync>>,
    spatial_index: OnceLock<RTree<IndexedExtent>>,
}

impl Shapefile {
    /// Creates an empty in-memory shapefile.
    pub fn new(shape_type: ShapeType) -> Shapefile {
        Shapefile {
            file_name: String::new(),
            header: ShapefileHeader::new(shape_type),
            shx_length: (HEADER_BYTES / 2) as i32,
            index: vec![],
            shapes: vec![],
            vertices: VertexStore::new(shape_type),
            projection: None,
            configs: Configs::default(),
            attributes: None,
            spatial_index: OnceLock::new(),
        }
    }

    /// Opens a shapefile with the default settings.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Shapefile> {
        let configs = Configs::default();
        let progress = progress_for(&configs, "Reading");
        Shapefile::open_with(path, &configs, progress.as_ref())
    }

    /// Opens the .shp/.shx pair (and .prj, if there is one) and decodes every
    /// record. Any decoding error aborts the open.
    pub fn open_with<P: AsRef<Path>>(
        path: P,
        configs: &Configs,
        progress: &dyn ProgressHandler,
    ) -> Result<Shapefile> {
        let (shp_path, shx_path) = companion_paths(path.as_ref())?;

        let mut shx = ByteOrderReader::new(
            BufferedBinaryReader::with_window_size(File::open(&shx_path)?, configs.buffer_size)?,
            Endianness::BigEndian,
        )?;
        let shx_header = ShapefileHeader::read_from(&mut shx, configs.strict_file_code)?;
        let shx_length = (shx.len() / 2) as i32;
        let mut index = read_index(&mut shx, &shx_header)?;

        let mut shp = ByteOrderReader::new(
            BufferedBinaryReader::with_window_size(File::open(&shp_path)?, configs.buffer_size)?,
            Endianness::BigEndian,
        )?;
        let mut header = ShapefileHeader::read_from(&mut shp, configs.strict_file_code)?;
        if shx_header.shape_type != header.shape_type {
            tracing::warn!(
                "index declares {} shapes, data file declares {}",
                shx_header.shape_type,
                header.shape_type
            );
        }

        if shp.len() == HEADER_BYTES {
            if !index.is_empty() {
                tracing::warn!(
                    "ignoring {} index entries for a data file with no records",
                    index.len()
                );
                index.clear();
            }
        } else {
            validate_against(&index, shp.len())?;
        }

        let (shapes, vertices) = if index.is_empty() {
            (vec![], VertexStore::new(header.shape_type))
        } else {
            decode_records(&mut shp, &index, header.shape_type, progress)?
        };
        if shapes.iter().all(|range| range.num_points == 0) {
            // null records only, the zero box on disk stands for no extent
            header.extent = Extent::empty();
        }
        let projection = PrjFile.open(&shp_path)?;

        tracing::debug!(
            "opened {}: {} {} records, {} vertices, {} bytes",
            shp_path.display(),
            shapes.len(),
            header.shape_type,
            vertices.num_vertices(),
            shp.len()
        );

        Ok(Shapefile {
            file_name: shp_path.to_string_lossy().to_string(),
            header,
            shx_length,
            index,
            shapes,
            vertices,
            projection,
            configs: configs.clone(),
            attributes: None,
            spatial_index: OnceLock::new(),
        })
    }

    pub fn shape_type(&self) -> ShapeType {
        self.header.shape_type
    }

    pub fn num_shapes(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn get_total_num_points(&self) -> usize {
        self.vertices.num_vertices()
    }

    pub fn get_short_filename(&self) -> String {
        Path::new(&self.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn get_shape(&self, index: usize) -> Result<&ShapeRange> {
        self.shapes.get(index).ok_or(ShapefileError::OutOfBounds {
            index,
            len: self.shapes.len(),
        })
    }

    pub fn shape_view(&self, index: usize) -> Result<ShapeView> {
        ShapeView::new(self.get_shape(index)?, &self.vertices)
    }

    /// Copies a record out of the file, attribute row included.
    pub fn get_shape_copy(&self, index: usize) -> Result<Shape> {
        let mut shape = Shape::from_view(&self.shape_view(index)?);
        shape.attributes = self.attribute_row(index)?;
        Ok(shape)
    }

    /// Materializes a record. Nothing is cached; every call rebuilds the
    /// geometry from the arena.
    pub fn get_feature(&self, index: usize) -> Result<Feature> {
        let view = self.shape_view(index)?;
        Ok(Feature {
            record_number: view.range.record_number,
            geometry: materialize(&view, self.configs.unmatched_holes),
            attributes: self.attribute_row(index)?,
        })
    }

    /// Visits every record in file order until the closure breaks. Returns the
    /// number of records visited.
    pub fn for_each_shape<F>(&self, mut f: F) -> Result<usize>
    where
        F: FnMut(usize, &ShapeView) -> ControlFlow<()>,
    {
        for i in 0..self.shapes.len() {
            let view = ShapeView::new(&self.shapes[i], &self.vertices)?;
            if f(i, &view).is_break() {
                return Ok(i + 1);
            }
        }
        Ok(self.shapes.len())
    }

    pub fn set_attributes(&mut self, attributes: Box<dyn AttributeSource + Send + Sync>) {
        self.attributes = Some(attributes);
    }

    pub fn attributes(&self) -> Option<&(dyn AttributeSource + Send + Sync)> {
        self.attributes.as_deref()
    }

    pub fn attributes_mut(&mut self) -> Option<&mut (dyn AttributeSource + Send + Sync + 'static)> {
        self.attributes.as_deref_mut()
    }

    fn attribute_row(&self, index: usize) -> Result<Option<Vec<FieldData>>> {
        match &self.attributes {
            Some(source) if index < source.num_rows() => {
                Ok(source.supply_page(index, 1)?.into_iter().next())
            }
            _ => Ok(None),
        }
    }

    /// Appends a shape, returning its record number. The shape must be a null
    /// shape or match the file's shape type.
    pub fn add_shape(&mut self, mut shape: Shape) -> Result<i32> {
        let shape_type = shape.shape_type();
        if !shape_type.is_null() && shape_type != self.header.shape_type {
            return Err(ShapefileError::InvariantViolation(format!(
                "cannot add a {} shape to a {} file",
                shape_type, self.header.shape_type
            )));
        }
        shape.validate()?;
        match (self.attributes.as_mut(), shape.attributes.take()) {
            (Some(source), Some(row)) => source.add_row(row)?,
            (Some(source), None) => {
                let row = vec![FieldData::Null; source.num_fields()];
                source.add_row(row)?;
            }
            (None, Some(_)) => {
                return Err(ShapefileError::InvariantViolation(
                    "shape carries an attribute row but the file has no attribute table"
                        .to_string(),
                ))
            }
            (None, None) => {}
        }

        let record_number = self.shapes.len() as i32 + 1;
        let start = self.vertices.num_vertices();
        self.vertices.extend_from_view(&shape.view());
        let mut range = shape.range;
        range.record_number = record_number;
        range.relocate(start);

        let offset = match self.index.last() {
            Some(last) => last.offset + last.content_length + 4,
            None => (HEADER_BYTES / 2) as i32,
        };
        self.index.push(ShapeHeader {
            offset,
            content_length: range.content_length,
        });
        self.header.file_length = offset + range.content_length + 4;
        self.shx_length = (HEADER_BYTES / 2) as i32 + 4 * self.index.len() as i32;
        self.header.extent.expand_to(&range.extent);
        self.shapes.push(range);
        self.spatial_index = OnceLock::new();
        Ok(record_number)
    }

    /// Removes a record (and its attribute row), renumbering the records after
    /// it. Returns the removed shape.
    pub fn remove_shape(&mut self, index: usize) -> Result<Shape> {
        let mut removed = Shape::from_view(&self.shape_view(index)?);
        if let Some(source) = self.attributes.as_mut() {
            if index < source.num_rows() {
                removed.attributes = Some(source.remove_row(index)?);
            }
        }
        let range = self.shapes.remove(index);
        self.vertices.remove_range(range.start_index, range.num_points);
        for later in self.shapes[index..].iter_mut() {
            later.record_number -= 1;
            let start = later.start_index - range.num_points;
            later.relocate(start);
        }
        removed.range.record_number = 0;
        self.rebuild_index();
        Ok(removed)
    }

    /// Recomputes index offsets, file lengths and the overall extent from the
    /// shape ranges.
    fn rebuild_index(&mut self) {
        let mut offset = (HEADER_BYTES / 2) as i32;
        let mut extent = Extent::empty();
        self.index = self
            .shapes
            .iter()
            .map(|range| {
                let entry = ShapeHeader {
                    offset,
                    content_length: range.content_length,
                };
                offset += range.content_length + 4;
                extent.expand_to(&range.extent);
                entry
            })
            .collect();
        self.header.file_length = offset;
        self.header.extent = extent;
        self.shx_length = (HEADER_BYTES / 2) as i32 + 4 * self.index.len() as i32;
        self.spatial_index = OnceLock::new();
    }

    /// Writes the .shp and .shx (and the .prj when a projection is set).
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P, overwrite: bool) -> Result<()> {
        let progress = progress_for(&self.configs, "Saving");
        self.save_as_with(path, overwrite, progress.as_ref())
    }

    /// Like `save_as`, reporting progress per record. When cancelled the files
    /// hold the records written so far, with consistent headers and index, and
    /// `Cancelled` is returned.
    pub fn save_as_with<P: AsRef<Path>>(
        &mut self,
        path: P,
        overwrite: bool,
        progress: &dyn ProgressHandler,
    ) -> Result<()> {
        let (shp_path, shx_path) = companion_paths(path.as_ref())?;
        if !overwrite && (shp_path.exists() || shx_path.exists()) {
            return Err(Error::new(
                ErrorKind::AlreadyExists,
                format!("{} already exists", shp_path.display()),
            )
            .into());
        }

        let mut writer = ShapefileWriter::create(&shp_path, self.header.shape_type, &self.configs)?;
        let num_shapes = self.shapes.len();
        let mut cancelled = false;
        let mut failure = None;
        for i in 0..num_shapes {
            if progress.is_cancelled() {
                cancelled = true;
                break;
            }
            let written = ShapeView::new(&self.shapes[i], &self.vertices)
                .and_then(|view| writer.write_shape(&view));
            if let Err(e) = written {
                failure = Some(e.in_record(i as i32 + 1));
                break;
            }
            progress.report(i + 1, num_shapes);
        }
        // headers are patched to the records written, also when stopping early
        let (header, entries) = writer.finish()?;
        if let Some(projection) = &self.projection {
            PrjFile.save(&shp_path, projection)?;
        }
        if let Some(e) = failure {
            tracing::warn!(
                "save stopped after {} of {} records",
                entries.len(),
                num_shapes
            );
            return Err(e);
        }
        if cancelled {
            tracing::warn!(
                "save cancelled after {} of {} records",
                entries.len(),
                num_shapes
            );
            return Err(ShapefileError::Cancelled);
        }

        // M and Z records now carry their M block on disk
        for (range, entry) in self.shapes.iter_mut().zip(entries.iter()) {
            range.content_length = entry.content_length;
        }
        self.header.file_length = header.file_length;
        self.shx_length = (HEADER_BYTES / 2) as i32 + 4 * entries.len() as i32;
        self.index = entries;
        self.file_name = shp_path.to_string_lossy().to_string();
        Ok(())
    }

    fn build_spatial_index(&self) -> RTree<IndexedExtent> {
        let boxes: Vec<IndexedExtent> = self
            .shapes
            .iter()
            .enumerate()
            .filter(|(_, range)| !range.is_null() && !range.extent.is_empty())
            .map(|(i, range)| {
                let e = &range.extent;
                GeomWithData::new(
                    Rectangle::from_corners([e.min_x, e.min_y], [e.max_x, e.max_y]),
                    i,
                )
            })
            .collect();
        RTree::bulk_load(boxes)
    }

    /// Indices of the records whose bounding boxes intersect `extent`, in
    /// record order.
    pub fn select_indices(&self, extent: &Extent) -> Vec<usize> {
        let tree = self
            .spatial_index
            .get_or_init(|| self.build_spatial_index());
        let envelope = AABB::from_corners([extent.min_x, extent.min_y], [extent.max_x, extent.max_y]);
        let mut hits: Vec<usize> = tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|item| item.data)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Up to `max_count` features whose bounding boxes intersect `extent`, in
    /// record order.
    pub fn select(&self, extent: &Extent, max_count: usize) -> Result<Vec<Feature>> {
        let mut hits = self.select_indices(extent);
        hits.truncate(max_count);
        hits.into_iter().map(|i| self.get_feature(i)).collect()
    }
}

impl fmt::Debug for Shapefile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Shapefile")
            .field("file_name", &self.file_name)
            .field("header", &self.header)
            .field("num_shapes", &self.shapes.len())
            .field("num_vertices", &self.vertices.num_vertices())
            .field("has_attributes", &self.attributes.is_some())
            .finish()
    }
}
