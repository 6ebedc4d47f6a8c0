/*
This code is part of the geocodec library.
License: MIT
*/
use super::geometry::{PartRange, ShapeRange, ShapeType, ShapeView, VertexStore};
use super::index::ShapeHeader;
use crate::error::{Result, ShapefileError};
use crate::io_utils::{ByteBlock, ByteOrderReader, ByteOrderWriter, Endianness};
use crate::progress::ProgressHandler;
use crate::structures::{Extent, Range};
use std::f64;
use std::io::prelude::*;

/// Bytes of record content (after the 8-byte record header) that a record of
/// this type must always hold, i.e. everything except the optional M block.
pub fn mandatory_byte_count(shape_type: ShapeType, num_parts: usize, num_points: usize) -> usize {
    match shape_type {
        ShapeType::Null => 4,
        ShapeType::Point | ShapeType::PointM => 20,
        ShapeType::PointZ => 28,
        ShapeType::MultiPoint | ShapeType::MultiPointM => 40 + 16 * num_points,
        ShapeType::MultiPointZ => 40 + 16 * num_points + 16 + 8 * num_points,
        ShapeType::PolyLine | ShapeType::PolyLineM | ShapeType::Polygon | ShapeType::PolygonM => {
            44 + 4 * num_parts + 16 * num_points
        }
        ShapeType::PolyLineZ | ShapeType::PolygonZ => {
            44 + 4 * num_parts + 16 * num_points + 16 + 8 * num_points
        }
        // parts, part types, points and the Z block
        ShapeType::MultiPatch => 44 + 8 * num_parts + 16 * num_points + 16 + 8 * num_points,
    }
}

/// Size of the optional M block of an M or Z record.
pub fn m_block_byte_count(shape_type: ShapeType, num_points: usize) -> usize {
    if !shape_type.has_m() {
        return 0;
    }
    match shape_type.base_shape_type() {
        ShapeType::Point => 8,
        _ => 16 + 8 * num_points,
    }
}

/// Record content length in 16-bit words.
pub fn content_length_words(
    shape_type: ShapeType,
    num_parts: usize,
    num_points: usize,
    with_m: bool,
) -> i32 {
    let mut bytes = mandatory_byte_count(shape_type, num_parts, num_points);
    if with_m {
        bytes += m_block_byte_count(shape_type, num_points);
    }
    (bytes / 2) as i32
}

/// Format quirk: M and Z records may or may not carry their M block, and
/// nothing but the declared content length says which. The block is there
/// exactly when the content is longer than the mandatory fields.
pub fn has_m_block(
    shape_type: ShapeType,
    content_length: i32,
    num_parts: usize,
    num_points: usize,
) -> bool {
    shape_type.has_m()
        && content_length.max(0) as usize * 2 > mandatory_byte_count(shape_type, num_parts, num_points)
}

/// What the first decoding pass learns about a record without touching its
/// coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordSummary {
    /// Byte offset of the record header in the .shp.
    pub offset: usize,
    pub record_number: i32,
    /// In 16-bit words.
    pub content_length: i32,
    pub shape_type: ShapeType,
    pub num_parts: usize,
    pub num_points: usize,
    /// The bounding box declared by the record (x/y only at this stage).
    pub extent: Extent,
}

impl RecordSummary {
    pub fn content_bytes(&self) -> usize {
        self.content_length.max(0) as usize * 2
    }
}

fn truncated(record_number: i32, expected: usize, available: usize) -> ShapefileError {
    ShapefileError::TruncatedRecord {
        record_number,
        expected,
        available,
    }
}

fn read_count<R: Read + Seek>(reader: &mut ByteOrderReader<R>, what: &str) -> Result<usize> {
    let value = reader.read_i32()?;
    if value < 0 {
        return Err(ShapefileError::Format(format!("negative {} ({})", what, value)));
    }
    Ok(value as usize)
}

/// First pass: reads the record header, shape type, bounding box and counts of
/// the record the index entry points at.
pub fn read_summary<R: Read + Seek>(
    reader: &mut ByteOrderReader<R>,
    entry: &ShapeHeader,
    record_number: i32,
    file_type: ShapeType,
) -> Result<RecordSummary> {
    let offset = entry.byte_offset();
    reader.seek(offset)?;
    reader.set_byte_order(Endianness::BigEndian);
    let declared_number = reader.read_i32()?;
    let content_length = reader.read_i32()?;
    if content_length != entry.content_length {
        return Err(ShapefileError::Format(format!(
            "record declares a content length of {} words but the index says {}",
            content_length, entry.content_length
        )));
    }
    if declared_number != record_number {
        tracing::warn!(
            "record {} is numbered {} in the .shp file",
            record_number,
            declared_number
        );
    }
    let content_bytes = content_length.max(0) as usize * 2;
    if content_bytes < 4 {
        return Err(truncated(record_number, 4, content_bytes));
    }

    reader.set_byte_order(Endianness::LittleEndian);
    let shape_type = ShapeType::from_int(reader.read_i32()?)?;
    if !shape_type.is_null() && shape_type != file_type {
        return Err(ShapefileError::Format(format!(
            "{} record in a {} file",
            shape_type, file_type
        )));
    }

    let mut summary = RecordSummary {
        offset,
        record_number,
        content_length,
        shape_type,
        num_parts: 0,
        num_points: 0,
        extent: Extent::empty(),
    };

    match shape_type.base_shape_type() {
        ShapeType::Null => return Ok(summary),
        ShapeType::MultiPatch => {
            return Err(ShapefileError::NotSupported(
                "MultiPatch records".to_string(),
            ))
        }
        ShapeType::Point => {
            summary.num_parts = 1;
            summary.num_points = 1;
        }
        base => {
            let header_bytes = if base == ShapeType::MultiPoint { 40 } else { 44 };
            if content_bytes < header_bytes {
                return Err(truncated(record_number, header_bytes, content_bytes));
            }
            let min_x = reader.read_f64()?;
            let min_y = reader.read_f64()?;
            let max_x = reader.read_f64()?;
            let max_y = reader.read_f64()?;
            summary.extent = Extent {
                min_x,
                min_y,
                max_x,
                max_y,
                m: None,
                z: None,
            };
            if base == ShapeType::MultiPoint {
                summary.num_points = read_count(reader, "point count")?;
                summary.num_parts = if summary.num_points > 0 { 1 } else { 0 };
            } else {
                summary.num_parts = read_count(reader, "part count")?;
                summary.num_points = read_count(reader, "point count")?;
            }
        }
    }

    let expected = mandatory_byte_count(shape_type, summary.num_parts, summary.num_points);
    if content_bytes < expected {
        return Err(truncated(record_number, expected, content_bytes));
    }
    Ok(summary)
}

/// Reads an axis block (min, max, then one value per vertex) at `pos`.
fn read_axis_block(
    block: &ByteBlock,
    pos: usize,
    dst: Option<&mut [f64]>,
) -> Option<Option<Range>> {
    let min = block.f64_at(pos, Endianness::LittleEndian)?;
    let max = block.f64_at(pos + 8, Endianness::LittleEndian)?;
    if let Some(dst) = dst {
        block.read_f64_into(pos + 16, dst)?;
    }
    Some(Range::from_raw(min, max))
}

fn column(column: &mut Option<Vec<f64>>, start: usize, count: usize) -> Result<&mut [f64]> {
    match column.as_mut() {
        Some(values) => Ok(&mut values[start..start + count]),
        None => Err(ShapefileError::InvariantViolation(
            "vertex store lacks a z/m column required by the record".to_string(),
        )),
    }
}

/// Second pass: reads the whole record payload into `block` and copies its
/// coordinates into `store`, starting at vertex `start`.
pub fn read_record<R: Read + Seek>(
    reader: &mut ByteOrderReader<R>,
    summary: &RecordSummary,
    block: &mut ByteBlock,
    store: &mut VertexStore,
    start: usize,
) -> Result<ShapeRange> {
    let record_number = summary.record_number;
    let shape_type = summary.shape_type;
    let n = summary.num_points;
    let content_bytes = summary.content_bytes();
    let mut range = ShapeRange {
        record_number,
        content_length: summary.content_length,
        shape_type,
        start_index: start,
        num_points: n,
        parts: vec![],
        extent: summary.extent,
    };
    if shape_type.is_null() {
        range.extent = Extent::empty();
        return Ok(range);
    }
    if start + n > store.num_vertices() {
        return Err(ShapefileError::OutOfBounds {
            index: start + n,
            len: store.num_vertices(),
        });
    }

    reader.seek(summary.offset + 8)?;
    reader.read_exact(block.reset(content_bytes))?;
    let short = |expected: usize| truncated(record_number, expected, content_bytes);
    let with_m = has_m_block(shape_type, summary.content_length, summary.num_parts, n);

    let points_at = match shape_type.base_shape_type() {
        ShapeType::Point => {
            range.parts.push(PartRange {
                start_index: 0,
                num_vertices: 1,
                offset: start,
            });
            4
        }
        ShapeType::MultiPoint => {
            if n > 0 {
                range.parts.push(PartRange {
                    start_index: 0,
                    num_vertices: n,
                    offset: start,
                });
            }
            40
        }
        _ => {
            let p = summary.num_parts;
            let mut starts = vec![0i32; p];
            block
                .read_i32_into(44, &mut starts)
                .ok_or_else(|| short(44 + 4 * p))?;
            range.parts = PartRange::from_starts(&starts, n, start)?;
            44 + 4 * p
        }
    };

    block
        .read_f64_into(points_at, &mut store.xy[2 * start..2 * (start + n)])
        .ok_or_else(|| short(points_at + 16 * n))?;
    let mut pos = points_at + 16 * n;

    if shape_type.base_shape_type() == ShapeType::Point {
        // a point has no bounding box, its z and m follow the coordinates directly
        range.extent = Extent::of_xy(&store.xy[2 * start..2 * start + 2]);
        if shape_type.has_z() {
            let z = block
                .f64_at(pos, Endianness::LittleEndian)
                .ok_or_else(|| short(pos + 8))?;
            column(&mut store.z, start, 1)?[0] = z;
            range.extent.z = Range::from_raw(z, z);
            pos += 8;
        }
        if with_m {
            let m = block
                .f64_at(pos, Endianness::LittleEndian)
                .ok_or_else(|| short(pos + 8))?;
            column(&mut store.m, start, 1)?[0] = m;
            range.extent.m = Range::from_raw(m, m);
        }
        return Ok(range);
    }

    if shape_type.has_z() {
        let dst = column(&mut store.z, start, n)?;
        range.extent.z = read_axis_block(block, pos, Some(dst)).ok_or_else(|| short(pos + 16 + 8 * n))?;
        pos += 16 + 8 * n;
    }
    if with_m {
        let dst = column(&mut store.m, start, n)?;
        range.extent.m = read_axis_block(block, pos, Some(dst)).ok_or_else(|| short(pos + 16 + 8 * n))?;
    }
    Ok(range)
}

/// Decodes every record listed in the index in two passes. The first pass
/// only reads record summaries so the vertex arena can be allocated once; the
/// second block-copies the coordinates into it.
pub fn decode_records<R: Read + Seek>(
    reader: &mut ByteOrderReader<R>,
    index: &[ShapeHeader],
    file_type: ShapeType,
    progress: &dyn ProgressHandler,
) -> Result<(Vec<ShapeRange>, VertexStore)> {
    let num_records = index.len();
    let mut summaries = Vec::with_capacity(num_records);
    let mut total_points = 0usize;
    let mut largest_record = 0usize;
    for (i, entry) in index.iter().enumerate() {
        if progress.is_cancelled() {
            return Err(ShapefileError::Cancelled);
        }
        let record_number = i as i32 + 1;
        let summary = read_summary(reader, entry, record_number, file_type)
            .map_err(|e| e.in_record(record_number))?;
        total_points += summary.num_points;
        largest_record = largest_record.max(summary.content_bytes());
        summaries.push(summary);
        progress.report(i + 1, 2 * num_records);
    }

    let mut store = VertexStore::allocate(file_type, total_points);
    let mut block = ByteBlock::with_capacity(largest_record);
    let mut shapes = Vec::with_capacity(num_records);
    let mut start = 0usize;
    for (i, summary) in summaries.iter().enumerate() {
        if progress.is_cancelled() {
            return Err(ShapefileError::Cancelled);
        }
        let range = read_record(reader, summary, &mut block, &mut store, start)
            .map_err(|e| e.in_record(summary.record_number))?;
        start += range.num_points;
        shapes.push(range);
        progress.report(num_records + i + 1, 2 * num_records);
    }
    tracing::debug!(
        "decoded {} records holding {} vertices",
        shapes.len(),
        total_points
    );
    Ok((shapes, store))
}

fn write_axis_block<W: Write>(
    writer: &mut ByteOrderWriter<W>,
    values: Option<&[f64]>,
    num_points: usize,
    fill: f64,
) -> Result<()> {
    let (min, max) = match values.and_then(Range::of) {
        Some(r) => (r.min, r.max),
        None => Range::inactive_sentinel(),
    };
    writer.write_f64(min)?;
    writer.write_f64(max)?;
    match values {
        Some(values) => writer.write_f64_slice(values)?,
        None => {
            for _ in 0..num_points {
                writer.write_f64(fill)?;
            }
        }
    }
    Ok(())
}

/// Encodes one record. M and Z types always get their M block; shapes without
/// measures are written with NaN. Returns the content length in words.
pub fn write_record<W: Write>(
    writer: &mut ByteOrderWriter<W>,
    record_number: i32,
    view: &ShapeView,
) -> Result<i32> {
    let shape_type = view.shape_type();
    let n = view.num_points();
    let p = view.num_parts();
    if view.xy.len() != 2 * n
        || view.z.map_or(false, |z| z.len() != n)
        || view.m.map_or(false, |m| m.len() != n)
    {
        return Err(ShapefileError::InvariantViolation(format!(
            "record {} declares {} vertices but its columns disagree",
            record_number, n
        )));
    }
    match shape_type.base_shape_type() {
        ShapeType::MultiPatch => {
            return Err(ShapefileError::NotSupported(
                "writing MultiPatch records".to_string(),
            ))
        }
        ShapeType::Point if n != 1 => {
            return Err(ShapefileError::InvariantViolation(format!(
                "a {} record holds exactly one point, found {}",
                shape_type, n
            )))
        }
        _ => {}
    }

    let content_length = content_length_words(shape_type, p, n, shape_type.has_m());
    writer.set_byte_order(Endianness::BigEndian);
    writer.write_i32(record_number)?;
    writer.write_i32(content_length)?;
    writer.set_byte_order(Endianness::LittleEndian);
    writer.write_i32(shape_type.to_int())?;

    match shape_type.base_shape_type() {
        ShapeType::Null => return Ok(content_length),
        ShapeType::Point => {
            writer.write_f64(view.xy[0])?;
            writer.write_f64(view.xy[1])?;
            if shape_type.has_z() {
                writer.write_f64(view.z.map_or(0f64, |z| z[0]))?;
            }
            if shape_type.has_m() {
                writer.write_f64(view.m.map_or(f64::NAN, |m| m[0]))?;
            }
            return Ok(content_length);
        }
        base => {
            let extent = Extent::of_xy(view.xy);
            if extent.is_empty() {
                writer.write_f64_slice(&[0f64; 4])?;
            } else {
                writer.write_f64(extent.min_x)?;
                writer.write_f64(extent.min_y)?;
                writer.write_f64(extent.max_x)?;
                writer.write_f64(extent.max_y)?;
            }
            if base != ShapeType::MultiPoint {
                writer.write_i32(p as i32)?;
            }
            writer.write_i32(n as i32)?;
            if base != ShapeType::MultiPoint {
                for part in &view.range.parts {
                    writer.write_i32(part.start_index as i32)?;
                }
            }
            writer.write_f64_slice(view.xy)?;
        }
    }
    if shape_type.has_z() {
        write_axis_block(writer, view.z, n, 0f64)?;
    }
    if shape_type.has_m() {
        write_axis_block(writer, view.m, n, f64::NAN)?;
    }
    Ok(content_length)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::progress::NoProgress;
    use crate::structures::Point2D;
    use crate::vector::shapefile::geometry::Shape;
    use std::io::Cursor;

    fn encode(shape: &Shape) -> Vec<u8> {
        let mut writer = ByteOrderWriter::new(Vec::new(), Endianness::LittleEndian);
        write_record(&mut writer, 1, &shape.view()).unwrap();
        writer.into_inner()
    }

    fn entry_for(bytes: &[u8]) -> ShapeHeader {
        ShapeHeader {
            offset: 0,
            content_length: ((bytes.len() - 8) / 2) as i32,
        }
    }

    fn ring() -> Vec<Point2D> {
        vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 10.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(0.0, 0.0),
        ]
    }

    #[test]
    fn test_byte_counts() {
        assert_eq!(mandatory_byte_count(ShapeType::Null, 0, 0), 4);
        assert_eq!(mandatory_byte_count(ShapeType::PointZ, 1, 1), 28);
        assert_eq!(content_length_words(ShapeType::PointZ, 1, 1, true), 18);
        assert_eq!(content_length_words(ShapeType::Point, 1, 1, false), 10);
        assert_eq!(mandatory_byte_count(ShapeType::PolygonM, 2, 10), 44 + 8 + 160);
        assert_eq!(m_block_byte_count(ShapeType::PolygonM, 10), 96);
        assert_eq!(m_block_byte_count(ShapeType::Polygon, 10), 0);
    }

    #[test]
    fn test_m_block_gate() {
        let mandatory = mandatory_byte_count(ShapeType::PolygonM, 1, 5) as i32 / 2;
        assert!(!has_m_block(ShapeType::PolygonM, mandatory, 1, 5));
        assert!(has_m_block(ShapeType::PolygonM, mandatory + 28, 1, 5));
        // plain types never carry one, whatever the length says
        assert!(!has_m_block(ShapeType::Polygon, mandatory + 28, 1, 5));
    }

    #[test]
    fn test_polygon_m_without_m_block() {
        let mut shape = Shape::new(ShapeType::PolygonM);
        shape.add_part_m(&ring(), &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let mut bytes = encode(&shape);

        // cut the record back to its mandatory fields
        let mandatory = mandatory_byte_count(ShapeType::PolygonM, 1, 5);
        bytes.truncate(8 + mandatory);
        bytes[4..8].copy_from_slice(&((mandatory / 2) as i32).to_be_bytes());

        let mut reader =
            ByteOrderReader::new(Cursor::new(bytes.clone()), Endianness::BigEndian).unwrap();
        let (shapes, store) =
            decode_records(&mut reader, &[entry_for(&bytes)], ShapeType::PolygonM, &NoProgress)
                .unwrap();
        assert!(!shapes[0].has_m_block());
        assert_eq!(shapes[0].extent.m, None);
        let view = ShapeView::new(&shapes[0], &store).unwrap();
        assert!(view.m.is_none());
        assert_eq!(view.xy, shape.vertices.xy.as_slice());
    }

    #[test]
    fn test_polygon_m_with_m_block() {
        let mut shape = Shape::new(ShapeType::PolygonM);
        shape.add_part_m(&ring(), &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let bytes = encode(&shape);
        let mut reader =
            ByteOrderReader::new(Cursor::new(bytes.clone()), Endianness::BigEndian).unwrap();
        let (shapes, store) =
            decode_records(&mut reader, &[entry_for(&bytes)], ShapeType::PolygonM, &NoProgress)
                .unwrap();
        let view = ShapeView::new(&shapes[0], &store).unwrap();
        assert_eq!(view.m, Some(&[1.0, 2.0, 3.0, 4.0, 5.0][..]));
        assert_eq!(shapes[0].extent.m, Some(Range::new(1.0, 5.0)));
    }

    #[test]
    fn test_truncated_record() {
        let mut shape = Shape::new(ShapeType::PolyLine);
        shape.add_part(&ring()).unwrap();
        let mut bytes = encode(&shape);
        // declare fewer words than the point count requires
        bytes.truncate(8 + 60);
        bytes[4..8].copy_from_slice(&30i32.to_be_bytes());
        let mut reader =
            ByteOrderReader::new(Cursor::new(bytes.clone()), Endianness::BigEndian).unwrap();
        let err = decode_records(&mut reader, &[entry_for(&bytes)], ShapeType::PolyLine, &NoProgress)
            .unwrap_err();
        match err {
            ShapefileError::TruncatedRecord {
                record_number,
                expected,
                available,
            } => {
                assert_eq!(record_number, 1);
                assert_eq!(expected, 44 + 4 + 80);
                assert_eq!(available, 60);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_index_disagreement() {
        let mut shape = Shape::new(ShapeType::Point);
        shape.add_point(Point2D::new(1.0, 2.0)).unwrap();
        let bytes = encode(&shape);
        let entry = ShapeHeader {
            offset: 0,
            content_length: 12,
        };
        let mut reader = ByteOrderReader::new(Cursor::new(bytes), Endianness::BigEndian).unwrap();
        let err = decode_records(&mut reader, &[entry], ShapeType::Point, &NoProgress).unwrap_err();
        assert_eq!(err.record_number(), Some(1));
    }

    #[test]
    fn test_point_z_without_measure() {
        let mut shape = Shape::new(ShapeType::PointZ);
        shape.add_point_z(Point2D::new(3.0, 4.0), 5.0, None).unwrap();
        let mut bytes = encode(&shape);
        assert_eq!(bytes.len(), 8 + 36);
        bytes.truncate(8 + 28);
        bytes[4..8].copy_from_slice(&14i32.to_be_bytes());
        let mut reader =
            ByteOrderReader::new(Cursor::new(bytes.clone()), Endianness::BigEndian).unwrap();
        let (shapes, store) =
            decode_records(&mut reader, &[entry_for(&bytes)], ShapeType::PointZ, &NoProgress)
                .unwrap();
        let view = ShapeView::new(&shapes[0], &store).unwrap();
        assert_eq!(view.coordinate(0).z, Some(5.0));
        assert_eq!(view.coordinate(0).m, None);
        assert_eq!(shapes[0].extent.z, Some(Range::new(5.0, 5.0)));
    }
}
