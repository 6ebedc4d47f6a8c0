use geocodec::structures::{Extent, Point2D};
use geocodec::vector::{
    CoordinateType, Geometry, Shape, ShapeReader, ShapeType, Shapefile, WkbDecoder,
};
use geocodec::{CancelFlag, Configs, ProgressHandler, ShapefileError};
use std::cell::Cell;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

fn add_part(shape: &mut Shape, points: &[Point2D], coordinate_type: CoordinateType, seed: f64) {
    let m: Vec<f64> = (0..points.len()).map(|i| seed + 0.5 * i as f64).collect();
    let z: Vec<f64> = (0..points.len()).map(|i| 100.0 + seed + i as f64).collect();
    match coordinate_type {
        CoordinateType::Regular => shape.add_part(points).unwrap(),
        CoordinateType::M => shape.add_part_m(points, &m).unwrap(),
        CoordinateType::Z => shape.add_part_z(points, &z, Some(&m)).unwrap(),
    }
}

fn square(x: f64, y: f64, size: f64, clockwise: bool) -> Vec<Point2D> {
    let mut ring = vec![
        Point2D::new(x, y),
        Point2D::new(x, y + size),
        Point2D::new(x + size, y + size),
        Point2D::new(x + size, y),
        Point2D::new(x, y),
    ];
    if !clockwise {
        ring.reverse();
    }
    ring
}

fn sample_shape(base: ShapeType, coordinate_type: CoordinateType, seed: f64) -> Shape {
    let shape_type = ShapeType::with_coordinate_type(base, coordinate_type);
    let mut shape = Shape::new(shape_type);
    match base {
        ShapeType::Point => add_part(&mut shape, &[Point2D::new(seed, -seed)], coordinate_type, seed),
        ShapeType::MultiPoint => add_part(
            &mut shape,
            &[
                Point2D::new(seed, 0.0),
                Point2D::new(seed + 1.0, 2.0),
                Point2D::new(seed + 2.0, 4.0),
            ],
            coordinate_type,
            seed,
        ),
        ShapeType::PolyLine => {
            add_part(
                &mut shape,
                &[Point2D::new(seed, 0.0), Point2D::new(seed + 5.0, 5.0)],
                coordinate_type,
                seed,
            );
            add_part(
                &mut shape,
                &[
                    Point2D::new(seed, 10.0),
                    Point2D::new(seed + 1.0, 11.0),
                    Point2D::new(seed + 2.0, 10.0),
                ],
                coordinate_type,
                seed + 1.0,
            );
        }
        _ => {
            add_part(&mut shape, &square(seed, 0.0, 10.0, true), coordinate_type, seed);
            add_part(&mut shape, &square(seed + 2.0, 2.0, 2.0, false), coordinate_type, seed);
        }
    }
    shape
}

#[test]
fn every_flavour_survives_a_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let bases = [
        ShapeType::Point,
        ShapeType::MultiPoint,
        ShapeType::PolyLine,
        ShapeType::Polygon,
    ];
    let flavours = [CoordinateType::Regular, CoordinateType::M, CoordinateType::Z];
    for base in bases.iter() {
        for flavour in flavours.iter() {
            let shape_type = ShapeType::with_coordinate_type(*base, *flavour);
            let path = dir.path().join(format!("{}.shp", shape_type.to_int()));
            let originals: Vec<Shape> = (0..3)
                .map(|i| sample_shape(*base, *flavour, 10.0 * i as f64))
                .collect();

            let mut sf = Shapefile::new(shape_type);
            for shape in &originals {
                sf.add_shape(shape.clone()).unwrap();
            }
            sf.save_as(&path, false).unwrap();

            let input = Shapefile::open(&path).unwrap();
            assert_eq!(input.shape_type(), shape_type);
            assert_eq!(input.num_shapes(), originals.len());
            for (i, original) in originals.iter().enumerate() {
                let expected = original.view();
                let found = input.shape_view(i).unwrap();
                assert_eq!(found.shape_type(), shape_type);
                assert_eq!(found.xy, expected.xy, "{} record {}", shape_type, i);
                assert_eq!(found.z, expected.z, "{} record {}", shape_type, i);
                assert_eq!(found.m, expected.m, "{} record {}", shape_type, i);
                assert_eq!(found.num_parts(), expected.num_parts());
                for part in 0..found.num_parts() {
                    assert_eq!(found.part_xy(part), expected.part_xy(part));
                }
                assert_eq!(found.range.extent, expected.range.extent);
            }
        }
    }
}

#[test]
fn index_matches_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lines.shp");
    let mut sf = Shapefile::new(ShapeType::PolyLine);
    for i in 0..25 {
        let mut shape = Shape::new(ShapeType::PolyLine);
        let points: Vec<Point2D> = (0..(i % 7 + 2))
            .map(|j| Point2D::new(j as f64, i as f64))
            .collect();
        shape.add_part(&points).unwrap();
        sf.add_shape(shape).unwrap();
    }
    sf.save_as(&path, false).unwrap();

    assert_eq!(
        fs::metadata(path.with_extension("shx")).unwrap().len(),
        100 + 8 * 25
    );
    let input = Shapefile::open(&path).unwrap();
    assert_eq!(input.shx_length, 50 + 4 * 25);
    assert_eq!(input.index[0].offset, 50);
    for pair in input.index.windows(2) {
        assert_eq!(pair[1].offset, pair[0].offset + pair[0].content_length + 4);
    }
    let last = input.index[24];
    assert_eq!(
        fs::metadata(&path).unwrap().len() as i32,
        2 * (last.offset + last.content_length + 4)
    );
}

#[test]
fn null_records_and_empty_files() {
    let dir = tempfile::tempdir().unwrap();

    let nulls = dir.path().join("nulls.shp");
    let mut sf = Shapefile::new(ShapeType::Polygon);
    for _ in 0..3 {
        sf.add_shape(Shape::null()).unwrap();
    }
    sf.save_as(&nulls, false).unwrap();
    let input = Shapefile::open(&nulls).unwrap();
    assert_eq!(input.num_shapes(), 3);
    assert_eq!(input.get_total_num_points(), 0);
    assert!(input.header.extent.is_empty());
    for i in 0..3 {
        assert!(input.get_shape(i).unwrap().is_null());
        assert_eq!(input.get_feature(i).unwrap().geometry, None);
    }
    assert_eq!(fs::metadata(nulls.with_extension("shx")).unwrap().len(), 124);

    let empty = dir.path().join("empty.shp");
    Shapefile::new(ShapeType::Point).save_as(&empty, false).unwrap();
    assert_eq!(fs::metadata(&empty).unwrap().len(), 100);
    let mut input = Shapefile::open(&empty).unwrap();
    assert!(input.is_empty());
    assert_eq!(input.shape_type(), ShapeType::Point);
    assert!(input.header.extent.is_empty());

    // the reopened extent grows from the first shape, not from the origin
    let mut shape = Shape::new(ShapeType::Point);
    shape.add_point(Point2D::new(5.0, 5.0)).unwrap();
    input.add_shape(shape).unwrap();
    assert_eq!(input.header.extent, Extent::new(5.0, 5.0, 5.0, 5.0));
}

#[test]
fn disjoint_shells_become_a_multipolygon() {
    let mut shape = Shape::new(ShapeType::Polygon);
    shape.add_part(&square(0.0, 0.0, 10.0, true)).unwrap();
    shape.add_part(&square(20.0, 0.0, 10.0, true)).unwrap();
    shape.add_part(&square(22.0, 2.0, 2.0, false)).unwrap();
    let mut sf = Shapefile::new(ShapeType::Polygon);
    sf.add_shape(shape).unwrap();

    match sf.get_feature(0).unwrap().geometry {
        Some(Geometry::MultiPolygon(polygons)) => {
            assert_eq!(polygons.len(), 2);
            assert!(polygons[0].interiors.is_empty());
            assert_eq!(polygons[1].interiors.len(), 1);
            assert_eq!(polygons[1].interiors[0][0].x, 22.0);
        }
        other => panic!("unexpected {:?}", other),
    }
}

struct CancelAfter {
    limit: usize,
    seen: Cell<usize>,
}

impl ProgressHandler for CancelAfter {
    fn report(&self, current: usize, _end: usize) {
        self.seen.set(current);
    }

    fn is_cancelled(&self) -> bool {
        self.seen.get() >= self.limit
    }
}

fn points(n: usize) -> Shapefile {
    let mut sf = Shapefile::new(ShapeType::Point);
    for i in 0..n {
        let mut shape = Shape::new(ShapeType::Point);
        shape.add_point(Point2D::new(i as f64, i as f64)).unwrap();
        sf.add_shape(shape).unwrap();
    }
    sf
}

#[test]
fn cancelled_save_leaves_a_consistent_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.shp");
    let mut sf = points(10);
    let progress = CancelAfter {
        limit: 4,
        seen: Cell::new(0),
    };
    match sf.save_as_with(&path, false, &progress) {
        Err(ShapefileError::Cancelled) => {}
        other => panic!("unexpected {:?}", other),
    }

    let input = Shapefile::open(&path).unwrap();
    assert_eq!(input.num_shapes(), 4);
    assert_eq!(
        fs::metadata(&path).unwrap().len() as i32,
        2 * input.header.file_length
    );
    assert_eq!(input.header.extent.max_x, 3.0);

    let flag = CancelFlag::new();
    flag.cancel();
    let path = dir.path().join("nothing.shp");
    assert!(matches!(
        sf.save_as_with(&path, false, &flag),
        Err(ShapefileError::Cancelled)
    ));
    assert!(Shapefile::open(&path).unwrap().is_empty());
    // the in-memory file is untouched
    assert_eq!(sf.num_shapes(), 10);
}

#[test]
fn existing_files_need_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.shp");
    let mut sf = points(2);
    sf.projection = Some("GEOGCS[\"WGS 84\"]".to_string());
    sf.save_as(&path, false).unwrap();
    match sf.save_as(&path, false) {
        Err(ShapefileError::Io(e)) => assert_eq!(e.kind(), ErrorKind::AlreadyExists),
        other => panic!("unexpected {:?}", other),
    }
    sf.add_shape(points(1).get_shape_copy(0).unwrap()).unwrap();
    sf.save_as(&path, true).unwrap();

    let input = Shapefile::open(&path).unwrap();
    assert_eq!(input.num_shapes(), 3);
    assert_eq!(input.projection.as_deref(), Some("GEOGCS[\"WGS 84\"]"));
    assert_eq!(input.get_short_filename(), "points");
}

#[test]
fn select_uses_record_order() {
    let sf = points(20);
    let hits = sf.select(&Extent::new(4.5, 4.5, 12.0, 12.0), 3).unwrap();
    let numbers: Vec<i32> = hits.iter().map(|f| f.record_number).collect();
    assert_eq!(numbers, vec![6, 7, 8]);
    assert!(sf
        .select(&Extent::new(100.0, 100.0, 200.0, 200.0), 10)
        .unwrap()
        .is_empty());
}

fn corrupt_shape_type(path: &Path, byte_offset: usize) {
    let mut bytes = fs::read(path).unwrap();
    bytes[byte_offset..byte_offset + 4].copy_from_slice(&2i32.to_le_bytes());
    fs::write(path, bytes).unwrap();
}

#[test]
fn streaming_reader_resumes_after_a_bad_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lines.shp");
    let mut sf = Shapefile::new(ShapeType::PolyLine);
    for i in 0..3 {
        sf.add_shape(sample_shape(ShapeType::PolyLine, CoordinateType::Regular, i as f64))
            .unwrap();
    }
    sf.save_as(&path, false).unwrap();
    corrupt_shape_type(&path, sf.index[1].offset as usize * 2 + 8);

    let err = Shapefile::open(&path).unwrap_err();
    assert_eq!(err.record_number(), Some(2));

    let results: Vec<_> = ShapeReader::open(&path, &Configs::default())
        .unwrap()
        .collect();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    match &results[1] {
        Err(e) => assert_eq!(e.record_number(), Some(2)),
        Ok(_) => panic!("record 2 should fail"),
    }
    let third = results[2].as_ref().unwrap();
    assert_eq!(third.range.record_number, 3);
    assert_eq!(third.view().xy, sf.shape_view(2).unwrap().xy);
}

#[test]
fn truncated_data_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.shp");
    points(3).save_as(&path, false).unwrap();
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 10]).unwrap();

    let err = Shapefile::open(&path).unwrap_err();
    assert_eq!(err.record_number(), Some(3));
}

#[test]
fn file_code_is_checked_unless_relaxed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.shp");
    points(2).save_as(&path, false).unwrap();
    let mut bytes = fs::read(&path).unwrap();
    bytes[3] = 0;
    fs::write(&path, bytes).unwrap();

    assert!(matches!(
        Shapefile::open(&path),
        Err(ShapefileError::Format(_))
    ));
    let mut configs = Configs::default();
    configs.strict_file_code = false;
    let input = Shapefile::open_with(&path, &configs, &geocodec::NoProgress).unwrap();
    assert_eq!(input.num_shapes(), 2);
}

#[test]
fn companion_extensions() {
    let dir = tempfile::tempdir().unwrap();
    points(1).save_as(dir.path().join("base"), false).unwrap();
    assert!(dir.path().join("base.shp").exists());
    assert!(dir.path().join("base.shx").exists());
    assert_eq!(Shapefile::open(dir.path().join("base.shx")).unwrap().num_shapes(), 1);
    assert!(matches!(
        Shapefile::open(dir.path().join("base.dbf")),
        Err(ShapefileError::NotSupported(_))
    ));
}

#[test]
fn wkb_geometry_can_be_stored() {
    // little-endian polygon, one ring
    let mut wkb = vec![1u8];
    wkb.extend_from_slice(&3u32.to_le_bytes());
    wkb.extend_from_slice(&1u32.to_le_bytes());
    wkb.extend_from_slice(&5u32.to_le_bytes());
    for (x, y) in &[(0.0f64, 0.0f64), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)] {
        wkb.extend_from_slice(&x.to_le_bytes());
        wkb.extend_from_slice(&y.to_le_bytes());
    }
    let shape = WkbDecoder::decode(&wkb[..]).unwrap();
    assert_eq!(shape.shape_type(), ShapeType::Polygon);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wkb.shp");
    let mut sf = Shapefile::new(ShapeType::Polygon);
    sf.add_shape(shape).unwrap();
    sf.save_as(&path, false).unwrap();
    let input = Shapefile::open(&path).unwrap();
    match input.get_feature(0).unwrap().geometry {
        Some(Geometry::Polygon(p)) => {
            assert_eq!(p.exterior.len(), 5);
            assert!(p.interiors.is_empty());
        }
        other => panic!("unexpected {:?}", other),
    }
}
