/*
This code is part of the geocodec library.
License: MIT
*/
use crate::algorithms::{is_clockwise_order, point_in_or_on_ring, signed_area};
use crate::configs::UnmatchedHolePolicy;
use crate::structures::{Coordinate, Extent, Point2D};

/// A shell ring and the hole rings nested in it, as part indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolygonRings {
    pub shell: usize,
    pub holes: Vec<usize>,
}

/// Groups the rings of a polygon record into shells and holes.
///
/// Clockwise rings are shells and counter-clockwise rings are holes, unless no
/// ring runs clockwise, in which case every ring is a shell. A hole belongs to
/// the smallest shell whose box contains the hole's box and whose ring
/// contains the hole's first vertex (boundary included).
pub fn classify_rings(rings: &[&[f64]], policy: UnmatchedHolePolicy) -> Vec<PolygonRings> {
    let clockwise: Vec<bool> = rings.iter().map(|r| is_clockwise_order(r)).collect();
    if !clockwise.iter().any(|cw| *cw) {
        return (0..rings.len())
            .map(|shell| PolygonRings {
                shell,
                holes: vec![],
            })
            .collect();
    }

    let extents: Vec<Extent> = rings.iter().map(|r| Extent::of_xy(r)).collect();
    let mut polygons: Vec<PolygonRings> = vec![];
    let mut shell_slot = vec![usize::MAX; rings.len()];
    for (i, cw) in clockwise.iter().enumerate() {
        if *cw {
            shell_slot[i] = polygons.len();
            polygons.push(PolygonRings {
                shell: i,
                holes: vec![],
            });
        }
    }

    let mut promoted = vec![];
    for (hole, _) in clockwise.iter().enumerate().filter(|(_, cw)| !**cw) {
        if rings[hole].len() < 2 {
            tracing::warn!("dropping hole ring {} with no vertices", hole);
            continue;
        }
        let first = Point2D::from_xy(rings[hole], 0);
        let mut best: Option<(usize, f64)> = None;
        for (shell, _) in clockwise.iter().enumerate().filter(|(_, cw)| **cw) {
            if !extents[shell].contains(&extents[hole]) || !point_in_or_on_ring(&first, rings[shell]) {
                continue;
            }
            let area = extents[shell].area();
            if best.map_or(true, |(_, a)| area < a) {
                best = Some((shell, area));
            }
        }
        match (best, policy) {
            (Some((shell, _)), _) => polygons[shell_slot[shell]].holes.push(hole),
            (None, UnmatchedHolePolicy::Drop) => {
                tracing::warn!("dropping hole ring {} with no enclosing shell", hole);
            }
            (None, UnmatchedHolePolicy::PromoteToShell) => promoted.push(PolygonRings {
                shell: hole,
                holes: vec![],
            }),
        }
    }
    polygons.extend(promoted);
    polygons
}

/// Reverses a ring in place when it does not already run in the requested
/// direction. Returns true if the ring was reversed.
pub fn orient_ring(ring: &mut [Coordinate], clockwise: bool) -> bool {
    let xy: Vec<f64> = ring.iter().flat_map(|c| [c.x, c.y]).collect();
    let area = signed_area(&xy);
    if area == 0f64 || (area < 0f64) == clockwise {
        return false;
    }
    ring.reverse();
    true
}
