use itertools::Itertools;
use std::collections::BTreeMap;

/// Converts a closed polygon in pixel space into per-row scan spans.
///
/// Every edge is traced with Bresenham's line algorithm; each plotted pixel
/// widens its row's `(start, end)` span. Scanning the interior then reduces
/// to walking each span, which is what keeps wide-area maximum queries
/// cheap enough for the control cycle.
///
/// # Arguments
/// * `vertices` - Polygon corners in pixel coordinates; the last vertex
///   closes back to the first.
///
/// # Returns
/// A map from row index to the inclusive `(start, end)` column pair. Empty
/// for degenerate input (fewer than three vertices).
pub(crate) fn polygon_spans(vertices: &[(i64, i64)]) -> BTreeMap<i64, (i64, i64)> {
    let mut spans: BTreeMap<i64, (i64, i64)> = BTreeMap::new();
    if vertices.len() < 3 {
        return spans;
    }
    for (a, b) in vertices.iter().circular_tuple_windows() {
        trace_edge(*a, *b, &mut spans);
    }
    spans
}

/// Plots one polygon edge, widening the span of every row it crosses.
fn trace_edge(from: (i64, i64), to: (i64, i64), spans: &mut BTreeMap<i64, (i64, i64)>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        spans
            .entry(y)
            .and_modify(|(start, end)| {
                *start = (*start).min(x);
                *end = (*end).max(x);
            })
            .or_insert((x, x));
        if (x, y) == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}
