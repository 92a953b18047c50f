use serde::{Deserialize, Serialize};

/// A blocking wall: fixed coordinate on one axis, extent on the other.
///
/// For an x-line `at` is the x coordinate and `start..=end` the y extent;
/// for a y-line it is the other way round. Game data stores these as
/// `[at, start, end]` arrays.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Segment {
    pub at: f64,
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn new(at: f64, start: f64, end: f64) -> Self {
        Self { at, start, end }
    }

    /// Low and high ends of the extent, whichever order the data used.
    pub fn extent(&self) -> (f64, f64) {
        if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        }
    }
}

impl From<[f64; 3]> for Segment {
    fn from([at, start, end]: [f64; 3]) -> Self {
        Self { at, start, end }
    }
}

impl From<Segment> for [f64; 3] {
    fn from(s: Segment) -> Self {
        [s.at, s.start, s.end]
    }
}

/// Sorted wall lists for one map.
///
/// Both lists are sorted ascending by `at` on construction and never mutated
/// afterwards, so range queries are a binary search plus a forward scan.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GeometryIndex {
    pub x_lines: Vec<Segment>,
    pub y_lines: Vec<Segment>,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl GeometryIndex {
    pub fn new(
        mut x_lines: Vec<Segment>,
        mut y_lines: Vec<Segment>,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    ) -> Self {
        x_lines.sort_by(|a, b| a.at.total_cmp(&b.at));
        y_lines.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self { x_lines, y_lines, min_x, min_y, max_x, max_y }
    }

    /// An unbounded-looking open field, handy for tests and empty maps.
    pub fn open(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(Vec::new(), Vec::new(), min_x, min_y, max_x, max_y)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Walls whose fixed coordinate lies within `[lo, hi]`.
    pub fn x_lines_between(&self, lo: f64, hi: f64) -> &[Segment] {
        lines_between(&self.x_lines, lo, hi)
    }

    pub fn y_lines_between(&self, lo: f64, hi: f64) -> &[Segment] {
        lines_between(&self.y_lines, lo, hi)
    }
}

/// Index of the first line whose `at` is >= `value` (`lines.len()` if none).
pub fn first_at_or_after(lines: &[Segment], value: f64) -> usize {
    lines.partition_point(|line| line.at < value)
}

fn lines_between(lines: &[Segment], lo: f64, hi: f64) -> &[Segment] {
    let first = first_at_or_after(lines, lo);
    let len = lines[first..].partition_point(|line| line.at <= hi);
    &lines[first..first + len]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_first(lines: &[Segment], value: f64) -> usize {
        lines.iter().position(|l| l.at >= value).unwrap_or(lines.len())
    }

    #[test]
    fn test_binary_search_matches_linear_scan() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for round in 0..50 {
            let n = rng.usize(0..40);
            let lines: Vec<Segment> = (0..n)
                .map(|_| Segment::new(rng.i32(-200..200) as f64, 0.0, 10.0))
                .collect();
            let index = GeometryIndex::new(lines.clone(), lines, -200.0, -200.0, 200.0, 200.0);

            // Below-min, above-max and every in-between value including exact hits
            for q in -210..=210 {
                let value = q as f64 + if q % 3 == 0 { 0.5 } else { 0.0 };
                assert_eq!(
                    first_at_or_after(&index.x_lines, value),
                    linear_first(&index.x_lines, value),
                    "round {} query {}",
                    round,
                    value
                );
            }
        }
    }

    #[test]
    fn test_lines_between_is_inclusive() {
        let index = GeometryIndex::new(
            vec![
                Segment::new(30.0, 0.0, 1.0),
                Segment::new(10.0, 0.0, 1.0),
                Segment::new(20.0, 0.0, 1.0),
            ],
            vec![],
            0.0,
            0.0,
            100.0,
            100.0,
        );
        let found: Vec<f64> = index.x_lines_between(10.0, 20.0).iter().map(|l| l.at).collect();
        assert_eq!(found, vec![10.0, 20.0]);
        assert!(index.x_lines_between(31.0, 90.0).is_empty());
    }

    #[test]
    fn test_segment_from_array() {
        let seg: Segment = serde_json::from_str("[50, 10, -10]").expect("array");
        assert_eq!(seg.at, 50.0);
        assert_eq!(seg.extent(), (-10.0, 10.0));
    }
}
