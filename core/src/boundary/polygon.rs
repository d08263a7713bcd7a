//! Ray-casting containment and edge-distance math for GPS boundary
//! polygons, grounded in `safety/boundary_monitor.py`'s
//! `_is_point_inside_polygon` / `_point_to_line_distance`. All math runs
//! in local tangent-plane meters via [`geo_to_local`] rather than mixing
//! degrees into the distance calculation the way the original does.

use sensor_types::{geo_to_local, GeoPoint};

pub struct LocalPolygon {
    /// Local-frame (x, y) meters, anchored at the polygon's own first point.
    vertices: Vec<(f64, f64)>,
}

impl LocalPolygon {
    pub fn from_geo(points: &[GeoPoint]) -> Self {
        let origin = points[0];
        let vertices = points.iter().map(|p| geo_to_local(origin, *p)).collect();
        Self { vertices }
    }

    fn project(&self, origin: GeoPoint, point: GeoPoint) -> (f64, f64) {
        geo_to_local(origin, point)
    }

    pub fn contains(&self, origin: GeoPoint, point: GeoPoint) -> bool {
        let (px, py) = self.project(origin, point);
        let n = self.vertices.len();
        let mut inside = false;
        let (mut p1x, mut p1y) = self.vertices[0];
        for i in 1..=n {
            let (p2x, p2y) = self.vertices[i % n];
            if py > p1y.min(p2y) && py <= p1y.max(p2y) && px <= p1x.max(p2x) && p1y != p2y {
                let xinters = (py - p1y) * (p2x - p1x) / (p2y - p1y) + p1x;
                if p1x == p2x || px <= xinters {
                    inside = !inside;
                }
            }
            p1x = p2x;
            p1y = p2y;
        }
        inside
    }

    /// Minimum distance from `point` to any polygon edge, meters.
    pub fn distance_to_edge(&self, origin: GeoPoint, point: GeoPoint) -> f64 {
        let (px, py) = self.project(origin, point);
        let n = self.vertices.len();
        let mut min_distance = f64::INFINITY;
        for i in 0..n {
            let (ax, ay) = self.vertices[i];
            let (bx, by) = self.vertices[(i + 1) % n];
            min_distance = min_distance.min(point_to_segment_distance((px, py), (ax, ay), (bx, by)));
        }
        min_distance
    }

    /// Positive if `point` is inside the polygon, negative if outside.
    pub fn signed_distance(&self, origin: GeoPoint, point: GeoPoint) -> f64 {
        let distance = self.distance_to_edge(origin, point);
        if self.contains(origin, point) {
            distance
        } else {
            -distance
        }
    }
}

fn point_to_segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (px, py) = p;
    let (ax, ay) = a;
    let (bx, by) = b;
    let ab_len_sq = (bx - ax).powi(2) + (by - ay).powi(2);
    if ab_len_sq == 0.0 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    let t = (((px - ax) * (bx - ax) + (py - ay) * (by - ay)) / ab_len_sq).clamp(0.0, 1.0);
    let closest_x = ax + t * (bx - ax);
    let closest_y = ay + t * (by - ay);
    ((px - closest_x).powi(2) + (py - closest_y).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<GeoPoint> {
        vec![
            GeoPoint { lat: 0.0, lon: 0.0 },
            GeoPoint { lat: 0.0, lon: 0.001 },
            GeoPoint { lat: 0.001, lon: 0.001 },
            GeoPoint { lat: 0.001, lon: 0.0 },
        ]
    }

    #[test]
    fn point_inside_square_is_contained() {
        let polygon = LocalPolygon::from_geo(&square());
        let origin = square()[0];
        let center = GeoPoint { lat: 0.0005, lon: 0.0005 };
        assert!(polygon.contains(origin, center));
    }

    #[test]
    fn point_outside_square_is_not_contained() {
        let polygon = LocalPolygon::from_geo(&square());
        let origin = square()[0];
        let outside = GeoPoint { lat: 0.01, lon: 0.01 };
        assert!(!polygon.contains(origin, outside));
    }

    #[test]
    fn signed_distance_is_negative_outside() {
        let polygon = LocalPolygon::from_geo(&square());
        let origin = square()[0];
        let outside = GeoPoint { lat: -0.0005, lon: 0.0005 };
        assert!(polygon.signed_distance(origin, outside) < 0.0);
    }
}
