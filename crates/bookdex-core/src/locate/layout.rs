use crate::source::BBox;

/// Two-column page test: exactly two text blocks whose horizontal extents
/// are disjoint, in either order. Any other block count fails.
///
/// Pages with zero or one detected column are rejected; the false-negative
/// risk on unusual index layouts is accepted.
pub fn is_two_column(boxes: &[BBox]) -> bool {
    match boxes {
        [a, b] => !a.overlaps_horizontally(b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x_min: f32, x_max: f32) -> BBox {
        BBox {
            x_min,
            y_min: 0.0,
            x_max,
            y_max: 700.0,
        }
    }

    #[test]
    fn test_two_disjoint_boxes() {
        assert!(is_two_column(&[bbox(50.0, 280.0), bbox(320.0, 550.0)]));
    }

    #[test]
    fn test_two_disjoint_boxes_reversed() {
        assert!(is_two_column(&[bbox(320.0, 550.0), bbox(50.0, 280.0)]));
    }

    #[test]
    fn test_two_overlapping_boxes() {
        assert!(!is_two_column(&[bbox(50.0, 330.0), bbox(320.0, 550.0)]));
    }

    #[test]
    fn test_one_box() {
        assert!(!is_two_column(&[bbox(50.0, 550.0)]));
    }

    #[test]
    fn test_zero_boxes() {
        assert!(!is_two_column(&[]));
    }

    #[test]
    fn test_three_boxes() {
        assert!(!is_two_column(&[
            bbox(50.0, 180.0),
            bbox(220.0, 350.0),
            bbox(390.0, 550.0),
        ]));
    }
}
