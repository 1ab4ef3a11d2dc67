use std::collections::HashMap;

/// Per-person motion state used to label the frame-by-frame detection record.
/// Direction is the dominant axis of the center displacement since the last
/// sighting; speed is the displacement magnitude in pixels per frame, rounded
/// so that downstream modal reductions see discrete values.
#[derive(Debug, Default)]
pub struct MotionEstimator {
    last_centers: HashMap<i64, (f64, f64)>,
}

impl MotionEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&mut self, raw_id: i64, center: (f64, f64)) -> (String, f64) {
        let previous = self.last_centers.insert(raw_id, center);
        let Some((px, py)) = previous else {
            return ("still".to_string(), 0.0);
        };

        let dx = center.0 - px;
        let dy = center.1 - py;
        let speed = (dx * dx + dy * dy).sqrt().round();
        if speed == 0.0 {
            return ("still".to_string(), 0.0);
        }

        let direction = if dx.abs() >= dy.abs() {
            if dx < 0.0 {
                "left"
            } else {
                "right"
            }
        } else if dy < 0.0 {
            "up"
        } else {
            "down"
        };
        (direction.to_string(), speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sighting_is_still() {
        let mut motion = MotionEstimator::new();
        assert_eq!(motion.step(1, (100.0, 100.0)), ("still".to_string(), 0.0));
    }

    #[test]
    fn horizontal_displacement_wins_on_dominant_axis() {
        let mut motion = MotionEstimator::new();
        motion.step(1, (100.0, 100.0));
        let (direction, speed) = motion.step(1, (90.0, 103.0));
        assert_eq!(direction, "left");
        assert_eq!(speed, 10.0);

        let (direction, _) = motion.step(1, (104.0, 101.0));
        assert_eq!(direction, "right");
    }

    #[test]
    fn vertical_displacement_maps_to_up_down() {
        let mut motion = MotionEstimator::new();
        motion.step(7, (50.0, 50.0));
        let (direction, _) = motion.step(7, (51.0, 40.0));
        assert_eq!(direction, "up");
        let (direction, _) = motion.step(7, (51.0, 60.0));
        assert_eq!(direction, "down");
    }

    #[test]
    fn people_are_tracked_independently() {
        let mut motion = MotionEstimator::new();
        motion.step(1, (0.0, 0.0));
        motion.step(2, (100.0, 100.0));
        let (direction, speed) = motion.step(1, (5.0, 0.0));
        assert_eq!((direction.as_str(), speed), ("right", 5.0));
        let (direction, speed) = motion.step(2, (100.0, 100.0));
        assert_eq!((direction.as_str(), speed), ("still", 0.0));
    }
}
