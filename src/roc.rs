//! Staircase ROC curve built from ordered up/right judgments.
//!
//! Step lengths are `1 / true_count` upwards and `1 / false_count` to the
//! right. A step that reaches (or passes) its capacity lands exactly on 1.0,
//! which also covers a zero capacity without dividing by it. Consecutive
//! steps in the same direction move the last point instead of appending one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of one step on the curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Right,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// A point in the unit square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub x: f64,
    pub y: f64,
}

impl RocPoint {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };
    pub const TOP_RIGHT: Self = Self { x: 1.0, y: 1.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    true_count: usize,
    false_count: usize,
    points: Vec<RocPoint>,
    up_steps: usize,
    right_steps: usize,
    #[serde(skip)]
    last_direction: Option<Direction>,
}

impl RocCurve {
    /// An empty curve for `true_count` positives and `false_count` negatives.
    pub fn new(true_count: usize, false_count: usize) -> Self {
        Self {
            true_count,
            false_count,
            points: Vec::new(),
            up_steps: 0,
            right_steps: 0,
            last_direction: None,
        }
    }

    /// Replay a step sequence into a curve whose capacities are the number
    /// of up and right steps in it.
    pub fn from_directions(directions: &[Direction]) -> Self {
        let ups = directions.iter().filter(|d| **d == Direction::Up).count();
        let mut curve = Self::new(ups, directions.len() - ups);
        for direction in directions {
            curve.step(*direction);
        }
        curve
    }

    pub fn step(&mut self, direction: Direction) {
        match direction {
            Direction::Up => self.step_up(),
            Direction::Right => self.step_right(),
        }
    }

    pub fn step_up(&mut self) {
        self.up_steps += 1;
        let y = axis_position(self.up_steps, self.true_count);
        let last_x = self.points.last().map_or(0.0, |p| p.x);
        if self.last_direction == Some(Direction::Up) {
            if let Some(last) = self.points.last_mut() {
                last.y = y;
                return;
            }
        }
        self.points.push(RocPoint::new(last_x, y));
        self.last_direction = Some(Direction::Up);
    }

    pub fn step_right(&mut self) {
        self.right_steps += 1;
        let x = axis_position(self.right_steps, self.false_count);
        let last_y = self.points.last().map_or(0.0, |p| p.y);
        if self.last_direction == Some(Direction::Right) {
            if let Some(last) = self.points.last_mut() {
                last.x = x;
                return;
            }
        }
        self.points.push(RocPoint::new(x, last_y));
        self.last_direction = Some(Direction::Right);
    }

    /// Append a raw point. The next step always starts a new point.
    pub fn add_point(&mut self, point: RocPoint) {
        self.points.push(point);
        self.last_direction = None;
    }

    /// Points recorded so far; the origin is implicit.
    pub fn points(&self) -> &[RocPoint] {
        &self.points
    }

    pub fn true_count(&self) -> usize {
        self.true_count
    }

    pub fn false_count(&self) -> usize {
        self.false_count
    }

    /// Close the curve at (1, 1) unless it already ends there.
    pub fn finalize(&mut self) {
        if self.points.last() != Some(&RocPoint::TOP_RIGHT) {
            self.points.push(RocPoint::TOP_RIGHT);
            self.last_direction = None;
        }
    }

    /// Finalize and integrate with the trapezoid rule.
    ///
    /// Segments with equal x (vertical steps) contribute nothing. The
    /// integration starts at the origin, so a curve without any step is the
    /// diagonal with area 0.5.
    pub fn finalize_and_area(&mut self) -> f64 {
        self.finalize();
        let mut area = 0.0;
        let mut a = RocPoint::ORIGIN;
        for &b in &self.points {
            if b.x != a.x {
                let width = b.x - a.x;
                area += a.y * width + 0.5 * (b.y - a.y) * width;
            }
            a = b;
        }
        area
    }
}

fn axis_position(steps: usize, capacity: usize) -> f64 {
    if steps >= capacity {
        1.0
    } else {
        steps as f64 / capacity as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::{Right, Up};

    fn curve(true_count: usize, false_count: usize, steps: &[Direction]) -> RocCurve {
        let mut curve = RocCurve::new(true_count, false_count);
        for step in steps {
            curve.step(*step);
        }
        curve
    }

    fn raw(points: &[(f64, f64)]) -> RocCurve {
        let mut curve = RocCurve::new(0, 0);
        for &(x, y) in points {
            curve.add_point(RocPoint::new(x, y));
        }
        curve
    }

    #[test]
    fn all_ups_then_all_rights_is_perfect() {
        let mut roc = curve(2, 2, &[Up, Up, Right, Right]);
        assert_eq!(roc.points(), &[RocPoint::new(0.0, 1.0), RocPoint::new(1.0, 1.0)]);
        assert_eq!(roc.finalize_and_area(), 1.0);
        // already closed, nothing appended
        assert_eq!(roc.points().len(), 2);
    }

    #[test]
    fn interleaved_steps_give_half() {
        let mut roc = curve(2, 2, &[Up, Right, Right, Up]);
        assert_eq!(
            roc.points(),
            &[
                RocPoint::new(0.0, 0.5),
                RocPoint::new(1.0, 0.5),
                RocPoint::new(1.0, 1.0)
            ]
        );
        assert_eq!(roc.finalize_and_area(), 0.5);
    }

    #[test]
    fn uneven_capacities() {
        let roc = curve(2, 1, &[Up, Right, Up]);
        assert_eq!(roc.points().len(), 3);
        let mut roc = curve(1, 2, &[Up, Right, Right]);
        assert_eq!(roc.points(), &[RocPoint::new(0.0, 1.0), RocPoint::new(1.0, 1.0)]);
        assert_eq!(roc.finalize_and_area(), 1.0);
    }

    #[test]
    fn overshooting_capacity_snaps_to_one() {
        let roc = curve(1, 1, &[Up, Up, Right, Right]);
        assert_eq!(roc.points(), &[RocPoint::new(0.0, 1.0), RocPoint::new(1.0, 1.0)]);
    }

    #[test]
    fn only_ups_with_zero_false_capacity() {
        let mut roc = curve(5, 0, &[Up; 5]);
        assert_eq!(roc.points(), &[RocPoint::new(0.0, 1.0)]);
        assert_eq!(roc.finalize_and_area(), 1.0);
    }

    #[test]
    fn only_rights_with_zero_true_capacity() {
        let mut roc = curve(0, 2, &[Right, Right]);
        assert_eq!(roc.points(), &[RocPoint::new(1.0, 0.0)]);
        assert_eq!(roc.finalize_and_area(), 0.0);
    }

    #[test]
    fn thirds_land_exactly_on_one() {
        let roc = curve(3, 1, &[Up, Up, Up]);
        assert_eq!(roc.points()[0].y, 1.0);
    }

    #[test]
    fn raw_points_integrate_diagonals() {
        assert_eq!(raw(&[(0.0, 1.0), (1.0, 1.0)]).finalize_and_area(), 1.0);
        assert_eq!(raw(&[(0.0, 1.0)]).finalize_and_area(), 1.0);
        assert_eq!(raw(&[(1.0, 0.0), (1.0, 1.0)]).finalize_and_area(), 0.0);
        assert_eq!(
            raw(&[(0.0, 0.5), (1.0, 0.5), (1.0, 1.0)]).finalize_and_area(),
            0.5
        );
        // origin → (0.5, 0.5) → (1, 1) is the diagonal
        assert_eq!(raw(&[(0.5, 0.5)]).finalize_and_area(), 0.5);
    }

    #[test]
    fn empty_curve_is_the_diagonal() {
        assert_eq!(RocCurve::new(0, 0).finalize_and_area(), 0.5);
    }

    #[test]
    fn from_directions_uses_step_counts_as_capacities() {
        let mut roc = RocCurve::from_directions(&[Up, Right, Up, Right]);
        assert_eq!(roc.true_count(), 2);
        assert_eq!(roc.false_count(), 2);
        assert_eq!(roc.finalize_and_area(), 0.75);
    }
}
