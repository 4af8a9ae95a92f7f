//! Pointer geometry for drag recognition and drop-target selection.

use serde::{Deserialize, Serialize};

use crate::core::drag_ref::DragRef;

/// Pointer position in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned bounding box of a rendered droppable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Edges are inclusive.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.left + self.width
            && point.y >= self.top
            && point.y <= self.top + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// A registered drop target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Droppable {
    pub id: DragRef,
    pub rect: Rect,
}

/// Pointer-within collision detection.
///
/// Only droppables containing the literal pointer position are candidates.
/// Cards sit inside their column, so the smallest containing rect wins; ties
/// keep registration order.
pub fn pointer_within(point: Point, droppables: &[Droppable]) -> Option<&Droppable> {
    droppables
        .iter()
        .filter(|droppable| droppable.rect.contains(point))
        .fold(None, |best: Option<&Droppable>, candidate| match best {
            Some(current) if current.rect.area() <= candidate.rect.area() => Some(current),
            _ => Some(candidate),
        })
}

/// Minimum pointer travel before a press becomes a drag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivationConstraint {
    pub distance: f64,
}

impl ActivationConstraint {
    pub fn distance(distance: f64) -> Self {
        Self { distance }
    }

    pub fn is_met(&self, origin: Point, current: Point) -> bool {
        origin.distance_to(current) >= self.distance
    }
}

impl Default for ActivationConstraint {
    fn default() -> Self {
        Self { distance: 8.0 }
    }
}
