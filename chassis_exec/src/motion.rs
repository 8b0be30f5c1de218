//! # Motion primitives
//!
//! The interface chassis control drives the chassis through. Every primitive is called once per
//! chassis cycle and reports whether its target has been reached, the implementation keeps any
//! progress (such as the current point of a path) between calls.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use comms_if::eqpt::chassis::Point;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

pub trait MotionPrimitives {
    /// Drive towards a single point. Returns `true` once the point is reached.
    fn go_to_point(&mut self, point: &Point) -> bool;

    /// Drive along the points in order. Returns `true` once the last point is reached.
    fn go_path(&mut self, points: &[Point]) -> bool;

    /// Drive to the storage slot with the given index. Returns `true` once the slot is reached.
    fn go_to_storage(&mut self, slot: u8) -> bool;

    /// Centre on the given point and clear the area. Returns `true` once complete, callers retry
    /// until it does.
    fn center_and_clear(&mut self, point: &Point) -> bool;

    /// Reset the position estimate to the reference.
    fn reset_position(&mut self);

    /// Command a body velocity directly.
    fn set_velocity(&mut self, vx: f32, vy: f32, vrot: f32);
}
