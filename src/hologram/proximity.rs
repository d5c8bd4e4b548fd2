use crate::core::position::Position;

/// Distance between the chunks containing `a` and `b`, in chunks.
pub fn chunk_distance(a: &Position, b: &Position) -> f64 {
    a.chunk().distance(&b.chunk())
}

/// Whether `target` is close enough to `anchor` to see a hologram with this view distance.
/// The boundary is inclusive; positions in another world are never in range.
pub fn is_in_range(anchor: &Position, target: &Position, view_distance: u32) -> bool {
    anchor.world == target.world && chunk_distance(anchor, target) <= f64::from(view_distance)
}
