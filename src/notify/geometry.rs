//! Stacking arithmetic.
//!
//! Offsets are measured from the bottom edge of the work area up to the top
//! edge of each popup. The oldest popup sits nearest the edge.

use super::window::WorkArea;

/// Offsets for popups of the given heights, listed oldest first.
pub fn stack_offsets<I>(heights: I, margin_bottom: u32, gap: u32) -> Vec<u32>
where
    I: IntoIterator<Item = u32>,
{
    let mut below = margin_bottom;
    heights
        .into_iter()
        .enumerate()
        .map(|(index, height)| {
            if index > 0 {
                below = below.saturating_add(gap);
            }
            below = below.saturating_add(height);
            below
        })
        .collect()
}

/// Offset a new popup of `height` would take above `existing` (oldest first).
pub fn next_offset<I>(existing: I, height: u32, margin_bottom: u32, gap: u32) -> u32
where
    I: IntoIterator<Item = u32>,
{
    let used = existing.into_iter().fold(0u32, |total, existing_height| {
        total.saturating_add(existing_height).saturating_add(gap)
    });
    margin_bottom.saturating_add(used).saturating_add(height)
}

/// Top-left corner of a right-aligned popup at `offset`.
pub fn window_origin(area: WorkArea, width: u32, margin_right: u32, offset: u32) -> (i32, i32) {
    let right = i64::from(area.x) + i64::from(area.width);
    let bottom = i64::from(area.y) + i64::from(area.height);
    let x = right - i64::from(width) - i64::from(margin_right);
    let y = bottom - i64::from(offset);
    (clamp_px(x), clamp_px(y))
}

fn clamp_px(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}
