//! D8 flow-direction encoding.
//!
//! Power-of-two neighbor encoding following Greenlee (1987) and
//! Jenson & Domingue (1988):
//!
//! ```text
//! +------------+
//! | 64  128  1 |
//! | 32   C   2 |
//! | 16   8   4 |
//! +------------+
//! ```
//!
//! `0` marks a sink/flat. Negative sentinels mark boundary outlets:
//! −1 east, −2 south, −3 west, −4 north. The numeric values are part of
//! the save-file format and must not change.

/// Outlet sentinel for the east edge.
pub const OUTLET_EAST: i32 = -1;
/// Outlet sentinel for the south edge.
pub const OUTLET_SOUTH: i32 = -2;
/// Outlet sentinel for the west edge.
pub const OUTLET_WEST: i32 = -3;
/// Outlet sentinel for the north edge.
pub const OUTLET_NORTH: i32 = -4;
/// A cell with no downhill 8-neighbor.
pub const SINK: i32 = 0;

/// The eight inflow bits in bit order, each with the `(dx, dy)` offset of
/// the neighbor that bit refers to (x = column, y = row, y grows south).
pub const INFLOW_BITS: [(u8, i32, i32); 8] = [
    (1, 1, -1),   // NE
    (2, 1, 0),    // E
    (4, 1, 1),    // SE
    (8, 0, 1),    // S
    (16, -1, 1),  // SW
    (32, -1, 0),  // W
    (64, -1, -1), // NW
    (128, 0, -1), // N
];

/// Encode a unit neighbor offset as its D8 bit. `(0, 0)` and any
/// out-of-range component encode as 0 (sink).
pub fn encode(dx: i32, dy: i32) -> i32 {
    match (dx, dy) {
        (1, -1) => 1,
        (1, 0) => 2,
        (1, 1) => 4,
        (0, 1) => 8,
        (-1, 1) => 16,
        (-1, 0) => 32,
        (-1, -1) => 64,
        (0, -1) => 128,
        _ => 0,
    }
}

/// The `(dx, dy)` a direction code points at. Outlet sentinels point off
/// the raster toward their edge; sinks point nowhere.
pub fn offset(code: i32) -> (i32, i32) {
    match code {
        OUTLET_NORTH => (0, -1),
        OUTLET_WEST => (-1, 0),
        OUTLET_SOUTH => (0, 1),
        OUTLET_EAST => (1, 0),
        1 => (1, -1),
        2 => (1, 0),
        4 => (1, 1),
        8 => (0, 1),
        16 => (-1, 1),
        32 => (-1, 0),
        64 => (-1, -1),
        128 => (0, -1),
        _ => (0, 0),
    }
}

/// Decode a direction to its compass angle in degrees (E = 0°, counter-
/// clockwise). Outlets decode to their cardinal angle. Sinks decode to
/// −1.0, a marker the aspect analysis replaces with a random angle.
pub fn to_degrees(code: i32) -> f32 {
    match code {
        OUTLET_NORTH => 90.0,
        OUTLET_WEST => 180.0,
        OUTLET_SOUTH => 270.0,
        OUTLET_EAST => 0.0,
        1 => 45.0,
        2 => 0.0,
        4 => 315.0,
        8 => 270.0,
        16 => 225.0,
        32 => 180.0,
        64 => 135.0,
        128 => 90.0,
        _ => -1.0,
    }
}

/// Decode a direction to radians. Sinks decode to −1.0 (marker, see
/// [`to_degrees`]).
pub fn to_radians(code: i32) -> f32 {
    let deg = to_degrees(code);
    if deg < 0.0 {
        -1.0
    } else {
        deg.to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_matches_greenlee_table() {
        assert_eq!(encode(1, -1), 1);
        assert_eq!(encode(1, 0), 2);
        assert_eq!(encode(1, 1), 4);
        assert_eq!(encode(0, 1), 8);
        assert_eq!(encode(-1, 1), 16);
        assert_eq!(encode(-1, 0), 32);
        assert_eq!(encode(-1, -1), 64);
        assert_eq!(encode(0, -1), 128);
        assert_eq!(encode(0, 0), 0);
    }

    #[test]
    fn encode_offset_round_trip() {
        for &(bit, dx, dy) in &INFLOW_BITS {
            assert_eq!(encode(dx, dy), bit as i32);
            assert_eq!(offset(bit as i32), (dx, dy));
        }
    }

    #[test]
    fn outlets_point_off_the_raster() {
        assert_eq!(offset(OUTLET_NORTH), (0, -1));
        assert_eq!(offset(OUTLET_SOUTH), (0, 1));
        assert_eq!(offset(OUTLET_WEST), (-1, 0));
        assert_eq!(offset(OUTLET_EAST), (1, 0));
    }

    #[test]
    fn angles_run_counter_clockwise_from_east() {
        assert_eq!(to_degrees(2), 0.0);
        assert_eq!(to_degrees(1), 45.0);
        assert_eq!(to_degrees(128), 90.0);
        assert_eq!(to_degrees(64), 135.0);
        assert_eq!(to_degrees(32), 180.0);
        assert_eq!(to_degrees(16), 225.0);
        assert_eq!(to_degrees(8), 270.0);
        assert_eq!(to_degrees(4), 315.0);
    }

    #[test]
    fn outlet_angles_match_their_edge() {
        assert_eq!(to_degrees(OUTLET_EAST), 0.0);
        assert_eq!(to_degrees(OUTLET_NORTH), 90.0);
        assert_eq!(to_degrees(OUTLET_WEST), 180.0);
        assert_eq!(to_degrees(OUTLET_SOUTH), 270.0);
    }

    #[test]
    fn sink_decodes_to_marker() {
        assert_eq!(to_degrees(SINK), -1.0);
        assert_eq!(to_radians(SINK), -1.0);
    }
}
