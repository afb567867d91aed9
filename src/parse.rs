//! X geometry strings such as `640x480+10-20`.

use bitflags::bitflags;

bitflags! {
    /// The parts present in a geometry string.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GeometryMask: u8 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const WIDTH = 1 << 2;
        const HEIGHT = 1 << 3;
        /// The x offset is measured from the right screen edge.
        const X_NEGATIVE = 1 << 4;
        /// The y offset is measured from the bottom screen edge.
        const Y_NEGATIVE = 1 << 5;
    }
}

/// A parsed geometry string. Fields not named in `mask` are zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParsedGeometry {
    pub mask: GeometryMask,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Reads an optionally signed decimal number. Returns `None` if no digit follows the sign.
fn read_int(input: &str) -> Option<(i64, &str)> {
    let (sign, rest) = match input.as_bytes().first() {
        Some(b'+') => (1, &input[1..]),
        Some(b'-') => (-1, &input[1..]),
        _ => (1, input),
    };

    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if end == 0 {
        return None;
    }

    let value = rest[..end]
        .bytes()
        .fold(0i64, |acc, digit| acc.saturating_mul(10).saturating_add(i64::from(digit - b'0')));
    Some((sign * value, &rest[end..]))
}

/// Reads `{+-}<offset>`. The outer `Option` is `None` on a malformed offset, the inner one
/// when there is no offset at all.
fn read_offset(input: &str) -> Option<Option<(i32, bool, &str)>> {
    let (negative, rest) = if let Some(rest) = input.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = input.strip_prefix('+') {
        (false, rest)
    } else {
        return Some(None);
    };

    let (value, next) = read_int(rest)?;
    let value = if negative { -value } else { value };
    Some(Some((to_i32(value), negative, next)))
}

fn to_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn to_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

/// Parse `[=][<width>][{xX}<height>][{+-}<xoffset>[{+-}<yoffset>]]`.
///
/// Returns `None` for an invalid string. An empty string parses to an empty mask.
pub fn parse_geometry(input: &str) -> Option<ParsedGeometry> {
    let mut parsed = ParsedGeometry::default();
    let mut rest = input.strip_prefix('=').unwrap_or(input);

    if !rest.is_empty() && !rest.starts_with(['+', '-', 'x']) {
        let (width, next) = read_int(rest)?;
        parsed.width = to_u32(width);
        parsed.mask |= GeometryMask::WIDTH;
        rest = next;
    }

    if let Some(next) = rest.strip_prefix(['x', 'X']) {
        let (height, next) = read_int(next)?;
        parsed.height = to_u32(height);
        parsed.mask |= GeometryMask::HEIGHT;
        rest = next;
    }

    if let Some((x, negative, next)) = read_offset(rest)? {
        parsed.x = x;
        parsed.mask |= GeometryMask::X;
        parsed.mask.set(GeometryMask::X_NEGATIVE, negative);
        rest = next;

        if let Some((y, negative, next)) = read_offset(rest)? {
            parsed.y = y;
            parsed.mask |= GeometryMask::Y;
            parsed.mask.set(GeometryMask::Y_NEGATIVE, negative);
            rest = next;
        }
    }

    rest.is_empty().then_some(parsed)
}
