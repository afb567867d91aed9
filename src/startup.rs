//! Startup notification ids.
//!
//! A launcher hands an application an opaque id, possibly ending in `_TIME<timestamp>`, and
//! waits for it to report that startup completed.

const TIME_MARKER: &str = "_TIME";

/// The user interaction time encoded in a startup id, if any.
///
/// The timestamp is the run of digits following the last `_TIME` in the id.
pub fn startup_id_timestamp(id: &str) -> Option<u32> {
    let (_, tail) = id.rsplit_once(TIME_MARKER)?;
    let digits = tail.find(|c: char| !c.is_ascii_digit()).map_or(tail, |end| &tail[..end]);

    if digits.is_empty() {
        return None;
    }

    // Timestamps are 32 bit server times, larger values wrap like they do on the server.
    digits.parse::<u64>().ok().map(|time| time as u32)
}

/// Whether the id only transports a timestamp and is not tracked by a launcher.
pub fn startup_id_is_fake(id: &str) -> bool {
    id.starts_with(TIME_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_found_by_suffix() {
        assert_eq!(startup_id_timestamp("launcher-42_TIME1234"), Some(1234));
        assert_eq!(startup_id_timestamp("a_TIME5_b_TIME77"), Some(77));
        assert_eq!(startup_id_timestamp("_TIME99trailing"), Some(99));
    }

    #[test]
    fn ids_without_timestamp() {
        assert_eq!(startup_id_timestamp("launcher-42"), None);
        assert_eq!(startup_id_timestamp("launcher_TIME"), None);
        assert_eq!(startup_id_timestamp("launcher_TIMEabc"), None);
    }

    #[test]
    fn fake_ids_start_with_the_marker() {
        assert!(startup_id_is_fake("_TIME1234"));
        assert!(!startup_id_is_fake("app_TIME1234"));
    }
}
