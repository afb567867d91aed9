//! Startup notification over X client messages.
//!
//! Messages are broadcast to the root window in 20 byte chunks, the first with type
//! `_NET_STARTUP_INFO_BEGIN` and the rest with `_NET_STARTUP_INFO`. The final chunk carries
//! the terminating nul.

use x11rb::connection::Connection as _;
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::x11_utils::Serialize;

use crate::error::X11Error;
use crate::xdisplay::XConnection;

/// Payload bytes of a format 8 client message.
const CHUNK_LEN: usize = 20;

/// The `remove` message completing the startup sequence `id`.
pub fn remove_message(id: &str) -> String {
    let mut message = String::from("remove: ID=");
    for c in id.chars() {
        if matches!(c, ' ' | '"' | '\\') {
            message.push('\\');
        }
        message.push(c);
    }
    message
}

/// Split `message` into nul-terminated, zero-padded client message payloads.
pub fn message_chunks(message: &str) -> Vec<[u8; CHUNK_LEN]> {
    let mut bytes = message.as_bytes().to_vec();
    bytes.push(0);

    bytes
        .chunks(CHUNK_LEN)
        .map(|chunk| {
            let mut data = [0; CHUNK_LEN];
            data[..chunk.len()].copy_from_slice(chunk);
            data
        })
        .collect()
}

/// Broadcast `message` from a throwaway window.
pub(crate) fn broadcast(xconn: &XConnection, message: &str) -> Result<(), X11Error> {
    let conn = xconn.xcb_connection();
    let atoms = xconn.atoms();
    let window = xconn.create_input_only(xconn.root(), -100, -100, true)?;

    for (index, data) in message_chunks(message).into_iter().enumerate() {
        let type_ =
            if index == 0 { atoms._NET_STARTUP_INFO_BEGIN } else { atoms._NET_STARTUP_INFO };
        let event = xproto::ClientMessageEvent {
            response_type: xproto::CLIENT_MESSAGE_EVENT,
            format: 8,
            sequence: 0,
            window,
            type_,
            data: data.into(),
        };
        let mask = xproto::EventMask::PROPERTY_CHANGE;
        conn.send_event(false, xconn.root(), mask, event.serialize())?;
    }

    conn.destroy_window(window)?;
    conn.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_escaped() {
        assert_eq!(remove_message("app-1_TIME42"), "remove: ID=app-1_TIME42");
        assert_eq!(remove_message(r#"a b"c\d"#), r#"remove: ID=a\ b\"c\\d"#);
    }

    #[test]
    fn chunks_end_with_a_nul() {
        let chunks = message_chunks("remove: ID=x");
        assert_eq!(chunks.len(), 1);
        assert_eq!(&chunks[0][..13], b"remove: ID=x\0");
        assert!(chunks[0][13..].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn long_messages_span_chunks() {
        // Exactly one chunk of text leaves the nul for a second chunk.
        let message = "remove: ID=123456789";
        assert_eq!(message.len(), CHUNK_LEN);
        let chunks = message_chunks(message);
        assert_eq!(chunks.len(), 2);
        assert_eq!(&chunks[0], message.as_bytes());
        assert_eq!(chunks[1], [0; CHUNK_LEN]);
    }
}
