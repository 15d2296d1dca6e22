//! Tests for line framing
//!
//! These tests verify:
//! - Messages spanning several reads
//! - Several messages in one read
//! - Preservation of trailing partial messages
//! - The pending-buffer limit

use linelog::protocol::{LineFramer, DELIMITER};
use linelog::ServerError;

const LIMIT: usize = 1024;

#[test]
fn test_no_delimiter_yields_nothing() {
    let mut framer = LineFramer::new(LIMIT);

    framer.push(b"partial").unwrap();

    assert!(framer.next_message().is_none());
    assert_eq!(framer.pending(), b"partial");
}

#[test]
fn test_message_split_across_reads() {
    let mut framer = LineFramer::new(LIMIT);

    framer.push(b"ab").unwrap();
    assert!(framer.next_message().is_none());

    framer.push(b"cd\n").unwrap();
    assert_eq!(framer.next_message().unwrap().as_ref(), b"abcd\n");
    assert!(framer.next_message().is_none());
    assert!(framer.is_empty());
}

#[test]
fn test_two_messages_in_one_read() {
    let mut framer = LineFramer::new(LIMIT);

    framer.push(b"aa\nbb\n").unwrap();

    assert_eq!(framer.next_message().unwrap().as_ref(), b"aa\n");
    assert_eq!(framer.next_message().unwrap().as_ref(), b"bb\n");
    assert!(framer.next_message().is_none());
}

#[test]
fn test_trailing_partial_is_kept() {
    let mut framer = LineFramer::new(LIMIT);

    framer.push(b"first\nsec").unwrap();
    assert_eq!(framer.next_message().unwrap().as_ref(), b"first\n");
    assert!(framer.next_message().is_none());
    assert_eq!(framer.pending(), b"sec");

    framer.push(b"ond\n").unwrap();
    assert_eq!(framer.next_message().unwrap().as_ref(), b"second\n");
}

#[test]
fn test_empty_message() {
    let mut framer = LineFramer::new(LIMIT);

    framer.push(&[DELIMITER]).unwrap();

    assert_eq!(framer.next_message().unwrap().as_ref(), b"\n");
}

#[test]
fn test_byte_at_a_time() {
    let mut framer = LineFramer::new(LIMIT);
    let mut messages = Vec::new();

    for byte in b"x\nyz\n" {
        framer.push(&[*byte]).unwrap();
        while let Some(message) = framer.next_message() {
            messages.push(message);
        }
    }

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].as_ref(), b"x\n");
    assert_eq!(messages[1].as_ref(), b"yz\n");
}

#[test]
fn test_binary_bytes_pass_through() {
    let mut framer = LineFramer::new(LIMIT);

    framer.push(&[0x00, 0xff, 0x7f, b'\n']).unwrap();

    assert_eq!(framer.next_message().unwrap().as_ref(), &[0x00, 0xff, 0x7f, b'\n']);
}

#[test]
fn test_clear_discards_partial() {
    let mut framer = LineFramer::new(LIMIT);
    framer.push(b"abandoned").unwrap();

    framer.clear();

    assert!(framer.is_empty());
    framer.push(b"fresh\n").unwrap();
    assert_eq!(framer.next_message().unwrap().as_ref(), b"fresh\n");
}

// =============================================================================
// Limit Tests
// =============================================================================

#[test]
fn test_oversized_partial_is_rejected() {
    let mut framer = LineFramer::new(8);

    framer.push(b"12345678").unwrap();
    let err = framer.push(b"9").unwrap_err();

    match err {
        ServerError::FrameTooLarge { pending, limit } => {
            assert_eq!(pending, 9);
            assert_eq!(limit, 8);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_large_read_with_delimiter_is_accepted() {
    let mut framer = LineFramer::new(8);

    framer.push(b"0123456789\nab").unwrap();

    assert_eq!(framer.next_message().unwrap().as_ref(), b"0123456789\n");
    assert_eq!(framer.pending(), b"ab");
}
