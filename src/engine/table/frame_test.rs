use crate::engine::errors::TableError;
use crate::engine::table::frame::{FRAME_PREFIX_LEN, Frame, read_frame, write_frame};
use crate::engine::table::value::Value;
use std::io::Cursor;
use std::path::Path;

fn basket() -> Frame {
    Frame::Basket {
        table: "physics".into(),
        column: 2,
        first_entry: 10,
        values: vec![Value::Int(1), Value::Int(2)],
    }
}

#[test]
fn frames_read_back_in_order_then_eof() {
    let footer = Frame::Footer {
        table: "physics".into(),
        entries: 12,
        column_bytes: vec![1, 2, 3],
    };
    let mut buf = Vec::new();
    let written = write_frame(&mut buf, &basket()).unwrap();
    write_frame(&mut buf, &footer).unwrap();
    assert!(written > FRAME_PREFIX_LEN);

    let mut cur = Cursor::new(buf);
    let path = Path::new("mem");
    assert_eq!(read_frame(&mut cur, path).unwrap(), Some(basket()));
    assert_eq!(read_frame(&mut cur, path).unwrap(), Some(footer));
    assert_eq!(read_frame(&mut cur, path).unwrap(), None);
}

#[test]
fn payload_corruption_is_detected() {
    let mut buf = Vec::new();
    write_frame(&mut buf, &basket()).unwrap();
    let last = buf.len() - 1;
    buf[last] ^= 0x55;

    let mut cur = Cursor::new(buf);
    let err = read_frame(&mut cur, Path::new("mem")).unwrap_err();
    assert!(matches!(err, TableError::Corrupted { .. }));
}

#[test]
fn truncated_frame_is_detected() {
    let mut buf = Vec::new();
    write_frame(&mut buf, &basket()).unwrap();
    buf.truncate(buf.len() - 3);

    let mut cur = Cursor::new(buf);
    let err = read_frame(&mut cur, Path::new("mem")).unwrap_err();
    assert!(err.to_string().contains("truncated frame payload"));
}
