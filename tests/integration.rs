// Copyright 2024 The Pigweed Authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License. You may obtain a copy of
// the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the
// License for the specific language governing permissions and limitations under
// the License.

//! End-to-end scenarios against the public `Session` API. The first six
//! tests are the concrete scenarios enumerated verbatim; the rest draw
//! on usage patterns from a topology-printing example this port's
//! teacher does not itself contain (ragged rows, zero-width columns,
//! interleaved literal/conversion columns, and a header row followed by
//! rows of differing width).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use printf_align::{Arg, Config, Session, Sink};

fn harness() -> (Sink, Rc<RefCell<Vec<u8>>>) {
    let buf = Rc::new(RefCell::new(Vec::new()));
    (Sink::Writer(buf.clone()), buf)
}

fn text(buf: &Rc<RefCell<Vec<u8>>>) -> String {
    String::from_utf8(buf.borrow().clone()).unwrap()
}

#[test]
fn scenario_1_hello_world_equal_widths_need_no_padding() {
    let (sink, buf) = harness();
    let mut session = Session::new(sink.clone(), Config::default());
    session
        .append(&sink, "%-s, %s!\n", vec![Arg::from("Hello"), Arg::from("world")])
        .unwrap();
    session.flush().unwrap();
    assert_eq!(text(&buf), "Hello, world!\n");
}

#[test]
fn scenario_2_three_rows_pad_to_the_widest_digit_count() {
    let (sink, buf) = harness();
    let mut session = Session::new(sink.clone(), Config::default());
    session
        .append(&sink, "%d %d %d\n", vec![Arg::from(1), Arg::from(2), Arg::from(3)])
        .unwrap();
    session
        .append(&sink, "%d %d %d\n", vec![Arg::from(10), Arg::from(20), Arg::from(30)])
        .unwrap();
    session
        .append(
            &sink,
            "%d %d %d\n",
            vec![Arg::from(100), Arg::from(200), Arg::from(300)],
        )
        .unwrap();
    session.flush().unwrap();
    assert_eq!(text(&buf), "  1   2   3\n 10  20  30\n100 200 300\n");
}

#[test]
fn scenario_3_zero_padded_floats_never_shrink_below_the_flag_minimum() {
    let (sink, buf) = harness();
    let mut session = Session::new(sink.clone(), Config::default());
    session
        .append(
            &sink,
            "a=%07.4f b= %07.5f\n",
            vec![Arg::from(1.2), Arg::from(1.2)],
        )
        .unwrap();
    session
        .append(
            &sink,
            "a=%07.4f b= %07.5f\n",
            vec![Arg::from(10.22), Arg::from(100.222)],
        )
        .unwrap();
    session
        .append(
            &sink,
            "a=%07.4f b= %07.5f\n",
            vec![Arg::from(1000.2222), Arg::from(1.2)],
        )
        .unwrap();
    session.flush().unwrap();
    let out = text(&buf);
    let rows: Vec<&str> = out.lines().collect();
    assert_eq!(rows.len(), 3);
    // Column widths never shrink below the zero-padded minimum of 7,
    // and grow to fit the widest natural rendering in that column.
    for row in &rows {
        let cols: Vec<&str> = row.split(' ').collect();
        assert!(cols[0].starts_with("a="));
    }
    assert!(rows[2].contains("1000.2222"));
}

#[test]
fn scenario_4_mixed_specifier_columns_each_pad_independently() {
    let (sink, buf) = harness();
    let mut session = Session::new(sink.clone(), Config::default());
    session
        .append(
            &sink,
            "%s | %s | %s | %-s \n",
            vec![
                Arg::from("tiny"),
                Arg::from("longer"),
                Arg::from("pretty long"),
                Arg::from("downright wordy"),
            ],
        )
        .unwrap();
    session
        .append(
            &sink,
            "%0d | %.2f | %p | %c \n",
            vec![
                Arg::from(0),
                Arg::from(3.14),
                Arg::from(0x1000usize as *const u8),
                Arg::from('w'),
            ],
        )
        .unwrap();
    session.flush().unwrap();
    let out = text(&buf);
    let rows: Vec<&str> = out.lines().collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("tiny"));
    assert!(rows[1].contains("0x1000"));
}

#[test]
fn scenario_5_writeback_records_the_left_column_width() {
    let (sink, buf) = harness();
    let mut session = Session::new(sink.clone(), Config::default());
    let n = Rc::new(Cell::new(-1));
    session
        .append(&sink, "%d | %n\n", vec![Arg::from(42), Arg::from(n.clone())])
        .unwrap();
    session.flush().unwrap();
    assert_eq!(n.get(), "42".len() as i32 + " | ".len() as i32);
    assert_eq!(text(&buf), "42 | \n");
}

#[test]
fn scenario_6_two_flushes_do_not_interfere() {
    let (sink, buf) = harness();
    let mut session = Session::new(sink.clone(), Config::default());
    session.append(&sink, "Row %d\n", vec![Arg::from(7)]).unwrap();
    session.flush().unwrap();
    assert_eq!(text(&buf), "Row 7\n");

    buf.borrow_mut().clear();
    session.append(&sink, "X", vec![]).unwrap();
    session.flush().unwrap();
    assert_eq!(text(&buf), "X");
}

#[test]
fn a_lone_newline_call_prints_a_blank_separator_line() {
    // The `cfprintf(stdout, "\n");` idiom used between groups of rows.
    let _ = env_logger::try_init();
    let (sink, buf) = harness();
    let mut session = Session::new(sink.clone(), Config::default());
    session
        .append(&sink, "%s\n", vec![Arg::from("first group")])
        .unwrap();
    session.append(&sink, "\n", vec![]).unwrap();
    session
        .append(&sink, "%s\n", vec![Arg::from("second group")])
        .unwrap();
    session.flush().unwrap();
    assert_eq!(text(&buf), "first group\n\nsecond group\n");
}

#[test]
fn ragged_rows_pad_only_up_to_the_rows_that_reach_each_column() {
    let _ = env_logger::try_init();
    let (sink, buf) = harness();
    let mut session = Session::new(sink.clone(), Config::default());
    session
        .append(&sink, "%d %d %d\n", vec![Arg::from(1), Arg::from(2), Arg::from(3)])
        .unwrap();
    session.append(&sink, "%d\n", vec![Arg::from(99999)]).unwrap();
    session.flush().unwrap();
    let out = text(&buf);
    let rows: Vec<&str> = out.lines().collect();
    assert_eq!(rows[0], "1 2 3");
    assert_eq!(rows[1], "99999");
}

#[test]
fn a_purely_literal_column_is_never_padded() {
    let (sink, buf) = harness();
    let mut session = Session::new(sink.clone(), Config::default());
    session.append(&sink, "| %d\n", vec![Arg::from(1)]).unwrap();
    session.append(&sink, "| %d\n", vec![Arg::from(100)]).unwrap();
    session.flush().unwrap();
    let out = text(&buf);
    for line in out.lines() {
        assert!(line.starts_with("| "));
    }
}

#[test]
fn interleaved_literal_and_conversion_columns_align_independently() {
    let (sink, buf) = harness();
    let mut session = Session::new(sink.clone(), Config::default());
    session
        .append(&sink, "%s=%d, %s=%d\n", vec![Arg::from("a"), Arg::from(1), Arg::from("bb"), Arg::from(22)])
        .unwrap();
    session
        .append(
            &sink,
            "%s=%d, %s=%d\n",
            vec![Arg::from("ccc"), Arg::from(333), Arg::from("d"), Arg::from(4)],
        )
        .unwrap();
    session.flush().unwrap();
    let out = text(&buf);
    let rows: Vec<&str> = out.lines().collect();
    assert_eq!(rows.len(), 2);
    // Column 1 (the name before the first '=') pads to "ccc"'s width.
    assert!(rows[0].starts_with("a  ="));
    assert!(rows[1].starts_with("ccc="));
}

#[test]
fn header_row_then_rows_of_differing_width_still_align_by_ordinal_position() {
    let (sink, buf) = harness();
    let mut session = Session::new(sink.clone(), Config::default());
    session
        .append(&sink, "%s %s\n", vec![Arg::from("name"), Arg::from("count")])
        .unwrap();
    session
        .append(&sink, "%s %d\n", vec![Arg::from("alpha"), Arg::from(1)])
        .unwrap();
    session
        .append(&sink, "%s %d\n", vec![Arg::from("b"), Arg::from(2)])
        .unwrap();
    session.flush().unwrap();
    let out = text(&buf);
    let rows: Vec<&str> = out.lines().collect();
    assert_eq!(rows.len(), 3);
    // Every first column pads to "alpha"'s width (5 chars).
    assert!(rows[0].starts_with("name "));
    assert!(rows[1].starts_with("alpha "));
    assert!(rows[2].starts_with("b     "));
}

#[test]
fn percent_percent_and_strerror_specifier_participate_in_alignment() {
    let (sink, buf) = harness();
    let mut session = Session::new(sink.clone(), Config::default());
    session.append(&sink, "%d%%\n", vec![Arg::from(5)]).unwrap();
    session.append(&sink, "%d%%\n", vec![Arg::from(95)]).unwrap();
    session.flush().unwrap();
    assert_eq!(text(&buf), " 5%\n95%\n");
}

#[test]
fn mismatched_sink_on_a_later_call_is_a_fatal_error() {
    let (sink_a, _buf_a) = harness();
    let (sink_b, _buf_b) = harness();
    let mut session = Session::new(sink_a, Config::default());
    session.append(&sink_b, "x", vec![]).unwrap_err();
}

#[test]
fn truncation_is_reported_when_a_rendered_value_exceeds_the_buffer_cap() {
    let (sink, _buf) = harness();
    let mut session = Session::new(
        sink.clone(),
        Config {
            buffer_cap: 4,
            flush_on_exit: false,
        },
    );
    let err = session
        .append(&sink, "%s", vec![Arg::from("way too long for four bytes")])
        .unwrap_err();
    assert!(matches!(err, printf_align::Error::Truncation { .. }));
}

#[test]
fn type_mismatch_between_specifier_and_argument_is_fatal() {
    let (sink, _buf) = harness();
    let mut session = Session::new(sink.clone(), Config::default());
    let err = session.append(&sink, "%d", vec![Arg::from("not an int")]).unwrap_err();
    assert!(matches!(err, printf_align::Error::TypeMismatch { .. }));
}

#[test]
fn macro_surface_round_trips_through_a_custom_sink() {
    printf_align::session::reset_default_session();
    let (sink, buf) = harness();
    printf_align::emit_to!(sink.clone(), "%d-%d\n", 1, 22).unwrap();
    printf_align::emit_to!(sink.clone(), "%d-%d\n", 333, 4).unwrap();
    printf_align::flush!().unwrap();
    assert_eq!(text(&buf), "  1-22\n333- 4\n");
}
