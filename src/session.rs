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

//! Session lifecycle (spec §4.6): binds a sink on first use, buffers
//! atoms across calls, and releases everything at flush. `Session` itself
//! is an explicit handle — Design Notes §9 recommends this over a bare
//! process singleton so the core never has to reach for a process-exit
//! hook — and [`with_default_session`]/the `emit!` family of macros wrap
//! one thread-local `Session` for callers who want the original
//! call-a-free-function shape.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use crate::align::align;
use crate::atom::{ConversionData, Graph, Payload};
use crate::emit::emit;
use crate::error::{Error, Result};
use crate::oracle::{FormatOracle, NativeOracle};
use crate::spec::FormatString;
use crate::value::{check_tag, classify, Arg};

/// Construction-time knobs. The original hard-codes both as constants
/// (a 4097-byte `snprintf` buffer and an implicit single session); this
/// port exposes them so a caller can choose a larger ceiling or opt into
/// exit-time flushing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Rendered values wider than this are a fatal [`Error::Truncation`].
    /// Spec §7 requires at least 4096; matches the reference's buffer.
    pub buffer_cap: usize,
    /// Whether this session should flush itself when its thread's
    /// thread-local storage is torn down (see the `Drop` impl below).
    /// Defaults to `false` — Design Notes §9 calls exit-time flushing
    /// "a convenience" that "must be opt-in… to avoid surprising
    /// interactions with host runtimes."
    pub flush_on_exit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            buffer_cap: 4096,
            flush_on_exit: false,
        }
    }
}

/// The output destination a session is bound to. Two sessions are
/// considered the "same sink" (spec §4.6's sink-mismatch rule) when this
/// compares equal: `Stdout`/`Stderr` by variant, a custom writer by
/// `Rc` pointer identity (there is no general way to compare two
/// `dyn Write` values by value).
#[derive(Clone)]
pub enum Sink {
    Stdout,
    Stderr,
    Writer(Rc<RefCell<dyn Write>>),
}

impl Sink {
    fn same_target(&self, other: &Sink) -> bool {
        match (self, other) {
            (Sink::Stdout, Sink::Stdout) => true,
            (Sink::Stderr, Sink::Stderr) => true,
            (Sink::Writer(a), Sink::Writer(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Stdout => write!(f, "Sink::Stdout"),
            Sink::Stderr => write!(f, "Sink::Stderr"),
            Sink::Writer(_) => write!(f, "Sink::Writer(..)"),
        }
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Stdout => io::stdout().write(buf),
            Sink::Stderr => io::stderr().write(buf),
            Sink::Writer(w) => w.borrow_mut().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Stdout => io::stdout().flush(),
            Sink::Stderr => io::stderr().flush(),
            Sink::Writer(w) => w.borrow_mut().flush(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Buffering,
    Failed,
}

/// A buffered column-aligning output session: one graph, one bound sink,
/// one oracle. `flush` runs the alignment engine then the emitter and
/// returns the session to an empty, freshly-initialized state; a second
/// flush with nothing appended in between is a no-op (spec §8,
/// "idempotent teardown").
pub struct Session {
    graph: Graph,
    sink: Sink,
    oracle: Box<dyn FormatOracle>,
    config: Config,
    pending_newline: bool,
    state: State,
}

impl Session {
    pub fn new(sink: Sink, config: Config) -> Self {
        Session {
            graph: Graph::new(),
            sink,
            oracle: Box::new(NativeOracle),
            config,
            pending_newline: false,
            state: State::Buffering,
        }
    }

    pub fn with_oracle(sink: Sink, config: Config, oracle: Box<dyn FormatOracle>) -> Self {
        Session {
            graph: Graph::new(),
            sink,
            oracle,
            config,
            pending_newline: false,
            state: State::Buffering,
        }
    }

    /// Appends one format string and its already-captured arguments.
    /// `sink` must match the sink this session was constructed with
    /// (spec §4.6, "subsequent calls must supply the same sink").
    pub fn append(&mut self, sink: &Sink, fmt: &str, args: Vec<Arg>) -> Result<()> {
        if self.state == State::Failed {
            return Err(Error::InvalidSpec(
                "session already failed; start a new one".to_string(),
            ));
        }
        if !self.sink.same_target(sink) {
            self.state = State::Failed;
            self.graph.clear();
            return Err(Error::SinkMismatch);
        }
        match self.append_inner(fmt, args) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state = State::Failed;
                self.graph.clear();
                Err(e)
            }
        }
    }

    fn append_inner(&mut self, fmt: &str, args: Vec<Arg>) -> Result<()> {
        let parsed = FormatString::parse(fmt)?;
        if parsed.rows.len() == 1 && parsed.rows[0].is_empty() {
            // A wholly empty format string: no row, no argument, no
            // change to whatever newline bookkeeping is already pending.
            return Ok(());
        }

        let mut pool: VecDeque<Arg> = args.into();
        let last_row_idx = parsed.rows.len() - 1;

        for (row_index, row) in parsed.rows.iter().enumerate() {
            if row.is_empty() {
                // A row with nothing in it: the `\n` that produced it
                // found another `\n` immediately behind it (or, for
                // `row_index == last_row_idx`, hasn't found anything yet).
                if row_index == last_row_idx {
                    // Not yet confirmed: the next append (or flush, via
                    // `trailing_newline`) decides whether this is a real
                    // blank row or nothing at all.
                    self.pending_newline = true;
                } else if row_index == 0
                    && !self.pending_newline
                    && self.graph.last_row_is_open()
                {
                    // This `\n` only closes a row a previous call left
                    // open; nothing preceded it in *this* row, so it is
                    // not itself a blank line.
                    self.pending_newline = false;
                } else {
                    self.graph.push_blank_row();
                    self.pending_newline = false;
                }
                continue;
            }

            for (frag_index, frag) in row.iter().enumerate() {
                let is_newline = frag_index == 0 && (row_index > 0 || self.pending_newline);
                match frag {
                    crate::spec::FormatFragment::Literal(text) => {
                        self.graph.append(is_newline, Payload::Literal(text.clone()));
                    }
                    crate::spec::FormatFragment::Conversion(spec) => {
                        let tag = classify(&spec.length, spec.specifier)?;
                        let value = match tag {
                            None => Arg::SignedInt(0), // %% / %m: consumes no argument
                            Some(tag) => {
                                let arg = pool.pop_front().ok_or_else(|| Error::MissingArgument {
                                    spec: spec.original_text.clone(),
                                })?;
                                check_tag(tag, &arg, &spec.original_text)?;
                                arg
                            }
                        };

                        let original_width = if matches!(value, Arg::Writeback(_)) {
                            0
                        } else {
                            let rendered = self.oracle.render(spec, &value)?;
                            if rendered.len() > self.config.buffer_cap {
                                return Err(Error::Truncation {
                                    spec: spec.original_text.clone(),
                                    cap: self.config.buffer_cap,
                                });
                            }
                            rendered.len()
                        };

                        self.graph.append(
                            is_newline,
                            Payload::Conversion(ConversionData {
                                spec: spec.clone(),
                                original_width,
                                new_width: 0,
                                new_spec: None,
                                value,
                            }),
                        );
                    }
                }
            }
            self.pending_newline = false;
        }

        Ok(())
    }

    /// Runs alignment and emission, then releases all buffered state. A
    /// flush over an empty graph is a non-fatal no-op reported as a
    /// diagnostic (spec §7) rather than an error.
    pub fn flush(&mut self) -> Result<()> {
        if self.graph.is_empty() {
            log::trace!("flush on empty graph; nothing to do");
            return Ok(());
        }
        align(&mut self.graph);
        let result = emit(
            &self.graph,
            self.oracle.as_ref(),
            &mut self.sink,
            self.config.buffer_cap,
            self.pending_newline,
        );
        self.graph.clear();
        self.pending_newline = false;
        self.state = State::Buffering;
        result
    }

    /// Diagnostic dump of the current grid to the `log` crate's `trace`
    /// level — an unspecified human-readable form, exactly as spec §6
    /// allows ("not a contract the test suite must check").
    pub fn dump(&self) {
        for (row_index, row) in self.graph.rows().iter().enumerate() {
            for &id in row {
                let atom = self.graph.atom(id);
                match &atom.payload {
                    Payload::Literal(text) => {
                        log::trace!("row={row_index} col={:?} literal={text:?}", atom.column);
                    }
                    Payload::Conversion(c) => {
                        log::trace!(
                            "row={row_index} col={:?} spec={} original_width={} new_width={}",
                            atom.column,
                            c.spec.original_text,
                            c.original_width,
                            c.new_width
                        );
                    }
                }
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.config.flush_on_exit && !self.graph.is_empty() {
            let _ = self.flush();
        }
    }
}

thread_local! {
    static DEFAULT_SESSION: RefCell<Option<Session>> = const { RefCell::new(None) };
}

/// Runs `f` against the thread-local default session, creating it (bound
/// to `sink`) on first use. Backs the `emit!`/`flush!`/`dump!` macro
/// family, which is the thin, illustrative public surface spec §6 names.
pub fn with_default_session<R>(sink: Sink, f: impl FnOnce(&mut Session, &Sink) -> Result<R>) -> Result<R> {
    DEFAULT_SESSION.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(Session::new(sink.clone(), Config::default()));
        }
        let session = slot.as_mut().expect("just initialized");
        f(session, &sink)
    })
}

pub fn flush_default_session() -> Result<()> {
    DEFAULT_SESSION.with(|cell| {
        if let Some(session) = cell.borrow_mut().as_mut() {
            session.flush()
        } else {
            Ok(())
        }
    })
}

pub fn dump_default_session() {
    DEFAULT_SESSION.with(|cell| {
        if let Some(session) = cell.borrow().as_ref() {
            session.dump();
        }
    })
}

/// Drops the calling thread's default session so the next `emit!`/
/// `emit_to!` rebinds it to a fresh sink. The test harness reuses worker
/// threads across test functions, and the default session is
/// thread-local state, so tests that exercise the macro surface call
/// this first to avoid inheriting a sink left bound by an earlier test
/// on the same worker thread.
#[doc(hidden)]
pub fn reset_default_session() {
    DEFAULT_SESSION.with(|cell| *cell.borrow_mut() = None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn writer_sink() -> (Sink, Rc<RefCell<Vec<u8>>>) {
        let buf = Rc::new(RefCell::new(Vec::new()));
        (Sink::Writer(buf.clone()), buf)
    }

    #[test]
    fn scenario_hello_world_needs_no_padding() {
        let (sink, buf) = writer_sink();
        let mut s = Session::new(sink.clone(), Config::default());
        s.append(&sink, "%-s, %s!\n", vec![Arg::from("Hello"), Arg::from("world")])
            .unwrap();
        s.flush().unwrap();
        assert_eq!(String::from_utf8(buf.borrow().clone()).unwrap(), "Hello, world!\n");
    }

    #[test]
    fn scenario_three_rows_of_growing_digit_counts() {
        let (sink, buf) = writer_sink();
        let mut s = Session::new(sink.clone(), Config::default());
        s.append(&sink, "%d %d %d\n", vec![Arg::from(1), Arg::from(2), Arg::from(3)])
            .unwrap();
        s.append(&sink, "%d %d %d\n", vec![Arg::from(10), Arg::from(20), Arg::from(30)])
            .unwrap();
        s.append(
            &sink,
            "%d %d %d\n",
            vec![Arg::from(100), Arg::from(200), Arg::from(300)],
        )
        .unwrap();
        s.flush().unwrap();
        assert_eq!(
            String::from_utf8(buf.borrow().clone()).unwrap(),
            "  1   2   3\n 10  20  30\n100 200 300\n"
        );
    }

    #[test]
    fn scenario_writeback_records_left_width() {
        let (sink, buf) = writer_sink();
        let mut s = Session::new(sink.clone(), Config::default());
        let n = Rc::new(Cell::new(-1));
        s.append(&sink, "%d | %n\n", vec![Arg::from(42), Arg::from(n.clone())])
            .unwrap();
        s.flush().unwrap();
        assert_eq!(n.get(), 2 + 3);
        assert_eq!(String::from_utf8(buf.borrow().clone()).unwrap(), "42 | \n");
    }

    #[test]
    fn scenario_two_flushes_do_not_interfere() {
        let (sink, buf) = writer_sink();
        let mut s = Session::new(sink.clone(), Config::default());
        s.append(&sink, "Row %d\n", vec![Arg::from(7)]).unwrap();
        s.flush().unwrap();
        assert_eq!(String::from_utf8(buf.borrow().clone()).unwrap(), "Row 7\n");

        buf.borrow_mut().clear();
        s.append(&sink, "X", vec![]).unwrap();
        s.flush().unwrap();
        assert_eq!(String::from_utf8(buf.borrow().clone()).unwrap(), "X");
    }

    #[test]
    fn second_flush_with_nothing_appended_is_a_no_op() {
        let (sink, buf) = writer_sink();
        let mut s = Session::new(sink.clone(), Config::default());
        s.append(&sink, "hi", vec![]).unwrap();
        s.flush().unwrap();
        buf.borrow_mut().clear();
        s.flush().unwrap();
        assert!(buf.borrow().is_empty());
    }

    #[test]
    fn mismatched_sink_is_fatal() {
        let (sink_a, _buf_a) = writer_sink();
        let (sink_b, _buf_b) = writer_sink();
        let mut s = Session::new(sink_a, Config::default());
        let err = s.append(&sink_b, "x", vec![]).unwrap_err();
        assert!(matches!(err, Error::SinkMismatch));
    }

    #[test]
    fn missing_argument_is_fatal() {
        let (sink, _buf) = writer_sink();
        let mut s = Session::new(sink.clone(), Config::default());
        let err = s.append(&sink, "%d", vec![]).unwrap_err();
        assert!(matches!(err, Error::MissingArgument { .. }));
    }

    #[test]
    fn embedded_newline_ends_the_row_it_sits_in() {
        let (sink, buf) = writer_sink();
        let mut s = Session::new(sink.clone(), Config::default());
        s.append(&sink, "a\nb", vec![]).unwrap();
        s.flush().unwrap();
        assert_eq!(String::from_utf8(buf.borrow().clone()).unwrap(), "a\nb");
    }

    #[test]
    fn trailing_newline_from_one_call_continues_into_the_next() {
        let (sink, buf) = writer_sink();
        let mut s = Session::new(sink.clone(), Config::default());
        s.append(&sink, "first\n", vec![]).unwrap();
        s.append(&sink, "second", vec![]).unwrap();
        s.flush().unwrap();
        assert_eq!(String::from_utf8(buf.borrow().clone()).unwrap(), "first\nsecond");
    }

    /// The `cfprintf(fp, "\n");` blank-line-separator idiom: a call whose
    /// entire format string is a bare newline must still produce a row
    /// of its own, not silently vanish between its neighbors.
    #[test]
    fn a_call_that_is_only_a_newline_produces_a_blank_row() {
        let (sink, buf) = writer_sink();
        let mut s = Session::new(sink.clone(), Config::default());
        s.append(&sink, "a\n", vec![]).unwrap();
        s.append(&sink, "\n", vec![]).unwrap();
        s.append(&sink, "b\n", vec![]).unwrap();
        s.flush().unwrap();
        assert_eq!(String::from_utf8(buf.borrow().clone()).unwrap(), "a\n\nb\n");
    }

    #[test]
    fn an_embedded_double_newline_produces_a_blank_row_in_one_call() {
        let (sink, buf) = writer_sink();
        let mut s = Session::new(sink.clone(), Config::default());
        s.append(&sink, "a\n\nb\n", vec![]).unwrap();
        s.flush().unwrap();
        assert_eq!(String::from_utf8(buf.borrow().clone()).unwrap(), "a\n\nb\n");
    }

    #[test]
    fn a_newline_right_after_unterminated_content_just_closes_that_row() {
        let (sink, buf) = writer_sink();
        let mut s = Session::new(sink.clone(), Config::default());
        s.append(&sink, "a", vec![]).unwrap();
        s.append(&sink, "\nb\n", vec![]).unwrap();
        s.flush().unwrap();
        // No blank row: the `\n` that opens the second call's format
        // string closes the row "a" left open, it does not itself
        // describe a blank line.
        assert_eq!(String::from_utf8(buf.borrow().clone()).unwrap(), "a\nb\n");
    }
}
