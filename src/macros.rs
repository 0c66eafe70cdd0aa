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

//! The public entry points named in spec §6. Rust has no variadic
//! functions, so each trailing expression is captured eagerly into an
//! `Arg` at the call site (`Arg::from`, see `value.rs`) and collected
//! into a plain `Vec` before the format string is even looked at — the
//! same shape the teacher's `pw_log_backend_printf` crate uses to build
//! a typed argument chain ahead of an FFI call, adapted here to a
//! runtime `Vec` rather than a compile-time tuple because this crate
//! can't finish type-checking a conversion until its column width is
//! known at flush time.

/// Appends to the default (standard-output-bound) session.
#[macro_export]
macro_rules! emit {
    ($fmt:expr $(, $arg:expr)*) => {{
        $crate::session::with_default_session($crate::session::Sink::Stdout, |session, sink| {
            session.append(sink, $fmt, vec![$($crate::value::Arg::from($arg)),*])
        })
    }};
}

/// Appends to a caller-chosen sink; the sink must match whatever sink
/// the default session is already bound to this call (spec §4.6).
#[macro_export]
macro_rules! emit_to {
    ($sink:expr, $fmt:expr $(, $arg:expr)*) => {{
        $crate::session::with_default_session($sink, |session, sink| {
            session.append(sink, $fmt, vec![$($crate::value::Arg::from($arg)),*])
        })
    }};
}

/// Appends to the default session using a pre-built argument pack. The
/// pack is copied into a fresh `Vec` before consumption, per spec §6.
#[macro_export]
macro_rules! emit_v {
    ($fmt:expr, $pack:expr) => {{
        $crate::session::with_default_session($crate::session::Sink::Stdout, |session, sink| {
            let args: ::std::vec::Vec<$crate::value::Arg> =
                ::std::iter::IntoIterator::into_iter($pack).cloned().collect();
            session.append(sink, $fmt, args)
        })
    }};
}

/// `emit_to_v!`'s sink-directed counterpart.
#[macro_export]
macro_rules! emit_to_v {
    ($sink:expr, $fmt:expr, $pack:expr) => {{
        $crate::session::with_default_session($sink, |session, sink| {
            let args: ::std::vec::Vec<$crate::value::Arg> =
                ::std::iter::IntoIterator::into_iter($pack).cloned().collect();
            session.append(sink, $fmt, args)
        })
    }};
}

/// Runs the alignment engine and emitter over the default session, then
/// releases its state (spec §4.6).
#[macro_export]
macro_rules! flush {
    () => {
        $crate::session::flush_default_session()
    };
}

/// Diagnostic dump of the default session's current grid at `trace`
/// level (spec §6; not a contract the test suite checks).
#[macro_export]
macro_rules! dump {
    () => {
        $crate::session::dump_default_session()
    };
}

#[cfg(test)]
mod tests {
    use crate::session::Sink;
    use crate::value::Arg;
    use std::cell::RefCell;
    use std::rc::Rc;

    // The macros above target the default thread-local session, which
    // is process state shared across tests in this module; each test
    // here only exercises that the macros expand and run without
    // panicking; end-to-end alignment behavior is covered in
    // `session.rs` against explicit `Session` handles, and in
    // `tests/integration.rs` against the macro surface in isolation.
    #[test]
    fn emit_to_and_flush_expand_and_run() {
        crate::session::reset_default_session();
        let buf = Rc::new(RefCell::new(Vec::new()));
        let sink = Sink::Writer(buf.clone());
        emit_to!(sink.clone(), "%d\n", 42).unwrap();
        flush!().unwrap();
        assert_eq!(String::from_utf8(buf.borrow().clone()).unwrap(), "42\n");
    }

    #[test]
    fn emit_to_v_copies_the_pack_before_consuming_it() {
        crate::session::reset_default_session();
        let buf = Rc::new(RefCell::new(Vec::new()));
        let sink = Sink::Writer(buf.clone());
        let pack = vec![Arg::from("a"), Arg::from("b")];
        emit_to_v!(sink.clone(), "%s-%s\n", &pack).unwrap();
        // The pack is still usable; the macro copied it rather than
        // draining it by value.
        assert_eq!(pack.len(), 2);
        flush!().unwrap();
        assert_eq!(String::from_utf8(buf.borrow().clone()).unwrap(), "a-b\n");
    }
}
