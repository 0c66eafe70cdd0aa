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

//! Buffers `printf`-style output across calls and, at flush, re-renders
//! it so that values sharing a column line up under a common field
//! width — the maximum natural width observed for that column.
//!
//! A caller writes ordinary conversion-specification strings:
//!
//! ```
//! use printf_align::{Config, Session, Sink};
//!
//! let sink = Sink::Writer(std::rc::Rc::new(std::cell::RefCell::new(Vec::new())));
//! let mut session = Session::new(sink.clone(), Config::default());
//! session.append(&sink, "%d %d %d\n", vec![1i32.into(), 2i32.into(), 3i32.into()]).unwrap();
//! session.append(&sink, "%d %d %d\n", vec![10i32.into(), 20i32.into(), 30i32.into()]).unwrap();
//! session.flush().unwrap();
//! ```
//!
//! prints `1`/`2`/`3` and `10`/`20`/`30` with each column padded to its
//! own widest value — no hand-computed width anywhere in the call site.
//!
//! # Architecture
//!
//! - [`spec`] splits a format string into literal runs and conversion
//!   specifications.
//! - [`value`] classifies each conversion's expected argument type and
//!   holds the caller's value under it ([`value::Arg`]).
//! - [`atom`] is the buffered grid every call appends into
//!   ([`atom::Graph`]).
//! - [`align`] sweeps the grid column by column to assign widths.
//! - [`emit`] walks the grid row by row, rendering through a
//!   [`oracle::FormatOracle`], and resolves `%n` writeback targets.
//! - [`session`] ties the above into the stateful [`Session`] handle,
//!   plus a thread-local default session backing the [`emit!`] macro
//!   family.
//!
//! The default [`oracle::NativeOracle`] renders every conversion in pure
//! Rust rather than shelling out to libc's `snprintf`; see its module
//! docs for why (in short: `long double` has no sound representation to
//! hand across an FFI boundary from safe Rust).

pub mod align;
pub mod atom;
pub mod emit;
pub mod error;
pub mod oracle;
pub mod session;
pub mod spec;
pub mod value;

#[macro_use]
pub mod macros;

pub use error::{Error, Result};
pub use oracle::{FormatOracle, NativeOracle};
pub use session::{Config, Session, Sink};
pub use value::Arg;
