// Copyright 2023 The Pigweed Authors
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

//! Error type for the column-aligning formatted-output engine.
//!
//! Every variant here corresponds to one of the fatal rows in the error
//! table: a bad conversion specification, a sink that disagrees with the
//! one a session already bound, a rendered value too wide for the
//! rendering buffer, or an argument whose runtime type disagrees with
//! what its conversion specifier demands.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A fatal error raised while buffering or flushing a session.
pub enum Error {
    /// A conversion specification could not be parsed: a bad
    /// length-modifier/specifier pairing, an indirect (`*`) width or
    /// precision, or a missing specifier character.
    InvalidSpec(String),

    /// The format string ended inside an unterminated `%` conversion.
    UnterminatedSpec,

    /// A call supplied a sink different from the one already bound to
    /// the current session.
    SinkMismatch,

    /// A rendered value would not fit in the rendering buffer.
    Truncation {
        /// The original specification being rendered.
        spec: String,
        /// The configured ceiling that was exceeded.
        cap: usize,
    },

    /// An argument's runtime tag does not match the type table for its
    /// `(length_modifier, specifier)` pair.
    TypeMismatch {
        /// The conversion specification that demanded the argument.
        spec: String,
        /// What the specification required.
        expected: &'static str,
    },

    /// Fewer arguments were supplied than the format string's
    /// conversions require.
    MissingArgument {
        /// The conversion specification left unsatisfied.
        spec: String,
    },

    /// Writing to the bound sink itself failed (a broken pipe, a full
    /// disk, …). Distinct from [`Error::SinkMismatch`], which means the
    /// caller supplied a *different* sink, not that writing to the
    /// already-agreed-upon one failed.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidSpec(s) => write!(f, "invalid conversion specification: {s}"),
            Error::UnterminatedSpec => write!(f, "format string ended inside a conversion"),
            Error::SinkMismatch => write!(f, "session is already bound to a different sink"),
            Error::Truncation { spec, cap } => {
                write!(f, "rendering '{spec}' exceeded the {cap}-byte buffer")
            }
            Error::TypeMismatch { spec, expected } => {
                write!(f, "'{spec}' expects {expected}, but a different argument type was supplied")
            }
            Error::MissingArgument { spec } => {
                write!(f, "no argument supplied for '{spec}'")
            }
            Error::Io(msg) => write!(f, "I/O error writing to sink: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// A `Result` alias using this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_spec() {
        let e = Error::Truncation {
            spec: "%d".to_string(),
            cap: 4096,
        };
        assert!(e.to_string().contains("%d"));
        assert!(e.to_string().contains("4096"));
    }

    #[test]
    fn error_is_std_error() {
        fn assert_std_error<E: std::error::Error>(_e: &E) {}
        assert_std_error(&Error::SinkMismatch);
    }

    #[test]
    fn io_error_is_distinct_from_sink_mismatch() {
        let io = Error::Io("broken pipe".to_string());
        assert!(io.to_string().contains("broken pipe"));
        assert_ne!(io, Error::SinkMismatch);
    }
}
