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

//! Row-major emission (spec §4.5): walk the grid one row at a time,
//! writing literals verbatim and invoking the format oracle with each
//! conversion's width-rewritten spec. A writeback conversion writes
//! nothing; instead it sums the widths of every atom to its left on the
//! same row (a literal contributes its byte length, a rendered
//! conversion its column's `new_width`) into its caller-supplied cell.

use std::io::Write;

use crate::atom::{Graph, Payload};
use crate::error::{Error, Result};
use crate::oracle::FormatOracle;
use crate::spec::ConversionSpec;
use crate::value::Arg;

/// `trailing_newline` tells the walk whether the row the grid currently
/// ends on was itself terminated by a `\n` that has no following atom yet
/// (a call ended its format string with a newline, and flush ran before
/// any further append claimed it). Every row boundary *within* the grid
/// already implies a `\n` — two rows only ever exist because something
/// ended the first one — so only the last row's trailing newline is ever
/// ambiguous enough to need this flag.
pub fn emit(
    graph: &Graph,
    oracle: &dyn FormatOracle,
    sink: &mut dyn Write,
    buffer_cap: usize,
    trailing_newline: bool,
) -> Result<()> {
    let rows = graph.rows();
    let last_row = rows.len().saturating_sub(1);

    for (row_index, row) in rows.iter().enumerate() {
        let mut width_so_far: usize = 0;

        for &id in row {
            let atom = graph.atom(id);
            match &atom.payload {
                Payload::Literal(text) => {
                    write_bytes(sink, text.as_bytes())?;
                    width_so_far += text.len();
                }
                Payload::Conversion(conv) => {
                    if let Arg::Writeback(cell) = &conv.value {
                        cell.set(width_so_far as i32);
                        continue;
                    }
                    let rendered_spec = ConversionSpec {
                        width: conv.new_width.to_string(),
                        ..conv.spec.clone()
                    };
                    let rendered = oracle.render(&rendered_spec, &conv.value)?;
                    if rendered.len() > buffer_cap {
                        return Err(Error::Truncation {
                            spec: conv.spec.original_text.clone(),
                            cap: buffer_cap,
                        });
                    }
                    write_bytes(sink, rendered.as_bytes())?;
                    width_so_far += conv.new_width;
                }
            }
        }

        if row_index != last_row || trailing_newline {
            write_bytes(sink, b"\n")?;
        }
    }

    Ok(())
}

fn write_bytes(sink: &mut dyn Write, bytes: &[u8]) -> Result<()> {
    sink.write_all(bytes).map_err(|e| Error::Io(e.to_string()))
}
