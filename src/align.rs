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

//! The two-pass column sweep (spec §4.4).
//!
//! Pass 1 walks each column top to bottom, taking the maximum
//! `original_width` over its conversion atoms (literals are untouched;
//! writeback atoms contribute 0, per the "newer engine" behavior the
//! port standardizes on). Pass 2 writes that maximum back as every
//! conversion atom's `new_width` and regenerates its `new_spec` string.
//! Columns with no conversions at all leave `w = 0`, matching the
//! source's behavior of never touching a purely-literal column.

use crate::atom::{Graph, Payload};

pub fn align(graph: &mut Graph) {
    for column_index in 0..graph.column_count() {
        let entries = graph.column_entries(column_index);

        let mut max_width = 0usize;
        for &id in &entries {
            if let Payload::Conversion(conv) = &graph.atom(id).payload {
                max_width = max_width.max(conv.original_width);
            }
        }

        for &id in &entries {
            if let Payload::Conversion(conv) = &mut graph.atom_mut(id).payload {
                conv.new_width = max_width;
                conv.new_spec = Some(conv.spec.with_width(max_width));
            }
        }

        graph.set_column_max_width(column_index, max_width);
    }
}
