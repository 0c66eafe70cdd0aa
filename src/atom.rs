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

//! The buffered 2D atom grid.
//!
//! The original engine splices atoms into a doubly-linked grid bordered on
//! every column by dummy sentinel nodes, so that the k-th atom of any row
//! lines up with the k-th atom of every other row. This module keeps the
//! same guarantee with an arena instead: atoms live in one `Vec<Atom>`,
//! `left`/`right` become `Option<AtomId>`, and a column is a first-class
//! [`Column`] record (an ordered list of the atom ids that occupy it, plus
//! the running `max_width`) rather than a chain bounded by dummies.
//! Nothing in this module performs up/down pointer chasing — column
//! membership is direct, so invariants I1-I5 of the grid hold by
//! construction rather than by link bookkeeping.

use crate::value::Arg;
use crate::spec::ConversionSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnId(usize);

#[derive(Debug, Clone)]
/// A conversion atom's mutable alignment state, alongside the fields the
/// spec parser and value capture already pinned down.
pub struct ConversionData {
    pub spec: ConversionSpec,
    /// Byte length of the value rendered under the original spec; 0 for a
    /// writeback conversion, which contributes nothing to column width.
    pub original_width: usize,
    /// Column width assigned during alignment; 0 until then.
    pub new_width: usize,
    /// Spec string regenerated with `new_width` in place of the parsed
    /// width; `None` until the alignment engine's pass 2 runs.
    pub new_spec: Option<String>,
    pub value: Arg,
}

#[derive(Debug, Clone)]
pub enum Payload {
    Literal(String),
    Conversion(ConversionData),
}

#[derive(Debug, Clone)]
pub struct Atom {
    pub payload: Payload,
    pub row: usize,
    pub column: ColumnId,
    pub left: Option<AtomId>,
    pub right: Option<AtomId>,
}

#[derive(Debug, Clone, Default)]
/// All non-dummy atoms at one ordinal position across every row, in
/// top-to-bottom order, plus the alignment sweep's running maximum.
pub struct Column {
    pub entries: Vec<AtomId>,
    pub max_width: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    atoms: Vec<Atom>,
    columns: Vec<Column>,
    rows: Vec<Vec<AtomId>>,
    last_atom: Option<AtomId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// True only once nothing at all has been appended, not even a blank
    /// row: a call whose entire format string was just `"\n"` pushes a
    /// row with no atoms in it via [`Self::push_blank_row`], and that
    /// still needs to reach the emitter.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty() && self.rows.is_empty()
    }

    pub fn atom(&self, id: AtomId) -> &Atom {
        &self.atoms[id.0]
    }

    pub fn atom_mut(&mut self, id: AtomId) -> &mut Atom {
        &mut self.atoms[id.0]
    }

    pub fn rows(&self) -> &[Vec<AtomId>] {
        &self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_mut(&mut self, id: ColumnId) -> &mut Column {
        &mut self.columns[id.0]
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_entries(&self, index: usize) -> Vec<AtomId> {
        self.columns[index].entries.clone()
    }

    pub fn set_column_max_width(&mut self, index: usize, width: usize) {
        self.columns[index].max_width = width;
    }

    /// Appends one atom to the grid, preserving invariants I1-I3.
    ///
    /// `is_newline` starts a fresh row: the new atom lands in column 0,
    /// below whatever is already there (§4.3, "is_newline == true" case).
    /// Otherwise the atom continues the row the last append started,
    /// occupying the column immediately to the right of the last atom —
    /// creating that column if no row has reached it yet (the "Continuation
    /// of current row" case, including the empty-graph case, which is
    /// just a continuation with no predecessor).
    pub fn append(&mut self, is_newline: bool, payload: Payload) -> AtomId {
        let starts_row = is_newline || self.last_atom.is_none();

        let column_index = if starts_row {
            0
        } else {
            let last = self.last_atom.expect("continuation implies a predecessor");
            self.atoms[last.0].column.0 + 1
        };

        if column_index >= self.columns.len() {
            self.columns.push(Column::default());
        }

        let row_index = if starts_row {
            self.rows.push(Vec::new());
            self.rows.len() - 1
        } else {
            self.rows.len() - 1
        };

        let left = if starts_row {
            None
        } else {
            self.last_atom
        };

        let id = AtomId(self.atoms.len());
        self.atoms.push(Atom {
            payload,
            row: row_index,
            column: ColumnId(column_index),
            left,
            right: None,
        });

        if let Some(left_id) = left {
            self.atoms[left_id.0].right = Some(id);
        }

        self.rows[row_index].push(id);
        self.columns[column_index].entries.push(id);
        self.last_atom = Some(id);
        id
    }

    /// Pushes a row with no atoms: a blank output line bounded by a
    /// confirmed newline on both sides, with nothing ever appended to
    /// close or continue it. A row only otherwise comes into being when
    /// [`Self::append`] puts something in it, so a blank line — the
    /// `cfprintf(fp, "\n");` separator idiom — needs this to exist in the
    /// grid at all.
    pub fn push_blank_row(&mut self) {
        self.rows.push(Vec::new());
    }

    /// Whether the most recently pushed row already holds an atom that
    /// has not yet been closed off by a confirmed row break. Used to
    /// distinguish a `\n` that starts a genuinely blank line from one
    /// that merely closes a row a previous call left open.
    pub fn last_row_is_open(&self) -> bool {
        self.rows.last().is_some_and(|row| !row.is_empty())
    }

    /// Releases every atom, column, and row, returning the grid to its
    /// freshly-constructed state. Mirrors the arena `clear()` that stands
    /// in for the original's recursive `_free_graph` walk.
    pub fn clear(&mut self) {
        self.atoms.clear();
        self.columns.clear();
        self.rows.clear();
        self.last_atom = None;
    }
}
