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

//! Value capture: classifying a conversion's expected type from its
//! `(length_modifier, specifier)` pair and holding the caller's argument
//! under that type.
//!
//! This plays the role the original's `value` union and `type_t` tag play
//! (`examples/original_source/src/cprintf.c`), and the role the teacher's
//! `pw_log_backend_printf::varargs` module plays in eagerly building a
//! typed argument list before the format string is fully understood
//! (`examples/google-pigweed/pw_log/rust/pw_log_backend_printf/varargs.rs`).
//! Unlike either, every [`Arg`] owns its data: the format string here is
//! parsed at *runtime*, one call at a time, and the session singleton that
//! holds buffered atoms cannot borrow from a caller's stack frame that may
//! have long since returned.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq)]
/// A single captured argument, owning its data.
///
/// Variant names follow the type column of the specifier table rather
/// than Rust's native integer names, since several distinct C types
/// (`long`, `long long`, `intmax_t`, …) are tracked separately even when
/// they coincide in width on common targets — the table draws the
/// distinctions that a caller's conversion specifier can demand.
pub enum Arg {
    /// `%c` with no length modifier: an `int`-promoted character.
    Int(i32),
    /// `%c` with `l`: a wide character (`wint_t`).
    WChar(char),
    /// `%s` with no length modifier: a byte string.
    Str(String),
    /// `%s` with `l`: a wide-character string.
    WStr(Vec<char>),
    /// `%d`/`%i` (or `%o`/`%u`/`%x`/`%X` with `h`/`hh`) promoted `int`.
    SignedInt(i32),
    /// `%d`/`%i` with `l`.
    Long(i64),
    /// `%d`/`%i` with `ll`.
    LongLong(i64),
    /// `%d`/`%i` with `j` (`intmax_t`).
    IntMax(i64),
    /// `%d`/`%i` with `z` (`ssize_t`).
    SSize(isize),
    /// `%d`/`%i` with `t` (`ptrdiff_t`).
    PtrDiff(isize),
    /// `%o`/`%u`/`%x`/`%X` with no length modifier.
    UInt(u32),
    /// `%o`/`%u`/`%x`/`%X` with `l`.
    ULong(u64),
    /// `%o`/`%u`/`%x`/`%X` with `ll`.
    ULongLong(u64),
    /// `%o`/`%u`/`%x`/`%X` with `j` (`uintmax_t`).
    UIntMax(u64),
    /// `%o`/`%u`/`%x`/`%X` with `z` (`size_t`).
    USize(usize),
    /// `%o`/`%u`/`%x`/`%X` with `t`.
    UPtrDiff(usize),
    /// `%f`/`%F`/`%e`/`%E`/`%g`/`%G`/`%a`/`%A` with no modifier or `l`.
    Double(f64),
    /// Same specifiers with `L`. Rust has no ABI-safe `long double`; the
    /// value is carried as `f64` (see DESIGN.md, "native oracle" entry).
    LongDouble(f64),
    /// `%p`: an opaque pointer, captured as its address.
    Pointer(usize),
    /// `%n`: a writeback target. An `Rc<Cell<i32>>` rather than a raw
    /// pointer so the public API stays free of `unsafe`.
    Writeback(Rc<Cell<i32>>),
}

impl Arg {
    pub(crate) fn tag(&self) -> TypeTag {
        match self {
            Arg::Int(_) => TypeTag::Int,
            Arg::WChar(_) => TypeTag::WChar,
            Arg::Str(_) => TypeTag::CharPtr,
            Arg::WStr(_) => TypeTag::WCharPtr,
            Arg::SignedInt(_) => TypeTag::Int,
            Arg::Long(_) => TypeTag::Long,
            Arg::LongLong(_) => TypeTag::LongLong,
            Arg::IntMax(_) => TypeTag::IntMax,
            Arg::SSize(_) => TypeTag::SSize,
            Arg::PtrDiff(_) => TypeTag::PtrDiff,
            Arg::UInt(_) => TypeTag::UInt,
            Arg::ULong(_) => TypeTag::ULong,
            Arg::ULongLong(_) => TypeTag::ULongLong,
            Arg::UIntMax(_) => TypeTag::UIntMax,
            Arg::USize(_) => TypeTag::USize,
            Arg::UPtrDiff(_) => TypeTag::UPtrDiff,
            Arg::Double(_) => TypeTag::Double,
            Arg::LongDouble(_) => TypeTag::LongDouble,
            Arg::Pointer(_) => TypeTag::VoidPtr,
            Arg::Writeback(_) => TypeTag::IntPtr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The type tag a `(length_modifier, specifier)` pair demands.
///
/// Mirrors the table in spec §4.2 (itself a transcription of the
/// `va_arg()` dispatch in `calc_actual_width()`,
/// `examples/original_source/src/cprintf.c`).
pub enum TypeTag {
    Int,
    WChar,
    CharPtr,
    WCharPtr,
    Long,
    LongLong,
    IntMax,
    SSize,
    PtrDiff,
    UInt,
    ULong,
    ULongLong,
    UIntMax,
    USize,
    UPtrDiff,
    Double,
    LongDouble,
    VoidPtr,
    IntPtr,
}

impl TypeTag {
    fn description(self) -> &'static str {
        match self {
            TypeTag::Int => "an int-sized character",
            TypeTag::WChar => "a wide character",
            TypeTag::CharPtr => "a string",
            TypeTag::WCharPtr => "a wide string",
            TypeTag::Long => "a long",
            TypeTag::LongLong => "a long long",
            TypeTag::IntMax => "an intmax_t",
            TypeTag::SSize => "a signed size",
            TypeTag::PtrDiff => "a signed pointer difference",
            TypeTag::UInt => "an unsigned int",
            TypeTag::ULong => "an unsigned long",
            TypeTag::ULongLong => "an unsigned long long",
            TypeTag::UIntMax => "a uintmax_t",
            TypeTag::USize => "a size",
            TypeTag::UPtrDiff => "an unsigned pointer difference",
            TypeTag::Double => "a double",
            TypeTag::LongDouble => "a long double",
            TypeTag::VoidPtr => "a pointer",
            TypeTag::IntPtr => "a writeback target",
        }
    }
}

/// Classify the type tag that a conversion's `(length_modifier,
/// specifier)` pair demands. `None` for `%%` and `%m`, which consume no
/// argument.
pub(crate) fn classify(length: &str, specifier: char) -> crate::error::Result<Option<TypeTag>> {
    use TypeTag::*;
    let tag = match (specifier, length) {
        ('c', "") => Int,
        ('c', "l") => WChar,
        ('s', "") => CharPtr,
        ('s', "l") => WCharPtr,
        ('d' | 'i', "" | "h" | "hh") => Int,
        ('d' | 'i', "l") => Long,
        ('d' | 'i', "ll") => LongLong,
        ('d' | 'i', "j") => IntMax,
        ('d' | 'i', "z") => SSize,
        ('d' | 'i', "t") => PtrDiff,
        ('o' | 'u' | 'x' | 'X', "h" | "hh") => Int,
        ('o' | 'u' | 'x' | 'X', "") => UInt,
        ('o' | 'u' | 'x' | 'X', "l") => ULong,
        ('o' | 'u' | 'x' | 'X', "ll") => ULongLong,
        ('o' | 'u' | 'x' | 'X', "j") => UIntMax,
        ('o' | 'u' | 'x' | 'X', "z") => USize,
        ('o' | 'u' | 'x' | 'X', "t") => UPtrDiff,
        ('f' | 'F' | 'e' | 'E' | 'g' | 'G' | 'a' | 'A', "" | "l") => Double,
        ('f' | 'F' | 'e' | 'E' | 'g' | 'G' | 'a' | 'A', "L") => LongDouble,
        ('p', "") => VoidPtr,
        ('n', "") => IntPtr,
        ('%', _) | ('m', _) => return Ok(None),
        _ => {
            return Err(Error::InvalidSpec(format!(
                "no type for length modifier '{length}' with specifier '{specifier}'"
            )))
        }
    };
    Ok(Some(tag))
}

/// Check that `arg`'s runtime tag matches what `expected` demands,
/// returning a [`Error::TypeMismatch`] naming `original_spec` otherwise.
pub(crate) fn check_tag(
    expected: TypeTag,
    arg: &Arg,
    original_spec: &str,
) -> crate::error::Result<()> {
    // int/long/long long and their unsigned counterparts collapse onto
    // the same bit width on every target this crate cares about, and a
    // caller writing `%ld` with a plain Rust `i64` (there is no
    // ambiguity to preserve once the value has already been widened)
    // should not have to reach for a disambiguating wrapper. Pointer-
    // valued, string, and floating tags are matched exactly.
    let compatible = match (expected, arg.tag()) {
        (a, b) if a == b => true,
        (Long | LongLong | IntMax, Long | LongLong | IntMax) => true,
        (ULong | ULongLong | UIntMax, ULong | ULongLong | UIntMax) => true,
        (SSize | PtrDiff, SSize | PtrDiff) => true,
        (USize | UPtrDiff, USize | UPtrDiff) => true,
        (Double, LongDouble) | (LongDouble, Double) => true,
        _ => false,
    };
    use TypeTag::*;
    if compatible {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            spec: original_spec.to_string(),
            expected: expected.description(),
        })
    }
}

impl From<i8> for Arg {
    fn from(v: i8) -> Self {
        Arg::SignedInt(v as i32)
    }
}
impl From<i16> for Arg {
    fn from(v: i16) -> Self {
        Arg::SignedInt(v as i32)
    }
}
impl From<i32> for Arg {
    fn from(v: i32) -> Self {
        Arg::SignedInt(v)
    }
}
impl From<i64> for Arg {
    fn from(v: i64) -> Self {
        Arg::LongLong(v)
    }
}
impl From<isize> for Arg {
    fn from(v: isize) -> Self {
        Arg::SSize(v)
    }
}
impl From<u8> for Arg {
    fn from(v: u8) -> Self {
        Arg::UInt(v as u32)
    }
}
impl From<u16> for Arg {
    fn from(v: u16) -> Self {
        Arg::UInt(v as u32)
    }
}
impl From<u32> for Arg {
    fn from(v: u32) -> Self {
        Arg::UInt(v)
    }
}
impl From<u64> for Arg {
    fn from(v: u64) -> Self {
        Arg::ULongLong(v)
    }
}
impl From<usize> for Arg {
    fn from(v: usize) -> Self {
        Arg::USize(v)
    }
}
impl From<f32> for Arg {
    fn from(v: f32) -> Self {
        Arg::Double(v as f64)
    }
}
impl From<f64> for Arg {
    fn from(v: f64) -> Self {
        Arg::Double(v)
    }
}
impl From<char> for Arg {
    fn from(v: char) -> Self {
        if v.is_ascii() {
            Arg::Int(v as i32)
        } else {
            Arg::WChar(v)
        }
    }
}
impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Str(v.to_string())
    }
}
impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::Str(v)
    }
}
impl From<&String> for Arg {
    fn from(v: &String) -> Self {
        Arg::Str(v.clone())
    }
}
impl<T> From<*const T> for Arg {
    fn from(v: *const T) -> Self {
        Arg::Pointer(v as usize)
    }
}
impl<T> From<*mut T> for Arg {
    fn from(v: *mut T) -> Self {
        Arg::Pointer(v as usize)
    }
}
impl From<Rc<Cell<i32>>> for Arg {
    fn from(v: Rc<Cell<i32>>) -> Self {
        Arg::Writeback(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_the_full_table() {
        assert_eq!(classify("", 'd').unwrap(), Some(TypeTag::Int));
        assert_eq!(classify("hh", 'd').unwrap(), Some(TypeTag::Int));
        assert_eq!(classify("l", 'd').unwrap(), Some(TypeTag::Long));
        assert_eq!(classify("ll", 'd').unwrap(), Some(TypeTag::LongLong));
        assert_eq!(classify("j", 'd').unwrap(), Some(TypeTag::IntMax));
        assert_eq!(classify("z", 'd').unwrap(), Some(TypeTag::SSize));
        assert_eq!(classify("t", 'd').unwrap(), Some(TypeTag::PtrDiff));
        assert_eq!(classify("", 'u').unwrap(), Some(TypeTag::UInt));
        assert_eq!(classify("h", 'x').unwrap(), Some(TypeTag::Int));
        assert_eq!(classify("l", 'X').unwrap(), Some(TypeTag::ULong));
        assert_eq!(classify("", 'f').unwrap(), Some(TypeTag::Double));
        assert_eq!(classify("L", 'g').unwrap(), Some(TypeTag::LongDouble));
        assert_eq!(classify("", 'p').unwrap(), Some(TypeTag::VoidPtr));
        assert_eq!(classify("", 'n').unwrap(), Some(TypeTag::IntPtr));
        assert_eq!(classify("", '%').unwrap(), None);
        assert_eq!(classify("", 'm').unwrap(), None);
    }

    #[test]
    fn rejects_unknown_combination() {
        assert!(classify("l", 'c').is_err() == false); // %lc is valid (WChar)
        assert!(classify("ll", 'c').is_err());
        assert!(classify("q", 'd').is_err());
    }

    #[test]
    fn tag_check_allows_width_equivalent_integers() {
        let long_val = Arg::from(5i64);
        check_tag(TypeTag::Long, &long_val, "%ld").unwrap();
        check_tag(TypeTag::LongLong, &long_val, "%lld").unwrap();
    }

    #[test]
    fn tag_check_rejects_string_for_integer() {
        let s = Arg::from("oops");
        assert!(check_tag(TypeTag::Int, &s, "%d").is_err());
    }
}
