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

//! The format oracle: "given a specification string and one typed value,
//! produce the rendered string" (spec §6). The core invokes this twice per
//! non-writeback conversion — once to measure `original_width`, once at
//! emission with the width-rewritten spec.
//!
//! The teacher's `pw_log_backend_printf` crate shows the idiomatic Rust
//! shape for reaching an external formatter: an `unsafe extern "C"`
//! variadic call into libc's `snprintf`
//! (`examples/google-pigweed/pw_log/rust/pw_log_backend_printf/varargs.rs`).
//! This crate's default oracle does not reuse that shape. The `L`/long
//! double length modifier would require handing an 80- or 128-bit C
//! `long double` across the FFI boundary, and `f64` is not ABI-compatible
//! with it on any target — passing one where the callee expects the other
//! is undefined behavior, not just lossy. Rather than ship one unsound
//! specifier, [`NativeOracle`] renders every conversion in pure Rust, with
//! `long double` approximated by `f64` (a precision loss, not a soundness
//! hole; see DESIGN.md). [`FormatOracle`] stays the seam spec §6 asks for,
//! so a caller who needs exact `long double` output may still plug in a
//! different oracle (e.g., shelling out to a helper process).

use std::fmt::Write as _;

use crate::error::{Error, Result};
use crate::spec::ConversionSpec;
use crate::value::Arg;

/// A single-value formatting primitive consulted by value capture (to
/// measure) and the emitter (to render).
pub trait FormatOracle {
    fn render(&self, spec: &ConversionSpec, value: &Arg) -> Result<String>;
}

/// The default, dependency-free oracle. See the module docs for why this
/// crate does not shell out to libc's `snprintf` by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeOracle;

impl FormatOracle for NativeOracle {
    fn render(&self, spec: &ConversionSpec, value: &Arg) -> Result<String> {
        render(spec, value)
    }
}

struct Flags {
    alternate: bool,
    zero: bool,
    left: bool,
    space: bool,
    plus: bool,
}

fn parse_flags(s: &str) -> Flags {
    Flags {
        alternate: s.contains('#'),
        zero: s.contains('0'),
        left: s.contains('-'),
        space: s.contains(' '),
        plus: s.contains('+'),
    }
}

fn width(spec: &ConversionSpec) -> usize {
    spec.width.parse().unwrap_or(0)
}

/// `None` when no `.` was parsed at all; `Some(n)` for `.n` and `Some(0)`
/// for a bare `.` (no digits), matching the original's `strtol` fallback.
fn precision(spec: &ConversionSpec) -> Option<usize> {
    if spec.precision.is_empty() {
        None
    } else {
        Some(spec.precision[1..].parse().unwrap_or(0))
    }
}

fn pad(body: String, width: usize, flags: &Flags, zero_eligible: bool) -> String {
    if body.len() >= width {
        return body;
    }
    let fill = width - body.len();
    if flags.left {
        let mut s = body;
        s.push_str(&" ".repeat(fill));
        s
    } else if flags.zero && zero_eligible {
        // Zero-padding goes after any sign/prefix, not before it.
        let split = body
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(0);
        let (head, tail) = body.split_at(split);
        format!("{head}{}{tail}", "0".repeat(fill))
    } else {
        format!("{}{body}", " ".repeat(fill))
    }
}

fn sign_prefix(flags: &Flags, negative: bool) -> &'static str {
    if negative {
        "-"
    } else if flags.plus {
        "+"
    } else if flags.space {
        " "
    } else {
        ""
    }
}

fn as_i64(value: &Arg) -> Result<i64> {
    Ok(match value {
        Arg::Int(v) | Arg::SignedInt(v) => *v as i64,
        Arg::Long(v) | Arg::LongLong(v) | Arg::IntMax(v) => *v,
        Arg::SSize(v) | Arg::PtrDiff(v) => *v as i64,
        _ => return Err(type_error("an integer", value)),
    })
}

fn as_u64(value: &Arg) -> Result<u64> {
    Ok(match value {
        Arg::UInt(v) => *v as u64,
        Arg::ULong(v) | Arg::ULongLong(v) | Arg::UIntMax(v) => *v,
        Arg::USize(v) | Arg::UPtrDiff(v) => *v as u64,
        _ => return Err(type_error("an unsigned integer", value)),
    })
}

fn as_f64(value: &Arg) -> Result<f64> {
    Ok(match value {
        Arg::Double(v) | Arg::LongDouble(v) => *v,
        _ => return Err(type_error("a float", value)),
    })
}

fn type_error(expected: &'static str, _value: &Arg) -> Error {
    Error::InvalidSpec(format!("format oracle expected {expected}"))
}

/// Renders one conversion. `spec.specifier` must be one of
/// `diouxXeEfFgGaAcCsSpnm%`; `n` should never reach this function — the
/// emitter resolves writeback conversions itself (spec §4.5).
fn render(spec: &ConversionSpec, value: &Arg) -> Result<String> {
    let flags = parse_flags(&spec.flags);
    let w = width(spec);
    let prec = precision(spec);

    let body = match spec.specifier {
        'd' | 'i' => render_signed(as_i64(value)?, &flags, prec),
        'u' => render_unsigned(as_u64(value)?, 10, false, &flags, prec),
        'o' => render_octal(as_u64(value)?, &flags, prec),
        'x' => render_hex(as_u64(value)?, false, &flags, prec),
        'X' => render_hex(as_u64(value)?, true, &flags, prec),
        'f' | 'F' => render_fixed(as_f64(value)?, prec.unwrap_or(6), &flags, spec.specifier == 'F'),
        'e' | 'E' => render_exp(as_f64(value)?, prec.unwrap_or(6), &flags, spec.specifier == 'E'),
        'g' | 'G' => render_general(as_f64(value)?, prec.unwrap_or(6), &flags, spec.specifier == 'G'),
        'a' | 'A' => render_hex_float(as_f64(value)?, prec, spec.specifier == 'A'),
        'c' => render_char(value)?,
        's' => render_string(value, prec)?,
        'p' => render_pointer(value)?,
        '%' => "%".to_string(),
        'm' => std::io::Error::last_os_error().to_string(),
        other => {
            return Err(Error::InvalidSpec(format!(
                "unsupported conversion specifier '{other}'"
            )))
        }
    };

    let zero_eligible = !matches!(spec.specifier, 's' | 'c' | '%' | 'm')
        && !(matches!(spec.specifier, 'd' | 'i' | 'u' | 'o' | 'x' | 'X') && prec.is_some());
    Ok(pad(body, w, &flags, zero_eligible))
}

fn render_signed(v: i64, flags: &Flags, prec: Option<usize>) -> String {
    let magnitude = v.unsigned_abs().to_string();
    let digits = apply_precision(&magnitude, prec);
    format!("{}{digits}", sign_prefix(flags, v < 0))
}

fn render_unsigned(v: u64, radix: u32, _upper: bool, _flags: &Flags, prec: Option<usize>) -> String {
    let digits = match radix {
        10 => v.to_string(),
        _ => unreachable!("only decimal uses render_unsigned"),
    };
    apply_precision(&digits, prec)
}

fn render_octal(v: u64, flags: &Flags, prec: Option<usize>) -> String {
    let mut digits = format!("{v:o}");
    digits = apply_precision(&digits, prec);
    if flags.alternate && !digits.starts_with('0') {
        digits = format!("0{digits}");
    }
    digits
}

fn render_hex(v: u64, upper: bool, flags: &Flags, prec: Option<usize>) -> String {
    let mut digits = if upper {
        format!("{v:X}")
    } else {
        format!("{v:x}")
    };
    digits = apply_precision(&digits, prec);
    if flags.alternate && v != 0 {
        let prefix = if upper { "0X" } else { "0x" };
        digits = format!("{prefix}{digits}");
    }
    digits
}

fn apply_precision(digits: &str, prec: Option<usize>) -> String {
    match prec {
        Some(0) if digits == "0" => String::new(),
        Some(p) if p > digits.len() => format!("{}{digits}", "0".repeat(p - digits.len())),
        _ => digits.to_string(),
    }
}

fn render_fixed(v: f64, prec: usize, flags: &Flags, upper: bool) -> String {
    let mut s = format!("{:.*}", prec, v.abs());
    if upper {
        s = s.to_uppercase();
    }
    format!("{}{s}", sign_prefix(flags, v.is_sign_negative()))
}

fn render_exp(v: f64, prec: usize, flags: &Flags, upper: bool) -> String {
    let mag = v.abs();
    let mut s = format!("{:.*e}", prec, mag);
    // Rust renders `1.5e3`; C wants `1.5e+03` (sign, two-digit minimum).
    if let Some(pos) = s.find('e') {
        let (mantissa, exp) = s.split_at(pos);
        let exp_val: i32 = exp[1..].parse().unwrap_or(0);
        let sign = if exp_val < 0 { "-" } else { "+" };
        s = format!("{mantissa}e{sign}{:02}", exp_val.abs());
    }
    if upper {
        s = s.to_uppercase();
    }
    format!("{}{s}", sign_prefix(flags, v.is_sign_negative()))
}

fn render_general(v: f64, prec: usize, flags: &Flags, upper: bool) -> String {
    let prec = prec.max(1);
    let exp = if v == 0.0 { 0 } else { v.abs().log10().floor() as i32 };
    let mut s = if exp < -4 || exp >= prec as i32 {
        render_exp(v, prec.saturating_sub(1), flags, upper)
    } else {
        let decimals = (prec as i32 - 1 - exp).max(0) as usize;
        render_fixed(v, decimals, flags, upper)
    };
    if !flags.alternate {
        s = trim_trailing_zeros(&s);
    }
    s
}

fn trim_trailing_zeros(s: &str) -> String {
    if let Some(e_pos) = s.find(['e', 'E']) {
        let (mantissa, exp) = s.split_at(e_pos);
        format!("{}{exp}", trim_trailing_zeros(mantissa))
    } else if s.contains('.') {
        let trimmed = s.trim_end_matches('0');
        trimmed.trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

/// A hand-rolled `%a`/`%A`: sign, `0x1.` + hex mantissa digits, `p` +
/// decimal exponent. `long double`'s extra mantissa bits are not
/// reproduced (see module docs); this renders the `f64` bit pattern.
fn render_hex_float(v: f64, prec: Option<usize>, upper: bool) -> String {
    if v == 0.0 {
        let body = match prec {
            Some(p) if p > 0 => format!("0x0.{}p+0", "0".repeat(p)),
            _ => "0x0p+0".to_string(),
        };
        return if upper { body.to_uppercase() } else { body };
    }
    let bits = v.abs().to_bits();
    let raw_exp = ((bits >> 52) & 0x7ff) as i64;
    let mantissa = bits & 0x000f_ffff_ffff_ffff;
    let (leading, exp, mantissa) = if raw_exp == 0 {
        (0u64, -1022i64, mantissa)
    } else {
        (1u64, raw_exp - 1023, mantissa)
    };
    let mut hex_digits = String::new();
    let mut m = mantissa << 12; // left-align into 64 bits, 4 bits per hex digit
    let digit_count = prec.unwrap_or(13);
    for _ in 0..digit_count {
        let nibble = (m >> 60) & 0xf;
        let _ = write!(hex_digits, "{nibble:x}");
        m <<= 4;
    }
    if prec.is_none() {
        while hex_digits.ends_with('0') {
            hex_digits.pop();
        }
    }
    let mantissa_str = if hex_digits.is_empty() {
        format!("{leading}")
    } else {
        format!("{leading}.{hex_digits}")
    };
    let sign = if v.is_sign_negative() { "-" } else { "" };
    let body = format!("{sign}0x{mantissa_str}p{}{}", if exp < 0 { "-" } else { "+" }, exp.abs());
    if upper {
        body.to_uppercase()
    } else {
        body
    }
}

fn render_char(value: &Arg) -> Result<String> {
    match value {
        Arg::Int(v) => Ok((u8::try_from(*v & 0xff).unwrap_or(b'?') as char).to_string()),
        Arg::WChar(c) => Ok(c.to_string()),
        _ => Err(type_error("a character", value)),
    }
}

fn render_string(value: &Arg, prec: Option<usize>) -> Result<String> {
    let s = match value {
        Arg::Str(s) => s.clone(),
        Arg::WStr(chars) => chars.iter().collect(),
        _ => return Err(type_error("a string", value)),
    };
    Ok(match prec {
        Some(p) if p < s.chars().count() => s.chars().take(p).collect(),
        _ => s,
    })
}

fn render_pointer(value: &Arg) -> Result<String> {
    match value {
        Arg::Pointer(addr) => Ok(format!("0x{addr:x}")),
        _ => Err(type_error("a pointer", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::FormatString;

    fn conv(fmt: &str) -> ConversionSpec {
        let parsed = FormatString::parse(fmt).unwrap();
        match &parsed.rows[0][0] {
            crate::spec::FormatFragment::Conversion(c) => c.clone(),
            _ => panic!("expected a conversion fragment"),
        }
    }

    #[test]
    fn renders_plain_decimal() {
        let c = conv("%d");
        assert_eq!(render(&c, &Arg::SignedInt(42)).unwrap(), "42");
    }

    #[test]
    fn renders_negative_decimal_with_minus_sign() {
        let c = conv("%d");
        assert_eq!(render(&c, &Arg::SignedInt(-7)).unwrap(), "-7");
    }

    #[test]
    fn zero_pads_to_width() {
        let c = conv("%07.4f");
        assert_eq!(render(&c, &Arg::Double(1.2)).unwrap(), "01.2000");
    }

    #[test]
    fn left_justify_pads_with_trailing_spaces() {
        let c = conv("%-5d");
        assert_eq!(render(&c, &Arg::SignedInt(3)).unwrap(), "3    ");
    }

    #[test]
    fn hex_alternate_form_prefixes_0x() {
        let c = conv("%#x");
        assert_eq!(render(&c, &Arg::UInt(255)).unwrap(), "0xff");
    }

    #[test]
    fn percent_percent_renders_a_literal_percent() {
        let c = conv("%%");
        assert_eq!(render(&c, &Arg::SignedInt(0)).unwrap(), "%");
    }

    #[test]
    fn string_precision_truncates() {
        let c = conv("%.3s");
        assert_eq!(
            render(&c, &Arg::Str("downright wordy".to_string())).unwrap(),
            "dow"
        );
    }

    #[test]
    fn pointer_renders_with_0x_prefix() {
        let c = conv("%p");
        assert_eq!(render(&c, &Arg::Pointer(0xdead)).unwrap(), "0xdead");
    }
}
