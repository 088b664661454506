use std::fmt;

use crate::error::RuntimeError;

/// A runtime value. Immutable once constructed; operations always produce a fresh `Value`
/// rather than mutating one in place.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Nil,
}

impl Value {
    /// The name used by `TYPE` and in diagnostics.
    ///
    /// # Examples
    /// ```
    /// use ippcode22::Value;
    ///
    /// assert_eq!(Value::Int(1).type_name(), "int");
    /// assert_eq!(Value::Nil.type_name(), "nil");
    /// ```
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Nil => "nil",
        }
    }

    /// Renders the value for `WRITE`: ints as decimal, floats as lossless hex-float, bools as
    /// `true`/`false`, strings verbatim, nil as the empty string.
    pub fn render(&self) -> String {
        match self {
            Value::Int(i) => i.to_string(),
            Value::Float(x) => format_hex_float(*x),
            Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Value::String(s) => s.clone(),
            Value::Nil => String::new(),
        }
    }

    /// Parses a value out of XML argument text for the given `type` attribute.
    ///
    /// `raw` is `None` for an argument element with no text content, which only `string`
    /// tolerates (as the empty string, not `Nil`).
    pub fn parse_from_xml(type_tag: &str, raw: Option<&str>) -> Result<Value, RuntimeError> {
        match type_tag {
            "int" => {
                let text = raw.unwrap_or("");
                text.trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| RuntimeError::OperandValue(format!("not an int: {}", text)))
            }
            "float" => {
                let text = raw.unwrap_or("").trim();
                parse_float(text)
                    .map(Value::Float)
                    .ok_or_else(|| RuntimeError::OperandValue(format!("not a float: {}", text)))
            }
            "bool" => Ok(Value::Bool(raw.unwrap_or("").trim() == "true")),
            "nil" => Ok(Value::Nil),
            "string" => Ok(Value::String(unescape(raw.unwrap_or("")))),
            other => Err(RuntimeError::OperandValue(format!(
                "unrecognized type tag: {}",
                other
            ))),
        }
    }

    /// Parses a value read from user input for `READ var type`. Never fails: unparsable input
    /// yields `Nil`, per the expected type's fallback rule.
    pub fn parse_from_user_input(expected_type: &str, raw_line: &str) -> Value {
        match expected_type {
            "int" => {
                if let Ok(i) = raw_line.trim().parse::<i64>() {
                    Value::Int(i)
                } else if let Some(f) = parse_float(raw_line.trim()) {
                    Value::Int(f as i64)
                } else {
                    Value::Nil
                }
            }
            "float" => match parse_float(raw_line.trim()) {
                Some(f) => Value::Float(f),
                None => Value::Nil,
            },
            "bool" => Value::Bool(raw_line.trim().eq_ignore_ascii_case("true")),
            "string" => {
                if raw_line.is_empty() {
                    Value::Nil
                } else {
                    Value::String(unescape(raw_line))
                }
            }
            _ => Value::Nil,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Parses a float trying decimal syntax first, then Rust's `0x1.8p3`-style hex-float syntax.
fn parse_float(text: &str) -> Option<f64> {
    if let Ok(f) = text.parse::<f64>() {
        return Some(f);
    }
    parse_hex_float(text)
}

/// Parses the lossless hex-float form produced by [`format_hex_float`]: `[-]0x1.hhhhhhp[+-]e`
/// or `0x0p+0` for zero.
fn parse_hex_float(text: &str) -> Option<f64> {
    let (neg, rest) = match text.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, text),
    };
    let rest = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X"))?;
    let p_pos = rest.find(|c| c == 'p' || c == 'P')?;
    let (mantissa, exp_part) = rest.split_at(p_pos);
    let exp: i32 = exp_part[1..].parse().ok()?;

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    let leading: u64 = if int_part.is_empty() {
        0
    } else {
        u64::from_str_radix(int_part, 16).ok()?
    };
    let mut mantissa_value = leading as f64;
    let mut scale = 1.0f64 / 16.0;
    for digit_char in frac_part.chars() {
        let digit = digit_char.to_digit(16)? as f64;
        mantissa_value += digit * scale;
        scale /= 16.0;
    }
    let value = mantissa_value * 2f64.powi(exp);
    Some(if neg { -value } else { value })
}

/// Renders `x` as a lossless hex float: `libc`-style `%a` formatting via repeated manual
/// digit extraction, since the standard library does not expose `f64::to_hex_string`.
fn format_hex_float(x: f64) -> String {
    if x == 0.0 {
        return if x.is_sign_negative() {
            "-0x0p+0".to_string()
        } else {
            "0x0p+0".to_string()
        };
    }
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x < 0.0 { "-inf".to_string() } else { "inf".to_string() };
    }

    let bits = x.to_bits();
    let sign = bits >> 63;
    let raw_exp = ((bits >> 52) & 0x7ff) as i64;
    let mantissa = bits & 0x000f_ffff_ffff_ffff;

    let (leading_digit, exp, mantissa_bits) = if raw_exp == 0 {
        (0u64, -1022i64, mantissa)
    } else {
        (1u64, raw_exp - 1023, mantissa)
    };

    let mut frac = String::new();
    let mut remaining = mantissa_bits << 12; // left-align into 64 bits, 4 bits per hex digit
    for _ in 0..13 {
        let digit = (remaining >> 60) & 0xf;
        frac.push(std::char::from_digit(digit as u32, 16).unwrap());
        remaining <<= 4;
    }
    while frac.ends_with('0') {
        frac.pop();
    }

    let sign_str = if sign == 1 { "-" } else { "" };
    if frac.is_empty() {
        format!("{}0x{}p{:+}", sign_str, leading_digit, exp)
    } else {
        format!("{}0x{}.{}p{:+}", sign_str, leading_digit, frac, exp)
    }
}

/// Decodes `\ddd` escapes (exactly three decimal digits) into the scalar with that code point.
/// Any other occurrence of `\` (not followed by three digits) passes through literally.
pub fn unescape(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 3 < chars.len() {
            let digits: String = chars[i + 1..i + 4].iter().collect();
            if digits.len() == 3 && digits.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(code) = digits.parse::<u32>() {
                    if let Some(ch) = char::from_u32(code) {
                        out.push(ch);
                        i += 4;
                        continue;
                    }
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Encodes the escapes an emitter would need to apply so that `unescape` round-trips the
/// original text: non-printable characters, `#`, `\`, and whitespace become `\ddd`.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        let needs_escape = ch == '#' || ch == '\\' || ch.is_whitespace() || ch.is_control();
        if needs_escape {
            out.push_str(&format!("\\{:03}", ch as u32));
        } else {
            out.push(ch);
        }
    }
    out
}
