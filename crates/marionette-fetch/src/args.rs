//! Numeric arguments from data tokens.
//!
//! Integers use C `strtol` base-0 rules: an optional sign, then a `0x`/`0X`
//! prefix for hex, a leading `0` for octal, anything else decimal. The whole
//! token must be consumed. Unsigned parsing rejects a `-` sign.

use marionette_types::error::{MarionetteError, Result};

/// Split a sign-less token into its digits and radix.
fn digits_and_radix(body: &str) -> Option<(&str, u32)> {
    let (digits, radix) = if let Some(hex) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        (hex, 16)
    } else if body.len() > 1 && body.starts_with('0') {
        (&body[1..], 8)
    } else {
        (body, 10)
    };
    // from_str_radix would accept a second sign.
    (!digits.is_empty() && digits.chars().all(|c| c.is_digit(radix))).then_some((digits, radix))
}

fn out_of_range(token: &str) -> MarionetteError {
    MarionetteError::Argument(format!("number out of range: {token}"))
}

/// Parse an unsigned integer with base-0 prefix rules.
pub fn parse_u32(token: &str) -> Result<u32> {
    let body = token.strip_prefix('+').unwrap_or(token);
    let (digits, radix) = digits_and_radix(body)
        .ok_or_else(|| MarionetteError::Argument(format!("not a number: {token}")))?;
    u32::from_str_radix(digits, radix).map_err(|_| out_of_range(token))
}

/// Parse a signed integer with base-0 prefix rules (`-0x10` is -16).
pub fn parse_i32(token: &str) -> Result<i32> {
    let (negative, body) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };
    let (digits, radix) = digits_and_radix(body)
        .ok_or_else(|| MarionetteError::Argument(format!("not a number: {token}")))?;
    let magnitude = i64::from_str_radix(digits, radix).map_err(|_| out_of_range(token))?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).map_err(|_| out_of_range(token))
}

/// Parse and check `min <= value <= max`.
pub fn parse_in_range(token: &str, min: u32, max: u32) -> Result<u32> {
    let value = parse_u32(token)?;
    if value < min || value > max {
        return Err(MarionetteError::Argument(format!(
            "{token} out of range [{min}, {max}]"
        )));
    }
    Ok(value)
}

/// Require exactly `n` data tokens.
pub fn expect_data<'a, 'b>(data: &'b [&'a str], n: usize) -> Result<&'b [&'a str]> {
    if data.len() != n {
        return Err(MarionetteError::Argument(format!(
            "expected {n} data argument(s), got {}",
            data.len()
        )));
    }
    Ok(data)
}

/// Reject command tokens beyond `used`.
pub fn expect_no_more(command: &[&str], used: usize) -> Result<()> {
    match command.get(used) {
        Some(extra) => Err(MarionetteError::Parse(format!("unexpected token: {extra}"))),
        None => Ok(()),
    }
}
