//! Number parsing for tokens that don't resolve to a dictionary word.
//!
//! Mirrors the C `sscanf(buf, "%li%n", ...)` used by the original
//! firmware's host-number parser: decimal, `0x`/`0X` hex, and a leading
//! zero for octal, each optionally signed. The whole token must parse —
//! trailing garbage is a `NOT_A_WORD` abort, exactly as a short `%n`
//! count not reaching the end of the buffer was there.

use super::Abort;

pub fn parse_num(tok: &[u8]) -> Result<i32, Abort> {
    let s = core::str::from_utf8(tok).map_err(|_| Abort::NotAWord)?;

    let (neg, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    if rest.is_empty() {
        return Err(Abort::NotAWord);
    }

    let magnitude = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map_err(|_| Abort::NotAWord)?
    } else if rest.len() > 1 && rest.starts_with('0') {
        i64::from_str_radix(&rest[1..], 8).map_err(|_| Abort::NotAWord)?
    } else {
        rest.parse::<i64>().map_err(|_| Abort::NotAWord)?
    };

    let signed = if neg { -magnitude } else { magnitude };
    i32::try_from(signed).map_err(|_| Abort::NotAWord)
}
