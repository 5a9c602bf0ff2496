use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::bvalue::BValue;
use super::error::BencodeError;

/// Decodes a single bencoded value from the front of `input`.
///
/// Returns the number of bytes consumed together with the parsed value.
/// Dictionary keys must be strictly increasing in raw-byte lexicographic
/// order; out-of-order or repeated keys are rejected, so every accepted
/// input re-encodes to the exact bytes it was decoded from.
pub fn decode(input: &[u8]) -> Result<(usize, BValue), BencodeError> {
    let mut pos = 0;
    let value = decode_value(input, &mut pos)?;
    Ok((pos, value))
}

/// Decodes a value that must span the entire input, as a torrent file or a
/// tracker response body does.
pub fn decode_all(input: &[u8]) -> Result<BValue, BencodeError> {
    let (consumed, value) = decode(input)?;
    if consumed != input.len() {
        return Err(BencodeError::TrailingData(consumed));
    }
    Ok(value)
}

fn decode_value(input: &[u8], pos: &mut usize) -> Result<BValue, BencodeError> {
    match input.get(*pos) {
        None => Err(BencodeError::Truncated),
        Some(b'i') => decode_integer(input, pos),
        Some(b'l') => decode_list(input, pos),
        Some(b'd') => decode_dict(input, pos),
        Some(b) if b.is_ascii_digit() => decode_string(input, pos).map(BValue::ByteString),
        Some(_) => Err(BencodeError::UnexpectedByte(*pos)),
    }
}

fn decode_integer(input: &[u8], pos: &mut usize) -> Result<BValue, BencodeError> {
    let start = *pos;
    *pos += 1;
    let digits_start = *pos;
    while let Some(&b) = input.get(*pos) {
        if b == b'e' {
            let parsed = parse_integer(&input[digits_start..*pos])
                .ok_or(BencodeError::BadInteger(start))?;
            *pos += 1;
            return Ok(BValue::Integer(parsed));
        }
        *pos += 1;
    }
    Err(BencodeError::Truncated)
}

/// Canonical integer text: optional `-`, no `-0`, no redundant leading zeros.
fn parse_integer(digits: &[u8]) -> Option<i64> {
    let text = std::str::from_utf8(digits).ok()?;
    let magnitude = text.strip_prefix('-').unwrap_or(text);
    if magnitude.is_empty() {
        return None;
    }
    if magnitude.starts_with('0') && (magnitude.len() > 1 || text.starts_with('-')) {
        return None;
    }
    text.parse().ok()
}

fn decode_string(input: &[u8], pos: &mut usize) -> Result<Vec<u8>, BencodeError> {
    let len_start = *pos;
    while input.get(*pos).is_some_and(|b| b.is_ascii_digit()) {
        *pos += 1;
    }
    match input.get(*pos) {
        None => return Err(BencodeError::Truncated),
        Some(b':') => {}
        Some(_) => return Err(BencodeError::BadLength(len_start)),
    }
    let len: usize = std::str::from_utf8(&input[len_start..*pos])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(BencodeError::BadLength(len_start))?;
    *pos += 1;

    let end = pos
        .checked_add(len)
        .ok_or(BencodeError::BadLength(len_start))?;
    if end > input.len() {
        return Err(BencodeError::Truncated);
    }
    let bytes = input[*pos..end].to_vec();
    *pos = end;
    Ok(bytes)
}

fn decode_list(input: &[u8], pos: &mut usize) -> Result<BValue, BencodeError> {
    *pos += 1;
    let mut items = Vec::new();
    loop {
        match input.get(*pos) {
            None => return Err(BencodeError::Truncated),
            Some(b'e') => {
                *pos += 1;
                return Ok(BValue::List(items));
            }
            Some(_) => items.push(decode_value(input, pos)?),
        }
    }
}

fn decode_dict(input: &[u8], pos: &mut usize) -> Result<BValue, BencodeError> {
    *pos += 1;
    let mut entries: BTreeMap<Vec<u8>, BValue> = BTreeMap::new();
    loop {
        match input.get(*pos) {
            None => return Err(BencodeError::Truncated),
            Some(b'e') => {
                *pos += 1;
                return Ok(BValue::Dict(entries));
            }
            Some(b) if b.is_ascii_digit() => {
                let key_pos = *pos;
                let key = decode_string(input, pos)?;
                // Keys strictly increase, so the last entry is the maximum.
                if let Some((prev, _)) = entries.last_key_value() {
                    match key.as_slice().cmp(prev.as_slice()) {
                        Ordering::Greater => {}
                        Ordering::Equal => return Err(BencodeError::DuplicateKey(key_pos)),
                        Ordering::Less => {
                            return Err(BencodeError::NonLexicographicKeys(key_pos))
                        }
                    }
                }
                let value = decode_value(input, pos)?;
                entries.insert(key, value);
            }
            Some(_) => return Err(BencodeError::UnexpectedByte(*pos)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::encode::encode;
    use super::*;

    #[test]
    fn decodes_integer() {
        let (consumed, value) = decode(b"i42e").unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(value, BValue::Integer(42));
    }

    #[test]
    fn decodes_negative_integer() {
        let (_, value) = decode(b"i-13e").unwrap();
        assert_eq!(value, BValue::Integer(-13));
    }

    #[test]
    fn decodes_zero() {
        let (_, value) = decode(b"i0e").unwrap();
        assert_eq!(value, BValue::Integer(0));
    }

    #[test]
    fn rejects_negative_zero() {
        assert_eq!(decode(b"i-0e"), Err(BencodeError::BadInteger(0)));
    }

    #[test]
    fn rejects_leading_zeros() {
        assert_eq!(decode(b"i0123e"), Err(BencodeError::BadInteger(0)));
        assert_eq!(decode(b"i-01e"), Err(BencodeError::BadInteger(0)));
    }

    #[test]
    fn rejects_empty_and_non_numeric_integers() {
        assert_eq!(decode(b"ie"), Err(BencodeError::BadInteger(0)));
        assert_eq!(decode(b"i4x2e"), Err(BencodeError::BadInteger(0)));
    }

    #[test]
    fn decodes_string() {
        let (consumed, value) = decode(b"5:hello").unwrap();
        assert_eq!(consumed, 7);
        assert_eq!(value, BValue::string("hello"));
    }

    #[test]
    fn decodes_empty_string() {
        let (consumed, value) = decode(b"0:").unwrap();
        assert_eq!(consumed, 2);
        assert_eq!(value, BValue::ByteString(Vec::new()));
    }

    #[test]
    fn decodes_list() {
        let (consumed, value) = decode(b"l4:spami42ee").unwrap();
        assert_eq!(consumed, 12);
        assert_eq!(
            value,
            BValue::List(vec![BValue::string("spam"), BValue::Integer(42)])
        );
    }

    #[test]
    fn decodes_nested_list() {
        let (_, value) = decode(b"l4:spaml3:eggi3eee").unwrap();
        assert_eq!(
            value,
            BValue::List(vec![
                BValue::string("spam"),
                BValue::List(vec![BValue::string("egg"), BValue::Integer(3)]),
            ])
        );
    }

    #[test]
    fn decodes_dict() {
        let (_, value) = decode(b"d3:cow3:moo4:spam4:eggse").unwrap();
        assert_eq!(value.get(b"cow"), Some(&BValue::string("moo")));
        assert_eq!(value.get(b"spam"), Some(&BValue::string("eggs")));
        assert_eq!(value.as_dict().unwrap().len(), 2);
    }

    #[test]
    fn decodes_empty_dict() {
        let (_, value) = decode(b"de").unwrap();
        assert_eq!(value, BValue::Dict(BTreeMap::new()));
    }

    #[test]
    fn rejects_out_of_order_keys() {
        assert_eq!(
            decode(b"d2:bai1e1:ai2ee"),
            Err(BencodeError::NonLexicographicKeys(8))
        );
        assert!(decode(b"d1:ai1e1:bi2ee").is_ok());
    }

    #[test]
    fn rejects_duplicate_keys() {
        assert_eq!(
            decode(b"d1:ai1e1:ai2ee"),
            Err(BencodeError::DuplicateKey(7))
        );
    }

    #[test]
    fn rejects_non_string_dict_key() {
        assert_eq!(decode(b"di42e4:spame"), Err(BencodeError::UnexpectedByte(1)));
    }

    #[test]
    fn rejects_stray_leading_byte() {
        assert_eq!(decode(b"x42e"), Err(BencodeError::UnexpectedByte(0)));
    }

    #[test]
    fn rejects_bad_string_length() {
        assert_eq!(decode(b"4x:abcd"), Err(BencodeError::BadLength(0)));
    }

    #[test]
    fn every_proper_prefix_fails() {
        let full = b"d3:fool4:spami1ee5:jelly4:\xff\x00\x01\x02e";
        assert!(decode(full).is_ok());
        for cut in 0..full.len() {
            let result = decode(&full[..cut]);
            assert!(
                matches!(
                    result,
                    Err(BencodeError::Truncated) | Err(BencodeError::BadInteger(_))
                ),
                "prefix of {cut} bytes gave {result:?}"
            );
        }
    }

    #[test]
    fn decode_all_rejects_trailing_bytes() {
        assert_eq!(decode_all(b"i42eextra"), Err(BencodeError::TrailingData(4)));
        assert_eq!(decode_all(b"de de"), Err(BencodeError::TrailingData(2)));
        assert!(decode_all(b"i42e").is_ok());
    }

    #[test]
    fn canonical_input_round_trips_to_identical_bytes() {
        let inputs: [&[u8]; 5] = [
            b"d3:cow3:moo4:spam4:eggse",
            b"l4:spaml3:eggi3eee",
            b"d1:ali-7ee1:c2:dee",
            b"i-987654321e",
            b"4:\x00\xff\x10\x7f",
        ];
        for input in inputs {
            let value = decode_all(input).unwrap();
            assert_eq!(encode(&value), input, "input {input:?}");
        }
    }
}
