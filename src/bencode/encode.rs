use serde_json::{json, Value};

use super::bvalue::BValue;

/// Serializes a value into its canonical bencoding.
///
/// Dictionary entries come out in lexicographic key order (the map already
/// stores them that way) and integers carry no redundant sign or zeros, so
/// encoding the result of a decode reproduces the original bytes.
pub fn encode(value: &BValue) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &BValue, out: &mut Vec<u8>) {
    match value {
        BValue::Integer(i) => {
            out.push(b'i');
            out.extend_from_slice(i.to_string().as_bytes());
            out.push(b'e');
        }
        BValue::ByteString(bytes) => {
            out.extend_from_slice(bytes.len().to_string().as_bytes());
            out.push(b':');
            out.extend_from_slice(bytes);
        }
        BValue::List(items) => {
            out.push(b'l');
            for item in items {
                encode_into(item, out);
            }
            out.push(b'e');
        }
        BValue::Dict(entries) => {
            out.push(b'd');
            for (key, val) in entries {
                out.extend_from_slice(key.len().to_string().as_bytes());
                out.push(b':');
                out.extend_from_slice(key);
                encode_into(val, out);
            }
            out.push(b'e');
        }
    }
}

/// Projects a value into JSON for the `decode` command.
///
/// Byte strings become JSON strings, lossily where they are not UTF-8.
pub fn to_json(value: &BValue) -> Value {
    match value {
        BValue::Integer(i) => json!(i),
        BValue::ByteString(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        BValue::List(items) => Value::Array(items.iter().map(to_json).collect()),
        BValue::Dict(entries) => {
            let mut object = serde_json::Map::new();
            for (key, val) in entries {
                object.insert(String::from_utf8_lossy(key).into_owned(), to_json(val));
            }
            Value::Object(object)
        }
    }
}
