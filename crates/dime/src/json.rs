//! Conversion between JSON (command-line input and output) and [`Value`].

use dime_value::{ArrayData, NumericArray, Value};
use serde_json::{json, Map, Value as Json};

use crate::exit::{CliError, CliResult};

/// Parse a `name=<json>` assignment.
pub fn parse_assignment(input: &str) -> CliResult<(String, Value)> {
    let (name, raw) = input
        .split_once('=')
        .ok_or_else(|| CliError::usage(format!("expected <name>=<json>, got '{input}'")))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::usage(format!("variable name is empty in '{input}'")));
    }
    let parsed: Json = serde_json::from_str(raw)
        .map_err(|err| CliError::usage(format!("value of '{name}' is not valid JSON: {err}")))?;
    Ok((name.to_string(), from_json(parsed)))
}

/// Integers that fit `i64` become `I64`; every other number becomes `F64`.
pub fn from_json(value: Json) -> Value {
    match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::I64(i),
            None => Value::F64(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::Text(s),
        Json::Array(items) => Value::List(items.into_iter().map(from_json).collect()),
        Json::Object(fields) => Value::Map(
            fields
                .into_iter()
                .map(|(k, v)| (Value::Text(k), from_json(v)))
                .collect(),
        ),
    }
}

pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => json!(b),
        Value::I8(n) => json!(n),
        Value::I16(n) => json!(n),
        Value::I32(n) => json!(n),
        Value::I64(n) => json!(n),
        Value::U8(n) => json!(n),
        Value::U16(n) => json!(n),
        Value::U32(n) => json!(n),
        Value::U64(n) => json!(n),
        Value::F32(n) => json!(n),
        Value::F64(n) => json!(n),
        Value::Complex64(c) => json!({"re": c.re, "im": c.im}),
        Value::Complex128(c) => json!({"re": c.re, "im": c.im}),
        Value::Array(array) => array_to_json(array),
        Value::Text(s) => json!(s),
        Value::List(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(pairs) => {
            let mut out = Map::with_capacity(pairs.len());
            for (key, value) in pairs {
                let key = match key {
                    Value::Text(s) => s.clone(),
                    other => to_json(other).to_string(),
                };
                out.insert(key, to_json(value));
            }
            Json::Object(out)
        }
    }
}

fn array_to_json(array: &NumericArray) -> Json {
    let scalars: Vec<Json> = match array.data() {
        ArrayData::I8(buf) => buf.iter().map(|x| json!(x)).collect(),
        ArrayData::I16(buf) => buf.iter().map(|x| json!(x)).collect(),
        ArrayData::I32(buf) => buf.iter().map(|x| json!(x)).collect(),
        ArrayData::I64(buf) => buf.iter().map(|x| json!(x)).collect(),
        ArrayData::U8(buf) => buf.iter().map(|x| json!(x)).collect(),
        ArrayData::U16(buf) => buf.iter().map(|x| json!(x)).collect(),
        ArrayData::U32(buf) => buf.iter().map(|x| json!(x)).collect(),
        ArrayData::U64(buf) => buf.iter().map(|x| json!(x)).collect(),
        ArrayData::F32(buf) => buf.iter().map(|x| json!(x)).collect(),
        ArrayData::F64(buf) => buf.iter().map(|x| json!(x)).collect(),
    };
    let data = if array.is_complex() {
        scalars
            .chunks_exact(2)
            .map(|pair| json!({"re": pair[0], "im": pair[1]}))
            .collect()
    } else {
        scalars
    };
    json!({
        "dtype": array.dtype().name(),
        "order": array.order().as_str(),
        "shape": array.shape(),
        "data": data,
    })
}

/// One-line rendering used by the table output.
pub fn summary(value: &Value) -> String {
    match value {
        Value::Array(array) => {
            let dims: Vec<String> = array.shape().iter().map(usize::to_string).collect();
            format!("{} [{}] {}", array.dtype(), dims.join("x"), array.order().as_str())
        }
        Value::Text(s) => s.clone(),
        other => to_json(other).to_string(),
    }
}
