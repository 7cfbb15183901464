//! Typed construction of transactions from their structured JSON form
//!
//! ```json
//! {
//!   "version": 1,
//!   "inputs":  [{ "hash": "<64 hex>", "index": 0, "script": ["OP_1"] }],
//!   "outputs": [{ "value": "1000", "script": ["OP_CHECKSIG"] }]
//! }
//! ```
//!
//! The first violation rejects the whole build and names the offending field.

use crate::core::{Script, TXInput, TXOutput, Transaction, TxHash, TX_VERSION};
use crate::error::{ClientError, Result};
use crate::utils::HASH_LEN;
use num_bigint::BigUint;
use serde_json::{json, Map, Value};

const TX_FIELDS: &[&str] = &["version", "inputs", "outputs"];
const INPUT_FIELDS: &[&str] = &["hash", "index", "script"];
const OUTPUT_FIELDS: &[&str] = &["value", "script"];

/// Builds a transaction from raw structured input without touching the network.
pub fn build_transaction(raw: &Value) -> Result<Transaction> {
    let record = expect_record(raw, "transaction", TX_FIELDS, false)?;

    if let Some(version) = record.get("version") {
        if version.as_u64() != Some(TX_VERSION as u64) {
            return Err(ClientError::validation(
                "version",
                format!("expected {TX_VERSION}, got {version}"),
            ));
        }
    }

    let inputs = expect_sequence(record.get("inputs"), "inputs")?
        .iter()
        .enumerate()
        .map(|(i, raw)| build_input(raw, &format!("inputs[{i}]")))
        .collect::<Result<Vec<_>>>()?;

    let outputs = expect_sequence(record.get("outputs"), "outputs")?
        .iter()
        .enumerate()
        .map(|(i, raw)| build_output(raw, &format!("outputs[{i}]")))
        .collect::<Result<Vec<_>>>()?;

    Ok(Transaction::new(inputs, outputs))
}

/// Structured form of a transaction; `build_transaction` accepts it back.
pub fn describe(tx: &Transaction) -> Value {
    let inputs: Vec<Value> = tx
        .get_inputs()
        .iter()
        .map(|input| {
            json!({
                "hash": input.get_hash().to_hex(),
                "index": input.get_index(),
                "script": input.get_script().decompile(),
            })
        })
        .collect();
    let outputs: Vec<Value> = tx
        .get_outputs()
        .iter()
        .map(|output| {
            json!({
                "value": output.get_value().to_str_radix(10),
                "script": output.get_script().decompile(),
            })
        })
        .collect();
    json!({
        "version": tx.get_version(),
        "inputs": inputs,
        "outputs": outputs,
    })
}

fn build_input(raw: &Value, path: &str) -> Result<TXInput> {
    let record = expect_record(raw, path, INPUT_FIELDS, true)?;

    let hash_field = format!("{path}.hash");
    let hash = match record.get("hash") {
        Some(Value::String(hex)) => parse_hash(hex, &hash_field)?,
        _ => return Err(ClientError::validation(hash_field, "must be a hex string")),
    };

    let index_field = format!("{path}.index");
    let index = record
        .get("index")
        .and_then(Value::as_u64)
        .ok_or_else(|| ClientError::validation(&index_field, "must be a non-negative integer"))?;
    let index = u32::try_from(index)
        .map_err(|_| ClientError::validation(&index_field, "exceeds the 32-bit index range"))?;

    let script = compile_field(record.get("script"), &format!("{path}.script"))?;
    Ok(TXInput::new(hash, index, script))
}

fn build_output(raw: &Value, path: &str) -> Result<TXOutput> {
    let record = expect_record(raw, path, OUTPUT_FIELDS, true)?;

    let value_field = format!("{path}.value");
    let value = match record.get("value") {
        Some(Value::String(decimal)) => parse_value(decimal, &value_field)?,
        _ => {
            return Err(ClientError::validation(
                value_field,
                "must be a decimal string",
            ))
        }
    };

    let script = compile_field(record.get("script"), &format!("{path}.script"))?;
    Ok(TXOutput::new(value, script))
}

fn expect_record<'a>(
    raw: &'a Value,
    path: &str,
    fields: &[&str],
    all_required: bool,
) -> Result<&'a Map<String, Value>> {
    let record = raw
        .as_object()
        .ok_or_else(|| ClientError::validation(path, "must be an object"))?;
    if let Some(unknown) = record.keys().find(|k| !fields.contains(&k.as_str())) {
        return Err(ClientError::validation(
            format!("{path}.{unknown}"),
            "unexpected field",
        ));
    }
    if all_required {
        if let Some(missing) = fields.iter().find(|f| !record.contains_key(**f)) {
            return Err(ClientError::validation(
                format!("{path}.{missing}"),
                "required field is missing",
            ));
        }
    }
    Ok(record)
}

// Absent sequences are empty; present ones must be arrays.
fn expect_sequence<'a>(raw: Option<&'a Value>, field: &str) -> Result<&'a [Value]> {
    match raw {
        None => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(ClientError::validation(field, "must be an array")),
    }
}

fn parse_hash(hex: &str, field: &str) -> Result<TxHash> {
    hex.parse::<TxHash>().map_err(|_| {
        ClientError::validation(field, format!("must be {} hex digits", HASH_LEN * 2))
    })
}

fn parse_value(decimal: &str, field: &str) -> Result<BigUint> {
    if decimal.is_empty() || !decimal.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ClientError::validation(
            field,
            format!("{decimal:?} is not a non-negative base-10 integer"),
        ));
    }
    BigUint::parse_bytes(decimal.as_bytes(), 10)
        .ok_or_else(|| ClientError::validation(field, "unparseable integer"))
}

fn compile_field(raw: Option<&Value>, field: &str) -> Result<Script> {
    let items = match raw {
        Some(Value::Array(items)) => items,
        _ => return Err(ClientError::validation(field, "must be an array of tokens")),
    };
    let tokens = items
        .iter()
        .enumerate()
        .map(|(i, token)| {
            token.as_str().ok_or_else(|| {
                ClientError::validation(format!("{field}[{i}]"), "token must be a string")
            })
        })
        .collect::<Result<Vec<&str>>>()?;
    Script::compile_at(field, &tokens)
}
