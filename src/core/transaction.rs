// Transactions as the service sees them: an ordered list of inputs spending
// earlier outputs and an ordered list of new outputs. The canonical binary
// rendering defined here is what gets hashed and submitted.

use crate::core::Script;
use crate::error::{ClientError, Result};
use crate::utils::{sha256_digest, WireReader, WireWriter, HASH_LEN};
use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use num_bigint::BigUint;
use std::fmt;
use std::str::FromStr;

/// The only transaction format version the codec understands
pub const TX_VERSION: u32 = 1;

// prev hash + index + empty script length
const MIN_INPUT_SIZE: usize = HASH_LEN + 4 + 1;
// empty value length + empty script length
const MIN_OUTPUT_SIZE: usize = 2;
pub(crate) const MIN_TX_SIZE: usize = 4 + 1 + 1;

/// Content hash of an entity, also used as its URL path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxHash([u8; HASH_LEN]);

impl TxHash {
    pub fn new(bytes: [u8; HASH_LEN]) -> TxHash {
        TxHash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.0)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for TxHash {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != HASH_LEN * 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ClientError::decode(format!(
                "Hash must be {} hex digits, got {s:?}",
                HASH_LEN * 2
            )));
        }
        let bytes = HEXLOWER_PERMISSIVE
            .decode(s.as_bytes())
            .map_err(|e| ClientError::decode(format!("Invalid hash hex: {e}")))?;
        let mut hash = [0u8; HASH_LEN];
        hash.copy_from_slice(&bytes);
        Ok(TxHash(hash))
    }
}

// An input points at output `index` of the transaction with hash `hash`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TXInput {
    hash: TxHash,
    index: u32,
    script: Script,
}

impl TXInput {
    pub fn new(hash: TxHash, index: u32, script: Script) -> TXInput {
        TXInput {
            hash,
            index,
            script,
        }
    }

    pub fn get_hash(&self) -> &TxHash {
        &self.hash
    }

    pub fn get_index(&self) -> u32 {
        self.index
    }

    pub fn get_script(&self) -> &Script {
        &self.script
    }
}

// An output locks `value` behind `script`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TXOutput {
    value: BigUint,
    script: Script,
}

impl TXOutput {
    pub fn new(value: BigUint, script: Script) -> TXOutput {
        TXOutput { value, script }
    }

    pub fn get_value(&self) -> &BigUint {
        &self.value
    }

    pub fn get_script(&self) -> &Script {
        &self.script
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    version: u32,
    inputs: Vec<TXInput>,
    outputs: Vec<TXOutput>,
}

impl Transaction {
    pub fn new(inputs: Vec<TXInput>, outputs: Vec<TXOutput>) -> Transaction {
        Transaction {
            version: TX_VERSION,
            inputs,
            outputs,
        }
    }

    /// Hand-assembled transaction with an explicit version. Only
    /// `TX_VERSION` renders to something the service accepts.
    pub fn with_version(version: u32, inputs: Vec<TXInput>, outputs: Vec<TXOutput>) -> Transaction {
        Transaction {
            version,
            inputs,
            outputs,
        }
    }

    pub fn get_version(&self) -> u32 {
        self.version
    }

    pub fn get_inputs(&self) -> &[TXInput] {
        self.inputs.as_slice()
    }

    pub fn get_outputs(&self) -> &[TXOutput] {
        self.outputs.as_slice()
    }

    /// Rejects a transaction whose version the codec does not declare.
    pub fn check_version(&self) -> Result<()> {
        if self.version != TX_VERSION {
            return Err(ClientError::validation(
                "version",
                format!("expected {TX_VERSION}, got {}", self.version),
            ));
        }
        Ok(())
    }

    /// Canonical wire encoding
    pub fn render(&self) -> Vec<u8> {
        let mut writer = WireWriter::new();
        self.render_into(&mut writer);
        writer.into_bytes()
    }

    pub(crate) fn render_into(&self, writer: &mut WireWriter) {
        writer.write_u32(self.version);

        writer.write_var_int(self.inputs.len() as u64);
        for input in &self.inputs {
            writer.write_hash(input.hash.as_bytes());
            writer.write_u32(input.index);
            writer.write_bytes(&input.script.to_bytes());
        }

        writer.write_var_int(self.outputs.len() as u64);
        for output in &self.outputs {
            writer.write_bytes(&encode_value(&output.value));
            writer.write_bytes(&output.script.to_bytes());
        }
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.render())
    }

    /// Exact inverse of `render`. The whole buffer must be consumed.
    pub fn parse(bytes: &[u8]) -> Result<Transaction> {
        let mut reader = WireReader::new(bytes);
        let tx = Self::parse_from(&mut reader)?;
        reader.finish("transaction")?;
        Ok(tx)
    }

    pub fn from_hex(hex: &str) -> Result<Transaction> {
        let bytes = HEXLOWER_PERMISSIVE
            .decode(hex.as_bytes())
            .map_err(|e| ClientError::decode(format!("Invalid transaction hex: {e}")))?;
        Self::parse(&bytes)
    }

    pub(crate) fn parse_from(reader: &mut WireReader<'_>) -> Result<Transaction> {
        let version = reader.read_u32("transaction version")?;
        if version != TX_VERSION {
            return Err(ClientError::decode(format!(
                "Unsupported transaction version {version}, expected {TX_VERSION}"
            )));
        }

        let input_count = reader.read_count("input count", MIN_INPUT_SIZE)?;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            let hash = TxHash(reader.read_hash("input hash")?);
            let index = reader.read_u32("input index")?;
            let script = Script::from_bytes(reader.read_bytes("input script")?)?;
            inputs.push(TXInput {
                hash,
                index,
                script,
            });
        }

        let output_count = reader.read_count("output count", MIN_OUTPUT_SIZE)?;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            let value = decode_value(reader.read_bytes("output value")?)?;
            let script = Script::from_bytes(reader.read_bytes("output script")?)?;
            outputs.push(TXOutput { value, script });
        }

        Ok(Transaction {
            version,
            inputs,
            outputs,
        })
    }

    /// SHA-256 of the canonical rendering
    pub fn hash(&self) -> TxHash {
        TxHash(sha256_digest(&self.render()))
    }
}

// Big-endian magnitude without leading zero bytes; zero is the empty string.
fn encode_value(value: &BigUint) -> Vec<u8> {
    if value.bits() == 0 {
        return Vec::new();
    }
    value.to_bytes_be()
}

fn decode_value(bytes: &[u8]) -> Result<BigUint> {
    if bytes.first() == Some(&0) {
        return Err(ClientError::decode("Output value has a leading zero byte"));
    }
    Ok(BigUint::from_bytes_be(bytes))
}
