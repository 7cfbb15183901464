// Scripts are stored compiled: a flat run of opcodes and data pushes.
// The textual form is an array of tokens, one instruction per token.

use crate::error::{ClientError, Result};
use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;

/// Largest push that fits a single length byte
const MAX_DIRECT_PUSH: usize = 0x4b;
const MAX_PUSH: usize = u16::MAX as usize;

const OPCODES: &[(&str, u8)] = &[
    ("OP_0", OP_0),
    ("OP_1", 0x51),
    ("OP_2", 0x52),
    ("OP_3", 0x53),
    ("OP_4", 0x54),
    ("OP_5", 0x55),
    ("OP_6", 0x56),
    ("OP_7", 0x57),
    ("OP_8", 0x58),
    ("OP_9", 0x59),
    ("OP_10", 0x5a),
    ("OP_11", 0x5b),
    ("OP_12", 0x5c),
    ("OP_13", 0x5d),
    ("OP_14", 0x5e),
    ("OP_15", 0x5f),
    ("OP_16", 0x60),
    ("OP_NOP", 0x61),
    ("OP_VERIFY", 0x69),
    ("OP_RETURN", 0x6a),
    ("OP_DROP", 0x75),
    ("OP_DUP", 0x76),
    ("OP_SWAP", 0x7c),
    ("OP_EQUAL", 0x87),
    ("OP_EQUALVERIFY", 0x88),
    ("OP_ADD", 0x93),
    ("OP_SUB", 0x94),
    ("OP_SHA256", 0xa8),
    ("OP_HASH256", 0xaa),
    ("OP_CHECKSIG", 0xac),
    ("OP_CHECKSIGVERIFY", 0xad),
    ("OP_CHECKMULTISIG", 0xae),
];

static BY_NAME: Lazy<HashMap<&'static str, u8>> =
    Lazy::new(|| OPCODES.iter().copied().collect());

static BY_CODE: Lazy<HashMap<u8, &'static str>> =
    Lazy::new(|| OPCODES.iter().map(|&(name, code)| (code, name)).collect());

/// A single compiled instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Op(u8),
    Push(Vec<u8>),
}

impl Instruction {
    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Instruction::Op(code) => out.push(*code),
            Instruction::Push(data) => {
                let len = data.len();
                if len <= MAX_DIRECT_PUSH {
                    out.push(len as u8);
                } else if len <= u8::MAX as usize {
                    out.push(OP_PUSHDATA1);
                    out.push(len as u8);
                } else {
                    out.push(OP_PUSHDATA2);
                    out.extend_from_slice(&(len as u16).to_le_bytes());
                }
                out.extend_from_slice(data);
            }
        }
    }

    fn to_token(&self) -> String {
        match self {
            Instruction::Op(code) => BY_CODE
                .get(code)
                .map(|name| name.to_string())
                .unwrap_or_else(|| format!("OP_UNKNOWN_{code:02x}")),
            Instruction::Push(data) => HEXLOWER.encode(data),
        }
    }
}

/// Compiled script carried by inputs (unlocking) and outputs (locking)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    instructions: Vec<Instruction>,
}

impl Script {
    /// Hand-assembled script. Only instructions the byte encoding can carry
    /// one-to-one are accepted; an empty push becomes `OP_0`.
    pub fn new(instructions: Vec<Instruction>) -> Result<Script> {
        let instructions = instructions
            .into_iter()
            .enumerate()
            .map(|(position, instruction)| check_instruction(position, instruction))
            .collect::<Result<Vec<_>>>()?;
        Ok(Script { instructions })
    }

    /// Compiles a token array. Token `i` becomes instruction `i`.
    pub fn compile<S: AsRef<str>>(tokens: &[S]) -> Result<Script> {
        Self::compile_at("script", tokens)
    }

    /// Like `compile`, with errors reporting `field` as the script's location.
    pub fn compile_at<S: AsRef<str>>(field: &str, tokens: &[S]) -> Result<Script> {
        let instructions = tokens
            .iter()
            .enumerate()
            .map(|(position, token)| compile_token(field, position, token.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Script { instructions })
    }

    /// Token form of the script; `compile` of the result gives back `self`.
    pub fn decompile(&self) -> Vec<String> {
        self.instructions.iter().map(Instruction::to_token).collect()
    }

    pub fn instructions(&self) -> &[Instruction] {
        self.instructions.as_slice()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for instruction in &self.instructions {
            instruction.encode_into(&mut out);
        }
        out
    }

    /// Decodes compiled bytes. Truncated pushes, non-minimal pushes and
    /// unassigned opcodes are rejected so the encoding stays one-to-one.
    pub fn from_bytes(bytes: &[u8]) -> Result<Script> {
        let mut instructions = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let code = bytes[pos];
            pos += 1;
            let len = match code {
                0x01..=0x4b => code as usize,
                OP_PUSHDATA1 => {
                    let len = *bytes
                        .get(pos)
                        .ok_or_else(|| ClientError::decode("Truncated OP_PUSHDATA1 length"))?
                        as usize;
                    pos += 1;
                    if len <= MAX_DIRECT_PUSH {
                        return Err(ClientError::decode("Non-minimal OP_PUSHDATA1 push"));
                    }
                    len
                }
                OP_PUSHDATA2 => {
                    let raw = bytes
                        .get(pos..pos + 2)
                        .ok_or_else(|| ClientError::decode("Truncated OP_PUSHDATA2 length"))?;
                    pos += 2;
                    let len = u16::from_le_bytes([raw[0], raw[1]]) as usize;
                    if len <= u8::MAX as usize {
                        return Err(ClientError::decode("Non-minimal OP_PUSHDATA2 push"));
                    }
                    len
                }
                _ => {
                    if !BY_CODE.contains_key(&code) {
                        return Err(ClientError::decode(format!(
                            "Unassigned opcode 0x{code:02x} at byte {}",
                            pos - 1
                        )));
                    }
                    instructions.push(Instruction::Op(code));
                    continue;
                }
            };
            let data = bytes.get(pos..pos + len).ok_or_else(|| {
                ClientError::decode(format!("Push of {len} bytes runs past end of script"))
            })?;
            pos += len;
            instructions.push(Instruction::Push(data.to_vec()));
        }
        Ok(Script { instructions })
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.decompile().join(" "))
    }
}

fn check_instruction(position: usize, instruction: Instruction) -> Result<Instruction> {
    let problem = match &instruction {
        Instruction::Push(data) if data.len() > MAX_PUSH => Some((
            format!("<{}-byte push>", data.len()),
            format!("push exceeds {MAX_PUSH} bytes"),
        )),
        Instruction::Op(code) if !BY_CODE.contains_key(code) => Some((
            format!("0x{code:02x}"),
            "not an assigned opcode".to_string(),
        )),
        _ => None,
    };
    if let Some((token, reason)) = problem {
        return Err(ClientError::Compile {
            field: "script".to_string(),
            position,
            token,
            reason,
        });
    }
    match instruction {
        Instruction::Push(data) if data.is_empty() => Ok(Instruction::Op(OP_0)),
        other => Ok(other),
    }
}

fn compile_token(field: &str, position: usize, token: &str) -> Result<Instruction> {
    let fail = |reason: String| ClientError::Compile {
        field: field.to_string(),
        position,
        token: token.to_string(),
        reason,
    };

    if token.starts_with("OP_") {
        return BY_NAME
            .get(token)
            .map(|&code| Instruction::Op(code))
            .ok_or_else(|| fail("unknown opcode".to_string()));
    }

    let hex = token.strip_prefix("0x").unwrap_or(token);
    if hex.len() % 2 != 0 {
        return Err(fail("hex literal has an odd number of digits".to_string()));
    }
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(fail("literal is neither an opcode nor hex data".to_string()));
    }
    let data = HEXLOWER_PERMISSIVE
        .decode(hex.as_bytes())
        .map_err(|e| fail(format!("invalid hex literal: {e}")))?;
    if data.is_empty() {
        return Ok(Instruction::Op(OP_0));
    }
    if data.len() > MAX_PUSH {
        return Err(fail(format!("push of {} bytes exceeds {MAX_PUSH}", data.len())));
    }
    Ok(Instruction::Push(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_opcodes_and_literals() {
        let script = Script::compile(&["OP_DUP", "OP_HASH256", "deadbeef", "OP_EQUALVERIFY"])
            .unwrap();
        assert_eq!(
            script.instructions(),
            &[
                Instruction::Op(0x76),
                Instruction::Op(0xaa),
                Instruction::Push(vec![0xde, 0xad, 0xbe, 0xef]),
                Instruction::Op(0x88),
            ]
        );
        assert_eq!(script.to_bytes(), vec![0x76, 0xaa, 0x04, 0xde, 0xad, 0xbe, 0xef, 0x88]);
    }

    #[test]
    fn test_prefixed_and_uppercase_hex_accepted() {
        let script = Script::compile(&["0xABCD"]).unwrap();
        assert_eq!(script.instructions(), &[Instruction::Push(vec![0xab, 0xcd])]);
    }

    #[test]
    fn test_empty_literal_is_op_0() {
        let script = Script::compile(&["", "0x"]).unwrap();
        assert_eq!(script.to_bytes(), vec![OP_0, OP_0]);
    }

    #[test]
    fn test_unknown_opcode_reports_position() {
        let err = Script::compile(&["OP_DUP", "OP_FROB"]).unwrap_err();
        match err {
            ClientError::Compile {
                position, token, ..
            } => {
                assert_eq!(position, 1);
                assert_eq!(token, "OP_FROB");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_hex_rejected() {
        assert!(matches!(
            Script::compile(&["abc"]),
            Err(ClientError::Compile { position: 0, .. })
        ));
        assert!(matches!(
            Script::compile(&["OP_1", "zz"]),
            Err(ClientError::Compile { position: 1, .. })
        ));
    }

    #[test]
    fn test_long_pushes_use_pushdata() {
        let medium = "ab".repeat(100);
        let large = "cd".repeat(300);
        let script = Script::compile(&[medium.as_str(), large.as_str()]).unwrap();
        let bytes = script.to_bytes();
        assert_eq!(bytes[0], OP_PUSHDATA1);
        assert_eq!(bytes[1], 100);
        assert_eq!(bytes[102], OP_PUSHDATA2);
        assert_eq!(Script::from_bytes(&bytes).unwrap(), script);
    }

    #[test]
    fn test_oversized_push_rejected() {
        let huge = "00".repeat(MAX_PUSH + 1);
        assert!(Script::compile(&[huge]).is_err());
    }

    #[test]
    fn test_decompile_recompiles_to_same_script() {
        let script = Script::compile(&["OP_2", "0102", "OP_CHECKMULTISIG"]).unwrap();
        let tokens = script.decompile();
        assert_eq!(tokens, vec!["OP_2", "0102", "OP_CHECKMULTISIG"]);
        assert_eq!(Script::compile(&tokens).unwrap(), script);
    }

    #[test]
    fn test_compile_at_reports_field() {
        let err = Script::compile_at("outputs[1].script", &["OP_DUP", "OP_BAD"]).unwrap_err();
        match err {
            ClientError::Compile {
                field, position, ..
            } => {
                assert_eq!(field, "outputs[1].script");
                assert_eq!(position, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_new_rejects_oversized_push() {
        let result = Script::new(vec![Instruction::Push(vec![0xab; 70_000])]);
        assert!(matches!(result, Err(ClientError::Compile { position: 0, .. })));
    }

    #[test]
    fn test_new_rejects_unassigned_and_push_range_opcodes() {
        for code in [0xff, 0x05, OP_PUSHDATA1, OP_PUSHDATA2] {
            assert!(
                Script::new(vec![Instruction::Op(code)]).is_err(),
                "0x{code:02x} should be rejected"
            );
        }
    }

    #[test]
    fn test_new_normalises_empty_push() {
        let script = Script::new(vec![Instruction::Push(vec![]), Instruction::Op(0x76)]).unwrap();
        assert_eq!(script.instructions(), &[Instruction::Op(OP_0), Instruction::Op(0x76)]);
        assert_eq!(Script::from_bytes(&script.to_bytes()).unwrap(), script);
    }

    #[test]
    fn test_new_scripts_survive_byte_round_trip() {
        let script = Script::new(vec![
            Instruction::Push(vec![0x11; 300]),
            Instruction::Push(vec![0x22; MAX_PUSH]),
            Instruction::Op(0xac),
        ])
        .unwrap();
        assert_eq!(Script::from_bytes(&script.to_bytes()).unwrap(), script);
    }

    #[test]
    fn test_from_bytes_rejects_malformed() {
        // push of 3 bytes with only 1 present
        assert!(Script::from_bytes(&[0x03, 0x01]).is_err());
        // unassigned opcode
        assert!(Script::from_bytes(&[0xff]).is_err());
        // PUSHDATA1 used for a short push
        assert!(Script::from_bytes(&[OP_PUSHDATA1, 0x01, 0xaa]).is_err());
    }
}
