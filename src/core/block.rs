use crate::core::transaction::MIN_TX_SIZE;
use crate::core::{Transaction, TxHash};
use crate::error::{ClientError, Result};
use crate::utils::{sha256_digest, WireReader, WireWriter};
use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};

pub const BLOCK_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    version: u32,
    parent: TxHash,
    timestamp: u64,
    transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(parent: TxHash, timestamp: u64, transactions: Vec<Transaction>) -> Block {
        Block {
            version: BLOCK_VERSION,
            parent,
            timestamp,
            transactions,
        }
    }

    pub fn get_version(&self) -> u32 {
        self.version
    }

    pub fn get_parent(&self) -> &TxHash {
        &self.parent
    }

    pub fn get_timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn render(&self) -> Vec<u8> {
        let mut writer = WireWriter::new();
        writer.write_u32(self.version);
        writer.write_hash(self.parent.as_bytes());
        writer.write_u64(self.timestamp);
        writer.write_var_int(self.transactions.len() as u64);
        for tx in &self.transactions {
            tx.render_into(&mut writer);
        }
        writer.into_bytes()
    }

    pub fn parse(bytes: &[u8]) -> Result<Block> {
        let mut reader = WireReader::new(bytes);
        let version = reader.read_u32("block version")?;
        if version != BLOCK_VERSION {
            return Err(ClientError::decode(format!(
                "Unsupported block version {version}, expected {BLOCK_VERSION}"
            )));
        }
        let parent = TxHash::new(reader.read_hash("block parent")?);
        let timestamp = reader.read_u64("block timestamp")?;

        let tx_count = reader.read_count("block transaction count", MIN_TX_SIZE)?;
        let mut transactions = Vec::with_capacity(tx_count);
        for _ in 0..tx_count {
            transactions.push(Transaction::parse_from(&mut reader)?);
        }
        reader.finish("block")?;

        Ok(Block {
            version,
            parent,
            timestamp,
            transactions,
        })
    }

    pub fn from_hex(hex: &str) -> Result<Block> {
        let bytes = HEXLOWER_PERMISSIVE
            .decode(hex.as_bytes())
            .map_err(|e| ClientError::decode(format!("Invalid block hex: {e}")))?;
        Self::parse(&bytes)
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.render())
    }

    pub fn hash(&self) -> TxHash {
        TxHash::new(sha256_digest(&self.render()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Script, TXInput, TXOutput};
    use num_bigint::BigUint;

    fn sample_block() -> Block {
        let coinbase = Transaction::new(
            vec![],
            vec![TXOutput::new(
                BigUint::from(50u32),
                Script::compile(&["OP_CHECKSIG"]).unwrap(),
            )],
        );
        let spend = Transaction::new(
            vec![TXInput::new(coinbase.hash(), 0, Script::compile(&["0102"]).unwrap())],
            vec![TXOutput::new(BigUint::from(49u32), Script::default())],
        );
        Block::new(TxHash::new([1u8; 32]), 1_700_000_000, vec![coinbase, spend])
    }

    #[test]
    fn test_block_round_trip() {
        let block = sample_block();
        let parsed = Block::parse(&block.render()).unwrap();
        assert_eq!(parsed, block);
        assert_eq!(parsed.hash(), block.hash());
        assert_eq!(parsed.get_transactions().len(), 2);
    }

    #[test]
    fn test_block_rejects_truncated_transaction() {
        let bytes = sample_block().render();
        assert!(Block::parse(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn test_block_rejects_trailing_bytes() {
        let mut bytes = sample_block().render();
        bytes.extend_from_slice(&[0, 0]);
        assert!(Block::parse(&bytes).is_err());
    }

    #[test]
    fn test_block_hex_round_trip() {
        let block = sample_block();
        assert_eq!(Block::from_hex(&block.to_hex()).unwrap(), block);
        assert!(Block::from_hex("not hex").is_err());
    }
}
