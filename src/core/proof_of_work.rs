use crate::error::{ClientError, Result};
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use log::{debug, info};
use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::ops::ShlAssign;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Random prefix followed by a little-endian attempt counter
pub const NONCE_LEN: usize = 16;
const PREFIX_LEN: usize = 8;

pub const MAX_COMPLEXITY: u32 = 256;

/// Finds a nonce for a service-chosen complexity. Blocking; the caller must
/// not assume an upper bound on how long it takes.
pub trait Solver: Send + Sync {
    fn solve(&self, complexity: u32) -> Result<Vec<u8>>;
}

/// Hash puzzle: `sha256(nonce)` read as a big-endian integer must be below
/// `2^(256 - complexity)`.
pub struct ProofOfWork {
    rng: Mutex<StdRng>,
    cancelled: Arc<AtomicBool>,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofOfWork {
    pub fn new() -> ProofOfWork {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Same seed, same sequence of nonces.
    pub fn with_seed(seed: u64) -> ProofOfWork {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> ProofOfWork {
        ProofOfWork {
            rng: Mutex::new(rng),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the returned flag makes any running `solve` give up.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    fn target(complexity: u32) -> Result<BigUint> {
        if complexity > MAX_COMPLEXITY {
            return Err(ClientError::Solver(format!(
                "Complexity {complexity} exceeds {MAX_COMPLEXITY}"
            )));
        }
        let mut target = BigUint::from(1u32);
        target.shl_assign(MAX_COMPLEXITY - complexity);
        Ok(target)
    }

    /// Checks a nonce against the puzzle at `complexity`.
    pub fn verify(complexity: u32, nonce: &[u8]) -> bool {
        match Self::target(complexity) {
            Ok(target) => Self::meets(&target, nonce),
            Err(_) => false,
        }
    }

    fn meets(target: &BigUint, nonce: &[u8]) -> bool {
        let hash = sha256_digest(nonce);
        BigUint::from_bytes_be(&hash) < *target
    }

    fn next_prefix(&self) -> Result<[u8; PREFIX_LEN]> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| ClientError::Solver("Solver RNG lock poisoned".to_string()))?;
        let mut prefix = [0u8; PREFIX_LEN];
        rng.fill_bytes(&mut prefix);
        Ok(prefix)
    }
}

impl Solver for ProofOfWork {
    fn solve(&self, complexity: u32) -> Result<Vec<u8>> {
        let target = Self::target(complexity)?;
        let started = Instant::now();
        let mut attempts: u64 = 0;

        loop {
            let mut nonce = [0u8; NONCE_LEN];
            nonce[..PREFIX_LEN].copy_from_slice(&self.next_prefix()?);

            for counter in 0..=u64::MAX {
                if self.cancelled.load(Ordering::Relaxed) {
                    return Err(ClientError::Cancelled { attempts });
                }
                nonce[PREFIX_LEN..].copy_from_slice(&counter.to_le_bytes());
                attempts += 1;

                if Self::meets(&target, &nonce) {
                    info!(
                        "Solved complexity {complexity} in {attempts} attempts ({:?})",
                        started.elapsed()
                    );
                    debug!("Nonce: {}", HEXLOWER.encode(&nonce));
                    return Ok(nonce.to_vec());
                }
            }
            // Counter space exhausted for this prefix, draw another
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solution_satisfies_puzzle() {
        let pow = ProofOfWork::with_seed(7);
        let nonce = pow.solve(8).unwrap();
        assert_eq!(nonce.len(), NONCE_LEN);
        assert!(ProofOfWork::verify(8, &nonce));
    }

    #[test]
    fn test_seeded_solver_is_deterministic() {
        let a = ProofOfWork::with_seed(42).solve(6).unwrap();
        let b = ProofOfWork::with_seed(42).solve(6).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_complexity_zero_accepts_anything() {
        assert!(ProofOfWork::verify(0, b"anything"));
        let nonce = ProofOfWork::with_seed(1).solve(0).unwrap();
        assert_eq!(&nonce[PREFIX_LEN..], &0u64.to_le_bytes());
    }

    #[test]
    fn test_higher_complexity_has_smaller_target() {
        let easy = ProofOfWork::target(1).unwrap();
        let hard = ProofOfWork::target(2).unwrap();
        assert!(hard < easy);
    }

    #[test]
    fn test_complexity_out_of_range() {
        let pow = ProofOfWork::with_seed(3);
        assert!(matches!(pow.solve(257), Err(ClientError::Solver(_))));
        assert!(!ProofOfWork::verify(300, &[0u8; NONCE_LEN]));
    }

    #[test]
    fn test_cancelled_solver_gives_up() {
        let pow = ProofOfWork::with_seed(5);
        pow.cancel_handle().store(true, Ordering::Relaxed);
        assert_eq!(
            pow.solve(MAX_COMPLEXITY),
            Err(ClientError::Cancelled { attempts: 0 })
        );
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let pow = Arc::new(ProofOfWork::with_seed(9));
        let flag = pow.cancel_handle();
        let worker = {
            let pow = Arc::clone(&pow);
            std::thread::spawn(move || pow.solve(MAX_COMPLEXITY))
        };
        std::thread::sleep(std::time::Duration::from_millis(10));
        flag.store(true, Ordering::Relaxed);
        assert!(matches!(
            worker.join().unwrap(),
            Err(ClientError::Cancelled { .. })
        ));
    }
}
