// crates/laskar-core/src/rng.rs: 16-bit LCG that folds counter jitter into its seed on every draw.
use crate::clock::{HardwareCounter, TickClock};
use rand::RngCore;

const LCG_MULTIPLIER: u32 = 1_103_515_245;
const LCG_INCREMENT: u32 = 12_345;

/// Cheap, non-cryptographic noise mixed into the generator before each draw.
pub trait EntropySource {
    fn jitter(&mut self) -> u16;
}

impl<H: HardwareCounter> EntropySource for TickClock<H> {
    fn jitter(&mut self) -> u16 {
        self.sample_counter()
    }
}

impl<E: EntropySource + ?Sized> EntropySource for &mut E {
    fn jitter(&mut self) -> u16 {
        (**self).jitter()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnLcg {
    seed: u16,
}

impl SpawnLcg {
    pub const fn new(seed: u16) -> Self {
        Self { seed }
    }

    pub const fn seed(&self) -> u16 {
        self.seed
    }

    pub fn next_with(&mut self, jitter: u16) -> u16 {
        let mixed = u32::from(self.seed ^ jitter);
        self.seed = (mixed
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT)
            & 0xffff) as u16;
        self.seed
    }

    /// Borrows the generator together with an entropy source as a `RngCore`.
    pub fn with_entropy<'a, E: EntropySource + ?Sized>(
        &'a mut self,
        entropy: &'a mut E,
    ) -> Reseeding<'a, E> {
        Reseeding { lcg: self, entropy }
    }
}

pub struct Reseeding<'a, E: ?Sized> {
    lcg: &'a mut SpawnLcg,
    entropy: &'a mut E,
}

impl<E: EntropySource + ?Sized> Reseeding<'_, E> {
    fn draw(&mut self) -> u16 {
        let jitter = self.entropy.jitter();
        self.lcg.next_with(jitter)
    }
}

impl<E: EntropySource + ?Sized> RngCore for Reseeding<'_, E> {
    fn next_u32(&mut self) -> u32 {
        let high = u32::from(self.draw());
        let low = u32::from(self.draw());
        (high << 16) | low
    }

    fn next_u64(&mut self) -> u64 {
        let high = u64::from(self.next_u32());
        let low = u64::from(self.next_u32());
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(2) {
            let bytes = self.draw().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}
