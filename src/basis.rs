use crate::error::{KitaevError, KitaevResult};
use crate::utils::{occupations_to_rank, rank_to_occupations, Occupations};

/// An occupation-number basis state carrying the sign picked up from operator actions.
///
/// Operators follow the Jordan-Wigner ordering: acting on mode `m` contributes
/// `(-1)^(occupied modes below m)`. Once an action violates exclusion the state
/// is zero and every later action is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasisState {
    occupations: Occupations,
    coefficient: i32,
}

impl BasisState {
    /// Build from an explicit strictly ascending tuple of modes.
    pub fn from_occupations(occupations: &[usize]) -> KitaevResult<Self> {
        if !occupations.windows(2).all(|w| w[0] < w[1]) {
            return Err(KitaevError::InvalidOccupations(occupations.to_vec()));
        }
        Ok(Self {
            occupations: Occupations::from_slice(occupations),
            coefficient: 1,
        })
    }

    /// Build the state of charge `q` with the given rank among `n` modes.
    pub fn from_rank(n: usize, q: usize, rank: usize) -> KitaevResult<Self> {
        Ok(Self {
            occupations: rank_to_occupations(n, q, rank)?,
            coefficient: 1,
        })
    }

    pub(crate) fn from_ascending(occupations: Occupations) -> Self {
        debug_assert!(occupations.windows(2).all(|w| w[0] < w[1]));
        Self {
            occupations,
            coefficient: 1,
        }
    }

    /// Apply `c_mode`.
    pub fn annihilate(&mut self, mode: usize) {
        if self.is_zero() {
            return;
        }
        match self.occupations.binary_search(&mode) {
            Ok(pos) => {
                self.occupations.remove(pos);
                self.flip_if_odd(pos);
            }
            Err(_) => self.coefficient = 0,
        }
    }

    /// Apply `c†_mode`.
    pub fn create(&mut self, mode: usize) {
        if self.is_zero() {
            return;
        }
        match self.occupations.binary_search(&mode) {
            Ok(_) => self.coefficient = 0,
            Err(pos) => {
                self.occupations.insert(pos, mode);
                self.flip_if_odd(pos);
            }
        }
    }

    /// Apply `c†_i c†_j c_k c_l`, rightmost operator first.
    pub fn apply_quartic(&mut self, i: usize, j: usize, k: usize, l: usize) {
        self.annihilate(l);
        self.annihilate(k);
        self.create(j);
        self.create(i);
    }

    #[inline]
    fn flip_if_odd(&mut self, below: usize) {
        if below % 2 == 1 {
            self.coefficient = -self.coefficient;
        }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.coefficient == 0
    }

    /// Number of occupied modes.
    #[inline]
    pub fn charge(&self) -> usize {
        self.occupations.len()
    }

    /// Colex rank within the sector of this state's charge.
    #[inline]
    pub fn rank(&self) -> usize {
        occupations_to_rank(&self.occupations)
    }

    #[inline]
    pub fn coefficient(&self) -> i32 {
        self.coefficient
    }

    pub fn occupations(&self) -> &[usize] {
        &self.occupations
    }
}
