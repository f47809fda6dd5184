use crate::error::{KitaevError, KitaevResult};
use num_integer::binomial;
use smallvec::SmallVec;

/// Occupation tuples of up to this many modes stay on the stack.
pub const INLINE_MODES: usize = 16;

/// Ascending list of occupied mode indices.
pub type Occupations = SmallVec<[usize; INLINE_MODES]>;

/// Number of basis states with `q` of `n` modes occupied, computed exactly.
#[inline]
pub fn sector_dim(n: usize, q: usize) -> usize {
    binomial(n, q)
}

/// Decode a colexicographic rank into the ascending tuple of `q` modes in `[0, n)`.
///
/// Colex rank of `t_0 < t_1 < ... < t_{q-1}` is `sum_m C(t_m, m + 1)`, so the
/// decode walks from the highest occupied mode down, each time taking the
/// largest `c` with `C(c, m) <= remaining`.
pub fn rank_to_occupations(n: usize, q: usize, rank: usize) -> KitaevResult<Occupations> {
    if q > n {
        return Err(KitaevError::InvalidSector { n, q });
    }
    let dim = sector_dim(n, q);
    if rank >= dim {
        return Err(KitaevError::RankOutOfRange { rank, dim });
    }

    let mut occupations: Occupations = smallvec::smallvec![0; q];
    let mut remaining = rank;
    let mut upper = n;
    for m in (1..=q).rev() {
        // C(m-1, m) = 0 so this stops at c >= m-1 at the latest.
        let mut c = upper - 1;
        while binomial(c, m) > remaining {
            c -= 1;
        }
        occupations[m - 1] = c;
        remaining -= binomial(c, m);
        upper = c;
    }
    debug_assert_eq!(remaining, 0);
    Ok(occupations)
}

/// Colex rank of an ascending tuple. Independent of the total number of modes.
#[inline]
pub fn occupations_to_rank(occupations: &[usize]) -> usize {
    occupations
        .iter()
        .enumerate()
        .map(|(m, &t)| binomial(t, m + 1))
        .sum()
}

/// A mode whose occupation is fixed by a term before the remaining modes are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pin {
    /// The mode must be occupied in the ket.
    Occupied(usize),
    /// The mode must be empty in the ket.
    Vacant(usize),
}

impl Pin {
    #[inline]
    pub fn mode(self) -> usize {
        match self {
            Pin::Occupied(p) | Pin::Vacant(p) => p,
        }
    }
}

/// Re-embed `indices` into a space one slot larger with slot `p` occupied.
///
/// Every element `>= p` moves up by one and `p` itself is placed at its sorted position.
pub fn insert_and_shift(indices: &[usize], p: usize) -> Occupations {
    let mut expanded = Occupations::with_capacity(indices.len() + 1);
    let mut inserted = false;
    for &x in indices {
        if x >= p {
            if !inserted {
                expanded.push(p);
                inserted = true;
            }
            expanded.push(x + 1);
        } else {
            expanded.push(x);
        }
    }
    if !inserted {
        expanded.push(p);
    }
    expanded
}

/// Re-embed `indices` into a space one slot larger with slot `p` left empty.
pub fn shift_only(indices: &[usize], p: usize) -> Occupations {
    indices
        .iter()
        .map(|&x| if x >= p { x + 1 } else { x })
        .collect()
}

/// Expand a reduced tuple through a sequence of pins.
///
/// Pins must be given in ascending mode order: after handling every pin below `p`
/// the working space agrees with the full space on `[0, p)`, which is what makes
/// placing `p` at its physical value correct.
pub fn expand(reduced: &[usize], pins: &[Pin]) -> Occupations {
    debug_assert!(pins.windows(2).all(|w| w[0].mode() < w[1].mode()));
    pins.iter()
        .fold(Occupations::from_slice(reduced), |acc, pin| match *pin {
            Pin::Occupied(p) => insert_and_shift(&acc, p),
            Pin::Vacant(p) => shift_only(&acc, p),
        })
}

/// Lexicographic enumeration of ascending `(loop_num + 1)`-tuples in `[min_val, max_val)`.
#[cfg(test)]
pub(crate) fn enumerate_rec(
    acc: &mut Vec<Occupations>,
    prefix: Occupations,
    loop_num: usize,
    min_val: usize,
    max_val: usize,
) {
    if loop_num == 0 {
        for i in min_val..max_val {
            let mut state = prefix.clone();
            state.push(i);
            acc.push(state);
        }
    } else {
        for i in min_val..max_val.saturating_sub(loop_num) {
            let mut state = prefix.clone();
            state.push(i);
            enumerate_rec(acc, state, loop_num - 1, i + 1, max_val);
        }
    }
}

/// All ascending `q`-tuples of `[0, n)` in lexicographic order.
#[cfg(test)]
pub(crate) fn enumerate_occupations(n: usize, q: usize) -> Vec<Occupations> {
    let mut states = vec![];
    if q == 0 {
        states.push(Occupations::new());
    } else if q <= n {
        enumerate_rec(&mut states, Occupations::new(), q - 1, 0, n);
    }
    states
}

/// Colexicographic comparison: the highest differing entry decides.
#[cfg(test)]
pub(crate) fn compare_colex(a: &[usize], b: &[usize]) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    for (ai, bi) in a.iter().rev().zip(b.iter().rev()) {
        match ai.cmp(bi) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    a.len().cmp(&b.len())
}
