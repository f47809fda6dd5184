use crate::basis::BasisState;
use crate::disorder::Couplings;
use crate::error::{KitaevError, KitaevResult};
use crate::utils::{expand, rank_to_occupations, sector_dim, Pin};
use ndarray::Array2;
use num_complex::Complex;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

/// Fixed-charge sector: `q` of `n` modes occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sector {
    n: usize,
    q: usize,
}

impl Sector {
    pub fn new(n: usize, q: usize) -> KitaevResult<Self> {
        if n == 0 || q > n {
            return Err(KitaevError::InvalidSector { n, q });
        }
        Ok(Self { n, q })
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn q(&self) -> usize {
        self.q
    }

    #[inline]
    pub fn dim(&self) -> usize {
        sector_dim(self.n, self.q)
    }

    /// Overall prefactor `4 / (2N)^{3/2}`.
    /// The 4 accounts for summing only over `i<j` and `k<l`.
    pub fn coefficient(&self) -> f64 {
        4.0 / (2.0 * self.n as f64).powf(1.5)
    }
}

/// The operator `c†_i c†_j c_k c_l` with `i<j` and `k<l`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Term {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub l: usize,
}

impl Term {
    pub fn new(n: usize, i: usize, j: usize, k: usize, l: usize) -> KitaevResult<Self> {
        if i >= j || k >= l || j >= n || l >= n {
            return Err(KitaevError::InvalidTerm { i, j, k, l, n });
        }
        Ok(Self { i, j, k, l })
    }

    /// Every term with `i<j` and `k<l` over `n` modes.
    pub fn all(n: usize) -> impl Iterator<Item = Term> {
        (0..n).flat_map(move |i| {
            (i + 1..n).flat_map(move |j| {
                (0..n).flat_map(move |k| (k + 1..n).map(move |l| Term { i, j, k, l }))
            })
        })
    }

    pub fn overlap(&self) -> TermOverlap {
        TermOverlap::classify(self)
    }
}

/// How the created pair `{i,j}` meets the annihilated pair `{k,l}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermOverlap {
    /// `i=k, j=l`
    Diagonal,
    /// `i=k` only
    SharedLow,
    /// `j=l` only
    SharedHigh,
    /// `i=l`, so `k < i=l < j`
    ChainUp,
    /// `j=k`, so `i < j=k < l`
    ChainDown,
    /// `i,j,k,l` pairwise distinct
    Distinct,
}

impl TermOverlap {
    pub fn classify(term: &Term) -> Self {
        let Term { i, j, k, l } = *term;
        match (i == k, j == l, i == l, j == k) {
            (true, true, _, _) => TermOverlap::Diagonal,
            (true, false, _, _) => TermOverlap::SharedLow,
            (false, true, _, _) => TermOverlap::SharedHigh,
            (false, false, true, _) => TermOverlap::ChainUp,
            (false, false, false, true) => TermOverlap::ChainDown,
            (false, false, false, false) => TermOverlap::Distinct,
        }
    }

    /// Modes fixed in every ket the term does not annihilate, in ascending order.
    ///
    /// `k,l` must be occupied. A created mode outside `{k,l}` must be empty.
    pub fn pins(self, term: &Term) -> SmallVec<[Pin; 4]> {
        let Term { i, j, k, l } = *term;
        match self {
            TermOverlap::Diagonal => smallvec![Pin::Occupied(k), Pin::Occupied(l)],
            TermOverlap::SharedLow => {
                if j < l {
                    smallvec![Pin::Occupied(k), Pin::Vacant(j), Pin::Occupied(l)]
                } else {
                    smallvec![Pin::Occupied(k), Pin::Occupied(l), Pin::Vacant(j)]
                }
            }
            TermOverlap::SharedHigh => {
                if i < k {
                    smallvec![Pin::Vacant(i), Pin::Occupied(k), Pin::Occupied(l)]
                } else {
                    smallvec![Pin::Occupied(k), Pin::Vacant(i), Pin::Occupied(l)]
                }
            }
            TermOverlap::ChainUp => smallvec![Pin::Occupied(k), Pin::Occupied(l), Pin::Vacant(j)],
            TermOverlap::ChainDown => {
                smallvec![Pin::Vacant(i), Pin::Occupied(k), Pin::Occupied(l)]
            }
            TermOverlap::Distinct => {
                // Six interleavings of i<j with k<l; sorting by mode covers all of them.
                let mut pins: SmallVec<[Pin; 4]> = smallvec![
                    Pin::Vacant(i),
                    Pin::Vacant(j),
                    Pin::Occupied(k),
                    Pin::Occupied(l)
                ];
                pins.sort_unstable_by_key(|p| p.mode());
                pins
            }
        }
    }
}

/// Assembles the dense block of the quartic Hamiltonian for one sector.
pub trait BlockAssembler {
    fn name(&self) -> &'static str;

    fn assemble(
        &self,
        sector: Sector,
        disorder: &dyn Couplings,
    ) -> KitaevResult<Array2<Complex<f64>>>;
}

/// Reference assembler: every term on every basis state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveAssembler;

/// Visits only the kets each term can act on.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizedAssembler;

/// Runtime choice between the two assemblers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssemblerKind {
    Naive,
    #[default]
    Optimized,
}

impl BlockAssembler for AssemblerKind {
    fn name(&self) -> &'static str {
        match self {
            AssemblerKind::Naive => NaiveAssembler.name(),
            AssemblerKind::Optimized => OptimizedAssembler.name(),
        }
    }

    fn assemble(
        &self,
        sector: Sector,
        disorder: &dyn Couplings,
    ) -> KitaevResult<Array2<Complex<f64>>> {
        match self {
            AssemblerKind::Naive => NaiveAssembler.assemble(sector, disorder),
            AssemblerKind::Optimized => OptimizedAssembler.assemble(sector, disorder),
        }
    }
}

/// Build the block for `q` of `n` modes with the optimized assembler.
pub fn build_block(
    n: usize,
    q: usize,
    disorder: &dyn Couplings,
) -> KitaevResult<Array2<Complex<f64>>> {
    OptimizedAssembler.assemble(Sector::new(n, q)?, disorder)
}

struct BlockAccumulator<'a> {
    sector: Sector,
    disorder: &'a dyn Couplings,
    matrix: Array2<Complex<f64>>,
    contributions: usize,
}

impl<'a> BlockAccumulator<'a> {
    fn new(sector: Sector, disorder: &'a dyn Couplings) -> KitaevResult<Self> {
        if disorder.num_modes() != sector.n() {
            return Err(KitaevError::ShapeMismatch {
                expected: vec![sector.n(); 4],
                found: vec![disorder.num_modes(); 4],
            });
        }
        let dim = sector.dim();
        Ok(Self {
            sector,
            disorder,
            matrix: Array2::zeros((dim, dim)),
            contributions: 0,
        })
    }

    /// Add `<bra| J_ijkl c†_i c†_j c_k c_l |ket>`. Returns whether the term survived.
    fn accumulate(&mut self, term: Term, ket: BasisState) -> KitaevResult<bool> {
        let dim = self.matrix.nrows();
        let ket_rank = ket.rank();
        if ket_rank >= dim {
            log::error!("ket {:?} outside sector", ket.occupations());
            return Err(KitaevError::RankOutOfRange {
                rank: ket_rank,
                dim,
            });
        }

        let mut bra = ket;
        bra.apply_quartic(term.i, term.j, term.k, term.l);
        if bra.is_zero() {
            return Ok(false);
        }

        let Term { i, j, k, l } = term;
        if bra.charge() != self.sector.q() {
            log::error!(
                "term ({},{},{},{}) left the sector: bra {:?}",
                i,
                j,
                k,
                l,
                bra.occupations()
            );
            return Err(KitaevError::ChargeViolation {
                i,
                j,
                k,
                l,
                expected: self.sector.q(),
                found: bra.charge(),
            });
        }
        let bra_rank = bra.rank();
        if bra_rank >= dim {
            log::error!("bra {:?} outside sector", bra.occupations());
            return Err(KitaevError::RankOutOfRange {
                rank: bra_rank,
                dim,
            });
        }

        self.matrix[(bra_rank, ket_rank)] +=
            self.disorder.elem(i, j, k, l) * f64::from(bra.coefficient());
        self.contributions += 1;
        Ok(true)
    }

    fn finish(mut self, name: &str) -> Array2<Complex<f64>> {
        let coefficient = self.sector.coefficient();
        self.matrix.mapv_inplace(|c| c * coefficient);
        log::debug!(
            "{} assembly done: N={} Q={} dim={} contributions={}",
            name,
            self.sector.n(),
            self.sector.q(),
            self.sector.dim(),
            self.contributions
        );
        self.matrix
    }
}

impl BlockAssembler for NaiveAssembler {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn assemble(
        &self,
        sector: Sector,
        disorder: &dyn Couplings,
    ) -> KitaevResult<Array2<Complex<f64>>> {
        log::debug!(
            "naive assembly: N={} Q={} dim={}",
            sector.n(),
            sector.q(),
            sector.dim()
        );
        let mut acc = BlockAccumulator::new(sector, disorder)?;
        for ket_rank in 0..sector.dim() {
            let ket = BasisState::from_rank(sector.n(), sector.q(), ket_rank)?;
            for term in Term::all(sector.n()) {
                acc.accumulate(term, ket.clone())?;
            }
        }
        Ok(acc.finish(self.name()))
    }
}

impl OptimizedAssembler {
    fn add_term(&self, acc: &mut BlockAccumulator, term: Term) -> KitaevResult<()> {
        let pins = term.overlap().pins(&term);
        let reduced_n = acc.sector.n() - pins.len();
        let reduced_q = acc.sector.q() - 2;

        for rank in 0..sector_dim(reduced_n, reduced_q) {
            let reduced = rank_to_occupations(reduced_n, reduced_q, rank)?;
            let ket = BasisState::from_ascending(expand(&reduced, &pins));
            let survived = acc.accumulate(term, ket)?;
            debug_assert!(survived, "{:?} annihilated an enumerated ket", term);
        }
        Ok(())
    }
}

impl BlockAssembler for OptimizedAssembler {
    fn name(&self) -> &'static str {
        "optimized"
    }

    fn assemble(
        &self,
        sector: Sector,
        disorder: &dyn Couplings,
    ) -> KitaevResult<Array2<Complex<f64>>> {
        log::debug!(
            "optimized assembly: N={} Q={} dim={}",
            sector.n(),
            sector.q(),
            sector.dim()
        );
        let mut acc = BlockAccumulator::new(sector, disorder)?;
        // Below two particles nothing survives c_k c_l.
        if sector.q() >= 2 {
            for term in Term::all(sector.n()) {
                self.add_term(&mut acc, term)?;
            }
        }
        Ok(acc.finish(self.name()))
    }
}

#[cfg(test)]
mod assembly_tests {
    use super::*;
    use crate::disorder::DisorderParameter;
    use crate::utils::{compare_colex, enumerate_occupations, Occupations};

    fn max_abs_diff(a: &Array2<Complex<f64>>, b: &Array2<Complex<f64>>) -> f64 {
        assert_eq!(a.shape(), b.shape());
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).norm())
            .fold(0.0, f64::max)
    }

    fn arbitrary_disorder(n: usize) -> DisorderParameter {
        DisorderParameter::from_fn(n, |i, j, k, l| {
            Complex::new(
                0.1 * (i + 2 * j) as f64 - 0.3 * (k * l) as f64 + 0.05,
                (i * l) as f64 - 0.5 * (j + k) as f64,
            )
        })
    }

    #[test]
    fn classify_cases() {
        let t = |i, j, k, l| Term::new(6, i, j, k, l).unwrap().overlap();
        assert_eq!(t(1, 3, 1, 3), TermOverlap::Diagonal);
        assert_eq!(t(1, 3, 1, 4), TermOverlap::SharedLow);
        assert_eq!(t(1, 4, 1, 3), TermOverlap::SharedLow);
        assert_eq!(t(0, 3, 2, 3), TermOverlap::SharedHigh);
        assert_eq!(t(2, 3, 0, 3), TermOverlap::SharedHigh);
        assert_eq!(t(2, 5, 0, 2), TermOverlap::ChainUp);
        assert_eq!(t(0, 2, 2, 5), TermOverlap::ChainDown);
        assert_eq!(t(0, 1, 2, 3), TermOverlap::Distinct);
        assert_eq!(t(1, 4, 0, 5), TermOverlap::Distinct);
    }

    #[test]
    fn invalid_terms_rejected() {
        assert!(Term::new(5, 2, 2, 0, 1).is_err());
        assert!(Term::new(5, 3, 1, 0, 1).is_err());
        assert!(Term::new(5, 0, 1, 4, 4).is_err());
        assert!(Term::new(5, 0, 5, 0, 1).is_err());
        assert!(Term::new(5, 0, 4, 1, 3).is_ok());
    }

    #[test]
    fn invalid_sector_rejected() {
        assert!(matches!(
            Sector::new(4, 5),
            Err(KitaevError::InvalidSector { n: 4, q: 5 })
        ));
        let empty = Sector::new(0, 0).unwrap_err();
        assert!(matches!(empty, KitaevError::InvalidSector { n: 0, q: 0 }));
        assert!(empty.to_string().contains("N >= 1"));
        assert_eq!(Sector::new(4, 2).unwrap().dim(), 6);
    }

    #[test]
    fn term_count() {
        let n = 6;
        let pairs = n * (n - 1) / 2;
        assert_eq!(Term::all(n).count(), pairs * pairs);
        assert!(Term::all(n).all(|t| t.i < t.j && t.k < t.l && t.j < n && t.l < n));
    }

    /// The expanded kets of each term are exactly the sector states the term does not annihilate.
    #[test]
    fn pins_enumerate_compatible_kets() {
        let n = 7;
        for q in 2..=n {
            let states = enumerate_occupations(n, q);
            for term in Term::all(n) {
                let mut expected = states
                    .iter()
                    .filter(|s| {
                        let mut ket = BasisState::from_occupations(s).unwrap();
                        ket.apply_quartic(term.i, term.j, term.k, term.l);
                        !ket.is_zero()
                    })
                    .cloned()
                    .collect::<Vec<Occupations>>();
                expected.sort_by(|a, b| compare_colex(a, b));

                let pins = term.overlap().pins(&term);
                assert!(pins.windows(2).all(|w| w[0].mode() < w[1].mode()));
                let reduced_n = n - pins.len();
                let mut expanded = (0..sector_dim(reduced_n, q - 2))
                    .map(|r| expand(&rank_to_occupations(reduced_n, q - 2, r).unwrap(), &pins))
                    .collect::<Vec<_>>();
                expanded.sort_by(|a, b| compare_colex(a, b));

                assert_eq!(expanded, expected, "term {:?} q={}", term, q);
            }
        }
    }

    #[test]
    fn optimized_matches_naive() {
        for n in 4..=7 {
            for q in 0..=n {
                let sector = Sector::new(n, q).unwrap();
                let disorder = DisorderParameter::new(n, 1.0, Some(17 + n as u64));
                let naive = NaiveAssembler.assemble(sector, &disorder).unwrap();
                let optimized = OptimizedAssembler.assemble(sector, &disorder).unwrap();
                assert!(
                    max_abs_diff(&naive, &optimized) < 1e-10,
                    "mismatch at N={} Q={}",
                    n,
                    q
                );
            }
        }
    }

    #[test]
    fn optimized_matches_naive_without_symmetry() {
        for (n, q) in [(4, 2), (5, 2), (5, 3), (6, 3), (6, 4)] {
            let sector = Sector::new(n, q).unwrap();
            let disorder = arbitrary_disorder(n);
            let naive = NaiveAssembler.assemble(sector, &disorder).unwrap();
            let optimized = OptimizedAssembler.assemble(sector, &disorder).unwrap();
            assert!(max_abs_diff(&naive, &optimized) < 1e-10);
            assert!(naive.iter().any(|c| c.norm() > 1e-6));
        }
    }

    #[test]
    fn single_number_term() {
        let disorder =
            DisorderParameter::single(4, (0, 1, 0, 1), Complex::new(1.0, 0.0)).unwrap();
        let block = build_block(4, 2, &disorder).unwrap();
        assert_eq!(block.shape(), &[6, 6]);

        // c†_0 c†_1 c_0 c_1 = -n_0 n_1, and {0,1} has colex rank 0.
        let expected = -4.0 / 8f64.powf(1.5);
        for ((r, c), v) in block.indexed_iter() {
            if (r, c) == (0, 0) {
                assert!((v - Complex::new(expected, 0.0)).norm() < 1e-14);
            } else {
                assert_eq!(*v, Complex::new(0.0, 0.0));
            }
        }
    }

    #[test]
    fn hopping_term_connects_states() {
        // c†_2 c†_3 c_0 c_1 maps {0,1} to -{2,3} and nothing else in Q=2.
        let disorder =
            DisorderParameter::single(4, (2, 3, 0, 1), Complex::new(0.0, 2.0)).unwrap();
        let block = build_block(4, 2, &disorder).unwrap();
        let ket = BasisState::from_occupations(&[0, 1]).unwrap().rank();
        let bra = BasisState::from_occupations(&[2, 3]).unwrap().rank();
        let coefficient = Sector::new(4, 2).unwrap().coefficient();
        for ((r, c), v) in block.indexed_iter() {
            if (r, c) == (bra, ket) {
                assert!((v - Complex::new(0.0, -2.0 * coefficient)).norm() < 1e-14);
            } else {
                assert_eq!(v.norm(), 0.0);
            }
        }
    }

    #[test]
    fn charge_violation_is_fatal() {
        let sector = Sector::new(5, 2).unwrap();
        let disorder = DisorderParameter::new(5, 1.0, Some(9));
        let mut acc = BlockAccumulator::new(sector, &disorder).unwrap();
        let ket = BasisState::from_occupations(&[0, 1, 2]).unwrap();
        let term = Term::new(5, 0, 1, 0, 1).unwrap();
        assert!(matches!(
            acc.accumulate(term, ket),
            Err(KitaevError::ChargeViolation {
                i: 0,
                j: 1,
                k: 0,
                l: 1,
                expected: 2,
                found: 3
            })
        ));
        assert_eq!(acc.contributions, 0);
    }

    #[test]
    fn ket_rank_outside_sector_is_fatal() {
        let sector = Sector::new(5, 2).unwrap();
        let disorder = DisorderParameter::new(5, 1.0, Some(9));
        let mut acc = BlockAccumulator::new(sector, &disorder).unwrap();
        // Colex rank of {4,5} is C(4,1) + C(5,2) = 14.
        let ket = BasisState::from_occupations(&[4, 5]).unwrap();
        let term = Term::new(5, 0, 1, 0, 1).unwrap();
        assert!(matches!(
            acc.accumulate(term, ket),
            Err(KitaevError::RankOutOfRange { rank: 14, dim: 10 })
        ));
    }

    #[test]
    fn bra_rank_outside_sector_is_fatal() {
        let sector = Sector::new(5, 2).unwrap();
        let disorder = DisorderParameter::new(5, 1.0, Some(9));
        let mut acc = BlockAccumulator::new(sector, &disorder).unwrap();
        // Mode 5 does not exist for N=5; the bra {2,5} has colex rank 12.
        let ket = BasisState::from_occupations(&[0, 1]).unwrap();
        let term = Term {
            i: 2,
            j: 5,
            k: 0,
            l: 1,
        };
        assert!(matches!(
            acc.accumulate(term, ket),
            Err(KitaevError::RankOutOfRange { rank: 12, dim: 10 })
        ));
        assert!(acc.matrix.iter().all(|c| c.norm() == 0.0));
    }

    #[test]
    fn block_is_hermitian() {
        for (n, q) in [(5, 2), (6, 3), (8, 4)] {
            let disorder = DisorderParameter::new(n, 1.0, Some(5));
            let block = build_block(n, q, &disorder).unwrap();
            let adjoint = block.t().mapv(|c| c.conj());
            assert!(max_abs_diff(&block, &adjoint) < 1e-10);
        }
    }

    #[test]
    fn linear_in_couplings() {
        let disorder = DisorderParameter::new(6, 1.0, Some(11));
        let block = build_block(6, 3, &disorder).unwrap();
        let doubled = build_block(6, 3, &disorder.scaled(2.0)).unwrap();
        assert!(max_abs_diff(&block.mapv(|c| c * 2.0), &doubled) < 1e-12);
    }

    #[test]
    fn few_particles_give_zero_block() {
        let disorder = DisorderParameter::new(5, 1.0, Some(2));
        for q in 0..2 {
            let block = build_block(5, q, &disorder).unwrap();
            assert_eq!(block.nrows(), sector_dim(5, q));
            assert!(block.iter().all(|c| c.norm() == 0.0));
        }
    }

    #[test]
    fn disorder_size_must_match() {
        let disorder = DisorderParameter::new(5, 1.0, Some(2));
        assert!(matches!(
            build_block(6, 3, &disorder),
            Err(KitaevError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn assembler_kind_dispatch() {
        let sector = Sector::new(5, 2).unwrap();
        let disorder = DisorderParameter::new(5, 1.0, Some(4));
        let naive = AssemblerKind::Naive.assemble(sector, &disorder).unwrap();
        let optimized = AssemblerKind::Optimized.assemble(sector, &disorder).unwrap();
        assert_eq!(AssemblerKind::Naive.name(), "naive");
        assert_eq!(AssemblerKind::default(), AssemblerKind::Optimized);
        assert!(max_abs_diff(&naive, &optimized) < 1e-10);
    }
}
