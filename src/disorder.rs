use crate::error::{KitaevError, KitaevResult};
use ndarray::Array4;
use num_complex::Complex;
use num_traits::Zero;
use numpy::{Complex64, PyArray4, PyReadonlyArray4, ToPyArray};
use pyo3::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Source of the quartic couplings `J(i,j,k,l)` weighting `c†_i c†_j c_k c_l`.
pub trait Couplings {
    fn num_modes(&self) -> usize;
    fn elem(&self, i: usize, j: usize, k: usize, l: usize) -> Complex<f64>;
}

/// Dense coupling tensor for one disorder realization.
#[pyclass]
#[derive(Debug, Clone)]
pub struct DisorderParameter {
    n: usize,
    couplings: Array4<Complex<f64>>,
}

#[pymethods]
impl DisorderParameter {
    /// Draw a random realization with `<|J|^2> = coupling^2`.
    #[new]
    #[pyo3(signature = (n, coupling=1.0, seed=None))]
    fn py_new(n: usize, coupling: f64, seed: Option<u64>) -> Self {
        Self::new(n, coupling, seed)
    }

    #[staticmethod]
    fn from_numpy(couplings: PyReadonlyArray4<Complex64>) -> PyResult<Self> {
        Ok(Self::from_array(couplings.as_array().to_owned())?)
    }

    #[getter(n)]
    fn py_n(&self) -> usize {
        self.n
    }

    #[pyo3(name = "elem")]
    fn py_elem(&self, i: usize, j: usize, k: usize, l: usize) -> PyResult<Complex64> {
        for mode in [i, j, k, l] {
            if mode >= self.n {
                return Err(KitaevError::ModeOutOfRange { mode, n: self.n }.into());
            }
        }
        Ok(self.elem(i, j, k, l))
    }

    /// Copy of the full tensor as a numpy array.
    fn couplings(&self, py: Python) -> Py<PyArray4<Complex64>> {
        self.couplings.to_pyarray_bound(py).unbind()
    }
}

impl DisorderParameter {
    /// Random realization. Without a seed the generator is seeded from entropy.
    pub fn new(n: usize, coupling: f64, seed: Option<u64>) -> Self {
        let mut rng = seed
            .map(SmallRng::seed_from_u64)
            .unwrap_or_else(SmallRng::from_entropy);
        Self::sample(n, coupling, &mut rng)
    }

    /// Draw couplings from `rng`.
    ///
    /// The tensor is antisymmetric under `i<->j` and `k<->l` and satisfies
    /// `J(i,j,k,l) = conj(J(k,l,i,j))`, which makes the Hamiltonian Hermitian.
    pub fn sample<R: Rng>(n: usize, coupling: f64, rng: &mut R) -> Self {
        let mut couplings = Array4::zeros((n, n, n, n));
        for i in 0..n {
            for j in i + 1..n {
                for k in 0..n {
                    for l in k + 1..n {
                        // Each pair of pairs is drawn once, its conjugate partner follows.
                        if (i, j) > (k, l) {
                            continue;
                        }
                        let value = if (i, j) == (k, l) {
                            let x: f64 = rng.sample(StandardNormal);
                            Complex::new(coupling * x, 0.0)
                        } else {
                            Complex::new(rng.sample(StandardNormal), rng.sample(StandardNormal))
                                * (coupling * std::f64::consts::FRAC_1_SQRT_2)
                        };
                        fill_antisymmetric(&mut couplings, (i, j, k, l), value);
                        fill_antisymmetric(&mut couplings, (k, l, i, j), value.conj());
                    }
                }
            }
        }
        Self { n, couplings }
    }

    /// Tensor with entries taken from `f`. No symmetry is imposed.
    pub fn from_fn<F>(n: usize, f: F) -> Self
    where
        F: Fn(usize, usize, usize, usize) -> Complex<f64>,
    {
        let couplings = Array4::from_shape_fn((n, n, n, n), |(i, j, k, l)| f(i, j, k, l));
        Self { n, couplings }
    }

    /// Tensor with a single nonzero entry.
    pub fn single(
        n: usize,
        (i, j, k, l): (usize, usize, usize, usize),
        value: Complex<f64>,
    ) -> KitaevResult<Self> {
        if let Some(mode) = [i, j, k, l].into_iter().find(|&m| m >= n) {
            return Err(KitaevError::ModeOutOfRange { mode, n });
        }
        let mut couplings = Array4::zeros((n, n, n, n));
        couplings[(i, j, k, l)] = value;
        Ok(Self { n, couplings })
    }

    pub fn from_array(couplings: Array4<Complex<f64>>) -> KitaevResult<Self> {
        let shape = couplings.shape();
        let n = shape[0];
        if shape.iter().any(|&s| s != n) {
            return Err(KitaevError::ShapeMismatch {
                expected: vec![n; 4],
                found: shape.to_vec(),
            });
        }
        Ok(Self { n, couplings })
    }

    /// Same realization with every coupling multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            n: self.n,
            couplings: self.couplings.mapv(|c| c * factor),
        }
    }

    pub fn as_array(&self) -> &Array4<Complex<f64>> {
        &self.couplings
    }

    /// Largest violation of `J(i,j,k,l) = conj(J(k,l,i,j))`.
    pub fn hermiticity_defect(&self) -> f64 {
        self.couplings
            .indexed_iter()
            .map(|((i, j, k, l), c)| (c - self.couplings[(k, l, i, j)].conj()).norm())
            .fold(f64::zero(), f64::max)
    }
}

fn fill_antisymmetric(
    couplings: &mut Array4<Complex<f64>>,
    (i, j, k, l): (usize, usize, usize, usize),
    value: Complex<f64>,
) {
    couplings[(i, j, k, l)] = value;
    couplings[(j, i, k, l)] = -value;
    couplings[(i, j, l, k)] = -value;
    couplings[(j, i, l, k)] = value;
}

impl Couplings for DisorderParameter {
    #[inline]
    fn num_modes(&self) -> usize {
        self.n
    }

    #[inline]
    fn elem(&self, i: usize, j: usize, k: usize, l: usize) -> Complex<f64> {
        self.couplings[(i, j, k, l)]
    }
}
