use crate::assembly::{BlockAssembler, NaiveAssembler, OptimizedAssembler, Sector};
use crate::config::{Diagonalization, KitaevConfig};
use crate::disorder::{Couplings, DisorderParameter};
use crate::error::{KitaevError, KitaevResult};
use ndarray::{Array1, Array2};
use ndarray_linalg::{Eig, EigVals};
use num_complex::Complex;
use numpy::{Complex64, PyArray1, PyArray2, PyReadonlyArray2, ToPyArray};
use pyo3::prelude::*;

#[derive(Debug, Clone)]
struct Spectrum {
    eigenvalues: Array1<Complex<f64>>,
    /// Columns ordered as `eigenvalues`. Absent after an eigenvalues-only run.
    eigenvectors: Option<Array2<Complex<f64>>>,
}

/// Dense Hamiltonian restricted to one charge sector, with its spectrum once computed.
#[pyclass]
#[derive(Debug, Clone)]
pub struct KitaevHamiltonianBlock {
    sector: Sector,
    matrix: Array2<Complex<f64>>,
    spectrum: Option<Spectrum>,
}

#[pymethods]
impl KitaevHamiltonianBlock {
    #[new]
    #[pyo3(signature = (n, q, disorder, naive=false))]
    fn py_new(
        n: usize,
        q: usize,
        disorder: PyRef<DisorderParameter>,
        naive: bool,
    ) -> PyResult<Self> {
        let block = if naive {
            Self::with_assembler(n, q, &*disorder, &NaiveAssembler)?
        } else {
            Self::with_assembler(n, q, &*disorder, &OptimizedAssembler)?
        };
        Ok(block)
    }

    #[staticmethod]
    fn from_numpy(n: usize, q: usize, matrix: PyReadonlyArray2<Complex64>) -> PyResult<Self> {
        Ok(Self::from_matrix(n, q, matrix.as_array().to_owned())?)
    }

    #[staticmethod]
    #[pyo3(name = "from_json")]
    fn py_from_json(json: &str) -> PyResult<Self> {
        Ok(Self::from_config(&KitaevConfig::from_json(json)?)?)
    }

    /// Compute the spectrum; the eigenvectors too when `full`. No-op once diagonalized.
    #[pyo3(name = "diagonalize", signature = (full=true))]
    fn py_diagonalize(&mut self, full: bool) -> PyResult<()> {
        Ok(self.diagonalize(full)?)
    }

    pub fn is_diagonalized(&self) -> bool {
        self.spectrum.is_some()
    }

    pub fn dim(&self) -> usize {
        self.sector.dim()
    }

    #[getter(n)]
    fn py_n(&self) -> usize {
        self.sector.n()
    }

    #[getter(q)]
    fn py_q(&self) -> usize {
        self.sector.q()
    }

    #[pyo3(name = "matrix")]
    fn py_matrix(&self, py: Python) -> Py<PyArray2<Complex64>> {
        self.matrix.to_pyarray_bound(py).unbind()
    }

    #[pyo3(name = "eigenvalues")]
    fn py_eigenvalues(&self, py: Python) -> PyResult<Py<PyArray1<Complex64>>> {
        Ok(self.eigenvalues()?.to_pyarray_bound(py).unbind())
    }

    #[pyo3(name = "eigenvectors")]
    fn py_eigenvectors(&self, py: Python) -> PyResult<Py<PyArray2<Complex64>>> {
        Ok(self.eigenvectors()?.to_pyarray_bound(py).unbind())
    }

    #[pyo3(name = "diagonal_matrix")]
    fn py_diagonal_matrix(&self, py: Python) -> PyResult<Py<PyArray2<Complex64>>> {
        Ok(self.diagonal_matrix()?.to_pyarray_bound(py).unbind())
    }

    fn __getitem__(&self, index: (usize, usize)) -> PyResult<Complex64> {
        Ok(self.get(index.0, index.1)?)
    }
}

impl KitaevHamiltonianBlock {
    /// Assemble the block for `q` of `n` modes with the optimized assembler.
    pub fn new(n: usize, q: usize, disorder: &dyn Couplings) -> KitaevResult<Self> {
        Self::with_assembler(n, q, disorder, &OptimizedAssembler)
    }

    pub fn with_assembler(
        n: usize,
        q: usize,
        disorder: &dyn Couplings,
        assembler: &dyn BlockAssembler,
    ) -> KitaevResult<Self> {
        let sector = Sector::new(n, q)?;
        let matrix = assembler.assemble(sector, disorder)?;
        Ok(Self {
            sector,
            matrix,
            spectrum: None,
        })
    }

    /// Wrap an already assembled `dim x dim` matrix.
    pub fn from_matrix(n: usize, q: usize, matrix: Array2<Complex<f64>>) -> KitaevResult<Self> {
        let sector = Sector::new(n, q)?;
        let dim = sector.dim();
        if matrix.shape() != &[dim, dim] {
            return Err(KitaevError::ShapeMismatch {
                expected: vec![dim, dim],
                found: matrix.shape().to_vec(),
            });
        }
        Ok(Self {
            sector,
            matrix,
            spectrum: None,
        })
    }

    /// Draw the disorder, assemble and diagonalize as `config` asks.
    pub fn from_config(config: &KitaevConfig) -> KitaevResult<Self> {
        config.validate()?;
        let disorder = DisorderParameter::new(config.n, config.coupling, config.seed);
        let mut block = Self::with_assembler(config.n, config.q, &disorder, &config.assembler)?;
        match config.diagonalization {
            Diagonalization::Skip => {}
            Diagonalization::EigenvaluesOnly => block.diagonalize(false)?,
            Diagonalization::Full => block.diagonalize(true)?,
        }
        Ok(block)
    }

    pub fn diagonalize(&mut self, full: bool) -> KitaevResult<()> {
        if self.spectrum.is_some() {
            return Ok(());
        }
        log::debug!(
            "diagonalizing N={} Q={} dim={} full={}",
            self.sector.n(),
            self.sector.q(),
            self.dim(),
            full
        );
        let spectrum = if full {
            let (eigenvalues, eigenvectors) = self.matrix.eig()?;
            Spectrum {
                eigenvalues,
                eigenvectors: Some(eigenvectors),
            }
        } else {
            Spectrum {
                eigenvalues: self.matrix.eigvals()?,
                eigenvectors: None,
            }
        };
        self.spectrum = Some(spectrum);
        Ok(())
    }

    pub fn sector(&self) -> Sector {
        self.sector
    }

    pub fn matrix(&self) -> &Array2<Complex<f64>> {
        &self.matrix
    }

    /// Matrix element `<bra|H|ket>` by basis rank.
    pub fn get(&self, bra: usize, ket: usize) -> KitaevResult<Complex<f64>> {
        let dim = self.dim();
        for rank in [bra, ket] {
            if rank >= dim {
                return Err(KitaevError::RankOutOfRange { rank, dim });
            }
        }
        Ok(self.matrix[(bra, ket)])
    }

    pub fn eigenvalues(&self) -> KitaevResult<&Array1<Complex<f64>>> {
        self.spectrum
            .as_ref()
            .map(|s| &s.eigenvalues)
            .ok_or(KitaevError::NotDiagonalized)
    }

    /// The eigenvector matrix `U`.
    pub fn eigenvectors(&self) -> KitaevResult<&Array2<Complex<f64>>> {
        let spectrum = self.spectrum.as_ref().ok_or(KitaevError::NotDiagonalized)?;
        spectrum
            .eigenvectors
            .as_ref()
            .ok_or(KitaevError::EigenvectorsUnavailable)
    }

    /// The diagonal matrix `D` of eigenvalues.
    pub fn diagonal_matrix(&self) -> KitaevResult<Array2<Complex<f64>>> {
        Ok(Array2::from_diag(self.eigenvalues()?))
    }
}
