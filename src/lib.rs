pub mod assembly;
pub mod basis;
pub mod config;
pub mod disorder;
pub mod error;
pub mod hamiltonian;
pub mod utils;

pub use assembly::{
    build_block, AssemblerKind, BlockAssembler, NaiveAssembler, OptimizedAssembler, Sector, Term,
};
pub use basis::BasisState;
pub use config::{Diagonalization, KitaevConfig};
pub use disorder::{Couplings, DisorderParameter};
pub use error::{KitaevError, KitaevResult};
pub use hamiltonian::KitaevHamiltonianBlock;

use pyo3::prelude::*;

#[pymodule]
fn py_kitaev(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<DisorderParameter>()?;
    m.add_class::<KitaevHamiltonianBlock>()?;
    Ok(())
}
