use crate::assembly::{AssemblerKind, Sector};
use crate::error::{KitaevError, KitaevResult};
use serde::{Deserialize, Serialize};

/// How much of the spectrum to compute after assembly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagonalization {
    Skip,
    EigenvaluesOnly,
    #[default]
    Full,
}

/// Parameters for one disorder realization of one charge sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KitaevConfig {
    /// Number of fermionic modes.
    pub n: usize,
    /// Occupied modes in the sector.
    pub q: usize,
    /// Coupling scale, `<|J|^2> = coupling^2`.
    pub coupling: f64,
    /// Disorder seed. Drawn from entropy when absent.
    pub seed: Option<u64>,
    pub assembler: AssemblerKind,
    pub diagonalization: Diagonalization,
}

impl Default for KitaevConfig {
    fn default() -> Self {
        Self {
            n: 8,
            q: 4,
            coupling: 1.0,
            seed: None,
            assembler: AssemblerKind::Optimized,
            diagonalization: Diagonalization::Full,
        }
    }
}

impl KitaevConfig {
    pub fn validate(&self) -> KitaevResult<()> {
        let sector = Sector::new(self.n, self.q)
            .map_err(|e| KitaevError::Config(e.to_string()))?;
        if !self.coupling.is_finite() || self.coupling <= 0.0 {
            return Err(KitaevError::Config(format!(
                "coupling must be finite and > 0, got {}",
                self.coupling
            )));
        }
        log::debug!("config ok: N={} Q={} dim={}", self.n, self.q, sector.dim());
        Ok(())
    }

    /// Load from a JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> KitaevResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| KitaevError::Config(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> KitaevResult<String> {
        serde_json::to_string(self).map_err(|e| KitaevError::Config(e.to_string()))
    }
}
