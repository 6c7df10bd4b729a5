//! Host memory coherence policy.
//!
//! The runtime reads `HIP_HOST_COHERENT` once, when the first context is
//! created, and keeps the answer for the life of the process. Tests that
//! need a different policy have to run in a fresh child process.

use std::sync::OnceLock;

/// Environment variable that selects the default coherence of host allocations.
pub const HOST_COHERENT_ENV: &str = "HIP_HOST_COHERENT";

static POLICY: OnceLock<CoherencePolicy> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoherencePolicy {
    /// Variable unset or unrecognised: allocation flags decide
    Default,
    /// `HIP_HOST_COHERENT=1`: host allocations are fine-grained
    Coherent,
    /// `HIP_HOST_COHERENT=0`: host allocations are coarse-grained
    NonCoherent,
}

impl CoherencePolicy {
    /// Interpret a raw value of the environment variable.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("1") => CoherencePolicy::Coherent,
            Some("0") => CoherencePolicy::NonCoherent,
            _ => CoherencePolicy::Default,
        }
    }

    /// The policy in force for this process. Later changes to the
    /// environment are not observed.
    pub fn current() -> Self {
        *POLICY.get_or_init(|| {
            let raw = std::env::var(HOST_COHERENT_ENV).ok();
            let policy = Self::parse(raw.as_deref());
            tracing::debug!(?policy, "host coherence policy fixed for process");
            policy
        })
    }

    /// Whether a plain host allocation is visible to the device while a
    /// kernel is running.
    pub fn host_alloc_is_coherent(self) -> bool {
        !matches!(self, CoherencePolicy::NonCoherent)
    }
}
