//! Configuration hashing for reproducibility.
//!
//! Two analyses are only comparable when they ran under the same policy and
//! limits. The hash is printed with every result so that can be checked.

use sha2::{Digest, Sha256};

use super::spec::{AnalyzerConfig, DangerPolicy};

/// Hasher for computing configuration fingerprints.
#[derive(Debug, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new configuration hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of the entire analyzer configuration.
    ///
    /// Field order is fixed and policy entries are sorted, so logically
    /// equal configurations hash equally.
    #[must_use]
    pub fn hash_config(&self, config: &AnalyzerConfig) -> String {
        let mut hasher = Sha256::new();

        hasher.update(self.hash_policy(&config.danger).as_bytes());

        // Limits
        let limits = &config.limits;
        hasher.update((limits.max_properties_per_resource as u64).to_be_bytes());
        hasher.update((limits.max_property_value_bytes as u64).to_be_bytes());
        hasher.update((limits.max_total_bytes as u64).to_be_bytes());

        // Grouping
        hasher.update([u8::from(config.grouping.enabled)]);
        hasher.update((config.grouping.threshold as u64).to_be_bytes());

        hasher.update([u8::from(config.auto_expand_dangerous)]);

        hex::encode(hasher.finalize())
    }

    /// Computes a hash of the danger policy alone.
    #[must_use]
    pub fn hash_policy(&self, policy: &DangerPolicy) -> String {
        let mut hasher = Sha256::new();

        // BTreeSet iteration is already sorted
        for resource_type in &policy.sensitive_resources {
            hasher.update(resource_type.as_bytes());
            hasher.update([0u8]);
        }

        // Rules (sorted for determinism)
        let mut rules: Vec<_> = policy.sensitive_properties.iter().collect();
        rules.sort();
        for rule in rules {
            hasher.update(rule.resource_type.as_bytes());
            hasher.update([0u8]);
            hasher.update(rule.property.as_str().as_bytes());
            hasher.update([0u8]);
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}
