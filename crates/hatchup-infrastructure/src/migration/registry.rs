//! Linear migration chain.
//!
//! Every document walks through each intermediate version in turn:
//! `0.0.0 -> 1.0.0 -> 2.0.0`. There are no shortcuts between versions.

use super::traits::{MigrationChain, TypedMigration};
use anyhow::{Context, Result};
use semver::Version;
use std::sync::Arc;

/// Ordered, continuous list of migration steps ending at `latest_version`.
#[derive(Debug)]
pub struct MigrationRegistry<T> {
    steps: Vec<Arc<dyn TypedMigration<T, T>>>,
    latest_version: Version,
}

impl<T> MigrationRegistry<T> {
    pub fn new(latest_version: Version) -> Self {
        Self {
            steps: Vec::new(),
            latest_version,
        }
    }

    /// Appends a step to the chain.
    ///
    /// # Errors
    ///
    /// Fails if the step does not start where the previous one ended, or if
    /// it targets a version past `latest_version`.
    pub fn register(&mut self, step: Arc<dyn TypedMigration<T, T>>) -> Result<()> {
        if let Some(last) = self.steps.last() {
            anyhow::ensure!(
                last.to_version() == step.from_version(),
                "Migration chain broken: '{}' ends at {} but '{}' starts at {}",
                last.description(),
                last.to_version(),
                step.description(),
                step.from_version()
            );
        }
        anyhow::ensure!(
            step.to_version() <= self.latest_version,
            "Migration '{}' targets {} beyond latest version {}",
            step.description(),
            step.to_version(),
            self.latest_version
        );
        self.steps.push(step);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_step(mut self, step: Arc<dyn TypedMigration<T, T>>) -> Result<Self> {
        self.register(step)?;
        Ok(self)
    }

    pub fn latest_version(&self) -> &Version {
        &self.latest_version
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn position_of(&self, version: &Version) -> Option<usize> {
        self.steps.iter().position(|step| step.can_migrate(version))
    }
}

impl<T> MigrationChain<T> for MigrationRegistry<T> {
    fn migrate_to_latest(&self, mut data: T, current_version: &Version) -> Result<T> {
        if current_version == &self.latest_version {
            return Ok(data);
        }
        anyhow::ensure!(
            current_version < &self.latest_version,
            "Document version {} is newer than supported version {}",
            current_version,
            self.latest_version
        );

        let start = self.position_of(current_version).with_context(|| {
            format!("No migration starts at version {}", current_version)
        })?;
        let total = self.steps.len() - start;

        tracing::info!(
            "[MigrationRegistry] Migrating {} -> {} ({} steps)",
            current_version,
            self.latest_version,
            total
        );

        for (index, step) in self.steps[start..].iter().enumerate() {
            tracing::debug!(
                "[MigrationRegistry] Step {}/{}: {} -> {} ({})",
                index + 1,
                total,
                step.from_version(),
                step.to_version(),
                step.description()
            );
            data = step.migrate(data).with_context(|| {
                format!(
                    "Migration '{}' failed ({} -> {})",
                    step.description(),
                    step.from_version(),
                    step.to_version()
                )
            })?;
        }

        Ok(data)
    }

    fn available_paths(&self, from: &Version) -> Vec<Vec<Version>> {
        match self.position_of(from) {
            Some(start) => {
                let mut path = vec![from.clone()];
                path.extend(self.steps[start..].iter().map(|step| step.to_version()));
                vec![path]
            }
            None => Vec::new(),
        }
    }
}
