use std::path::{Path, PathBuf};
use std::sync::Arc;

use action_locator::DefaultElementResolver;
use anyhow::{Context, Result};
use perceiver_structural::InMemoryTree;

use super::output::OutputFormat;
use crate::config::Config;

pub struct CliContext {
    config: Arc<Config>,
    config_path: PathBuf,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(config: Config, config_path: PathBuf, output: OutputFormat) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            output,
        }
    }

    pub fn config(&self) -> &Config {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn output(&self) -> &OutputFormat {
        &self.output
    }

    /// Load a tree fixture into a fresh in-memory provider
    pub fn load_tree(&self, path: &Path) -> Result<Arc<InMemoryTree>> {
        let tree = InMemoryTree::load(path)
            .with_context(|| format!("Failed to load tree fixture {}", path.display()))?;
        Ok(Arc::new(tree))
    }

    pub fn resolver(&self, tree: Arc<InMemoryTree>) -> DefaultElementResolver {
        DefaultElementResolver::with_options(tree, self.config.resolver.clone())
    }

    /// `--all` and `--first` win over the configured default
    pub fn first_only(&self, all: bool, first: bool) -> bool {
        if all {
            false
        } else if first {
            true
        } else {
            self.config.first_match_only
        }
    }
}
