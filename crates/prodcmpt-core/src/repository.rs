//! In-memory registry of types and product components keyed by qualified name

use crate::cmpt::ProductCmpt;
use crate::config::ProjectConfig;
use crate::error::ModelError;
use crate::model::{ModelContext, ProductCmptType};
use crate::persistence::{Element, read_product_cmpt, write_product_cmpt};
use crate::result::Result;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Types and components of a project.
///
/// Templates are referenced by name and looked up here, so a stale reference simply finds
/// nothing.
#[derive(Debug, Clone, Default)]
pub struct Repository {
    types: IndexMap<String, ProductCmptType>,
    cmpts: IndexMap<String, ProductCmpt>,
    sources: HashMap<String, PathBuf>,
}

/// Outcome of loading a project from disk
#[derive(Debug, Default)]
pub struct LoadReport {
    pub type_files: usize,
    pub cmpt_files: usize,
    /// Files that could not be read; loading continued without them
    pub errors: Vec<ModelError>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a type
    pub fn insert_type(&mut self, product_type: ProductCmptType) -> Option<ProductCmptType> {
        self.types
            .insert(product_type.qualified_name.clone(), product_type)
    }

    /// Add a type, failing if the name is taken
    pub fn add_type(&mut self, product_type: ProductCmptType) -> Result<()> {
        if self.types.contains_key(&product_type.qualified_name) {
            return Err(ModelError::DuplicateDefinition {
                name: product_type.qualified_name,
            });
        }
        self.insert_type(product_type);
        Ok(())
    }

    /// Add or replace a component
    pub fn insert_cmpt(&mut self, cmpt: ProductCmpt) -> Option<ProductCmpt> {
        self.cmpts.insert(cmpt.qualified_name.clone(), cmpt)
    }

    /// Add a component, failing if the name is taken
    pub fn add_cmpt(&mut self, cmpt: ProductCmpt) -> Result<()> {
        if self.cmpts.contains_key(&cmpt.qualified_name) {
            return Err(ModelError::DuplicateDefinition {
                name: cmpt.qualified_name,
            });
        }
        self.insert_cmpt(cmpt);
        Ok(())
    }

    pub fn find_type(&self, qualified_name: &str) -> Option<&ProductCmptType> {
        self.types.get(qualified_name)
    }

    pub fn find_cmpt(&self, qualified_name: &str) -> Option<&ProductCmpt> {
        self.cmpts.get(qualified_name)
    }

    pub fn find_cmpt_mut(&mut self, qualified_name: &str) -> Option<&mut ProductCmpt> {
        self.cmpts.get_mut(qualified_name)
    }

    pub fn types(&self) -> impl Iterator<Item = &ProductCmptType> {
        self.types.values()
    }

    pub fn cmpts(&self) -> impl Iterator<Item = &ProductCmpt> {
        self.cmpts.values()
    }

    pub fn cmpt_names(&self) -> Vec<String> {
        self.cmpts.keys().cloned().collect()
    }

    /// File a component was loaded from
    pub fn source_of(&self, qualified_name: &str) -> Option<&Path> {
        self.sources.get(qualified_name).map(PathBuf::as_path)
    }

    /// Load every type and component file matched by the configuration below `root`.
    ///
    /// Unreadable files are collected in the report and skipped.
    pub fn load(config: &ProjectConfig, root: &Path) -> Result<(Repository, LoadReport)> {
        let mut repo = Repository::new();
        let mut report = LoadReport::default();
        let exclude = compile_patterns(&config.exclude_patterns())?;

        for path in expand_patterns(root, &config.type_patterns(), &exclude)? {
            match read_type_file(&path).and_then(|t| repo.add_type(t)) {
                Ok(()) => report.type_files += 1,
                Err(err) if err.is_recoverable() => report.errors.push(err),
                Err(err) => return Err(err),
            }
        }

        for path in expand_patterns(root, &config.cmpt_patterns(), &exclude)? {
            let loaded = read_cmpt_file(&path).and_then(|cmpt| {
                let name = cmpt.qualified_name.clone();
                repo.add_cmpt(cmpt)?;
                repo.sources.insert(name, path.clone());
                Ok(())
            });
            match loaded {
                Ok(()) => report.cmpt_files += 1,
                Err(err) if err.is_recoverable() => report.errors.push(err),
                Err(err) => return Err(err),
            }
        }

        info!(
            "Loaded {} types and {} components from {}",
            report.type_files,
            report.cmpt_files,
            root.display()
        );
        Ok((repo, report))
    }

    /// Write a component back to the file it was loaded from
    pub fn save_cmpt(&self, qualified_name: &str) -> Result<()> {
        let cmpt = self
            .find_cmpt(qualified_name)
            .ok_or_else(|| ModelError::unknown_product_cmpt(qualified_name))?;
        let path = self.source_of(qualified_name).ok_or_else(|| {
            ModelError::internal_error(format!("{qualified_name} was not loaded from a file"))
        })?;
        write_cmpt_file(cmpt, path)
    }
}

impl ModelContext for Repository {
    fn find_product_cmpt_type(&self, qualified_name: &str) -> Option<&ProductCmptType> {
        self.find_type(qualified_name)
    }

    fn find_product_cmpt(&self, qualified_name: &str) -> Option<&ProductCmpt> {
        self.find_cmpt(qualified_name)
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<glob::Pattern>> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p)
                .map_err(|e| ModelError::config_error(format!("Invalid glob pattern '{p}': {e}")))
        })
        .collect()
}

/// Files below `root` matching any pattern and no exclude pattern, sorted and deduplicated
fn expand_patterns(root: &Path, patterns: &[String], exclude: &[glob::Pattern]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let full = root.join(pattern);
        let full = full.to_string_lossy();
        let entries = glob::glob(&full)
            .map_err(|e| ModelError::config_error(format!("Invalid glob pattern '{pattern}': {e}")))?;
        for entry in entries.filter_map(|e| e.ok()) {
            let relative = entry.strip_prefix(root).unwrap_or(&entry);
            if exclude.iter().any(|p| p.matches_path(relative)) {
                debug!("Excluded {}", entry.display());
                continue;
            }
            if entry.is_file() {
                files.push(entry);
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "json")
}

/// Read one type from a YAML or JSON file
pub fn read_type_file(path: &Path) -> Result<ProductCmptType> {
    let content = fs::read_to_string(path).map_err(|e| ModelError::io_error(path, e))?;
    let source = path.display().to_string();
    if is_json(path) {
        serde_json::from_str(&content).map_err(|e| ModelError::parse_error(source, e.to_string()))
    } else {
        serde_yaml::from_str(&content).map_err(|e| ModelError::parse_error(source, e.to_string()))
    }
}

/// Read one component from a YAML or JSON element tree file
pub fn read_cmpt_file(path: &Path) -> Result<ProductCmpt> {
    let content = fs::read_to_string(path).map_err(|e| ModelError::io_error(path, e))?;
    let element = Element::from_yaml(&path.display().to_string(), &content)?;
    read_product_cmpt(&element)
}

pub fn write_cmpt_file(cmpt: &ProductCmpt, path: &Path) -> Result<()> {
    let element = write_product_cmpt(cmpt);
    let content = if is_json(path) {
        element.to_json()?
    } else {
        element.to_yaml()?
    };
    fs::write(path, content).map_err(|e| ModelError::io_error(path, e))?;
    debug!("Wrote {}", path.display());
    Ok(())
}
