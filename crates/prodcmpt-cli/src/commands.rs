//! CLI command implementations
//!
//! Every command loads the project (configuration plus type and component files) first. Read-only
//! work runs in parallel over the components; fixes are applied and written one at a time.

use anyhow::{Context, bail};
use prodcmpt_core::template::find_template_value;
use prodcmpt_core::{
    CmptReport, ConfigLoader, ContainerId, DeltaOptions, ModelContext, ProductCmpt,
    ProductCmptDelta, ProjectConfig, PropertyValueType, Repository, ResultExt, Severity,
    TemplateHierarchy, compute_delta, effective_content, fix_delta, validate_with_config,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::output::{CheckSummary, DeltaSummary, OutputFormatter};
use crate::{ConfigFormat, OutputFormat};

/// Configuration and repository of one project
struct Project {
    config: ProjectConfig,
    repo: Repository,
}

impl Project {
    fn load(config_path: Option<&Path>, dir: &Path) -> anyhow::Result<Self> {
        let (config, root) = ConfigLoader::load(config_path, Some(dir))?;
        debug!("Project root: {}", root.display());
        let (repo, report) = Repository::load(&config, &root)?;
        for err in &report.errors {
            warn!("Skipped: {}", err);
        }
        Ok(Self { config, repo })
    }

    /// The named components, or all of them when no name is given
    fn select(&self, names: &[String]) -> anyhow::Result<Vec<&ProductCmpt>> {
        if names.is_empty() {
            return Ok(self.repo.cmpts().collect());
        }
        names
            .iter()
            .map(|name| {
                self.repo
                    .find_cmpt(name)
                    .with_context(|| format!("Unknown product component '{name}'"))
            })
            .collect()
    }
}

/// Check command implementation
pub fn check_command(
    config_path: Option<&Path>,
    dir: &Path,
    names: &[String],
    format: OutputFormat,
    error_on_warnings: bool,
) -> anyhow::Result<bool> {
    let project = Project::load(config_path, dir)?;
    let selected = project.select(names)?;
    let hierarchy = TemplateHierarchy::build(project.repo.cmpts());

    let reports: Vec<CmptReport> = selected
        .par_iter()
        .map(|cmpt| CmptReport {
            cmpt: cmpt.qualified_name.clone(),
            messages: validate_with_config(&project.repo, cmpt, &hierarchy, &project.config),
        })
        .filter(|report| !report.messages.is_empty())
        .collect();

    let summary = CheckSummary::from_reports(selected.len(), &reports);
    info!(
        "Checked {} components: {} errors, {} warnings",
        summary.cmpts_checked, summary.errors, summary.warnings
    );
    OutputFormatter::new(format).print_check(&reports, &summary)?;

    let failed = reports.iter().flat_map(|r| r.messages.iter()).any(|m| {
        m.severity == Severity::Error || (error_on_warnings && m.severity == Severity::Warning)
    });
    Ok(!failed)
}

/// Delta command implementation
///
/// Without `fix`, finding any difference fails the command. With `fix`, templates are fixed
/// before the components based on them and every delta is computed right before it is applied,
/// so entries derived from a template always see the template's fixed state.
pub fn delta_command(
    config_path: Option<&Path>,
    dir: &Path,
    names: &[String],
    format: OutputFormat,
    fix: bool,
) -> anyhow::Result<bool> {
    let mut project = Project::load(config_path, dir)?;
    let options = DeltaOptions::from_config(&project.config);

    if !fix {
        let selected = project.select(names)?;
        let deltas: Vec<ProductCmptDelta> = selected
            .par_iter()
            .map(|cmpt| compute_delta(&project.repo, cmpt, &options))
            .filter(|delta| !delta.is_empty())
            .collect();
        let summary = DeltaSummary {
            cmpts_compared: selected.len(),
            cmpts_with_delta: deltas.len(),
            entries: deltas.iter().map(ProductCmptDelta::len).sum(),
            ..DeltaSummary::default()
        };
        OutputFormatter::new(format).print_delta(&deltas, &[], &summary)?;
        return Ok(deltas.is_empty());
    }

    let ordered = templates_first(&project, names)?;
    let mut summary = DeltaSummary {
        cmpts_compared: ordered.len(),
        ..DeltaSummary::default()
    };
    let mut deltas = Vec::new();
    let mut fixes = Vec::new();
    for name in &ordered {
        let Some(cmpt) = project.repo.find_cmpt(name) else {
            continue;
        };
        let delta = compute_delta(&project.repo, cmpt, &options);
        if delta.is_empty() {
            continue;
        }
        summary.cmpts_with_delta += 1;
        summary.entries += delta.len();

        if let Some(cmpt) = project.repo.find_cmpt_mut(name)
            && let Some(report) = fix_delta(cmpt, &delta).log_and_continue()
        {
            summary.entries_fixed += report.fixed;
            if project.repo.save_cmpt(name).log_and_continue().is_some() {
                summary.cmpts_saved += 1;
            }
            fixes.push((name.clone(), report));
        }
        deltas.push(delta);
    }

    OutputFormatter::new(format).print_delta(&deltas, &fixes, &summary)?;
    Ok(summary.cmpts_saved == summary.cmpts_with_delta)
}

/// Names of the selected components, every template ahead of the components based on it
fn templates_first(project: &Project, names: &[String]) -> anyhow::Result<Vec<String>> {
    let hierarchy = TemplateHierarchy::build(project.repo.cmpts());
    let mut ordered: Vec<(usize, String)> = project
        .select(names)?
        .into_iter()
        .map(|cmpt| {
            let depth = hierarchy.template_chain(&cmpt.qualified_name).len();
            (depth, cmpt.qualified_name.clone())
        })
        .collect();
    ordered.sort_by_key(|(depth, _)| *depth);
    Ok(ordered.into_iter().map(|(_, name)| name).collect())
}

/// Resolve command implementation
pub fn resolve_command(
    config_path: Option<&Path>,
    dir: &Path,
    name: &str,
    property: &str,
    kind: PropertyValueType,
    date: Option<&str>,
) -> anyhow::Result<bool> {
    let project = Project::load(config_path, dir)?;
    let repo = &project.repo;
    let cmpt = repo
        .find_cmpt(name)
        .with_context(|| format!("Unknown product component '{name}'"))?;
    let id = match date {
        Some(date) => cmpt
            .best_matching_generation(date)
            .with_context(|| format!("{name} has no generation effective on {date}"))?,
        None => default_container(repo, cmpt, property, kind),
    };
    let hierarchy = TemplateHierarchy::build(repo.cmpts());

    println!("{} {property} ({kind})", cmpt.container_label(id));
    println!("  template chain: {}", hierarchy.template_chain(name).join(" -> "));

    let local = cmpt
        .container(id)
        .and_then(|container| container.find_value(property, kind));
    match local {
        Some(value) => println!("  stored: {} {}", value.status(), render(value.value.local())),
        None => println!("  stored: nothing"),
    }

    match find_template_value(repo, cmpt, id, property, kind) {
        Some(hit) => println!(
            "  template value: {} from {}",
            render(hit.part.value.defined()),
            hit.cmpt.container_label(hit.container)
        ),
        None => println!("  template value: none"),
    }

    if let Some(value) = local {
        println!(
            "  effective: {}",
            render(effective_content(repo, cmpt, id, value))
        );
    }
    Ok(true)
}

/// Container holding `property`: the latest generation for properties changing over time
fn default_container(
    repo: &Repository,
    cmpt: &ProductCmpt,
    property: &str,
    kind: PropertyValueType,
) -> ContainerId {
    let changing = repo
        .find_product_cmpt_type(&cmpt.product_cmpt_type)
        .is_some_and(|t| t.changing_over_time)
        && repo
            .find_property(&cmpt.product_cmpt_type, property, kind)
            .is_some_and(|p| p.changing_over_time());
    if changing {
        cmpt.latest_generation().unwrap_or(ContainerId::Cmpt)
    } else {
        ContainerId::Cmpt
    }
}

fn render(content: Option<&impl std::fmt::Display>) -> String {
    content.map_or_else(|| "-".to_string(), |c| c.to_string())
}

/// Config init command implementation
pub fn config_init_command(dir: &Path, format: ConfigFormat, force: bool) -> anyhow::Result<bool> {
    let filename = match format {
        ConfigFormat::Yaml => "prodcmpt.yaml",
        ConfigFormat::Json => "prodcmpt.json",
        ConfigFormat::Toml => ".prodcmptrc.toml",
    };
    let config_path: PathBuf = dir.join(filename);

    if config_path.exists() && !force {
        bail!(
            "Configuration file '{}' already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = ProjectConfig::example();
    let content = match format {
        ConfigFormat::Yaml => serde_yaml::to_string(&config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
        ConfigFormat::Toml => toml::to_string_pretty(&config)?,
    };
    std::fs::write(&config_path, content)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Created configuration file: {}", config_path.display());
    Ok(true)
}

/// Config schema command implementation
pub fn config_schema_command() -> anyhow::Result<bool> {
    println!("{}", serde_json::to_string_pretty(&ProjectConfig::json_schema())?);
    Ok(true)
}

/// Config show command implementation
pub fn config_show_command(config_path: Option<&Path>, dir: &Path) -> anyhow::Result<bool> {
    let (config, root) = ConfigLoader::load(config_path, Some(dir))?;
    println!("# project root: {}", root.display());
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(true)
}
