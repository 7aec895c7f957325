//! Validation of product components
//!
//! Findings are [`Message`]s with stable codes, never errors. A component is checked for its
//! template reference, the statuses of its parts and the cardinalities of the links in every
//! container. The project configuration may disable codes or override their severity.

pub mod link_container;

pub use link_container::{
    MSGCODE_DUPLICATE_RELATION_TARGET, MSGCODE_MAX_CARDINALITY_EXCEEDS_MODEL_MAX,
    MSGCODE_MIN_CARDINALITY_FALLS_BELOW_MODEL_MIN, validate_links,
};

use crate::cmpt::ProductCmpt;
use crate::config::ProjectConfig;
use crate::diagnostics::{Message, MessageList, Severity};
use crate::model::ModelContext;
use crate::repository::Repository;
use crate::template::{TemplateHierarchy, validate_template};
use serde::Serialize;
use tracing::debug;

/// Findings of one component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CmptReport {
    pub cmpt: String,
    pub messages: MessageList,
}

impl CmptReport {
    pub fn errors(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Error)
    }
}

/// All built-in checks of one component
pub fn validate_cmpt<C>(ctx: &C, cmpt: &ProductCmpt, hierarchy: &TemplateHierarchy<'_>) -> MessageList
where
    C: ModelContext + ?Sized,
{
    let mut list = validate_template(ctx, cmpt, hierarchy);
    for id in cmpt.container_ids() {
        list.append(validate_links(ctx, cmpt, id));
    }
    list
}

/// Validate one component and apply the configured code filters and severities
pub fn validate_with_config<C>(
    ctx: &C,
    cmpt: &ProductCmpt,
    hierarchy: &TemplateHierarchy<'_>,
    config: &ProjectConfig,
) -> MessageList
where
    C: ModelContext + ?Sized,
{
    if !config.validation_enabled() {
        return MessageList::new();
    }
    let mut list = validate_cmpt(ctx, cmpt, hierarchy);
    list.apply_overrides(&config.disabled_codes(), &config.severity_overrides());
    list.sort_by_severity();
    debug!("{}: {} messages", cmpt.qualified_name, list.len());
    list
}

/// Validate every component of the repository, returning the ones with findings
pub fn validate_repository(repo: &Repository, config: &ProjectConfig) -> Vec<CmptReport> {
    let hierarchy = TemplateHierarchy::build(repo.cmpts());
    repo.cmpts()
        .map(|cmpt| CmptReport {
            cmpt: cmpt.qualified_name.clone(),
            messages: validate_with_config(repo, cmpt, &hierarchy, config),
        })
        .filter(|report| !report.messages.is_empty())
        .collect()
}
