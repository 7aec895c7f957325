//! Product Component Core
//!
//! Engine for product components that instantiate a product component type and may be based on
//! a chain of templates. This crate resolves template values along that chain, computes and
//! fixes the delta between stored components and their current type, and validates the
//! cardinalities of component links.

pub mod cmpt;
pub mod config;
pub mod delta;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod persistence;
pub mod repository;
pub mod result;
pub mod template;
pub mod validation;

// Re-export commonly used types
pub use cmpt::{
    Cardinality, ContainerId, MANY, PartId, ProductCmpt, ProductCmptGeneration, ProductCmptLink,
    PropertyContent, PropertyValue, PropertyValueContainer, TemplateValue, TemplateValueStatus,
    ValueHolder,
};
pub use config::{ConfigLoader, ProjectConfig};
pub use delta::{
    DeltaAction, DeltaEntry, DeltaOptions, DeltaType, FixReport, ProductCmptDelta, compute_delta,
    fix_delta,
};
pub use diagnostics::{Message, MessageList, ObjectProperty, Severity};
pub use error::{ErrorKind, ModelError};
pub use model::{
    ModelContext, ProductAssociation, ProductAttribute, ProductCmptProperty, ProductCmptType,
    PropertyValueType, ValueSet, ValueSetType,
};
pub use repository::{LoadReport, Repository};
pub use result::{Result, ResultExt};
pub use template::{
    DeleteOutcome, TemplateHierarchy, effective_cardinality, effective_content,
    find_template_link, find_template_value,
};
pub use validation::{CmptReport, validate_cmpt, validate_repository, validate_with_config};

/// Initialize the tracing subscriber for logging
pub fn init_tracing() {
    init_tracing_with_level(None);
}

/// Initialize tracing, with `level` taking precedence over the default filter but not over
/// `RUST_LOG`
pub fn init_tracing_with_level(level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let default = level.map_or_else(|| "prodcmpt=info".to_string(), |l| format!("prodcmpt={l}"));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
