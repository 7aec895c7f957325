//! Template hierarchies
//!
//! A product component may be based on a template, which may itself be based on another
//! template. Each stored value and link carries a [`crate::cmpt::TemplateValueStatus`] telling
//! whether it is defined locally, inherited from the template chain or explicitly undefined.
//!
//! - [`finder`] resolves values and links along the chain
//! - [`edit`] changes statuses and deletes parts the way the chain requires
//! - [`hierarchy`] builds the template graph and checks template references

pub mod edit;
pub mod finder;
pub mod hierarchy;

pub use edit::{DeleteOutcome, allowed_statuses, initial_value, new_property_values};
pub use finder::{
    TemplateHit, effective_cardinality, effective_content, find_template_link,
    find_template_value, template_cardinality, template_container, template_content,
};
pub use hierarchy::{TemplateHierarchy, validate_template};
