//! Template resolution
//!
//! Resolution starts at the *template* of the asking container and walks up the chain:
//!
//! * the template container has no value for the property: nothing is found
//! * the value there is DEFINED: it is the result
//! * the value there is UNDEFINED: nothing is found, even if a higher template defines it
//! * the value there is INHERITED: continue with that container's own template
//!
//! Missing template references end the walk without an error. The walk remembers the
//! components it passed so a cyclic template graph cannot loop forever.

use crate::cmpt::{
    Cardinality, ContainerId, ProductCmpt, ProductCmptLink, PropertyContent, PropertyValue,
    PropertyValueContainer, TemplateValueStatus,
};
use crate::model::{ModelContext, PropertyValueType};
use std::collections::HashSet;
use tracing::{trace, warn};

/// A value found in a template container
#[derive(Debug, Clone, Copy)]
pub struct TemplateHit<'a, T> {
    pub cmpt: &'a ProductCmpt,
    pub container: ContainerId,
    pub part: &'a T,
}

/// The container of `cmpt`'s template that corresponds to `id`.
///
/// For the component container this is the template component itself. For a generation it is
/// the template's generation effective on the generation's valid-from date.
pub fn template_container<'a, C>(
    ctx: &'a C,
    cmpt: &ProductCmpt,
    id: ContainerId,
) -> Option<(&'a ProductCmpt, ContainerId)>
where
    C: ModelContext + ?Sized,
{
    let template = ctx.find_product_cmpt(cmpt.template.as_deref()?)?;
    match id {
        ContainerId::Cmpt => Some((template, ContainerId::Cmpt)),
        ContainerId::Generation(index) => {
            let valid_from = &cmpt.generations.get(index)?.valid_from;
            let generation = template.best_matching_generation(valid_from)?;
            Some((template, generation))
        }
    }
}

/// Walk the template chain of `cmpt`'s container `id` looking for a DEFINED part.
///
/// `find` looks the part up in one container, `status` reports its inheritance status.
fn resolve<'a, C, T, F, S>(
    ctx: &'a C,
    cmpt: &'a ProductCmpt,
    id: ContainerId,
    find: F,
    status: S,
) -> Option<TemplateHit<'a, T>>
where
    C: ModelContext + ?Sized,
    F: Fn(&'a PropertyValueContainer) -> Option<&'a T>,
    S: Fn(&T) -> TemplateValueStatus,
{
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(cmpt.qualified_name.as_str());

    let mut current = (cmpt, id);
    loop {
        let (template, template_id) = template_container(ctx, current.0, current.1)?;
        if !visited.insert(template.qualified_name.as_str()) {
            warn!(
                "Template cycle reached {} while resolving from {}",
                template.qualified_name, cmpt.qualified_name
            );
            return None;
        }
        let part = find(template.container(template_id)?)?;
        match status(part) {
            TemplateValueStatus::Defined => {
                trace!(
                    "Resolved template part in {}",
                    template.container_label(template_id)
                );
                return Some(TemplateHit {
                    cmpt: template,
                    container: template_id,
                    part,
                });
            }
            TemplateValueStatus::Undefined => return None,
            TemplateValueStatus::Inherited => current = (template, template_id),
        }
    }
}

/// Nearest DEFINED template value for a property of `cmpt`'s container `id`
pub fn find_template_value<'a, C>(
    ctx: &'a C,
    cmpt: &'a ProductCmpt,
    id: ContainerId,
    property_name: &str,
    value_type: PropertyValueType,
) -> Option<TemplateHit<'a, PropertyValue>>
where
    C: ModelContext + ?Sized,
{
    resolve(
        ctx,
        cmpt,
        id,
        |container| container.find_value(property_name, value_type),
        PropertyValue::status,
    )
}

/// Nearest DEFINED template link with the same association and target
pub fn find_template_link<'a, C>(
    ctx: &'a C,
    cmpt: &'a ProductCmpt,
    id: ContainerId,
    association: &str,
    target: &str,
) -> Option<TemplateHit<'a, ProductCmptLink>>
where
    C: ModelContext + ?Sized,
{
    resolve(
        ctx,
        cmpt,
        id,
        |container| container.find_link(association, target),
        ProductCmptLink::status,
    )
}

/// Content of the nearest DEFINED template value
pub fn template_content<'a, C>(
    ctx: &'a C,
    cmpt: &'a ProductCmpt,
    id: ContainerId,
    property_name: &str,
    value_type: PropertyValueType,
) -> Option<&'a PropertyContent>
where
    C: ModelContext + ?Sized,
{
    find_template_value(ctx, cmpt, id, property_name, value_type)
        .and_then(|hit| hit.part.value.defined())
}

/// Cardinality of the nearest DEFINED template link
pub fn template_cardinality<'a, C>(
    ctx: &'a C,
    cmpt: &'a ProductCmpt,
    id: ContainerId,
    association: &str,
    target: &str,
) -> Option<Cardinality>
where
    C: ModelContext + ?Sized,
{
    find_template_link(ctx, cmpt, id, association, target)
        .and_then(|hit| hit.part.cardinality.defined().copied())
}

/// The value in effect for a stored property value.
///
/// DEFINED yields the local value, UNDEFINED nothing. INHERITED yields the live template value
/// and only falls back to the locally cached copy when the chain does not resolve.
pub fn effective_content<'a, C>(
    ctx: &'a C,
    cmpt: &'a ProductCmpt,
    id: ContainerId,
    value: &'a PropertyValue,
) -> Option<&'a PropertyContent>
where
    C: ModelContext + ?Sized,
{
    let template = match value.status() {
        TemplateValueStatus::Inherited => {
            template_content(ctx, cmpt, id, &value.property_name, value.value_type)
        }
        _ => None,
    };
    value.value.effective(template)
}

/// The cardinality in effect for a link, [`Cardinality::UNDEFINED`] when nothing is in effect.
///
/// Unlike property values, an INHERITED link never falls back to its cached cardinality: without
/// a resolvable ancestor link it is UNDEFINED.
pub fn effective_cardinality<'a, C>(
    ctx: &'a C,
    cmpt: &'a ProductCmpt,
    id: ContainerId,
    link: &'a ProductCmptLink,
) -> Cardinality
where
    C: ModelContext + ?Sized,
{
    match link.status() {
        TemplateValueStatus::Defined => link
            .cardinality
            .defined()
            .copied()
            .unwrap_or(Cardinality::UNDEFINED),
        TemplateValueStatus::Inherited => {
            template_cardinality(ctx, cmpt, id, &link.association, &link.target)
                .unwrap_or(Cardinality::UNDEFINED)
        }
        TemplateValueStatus::Undefined => Cardinality::UNDEFINED,
    }
}
