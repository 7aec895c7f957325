//! Status changes, deletion and creation of template-aware values

use super::finder::{
    effective_cardinality, effective_content, find_template_link, find_template_value,
    template_cardinality, template_content,
};
use crate::cmpt::{
    ContainerId, PartId, ProductCmpt, PropertyContent, PropertyValue, TemplateValue,
    TemplateValueStatus,
};
use crate::error::ModelError;
use crate::model::{ModelContext, ProductCmptProperty, PropertyValueType};
use crate::repository::Repository;
use crate::result::Result;
use tracing::debug;

/// What deleting a value or link did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Removed from its container
    Removed,
    /// Kept and reset to UNDEFINED because a template still supplies a value
    ResetToUndefined,
}

/// Statuses a value of `cmpt` may carry.
///
/// INHERITED needs a template to inherit from. UNDEFINED is available to templates and to
/// components based on a template.
pub fn allowed_statuses(cmpt: &ProductCmpt) -> Vec<TemplateValueStatus> {
    let mut statuses = vec![TemplateValueStatus::Defined];
    if cmpt.uses_template() {
        statuses.push(TemplateValueStatus::Inherited);
    }
    if cmpt.is_template || cmpt.uses_template() {
        statuses.push(TemplateValueStatus::Undefined);
    }
    statuses
}

/// Initial value for a declared property in a container.
///
/// A component whose template supplies the property starts out inheriting it, with the
/// template content as fallback. Everything else starts with the model default.
pub fn initial_value<C>(
    ctx: &C,
    cmpt: &ProductCmpt,
    id: ContainerId,
    property: ProductCmptProperty<'_>,
    value_type: PropertyValueType,
) -> TemplateValue<PropertyContent>
where
    C: ModelContext + ?Sized,
{
    match template_content(ctx, cmpt, id, property.name(), value_type) {
        Some(content) => TemplateValue::Inherited {
            fallback: Some(content.clone()),
        },
        None => TemplateValue::Defined(PropertyContent::default_for(property, value_type)),
    }
}

/// Create the values the type declares for container `id` that are not stored yet.
///
/// Static properties live on the component, changing-over-time ones on each generation. A type
/// that does not change over time keeps every property on the component. Returns the number of
/// values created.
pub fn new_property_values<C>(ctx: &C, cmpt: &mut ProductCmpt, id: ContainerId) -> usize
where
    C: ModelContext + ?Sized,
{
    let mut created = Vec::new();
    {
        let cmpt: &ProductCmpt = cmpt;
        let Some(container) = cmpt.container(id) else {
            return 0;
        };
        let changing = ctx
            .find_product_cmpt_type(&cmpt.product_cmpt_type)
            .is_some_and(|t| t.changing_over_time);
        for property in ctx.find_all_properties(&cmpt.product_cmpt_type) {
            if (changing && property.changing_over_time()) != id.is_generation() {
                continue;
            }
            for &value_type in property.value_types() {
                if container.find_value(property.name(), value_type).is_none() {
                    let value = initial_value(ctx, cmpt, id, property, value_type);
                    created.push((property.name().to_string(), value_type, value));
                }
            }
        }
    }
    let count = created.len();
    for (name, value_type, value) in created {
        let part_id = cmpt.allocate_part_id();
        if let Some(container) = cmpt.container_mut(id) {
            container.add_value(PropertyValue::new(part_id, name, value_type, value));
        }
    }
    count
}

impl Repository {
    fn cmpt_or_err(&self, name: &str) -> Result<&ProductCmpt> {
        self.find_cmpt(name)
            .ok_or_else(|| ModelError::unknown_product_cmpt(name))
    }

    fn cmpt_mut_or_err(&mut self, name: &str) -> Result<&mut ProductCmpt> {
        self.find_cmpt_mut(name)
            .ok_or_else(|| ModelError::unknown_product_cmpt(name))
    }

    fn value_ref(&self, name: &str, id: ContainerId, value_id: PartId) -> Result<(&ProductCmpt, &PropertyValue)> {
        let cmpt = self.cmpt_or_err(name)?;
        let value = cmpt
            .container(id)
            .and_then(|c| c.value_by_id(value_id))
            .ok_or_else(|| {
                ModelError::unknown_part(cmpt.container_label(id), format!("value #{value_id}"))
            })?;
        Ok((cmpt, value))
    }

    /// Change the status of a stored property value.
    ///
    /// DEFINED copies the value currently in effect, so the effective value does not change.
    /// INHERITED refreshes the fallback from the template. UNDEFINED clears the value.
    pub fn set_value_status(
        &mut self,
        cmpt_name: &str,
        id: ContainerId,
        value_id: PartId,
        status: TemplateValueStatus,
    ) -> Result<()> {
        let (effective, template) = {
            let (cmpt, value) = self.value_ref(cmpt_name, id, value_id)?;
            let template =
                template_content(self, cmpt, id, &value.property_name, value.value_type).cloned();
            let effective = effective_content(self, cmpt, id, value)
                .cloned()
                .or_else(|| template.clone())
                .unwrap_or_else(|| PropertyContent::empty(value.value_type));
            (effective, template)
        };
        let cmpt = self.cmpt_mut_or_err(cmpt_name)?;
        if let Some(value) = cmpt
            .container_mut(id)
            .and_then(|c| c.value_by_id_mut(value_id))
        {
            debug!(
                "Setting {} of {} from {} to {}",
                value.property_name,
                cmpt_name,
                value.status(),
                status
            );
            value.value.set_status(status, effective, template);
        }
        Ok(())
    }

    /// Change the status of a link's cardinality, with the same rules as values
    pub fn set_link_status(
        &mut self,
        cmpt_name: &str,
        id: ContainerId,
        link_id: PartId,
        status: TemplateValueStatus,
    ) -> Result<()> {
        let (effective, template) = {
            let cmpt = self.cmpt_or_err(cmpt_name)?;
            let link = cmpt
                .container(id)
                .and_then(|c| c.link_by_id(link_id))
                .ok_or_else(|| {
                    ModelError::unknown_part(cmpt.container_label(id), format!("link #{link_id}"))
                })?;
            let template = template_cardinality(self, cmpt, id, &link.association, &link.target);
            let effective = effective_cardinality(self, cmpt, id, link);
            let effective = if effective.is_undefined() {
                template.unwrap_or_default()
            } else {
                effective
            };
            (effective, template)
        };
        let cmpt = self.cmpt_mut_or_err(cmpt_name)?;
        if let Some(link) = cmpt
            .container_mut(id)
            .and_then(|c| c.link_by_id_mut(link_id))
        {
            link.cardinality.set_status(status, effective, template);
        }
        Ok(())
    }

    /// Delete a stored value.
    ///
    /// A value whose template chain still supplies a value is reset to UNDEFINED instead of
    /// being removed; otherwise the next model sync would silently recreate it as inherited.
    pub fn delete_value(
        &mut self,
        cmpt_name: &str,
        id: ContainerId,
        value_id: PartId,
    ) -> Result<DeleteOutcome> {
        let outcome = {
            let (cmpt, value) = self.value_ref(cmpt_name, id, value_id)?;
            if find_template_value(self, cmpt, id, &value.property_name, value.value_type).is_some() {
                DeleteOutcome::ResetToUndefined
            } else {
                DeleteOutcome::Removed
            }
        };
        let cmpt = self.cmpt_mut_or_err(cmpt_name)?;
        if let Some(container) = cmpt.container_mut(id) {
            match outcome {
                DeleteOutcome::Removed => {
                    container.remove_value(value_id);
                }
                DeleteOutcome::ResetToUndefined => {
                    if let Some(value) = container.value_by_id_mut(value_id) {
                        value.value = TemplateValue::Undefined;
                    }
                }
            }
        }
        Ok(outcome)
    }

    /// Delete a link, keeping it as UNDEFINED while a template defines the same link
    pub fn delete_link(
        &mut self,
        cmpt_name: &str,
        id: ContainerId,
        link_id: PartId,
    ) -> Result<DeleteOutcome> {
        let outcome = {
            let cmpt = self.cmpt_or_err(cmpt_name)?;
            let link = cmpt
                .container(id)
                .and_then(|c| c.link_by_id(link_id))
                .ok_or_else(|| {
                    ModelError::unknown_part(cmpt.container_label(id), format!("link #{link_id}"))
                })?;
            if find_template_link(self, cmpt, id, &link.association, &link.target).is_some() {
                DeleteOutcome::ResetToUndefined
            } else {
                DeleteOutcome::Removed
            }
        };
        let cmpt = self.cmpt_mut_or_err(cmpt_name)?;
        if let Some(container) = cmpt.container_mut(id) {
            match outcome {
                DeleteOutcome::Removed => {
                    container.remove_link(link_id);
                }
                DeleteOutcome::ResetToUndefined => {
                    if let Some(link) = container.link_by_id_mut(link_id) {
                        link.cardinality = TemplateValue::Undefined;
                    }
                }
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmpt::{Cardinality, ProductCmptLink, ValueHolder};
    use crate::model::{ProductAttribute, ProductCmptType};

    fn content(text: &str) -> PropertyContent {
        PropertyContent::Attribute(ValueHolder::single(text))
    }

    fn repository() -> Repository {
        let mut repo = Repository::new();
        let mut product_type = ProductCmptType::new("model.Product");
        product_type.changing_over_time = false;
        let mut attribute = ProductAttribute::new("x");
        attribute.default_value = Some("0".into());
        product_type.attributes.push(attribute);
        repo.insert_type(product_type);

        let mut template = ProductCmpt::new("tmpl", "model.Product").as_template();
        template.container.add_value(PropertyValue::attribute(0, "x", Some("23")));
        template
            .container
            .add_link(ProductCmptLink::new(1, "Coverage", "cov.A", Cardinality::MANDATORY));
        repo.insert_cmpt(template);

        let mut cmpt = ProductCmpt::new("p", "model.Product").with_template("tmpl");
        cmpt.container.add_value(PropertyValue::new(
            0,
            "x",
            PropertyValueType::AttributeValue,
            TemplateValue::inherited(),
        ));
        cmpt.container
            .add_link(ProductCmptLink::inherited(1, "Coverage", "cov.A"));
        cmpt.container
            .add_link(ProductCmptLink::new(2, "Coverage", "cov.B", Cardinality::OPTIONAL));
        repo.insert_cmpt(cmpt);
        repo
    }

    fn value_of(repo: &Repository) -> &PropertyValue {
        &repo.find_cmpt("p").unwrap().container.values[0]
    }

    #[test]
    fn test_defined_copies_inherited_value() {
        let mut repo = repository();
        repo.set_value_status("p", ContainerId::Cmpt, 0, TemplateValueStatus::Defined)
            .unwrap();
        assert_eq!(value_of(&repo).value, TemplateValue::Defined(content("23")));
    }

    #[test]
    fn test_toggling_status_follows_live_template() {
        let mut repo = repository();
        repo.find_cmpt_mut("p").unwrap().container.values[0].value =
            TemplateValue::Defined(content("15"));

        repo.set_value_status("p", ContainerId::Cmpt, 0, TemplateValueStatus::Inherited)
            .unwrap();
        assert_eq!(
            value_of(&repo).value,
            TemplateValue::Inherited {
                fallback: Some(content("23"))
            }
        );
        repo.set_value_status("p", ContainerId::Cmpt, 0, TemplateValueStatus::Defined)
            .unwrap();
        // the inherited 23 was copied, the old local 15 is gone
        assert_eq!(value_of(&repo).value, TemplateValue::Defined(content("23")));
        repo.set_value_status("p", ContainerId::Cmpt, 0, TemplateValueStatus::Inherited)
            .unwrap();
        repo.set_value_status("p", ContainerId::Cmpt, 0, TemplateValueStatus::Defined)
            .unwrap();
        assert_eq!(value_of(&repo).value, TemplateValue::Defined(content("23")));
    }

    #[test]
    fn test_round_trip_without_resolvable_template_keeps_value() {
        let mut repo = repository();
        let cmpt = repo.find_cmpt_mut("p").unwrap();
        cmpt.template = Some("missing".into());
        cmpt.container.values[0].value = TemplateValue::Defined(content("15"));

        repo.set_value_status("p", ContainerId::Cmpt, 0, TemplateValueStatus::Inherited)
            .unwrap();
        repo.set_value_status("p", ContainerId::Cmpt, 0, TemplateValueStatus::Defined)
            .unwrap();
        assert_eq!(value_of(&repo).value, TemplateValue::Defined(content("15")));
    }

    #[test]
    fn test_delete_value_with_template_resets_to_undefined() {
        let mut repo = repository();
        let outcome = repo.delete_value("p", ContainerId::Cmpt, 0).unwrap();
        assert_eq!(outcome, DeleteOutcome::ResetToUndefined);
        assert_eq!(value_of(&repo).status(), TemplateValueStatus::Undefined);

        let outcome = repo.delete_value("tmpl", ContainerId::Cmpt, 0).unwrap();
        assert_eq!(outcome, DeleteOutcome::Removed);
        assert!(repo.find_cmpt("tmpl").unwrap().container.values.is_empty());
    }

    #[test]
    fn test_delete_link() {
        let mut repo = repository();
        assert_eq!(
            repo.delete_link("p", ContainerId::Cmpt, 1).unwrap(),
            DeleteOutcome::ResetToUndefined
        );
        assert_eq!(
            repo.delete_link("p", ContainerId::Cmpt, 2).unwrap(),
            DeleteOutcome::Removed
        );
        let links = &repo.find_cmpt("p").unwrap().container.links;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].status(), TemplateValueStatus::Undefined);
    }

    #[test]
    fn test_unknown_part_is_an_error() {
        let mut repo = repository();
        let err = repo
            .set_value_status("p", ContainerId::Cmpt, 99, TemplateValueStatus::Defined)
            .unwrap_err();
        assert!(matches!(err, ModelError::UnknownPart { .. }));
        assert!(repo.delete_link("nope", ContainerId::Cmpt, 0).is_err());
    }

    #[test]
    fn test_allowed_statuses() {
        let repo = repository();
        assert_eq!(
            allowed_statuses(repo.find_cmpt("tmpl").unwrap()),
            vec![TemplateValueStatus::Defined, TemplateValueStatus::Undefined]
        );
        assert_eq!(allowed_statuses(repo.find_cmpt("p").unwrap()).len(), 3);
        assert_eq!(
            allowed_statuses(&ProductCmpt::new("plain", "model.Product")),
            vec![TemplateValueStatus::Defined]
        );
    }

    #[test]
    fn test_new_property_values() {
        let repo = repository();
        let mut fresh = ProductCmpt::new("fresh", "model.Product").with_template("tmpl");
        assert_eq!(new_property_values(&repo, &mut fresh, ContainerId::Cmpt), 1);
        assert_eq!(
            fresh.container.values[0].value,
            TemplateValue::Inherited {
                fallback: Some(content("23"))
            }
        );

        let mut plain = ProductCmpt::new("plain", "model.Product");
        new_property_values(&repo, &mut plain, ContainerId::Cmpt);
        assert_eq!(plain.container.values[0].value, TemplateValue::Defined(content("0")));
        assert_eq!(new_property_values(&repo, &mut plain, ContainerId::Cmpt), 0);
    }
}
