use super::{ContainerDelta, DeltaAction, DeltaEntry, DeltaType, EntryId, ProductCmptDelta};
use crate::cmpt::{
    ContainerId, ProductCmpt, ProductCmptLink, PropertyContent, PropertyValue,
    PropertyValueContainer, TemplateValue, TemplateValueStatus, ValueHolder,
};
use crate::config::ProjectConfig;
use crate::model::{ModelContext, ProductAssociation, ProductCmptProperty, PropertyValueType};
use crate::template::edit::initial_value;
use crate::template::finder::{template_cardinality, template_container, template_content};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Optional checks of the delta computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaOptions {
    pub check_hidden_attributes: bool,
    pub check_inherited_fallbacks: bool,
}

impl Default for DeltaOptions {
    fn default() -> Self {
        Self {
            check_hidden_attributes: true,
            check_inherited_fallbacks: true,
        }
    }
}

impl DeltaOptions {
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            check_hidden_attributes: config.check_hidden_attributes(),
            check_inherited_fallbacks: config.check_inherited_fallbacks(),
        }
    }
}

/// Compute the delta between `cmpt` and its type.
///
/// A component whose type cannot be found yields an empty delta.
pub fn compute_delta<C>(ctx: &C, cmpt: &ProductCmpt, options: &DeltaOptions) -> ProductCmptDelta
where
    C: ModelContext + ?Sized,
{
    let mut delta = ProductCmptDelta {
        cmpt: cmpt.qualified_name.clone(),
        root: ContainerDelta::new(ContainerId::Cmpt, cmpt.container_label(ContainerId::Cmpt)),
        generations: cmpt
            .generation_ids()
            .map(|id| ContainerDelta::new(id, cmpt.container_label(id)))
            .collect(),
    };
    let Some(product_type) = ctx.find_product_cmpt_type(&cmpt.product_cmpt_type) else {
        warn!(
            "Type {} of {} not found, no delta computed",
            cmpt.product_cmpt_type, cmpt.qualified_name
        );
        return delta;
    };

    let mut builder = DeltaBuilder {
        ctx,
        cmpt,
        options,
        changing: product_type.changing_over_time,
        properties: ctx.find_all_properties(&cmpt.product_cmpt_type),
        associations: ctx.find_all_associations(&cmpt.product_cmpt_type),
        next_id: 0,
        moved: HashMap::new(),
    };

    // orphans first, so values that moved level can serve as predecessors
    let ids = cmpt.container_ids();
    let orphans: Vec<Vec<DeltaEntry>> = ids.iter().map(|&id| builder.orphaned_parts(id)).collect();
    for (id, orphans) in ids.into_iter().zip(orphans) {
        let mut entries = builder.declared_parts(id);
        entries.extend(orphans);
        match id {
            ContainerId::Cmpt => delta.root.entries = entries,
            ContainerId::Generation(index) => delta.generations[index].entries = entries,
        }
    }

    debug!(
        "Computed {} delta entries for {}",
        delta.len(),
        cmpt.qualified_name
    );
    delta
}

struct DeltaBuilder<'a, C: ModelContext + ?Sized> {
    ctx: &'a C,
    cmpt: &'a ProductCmpt,
    options: &'a DeltaOptions,
    /// Whether the type has generations at all
    changing: bool,
    properties: Vec<ProductCmptProperty<'a>>,
    associations: Vec<&'a ProductAssociation>,
    next_id: EntryId,
    /// VALUE_WITHOUT_PROPERTY entries of values whose property moved to the other level
    moved: HashMap<(ContainerId, String, PropertyValueType), EntryId>,
}

impl<'a, C: ModelContext + ?Sized> DeltaBuilder<'a, C> {
    /// Whether a part with the given changing-over-time flag is stored in container `id`
    fn belongs_here(&self, changing_over_time: bool, id: ContainerId) -> bool {
        (self.changing && changing_over_time) == id.is_generation()
    }

    fn entry(
        &mut self,
        container: ContainerId,
        delta_type: DeltaType,
        part_name: impl Into<String>,
        value_type: Option<PropertyValueType>,
        description: impl Into<String>,
        action: DeltaAction,
    ) -> DeltaEntry {
        let id = self.next_id;
        self.next_id += 1;
        DeltaEntry {
            id,
            container,
            delta_type,
            part_name: part_name.into(),
            value_type,
            predecessor: None,
            description: description.into(),
            action,
        }
    }

    /// Entries for the declared properties and the template links of container `id`
    fn declared_parts(&mut self, id: ContainerId) -> Vec<DeltaEntry> {
        let mut entries = Vec::new();
        let cmpt = self.cmpt;
        let Some(container) = cmpt.container(id) else {
            return entries;
        };
        for property in self.properties.clone() {
            if self.belongs_here(property.changing_over_time(), id) {
                self.check_property(id, container, property, &mut entries);
            }
        }
        self.check_template_links(id, container, &mut entries);
        entries
    }

    fn declared_kinds(&self, property_name: &str, id: ContainerId) -> Vec<PropertyValueType> {
        self.properties
            .iter()
            .filter(|p| p.name() == property_name && self.belongs_here(p.changing_over_time(), id))
            .flat_map(|p| p.value_types().iter().copied())
            .collect()
    }

    fn check_property(
        &mut self,
        id: ContainerId,
        container: &'a PropertyValueContainer,
        property: ProductCmptProperty<'a>,
        entries: &mut Vec<DeltaEntry>,
    ) {
        let name = property.name();
        let declared = self.declared_kinds(name, id);
        let foreign: Vec<&PropertyValue> = container
            .values_named(name)
            .filter(|v| !declared.contains(&v.value_type))
            .collect();

        if !foreign.is_empty() {
            let create = property
                .value_types()
                .iter()
                .filter(|&&kind| container.find_value(name, kind).is_none())
                .map(|&kind| (kind, initial_value(self.ctx, self.cmpt, id, property, kind)))
                .collect();
            let stored: Vec<String> = foreign.iter().map(|v| v.value_type.to_string()).collect();
            let entry = self.entry(
                id,
                DeltaType::PropertyTypeMismatch,
                name,
                None,
                format!("stored as {}, declared as {:?}", stored.join(", "), property.property_type()),
                DeltaAction::ReplaceValues {
                    remove: foreign.iter().map(|v| v.id).collect(),
                    create,
                },
            );
            entries.push(entry);
        }

        for &kind in property.value_types() {
            match container.find_value(name, kind) {
                Some(value) => self.check_value(id, property, value, entries),
                None if foreign.is_empty() => {
                    let entry = self.missing_value(id, property, kind);
                    entries.push(entry);
                }
                None => {}
            }
        }
    }

    fn missing_value(
        &mut self,
        id: ContainerId,
        property: ProductCmptProperty<'a>,
        kind: PropertyValueType,
    ) -> DeltaEntry {
        let name = property.name();
        let cmpt = self.cmpt;
        let source_id = match id {
            ContainerId::Cmpt => cmpt.latest_generation(),
            ContainerId::Generation(_) => Some(ContainerId::Cmpt),
        };
        let moved = source_id.and_then(|source_id| {
            let predecessor = self.moved.get(&(source_id, name.to_string(), kind)).copied()?;
            let source = cmpt.container(source_id)?.find_value(name, kind)?;
            Some((source_id, source, predecessor))
        });

        match moved {
            Some((source_id, source, predecessor)) => {
                let value = self.relocated(id, property, kind, &source.value);
                let description = format!("moved from {}", cmpt.container_label(source_id));
                let mut entry = self.entry(
                    id,
                    DeltaType::MissingPropertyValue,
                    name,
                    Some(kind),
                    description,
                    DeltaAction::CreateValue {
                        value_type: kind,
                        value,
                    },
                );
                entry.predecessor = Some(predecessor);
                entry
            }
            None => {
                let value = initial_value(self.ctx, self.cmpt, id, property, kind);
                self.entry(
                    id,
                    DeltaType::MissingPropertyValue,
                    name,
                    Some(kind),
                    "no value stored",
                    DeltaAction::CreateValue {
                        value_type: kind,
                        value,
                    },
                )
            }
        }
    }

    /// A value moved from the other level: its content is kept, the fallback of an inherited
    /// value comes from the template of the new level
    fn relocated(
        &self,
        id: ContainerId,
        property: ProductCmptProperty<'a>,
        kind: PropertyValueType,
        source: &TemplateValue<PropertyContent>,
    ) -> TemplateValue<PropertyContent> {
        match source {
            TemplateValue::Defined(content) => TemplateValue::Defined(
                self.content_fix(property, content)
                    .map(|(_, fixed, _)| fixed)
                    .unwrap_or_else(|| content.clone()),
            ),
            TemplateValue::Inherited { fallback } => TemplateValue::Inherited {
                fallback: template_content(self.ctx, self.cmpt, id, property.name(), kind)
                    .cloned()
                    .or_else(|| fallback.clone()),
            },
            TemplateValue::Undefined => TemplateValue::Undefined,
        }
    }

    fn check_value(
        &mut self,
        id: ContainerId,
        property: ProductCmptProperty<'a>,
        value: &'a PropertyValue,
        entries: &mut Vec<DeltaEntry>,
    ) {
        match &value.value {
            TemplateValue::Defined(content) => {
                if let Some((delta_type, fixed, description)) = self.content_fix(property, content) {
                    let entry = self.entry(
                        id,
                        delta_type,
                        property.name(),
                        Some(value.value_type),
                        description,
                        DeltaAction::SetValue {
                            value_id: value.id,
                            value: TemplateValue::Defined(fixed),
                        },
                    );
                    entries.push(entry);
                }
            }
            TemplateValue::Inherited {
                fallback: Some(cached),
            } if self.options.check_inherited_fallbacks => {
                let (ctx, cmpt) = (self.ctx, self.cmpt);
                let live = template_content(
                    ctx,
                    cmpt,
                    id,
                    &value.property_name,
                    value.value_type,
                );
                if let Some(live) = live.filter(|live| *live != cached) {
                    let entry = self.entry(
                        id,
                        DeltaType::InheritedTemplateMismatch,
                        property.name(),
                        Some(value.value_type),
                        format!("cached {cached}, template has {live}"),
                        DeltaAction::SetValue {
                            value_id: value.id,
                            value: TemplateValue::Inherited {
                                fallback: Some(live.clone()),
                            },
                        },
                    );
                    entries.push(entry);
                }
            }
            _ => {}
        }
    }

    /// The fix a defined content needs to match its property, if any
    fn content_fix(
        &self,
        property: ProductCmptProperty<'a>,
        content: &PropertyContent,
    ) -> Option<(DeltaType, PropertyContent, String)> {
        match (property, content) {
            (ProductCmptProperty::Attribute(attribute), PropertyContent::Attribute(holder)) => {
                let shaped = if attribute.multi_value {
                    holder.to_multi()
                } else {
                    holder.to_single()
                };
                if self.options.check_hidden_attributes && !attribute.visible {
                    let default = ValueHolder::for_default(
                        attribute.default_value.as_deref(),
                        attribute.multi_value,
                    );
                    if shaped != default {
                        return Some((
                            DeltaType::HiddenAttributeMismatch,
                            PropertyContent::Attribute(default.clone()),
                            format!("hidden attribute has {holder}, default is {default}"),
                        ));
                    }
                }
                (shaped != *holder).then(|| {
                    let description = if attribute.multi_value {
                        "single value stored for multi-value attribute"
                    } else {
                        "multiple values stored for single-value attribute"
                    };
                    (
                        DeltaType::ValueHolderMismatch,
                        PropertyContent::Attribute(shaped),
                        description.to_string(),
                    )
                })
            }
            (ProductCmptProperty::PolicyAttribute(attribute), PropertyContent::ValueSet(value_set)) => {
                let allowed = attribute.allowed_value_set_types();
                if allowed.contains(&value_set.value_set_type()) {
                    return None;
                }
                let target = attribute.conversion_target();
                Some((
                    DeltaType::ValueSetMismatch,
                    PropertyContent::ValueSet(value_set.convert_to(target)),
                    format!(
                        "value set kind {} not allowed, converting to {}",
                        value_set.value_set_type(),
                        target
                    ),
                ))
            }
            _ => None,
        }
    }

    /// Links the template defines but the container lacks, and inherited links the template dropped
    fn check_template_links(
        &mut self,
        id: ContainerId,
        container: &'a PropertyValueContainer,
        entries: &mut Vec<DeltaEntry>,
    ) {
        let (ctx, cmpt) = (self.ctx, self.cmpt);
        let Some((template, template_id)) = template_container(ctx, cmpt, id) else {
            return;
        };
        let Some(template_links) = template.container(template_id) else {
            return;
        };

        for template_link in &template_links.links {
            if template_link.status() != TemplateValueStatus::Defined
                || !self.association_belongs_here(&template_link.association, id)
                || container
                    .find_link(&template_link.association, &template_link.target)
                    .is_some()
            {
                continue;
            }
            let fallback = template_cardinality(
                ctx,
                cmpt,
                id,
                &template_link.association,
                &template_link.target,
            );
            let entry = self.entry(
                id,
                DeltaType::MissingTemplateLink,
                template_link.name(),
                None,
                format!("defined in {}", template.container_label(template_id)),
                DeltaAction::CreateLink {
                    association: template_link.association.clone(),
                    target: template_link.target.clone(),
                    cardinality: TemplateValue::Inherited { fallback },
                },
            );
            entries.push(entry);
        }

        for link in &container.links {
            if link.status() == TemplateValueStatus::Inherited
                && self.association_belongs_here(&link.association, id)
                && template_links.find_link(&link.association, &link.target).is_none()
            {
                let entry = self.entry(
                    id,
                    DeltaType::RemovedTemplateLink,
                    link.name(),
                    None,
                    format!("no longer in {}", template.container_label(template_id)),
                    DeltaAction::RemoveLink { link_id: link.id },
                );
                entries.push(entry);
            }
        }
    }

    fn association_belongs_here(&self, association: &str, id: ContainerId) -> bool {
        self.associations
            .iter()
            .any(|a| a.name == association && self.belongs_here(a.changing_over_time, id))
    }

    /// Entries for stored values and links the type does not declare for container `id`
    fn orphaned_parts(&mut self, id: ContainerId) -> Vec<DeltaEntry> {
        let mut entries = Vec::new();
        let cmpt = self.cmpt;
        let Some(container) = cmpt.container(id) else {
            return entries;
        };

        for value in &container.values {
            let declared: Vec<ProductCmptProperty<'a>> = self
                .properties
                .iter()
                .filter(|p| p.name() == value.property_name)
                .copied()
                .collect();
            if declared
                .iter()
                .any(|p| self.belongs_here(p.changing_over_time(), id))
            {
                continue;
            }
            let description = if declared.is_empty() {
                "property no longer declared"
            } else if id.is_generation() {
                "property no longer changes over time"
            } else {
                "property now changes over time"
            };
            let entry = self.entry(
                id,
                DeltaType::ValueWithoutProperty,
                value.property_name.as_str(),
                Some(value.value_type),
                description,
                DeltaAction::RemoveValue { value_id: value.id },
            );
            if declared.iter().any(|p| p.has_value_type(value.value_type)) {
                self.moved
                    .insert((id, value.property_name.clone(), value.value_type), entry.id);
            }
            entries.push(entry);
        }

        for link in &container.links {
            let association = self
                .associations
                .iter()
                .find(|a| a.name == link.association)
                .copied();
            match association {
                None => {
                    let entry = self.entry(
                        id,
                        DeltaType::LinkWithoutAssociation,
                        link.name(),
                        None,
                        format!("association {} no longer declared", link.association),
                        DeltaAction::RemoveLink { link_id: link.id },
                    );
                    entries.push(entry);
                }
                Some(association) if !self.belongs_here(association.changing_over_time, id) => {
                    let destinations = self.link_destinations(id, link);
                    let entry = self.entry(
                        id,
                        DeltaType::LinkChangingOverTimeMismatch,
                        link.name(),
                        None,
                        if id.is_generation() {
                            "association no longer changes over time"
                        } else {
                            "association now changes over time"
                        },
                        DeltaAction::MoveLink {
                            link_id: link.id,
                            link: link.clone(),
                            destinations,
                        },
                    );
                    entries.push(entry);
                }
                Some(_) => {}
            }
        }
        entries
    }

    /// Where a link stored on the wrong level goes.
    ///
    /// A component link is copied into every generation lacking it. Of the generation links
    /// only the latest generation's one moves up; the others are dropped.
    fn link_destinations(&self, id: ContainerId, link: &ProductCmptLink) -> Vec<ContainerId> {
        let lacks = |target: ContainerId| {
            self.cmpt
                .container(target)
                .is_some_and(|c| c.find_link(&link.association, &link.target).is_none())
        };
        match id {
            ContainerId::Cmpt => self.cmpt.generation_ids().filter(|&g| lacks(g)).collect(),
            generation if Some(generation) == self.cmpt.latest_generation() && lacks(ContainerId::Cmpt) => {
                vec![ContainerId::Cmpt]
            }
            ContainerId::Generation(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmpt::Cardinality;
    use crate::model::{PolicyAttribute, ProductAttribute, ProductCmptType, ValueSet, ValueSetType};
    use crate::repository::Repository;

    const GEN: ContainerId = ContainerId::Generation(0);

    fn product_type() -> ProductCmptType {
        let mut product_type = ProductCmptType::new("model.Product");
        let mut fixed = ProductAttribute::new("fixed");
        fixed.changing_over_time = false;
        fixed.default_value = Some("1".to_string());
        product_type.attributes.push(fixed);
        product_type.attributes.push(ProductAttribute::new("rate"));
        product_type
            .associations
            .push(ProductAssociation::new("coverages", "model.Coverage"));
        product_type
    }

    fn attribute(id: u32, name: &str, text: &str) -> PropertyValue {
        PropertyValue::attribute(id, name, Some(text))
    }

    /// Component with a value for every declared property and one generation
    fn complete_cmpt() -> ProductCmpt {
        let mut cmpt = ProductCmpt::new("products.Basic", "model.Product");
        cmpt.add_generation("2024-01-01");
        cmpt.container.add_value(attribute(0, "fixed", "1"));
        cmpt.generations[0].container.add_value(attribute(1, "rate", "0.5"));
        cmpt.reserve_part_id(1);
        cmpt
    }

    fn repo_with(product_type: ProductCmptType, cmpts: Vec<ProductCmpt>) -> Repository {
        let mut repo = Repository::new();
        repo.insert_type(product_type);
        for cmpt in cmpts {
            repo.insert_cmpt(cmpt);
        }
        repo
    }

    fn delta_of(repo: &Repository, name: &str) -> ProductCmptDelta {
        compute_delta(repo, repo.find_cmpt(name).unwrap(), &DeltaOptions::default())
    }

    #[test]
    fn test_consistent_component_has_empty_delta() {
        let repo = repo_with(product_type(), vec![complete_cmpt()]);
        assert!(delta_of(&repo, "products.Basic").is_empty());
    }

    #[test]
    fn test_unknown_type_yields_empty_delta() {
        let mut cmpt = complete_cmpt();
        cmpt.product_cmpt_type = "model.Gone".to_string();
        let repo = repo_with(product_type(), vec![cmpt]);
        assert!(delta_of(&repo, "products.Basic").is_empty());
    }

    #[test]
    fn test_missing_values_per_level() {
        let mut cmpt = ProductCmpt::new("products.Basic", "model.Product");
        cmpt.add_generation("2024-01-01");
        let repo = repo_with(product_type(), vec![cmpt]);
        let delta = delta_of(&repo, "products.Basic");

        let missing = delta.entries_of_type(DeltaType::MissingPropertyValue);
        assert_eq!(missing.len(), 2);
        assert_eq!(missing[0].container, ContainerId::Cmpt);
        assert_eq!(missing[0].part_name, "fixed");
        assert!(matches!(
            &missing[0].action,
            DeltaAction::CreateValue { value: TemplateValue::Defined(PropertyContent::Attribute(h)), .. }
                if h.first() == Some("1")
        ));
        assert_eq!(missing[1].container, GEN);
        assert_eq!(missing[1].part_name, "rate");
    }

    #[test]
    fn test_type_without_generations_keeps_everything_on_component() {
        let mut product_type = product_type();
        product_type.changing_over_time = false;
        let mut cmpt = ProductCmpt::new("products.Basic", "model.Product");
        cmpt.container.add_value(attribute(0, "fixed", "1"));
        let repo = repo_with(product_type, vec![cmpt]);
        let delta = delta_of(&repo, "products.Basic");

        let missing = delta.entries_of_type(DeltaType::MissingPropertyValue);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].part_name, "rate");
        assert_eq!(missing[0].container, ContainerId::Cmpt);
    }

    #[test]
    fn test_removed_property_yields_value_without_property() {
        let mut cmpt = complete_cmpt();
        cmpt.container.add_value(attribute(7, "legacy", "x"));
        let repo = repo_with(product_type(), vec![cmpt]);
        let delta = delta_of(&repo, "products.Basic");

        assert_eq!(delta.len(), 1);
        let entry = &delta.entries_of_type(DeltaType::ValueWithoutProperty)[0];
        assert_eq!(entry.action, DeltaAction::RemoveValue { value_id: 7 });
    }

    #[test]
    fn test_value_moved_to_generations_keeps_content() {
        let mut product_type = product_type();
        product_type.attributes[0].changing_over_time = true;
        let repo = repo_with(product_type, vec![complete_cmpt()]);
        let delta = delta_of(&repo, "products.Basic");

        let removed = &delta.entries_of_type(DeltaType::ValueWithoutProperty)[0];
        assert_eq!(removed.container, ContainerId::Cmpt);
        let created = &delta.entries_of_type(DeltaType::MissingPropertyValue)[0];
        assert_eq!(created.container, GEN);
        assert_eq!(created.predecessor, Some(removed.id));
        assert!(created.description.starts_with("moved from"));
    }

    #[test]
    fn test_value_holder_mismatch() {
        let mut product_type = product_type();
        product_type.attributes[1].multi_value = true;
        let repo = repo_with(product_type, vec![complete_cmpt()]);
        let delta = delta_of(&repo, "products.Basic");

        let entry = &delta.entries_of_type(DeltaType::ValueHolderMismatch)[0];
        assert_eq!(
            entry.action,
            DeltaAction::SetValue {
                value_id: 1,
                value: TemplateValue::Defined(PropertyContent::Attribute(ValueHolder::Multi(vec![
                    Some("0.5".to_string())
                ]))),
            }
        );
    }

    #[test]
    fn test_hidden_attribute_mismatch_takes_precedence() {
        let mut product_type = product_type();
        product_type.attributes[0].visible = false;
        product_type.attributes[0].multi_value = true;
        let mut cmpt = complete_cmpt();
        cmpt.container.add_value(attribute(0, "fixed", "2"));
        let repo = repo_with(product_type, vec![cmpt]);

        let delta = delta_of(&repo, "products.Basic");
        assert_eq!(delta.len(), 1);
        assert_eq!(delta.entries_of_type(DeltaType::HiddenAttributeMismatch).len(), 1);

        let options = DeltaOptions {
            check_hidden_attributes: false,
            ..DeltaOptions::default()
        };
        let delta = compute_delta(&repo, repo.find_cmpt("products.Basic").unwrap(), &options);
        assert_eq!(delta.len(), 1);
        assert_eq!(delta.entries_of_type(DeltaType::ValueHolderMismatch).len(), 1);
    }

    #[test]
    fn test_value_set_mismatch_converts_to_model_kind() {
        let mut product_type = product_type();
        let mut premium = PolicyAttribute::new("premium");
        premium.value_set = ValueSet::Range {
            lower: Some("0".to_string()),
            upper: Some("100".to_string()),
            step: None,
            contains_null: false,
        };
        premium.allowed_value_set_types = vec![ValueSetType::Range];
        product_type.policy_attributes.push(premium);

        let mut cmpt = complete_cmpt();
        cmpt.generations[0].container.add_value(PropertyValue::new(
            2,
            "premium",
            PropertyValueType::ConfiguredDefault,
            TemplateValue::Defined(PropertyContent::Default(None)),
        ));
        cmpt.generations[0].container.add_value(PropertyValue::new(
            3,
            "premium",
            PropertyValueType::ConfiguredValueSet,
            TemplateValue::Defined(PropertyContent::ValueSet(ValueSet::Enum {
                values: vec!["10".to_string()],
                contains_null: false,
            })),
        ));
        let repo = repo_with(product_type, vec![cmpt]);
        let delta = delta_of(&repo, "products.Basic");

        assert_eq!(delta.len(), 1);
        let entry = &delta.entries_of_type(DeltaType::ValueSetMismatch)[0];
        match &entry.action {
            DeltaAction::SetValue {
                value: TemplateValue::Defined(PropertyContent::ValueSet(value_set)),
                ..
            } => assert_eq!(value_set.value_set_type(), ValueSetType::Range),
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_property_type_mismatch_replaces_foreign_kind() {
        let mut cmpt = complete_cmpt();
        cmpt.generations[0].container.values.clear();
        cmpt.generations[0].container.add_value(PropertyValue::new(
            4,
            "rate",
            PropertyValueType::Formula,
            TemplateValue::Defined(PropertyContent::Formula(Some("1 + 1".to_string()))),
        ));
        let repo = repo_with(product_type(), vec![cmpt]);
        let delta = delta_of(&repo, "products.Basic");

        assert_eq!(delta.len(), 1);
        let entry = &delta.entries_of_type(DeltaType::PropertyTypeMismatch)[0];
        match &entry.action {
            DeltaAction::ReplaceValues { remove, create } => {
                assert_eq!(remove, &vec![4]);
                assert_eq!(create.len(), 1);
                assert_eq!(create[0].0, PropertyValueType::AttributeValue);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    fn template_and_instance() -> (ProductCmpt, ProductCmpt) {
        let mut template = complete_cmpt().as_template();
        template.qualified_name = "templates.Base".to_string();
        let mut instance = complete_cmpt().with_template("templates.Base");
        instance.container.values.clear();
        instance.container.add_value(PropertyValue::new(
            0,
            "fixed",
            PropertyValueType::AttributeValue,
            TemplateValue::Inherited { fallback: None },
        ));
        (template, instance)
    }

    #[test]
    fn test_stale_inherited_fallback() {
        let (template, mut instance) = template_and_instance();
        let stale = PropertyContent::Attribute(ValueHolder::single("9"));
        instance.container.values[0].value = TemplateValue::Inherited {
            fallback: Some(stale),
        };
        let repo = repo_with(product_type(), vec![template.clone(), instance.clone()]);
        let delta = delta_of(&repo, "products.Basic");
        assert_eq!(delta.entries_of_type(DeltaType::InheritedTemplateMismatch).len(), 1);

        // an empty cache is not stale
        instance.container.values[0].value = TemplateValue::Inherited { fallback: None };
        let repo = repo_with(product_type(), vec![template, instance]);
        assert!(delta_of(&repo, "products.Basic").is_empty());
    }

    #[test]
    fn test_template_link_added_and_removed() {
        let (mut template, mut instance) = template_and_instance();
        template.generations[0].container.add_link(ProductCmptLink::new(
            5,
            "coverages",
            "coverages.Fire",
            Cardinality::MANDATORY,
        ));
        let mut water = ProductCmptLink::inherited(6, "coverages", "coverages.Water");
        water.cardinality = TemplateValue::Undefined;
        template.generations[0].container.add_link(water);
        instance.generations[0]
            .container
            .add_link(ProductCmptLink::inherited(8, "coverages", "coverages.Storm"));
        let repo = repo_with(product_type(), vec![template, instance]);
        let delta = delta_of(&repo, "products.Basic");

        assert_eq!(delta.len(), 2);
        let missing = &delta.entries_of_type(DeltaType::MissingTemplateLink)[0];
        assert_eq!(missing.part_name, "coverages:coverages.Fire");
        assert_eq!(
            missing.action,
            DeltaAction::CreateLink {
                association: "coverages".to_string(),
                target: "coverages.Fire".to_string(),
                cardinality: TemplateValue::Inherited {
                    fallback: Some(Cardinality::MANDATORY)
                },
            }
        );
        let removed = &delta.entries_of_type(DeltaType::RemovedTemplateLink)[0];
        assert_eq!(removed.action, DeltaAction::RemoveLink { link_id: 8 });
    }

    #[test]
    fn test_inherited_template_link_is_not_copied() {
        let (mut template, instance) = template_and_instance();
        template.generations[0]
            .container
            .add_link(ProductCmptLink::inherited(5, "coverages", "coverages.A"));
        let repo = repo_with(product_type(), vec![template, instance]);
        let delta = delta_of(&repo, "products.Basic");
        assert!(delta.entries_of_type(DeltaType::MissingTemplateLink).is_empty());
        assert!(delta.is_empty());
    }

    #[test]
    fn test_link_entries_for_removed_and_static_associations() {
        let mut product_type = product_type();
        product_type.associations[0].changing_over_time = false;
        let mut cmpt = complete_cmpt();
        cmpt.add_generation("2025-01-01");
        cmpt.generations[0]
            .container
            .add_link(ProductCmptLink::new(5, "coverages", "coverages.Fire", Cardinality::OPTIONAL));
        cmpt.generations[1]
            .container
            .add_link(ProductCmptLink::new(6, "coverages", "coverages.Fire", Cardinality::MANDATORY));
        cmpt.container
            .add_link(ProductCmptLink::new(7, "gone", "x.Y", Cardinality::OPTIONAL));
        let repo = repo_with(product_type, vec![cmpt]);
        let delta = delta_of(&repo, "products.Basic");

        assert_eq!(delta.entries_of_type(DeltaType::LinkWithoutAssociation).len(), 1);
        let moves = delta.entries_of_type(DeltaType::LinkChangingOverTimeMismatch);
        assert_eq!(moves.len(), 2);
        let destinations: Vec<&Vec<ContainerId>> = moves
            .iter()
            .map(|e| match &e.action {
                DeltaAction::MoveLink { destinations, .. } => destinations,
                other => panic!("unexpected action {other:?}"),
            })
            .collect();
        assert!(destinations[0].is_empty());
        assert_eq!(destinations[1], &vec![ContainerId::Cmpt]);
    }
}
