//! Element tree persistence of product components
//!
//! A component is stored as a tree of elements, each with a name, string attributes, optional
//! text and child elements. Component files hold this tree as YAML or JSON.
//!
//! Every property value and link records its `templateValueStatus`. Only DEFINED parts write a
//! payload; an INHERITED part is resolved live after reading, so a payload found on one is
//! ignored.

use crate::cmpt::cardinality::{format_bound, parse_bound};
use crate::cmpt::{
    Cardinality, PartId, ProductCmpt, ProductCmptLink, PropertyContent, PropertyValue,
    PropertyValueContainer, TemplateValue, TemplateValueStatus, ValueHolder,
};
use crate::error::ModelError;
use crate::model::{PropertyValueType, ValueSet};
use crate::result::Result;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const ELEMENT_PRODUCT_CMPT: &str = "ProductCmpt";
pub const ELEMENT_GENERATION: &str = "Generation";
pub const ELEMENT_LINK: &str = "Link";
pub const ELEMENT_VALUE: &str = "Value";
pub const ELEMENT_MULTI_VALUE: &str = "MultiValue";
pub const ELEMENT_VALUE_SET: &str = "ValueSet";
pub const ELEMENT_TABLE_CONTENT: &str = "TableContentName";
pub const ELEMENT_EXPRESSION: &str = "Expression";

pub const ATTR_ID: &str = "id";
pub const ATTR_STATUS: &str = "templateValueStatus";

/// A node of the persisted tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: Option<&str>) -> Self {
        self.text = text.map(str::to_string);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn required_attr(&self, name: &str) -> Result<&str> {
        self.attr(name).ok_or_else(|| {
            ModelError::persistence_error(&self.name, format!("missing attribute '{name}'"))
        })
    }

    fn bool_attr(&self, name: &str) -> bool {
        self.attr(name).is_some_and(|v| v == "true")
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Parse a YAML or JSON document; JSON is valid YAML
    pub fn from_yaml(source_name: &str, content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| ModelError::parse_error(source_name, e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ModelError::persistence_error(&self.name, e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ModelError::persistence_error(&self.name, e.to_string()))
    }
}

fn status_of(element: &Element) -> Result<TemplateValueStatus> {
    match element.attr(ATTR_STATUS) {
        None => Ok(TemplateValueStatus::Defined),
        Some(text) => text
            .parse()
            .map_err(|e: String| ModelError::persistence_error(&element.name, e)),
    }
}

fn value_element(value: Option<&str>) -> Element {
    let element = Element::new(ELEMENT_VALUE).with_text(value);
    if value.is_none() {
        element.with_attr("isNull", "true")
    } else {
        element
    }
}

fn read_value_text(element: &Element) -> Option<String> {
    if element.bool_attr("isNull") {
        None
    } else {
        Some(element.text.clone().unwrap_or_default())
    }
}

fn child_text(element: &Element, name: &str) -> Option<String> {
    element.child(name).and_then(read_value_text)
}

fn write_value_set(value_set: &ValueSet) -> Element {
    let element = Element::new(ELEMENT_VALUE_SET)
        .with_attr("type", value_set.value_set_type().as_str())
        .with_attr("containsNull", value_set.contains_null().to_string());
    match value_set {
        ValueSet::Enum { values, .. } => values
            .iter()
            .fold(element, |e, v| e.with_child(value_element(Some(v)))),
        ValueSet::Range {
            lower, upper, step, ..
        } => {
            let mut element = element;
            for (name, bound) in [("lowerBound", lower), ("upperBound", upper), ("step", step)] {
                if let Some(bound) = bound {
                    element = element.with_attr(name, bound.as_str());
                }
            }
            element
        }
        ValueSet::StringLength { max_length, .. } => match max_length {
            Some(max) => element.with_attr("maximumLength", max.to_string()),
            None => element,
        },
        ValueSet::Unrestricted { .. } | ValueSet::Derived => element,
    }
}

fn read_value_set(element: &Element) -> Result<ValueSet> {
    let contains_null = element.bool_attr("containsNull");
    let kind = element.required_attr("type")?;
    let value_set = match kind {
        "unrestricted" => ValueSet::Unrestricted { contains_null },
        "enum" => ValueSet::Enum {
            values: element
                .children_named(ELEMENT_VALUE)
                .filter_map(read_value_text)
                .collect(),
            contains_null,
        },
        "range" => ValueSet::Range {
            lower: element.attr("lowerBound").map(str::to_string),
            upper: element.attr("upperBound").map(str::to_string),
            step: element.attr("step").map(str::to_string),
            contains_null,
        },
        "stringLength" => ValueSet::StringLength {
            max_length: element.attr("maximumLength").and_then(|m| m.parse().ok()),
            contains_null,
        },
        "derived" => ValueSet::Derived,
        other => {
            return Err(ModelError::persistence_error(
                ELEMENT_VALUE_SET,
                format!("unknown value set type '{other}'"),
            ));
        }
    };
    Ok(value_set)
}

fn write_content(element: Element, content: &PropertyContent) -> Element {
    match content {
        PropertyContent::Attribute(ValueHolder::Single(value)) => {
            element.with_child(value_element(value.as_deref()))
        }
        PropertyContent::Attribute(ValueHolder::Multi(values)) => element.with_child(
            values
                .iter()
                .fold(Element::new(ELEMENT_MULTI_VALUE), |e, v| {
                    e.with_child(value_element(v.as_deref()))
                }),
        ),
        PropertyContent::Default(value) => element.with_child(value_element(value.as_deref())),
        PropertyContent::ValueSet(value_set) => element.with_child(write_value_set(value_set)),
        PropertyContent::TableUsage(name) => {
            element.with_child(Element::new(ELEMENT_TABLE_CONTENT).with_text(name.as_deref()))
        }
        PropertyContent::Formula(expression) => {
            element.with_child(Element::new(ELEMENT_EXPRESSION).with_text(expression.as_deref()))
        }
        PropertyContent::RuleConfig { active } => element.with_attr("active", active.to_string()),
    }
}

fn read_content(element: &Element, value_type: PropertyValueType) -> Result<PropertyContent> {
    let content = match value_type {
        PropertyValueType::AttributeValue => match element.child(ELEMENT_MULTI_VALUE) {
            Some(multi) => PropertyContent::Attribute(ValueHolder::Multi(
                multi
                    .children_named(ELEMENT_VALUE)
                    .map(read_value_text)
                    .collect(),
            )),
            None => PropertyContent::Attribute(ValueHolder::Single(child_text(element, ELEMENT_VALUE))),
        },
        PropertyValueType::ConfiguredDefault => {
            PropertyContent::Default(child_text(element, ELEMENT_VALUE))
        }
        PropertyValueType::ConfiguredValueSet => match element.child(ELEMENT_VALUE_SET) {
            Some(value_set) => PropertyContent::ValueSet(read_value_set(value_set)?),
            None => PropertyContent::ValueSet(ValueSet::default()),
        },
        PropertyValueType::TableContentUsage => PropertyContent::TableUsage(
            element
                .child(ELEMENT_TABLE_CONTENT)
                .and_then(|e| e.text.clone()),
        ),
        PropertyValueType::Formula => {
            PropertyContent::Formula(element.child(ELEMENT_EXPRESSION).and_then(|e| e.text.clone()))
        }
        PropertyValueType::ValidationRuleConfig => PropertyContent::RuleConfig {
            active: element.attr("active").is_none_or(|a| a == "true"),
        },
    };
    Ok(content)
}

/// Write a property value; the payload only for DEFINED values
pub fn write_property_value(value: &PropertyValue) -> Element {
    let element = Element::new(value.value_type.element_name())
        .with_attr(ATTR_ID, value.id.to_string())
        .with_attr("property", value.property_name.as_str())
        .with_attr(ATTR_STATUS, value.status().as_str());
    match value.value.defined() {
        Some(content) => write_content(element, content),
        None => element,
    }
}

/// Read a property value. `fallback_id` is used when the element carries no id.
pub fn read_property_value(element: &Element, fallback_id: PartId) -> Result<PropertyValue> {
    let value_type = PropertyValueType::from_element_name(&element.name).ok_or_else(|| {
        ModelError::persistence_error(&element.name, "not a property value element")
    })?;
    let id = read_id(element)?.unwrap_or(fallback_id);
    let property = element.required_attr("property")?;
    let value = match status_of(element)? {
        TemplateValueStatus::Defined => TemplateValue::Defined(read_content(element, value_type)?),
        TemplateValueStatus::Inherited => TemplateValue::inherited(),
        TemplateValueStatus::Undefined => TemplateValue::Undefined,
    };
    Ok(PropertyValue::new(id, property, value_type, value))
}

/// Write a link; the cardinality only when DEFINED, the maximum `*` when unbounded
pub fn write_link(link: &ProductCmptLink) -> Element {
    let element = Element::new(ELEMENT_LINK)
        .with_attr(ATTR_ID, link.id.to_string())
        .with_attr("association", link.association.as_str())
        .with_attr("target", link.target.as_str())
        .with_attr(ATTR_STATUS, link.status().as_str());
    match link.cardinality.defined() {
        Some(cardinality) => element
            .with_attr("minCardinality", cardinality.min().to_string())
            .with_attr("maxCardinality", format_bound(cardinality.max()))
            .with_attr("defaultCardinality", cardinality.default_cardinality().to_string()),
        None => element,
    }
}

pub fn read_link(element: &Element, fallback_id: PartId) -> Result<ProductCmptLink> {
    let id = read_id(element)?.unwrap_or(fallback_id);
    let association = element.required_attr("association")?;
    let target = element.required_attr("target")?;
    let cardinality = match status_of(element)? {
        TemplateValueStatus::Defined => {
            let bound = |name: &str, default: i32| -> Result<i32> {
                match element.attr(name) {
                    None => Ok(default),
                    Some(text) => parse_bound(text).ok_or_else(|| {
                        ModelError::persistence_error(
                            ELEMENT_LINK,
                            format!("invalid {name} '{text}'"),
                        )
                    }),
                }
            };
            TemplateValue::Defined(Cardinality::new(
                bound("minCardinality", 0)?,
                bound("maxCardinality", 1)?,
                bound("defaultCardinality", 0)?,
            ))
        }
        TemplateValueStatus::Inherited => TemplateValue::inherited(),
        TemplateValueStatus::Undefined => TemplateValue::Undefined,
    };
    Ok(ProductCmptLink {
        id,
        association: association.to_string(),
        target: target.to_string(),
        cardinality,
    })
}

fn read_id(element: &Element) -> Result<Option<PartId>> {
    element
        .attr(ATTR_ID)
        .map(|id| {
            id.parse().map_err(|_| {
                ModelError::persistence_error(&element.name, format!("invalid id '{id}'"))
            })
        })
        .transpose()
}

fn write_container(element: Element, container: &PropertyValueContainer) -> Element {
    let element = container
        .values
        .iter()
        .fold(element, |e, v| e.with_child(write_property_value(v)));
    container
        .links
        .iter()
        .fold(element, |e, l| e.with_child(write_link(l)))
}

fn is_part(element: &Element) -> bool {
    element.name == ELEMENT_LINK || PropertyValueType::from_element_name(&element.name).is_some()
}

/// Ids stored anywhere in a component element
fn stored_ids(element: &Element) -> Result<HashSet<PartId>> {
    let mut ids = HashSet::new();
    let containers = std::iter::once(element).chain(element.children_named(ELEMENT_GENERATION));
    for container in containers {
        for child in container.children.iter().filter(|c| is_part(c)) {
            ids.extend(read_id(child)?);
        }
    }
    Ok(ids)
}

/// Read the parts of one container. Elements without an id take the next id from `free`.
fn read_container(
    element: &Element,
    cmpt: &mut ProductCmpt,
    container: &mut PropertyValueContainer,
    free: &mut impl Iterator<Item = PartId>,
) -> Result<()> {
    for child in element.children.iter().filter(|c| is_part(c)) {
        let id = match read_id(child)? {
            Some(id) => id,
            None => free.next().ok_or_else(|| {
                ModelError::persistence_error(&child.name, "no part id left to assign")
            })?,
        };
        cmpt.reserve_part_id(id);
        if child.name == ELEMENT_LINK {
            container.add_link(read_link(child, id)?);
        } else {
            container.add_value(read_property_value(child, id)?);
        }
    }
    Ok(())
}

pub fn write_product_cmpt(cmpt: &ProductCmpt) -> Element {
    let mut element = Element::new(ELEMENT_PRODUCT_CMPT)
        .with_attr("qualifiedName", cmpt.qualified_name.as_str())
        .with_attr("productCmptType", cmpt.product_cmpt_type.as_str());
    if let Some(template) = &cmpt.template {
        element = element.with_attr("template", template.as_str());
    }
    if cmpt.is_template {
        element = element.with_attr("isTemplate", "true");
    }
    let element = write_container(element, &cmpt.container);
    cmpt.generations.iter().fold(element, |e, generation| {
        e.with_child(write_container(
            Element::new(ELEMENT_GENERATION).with_attr("validFrom", generation.valid_from.as_str()),
            &generation.container,
        ))
    })
}

pub fn read_product_cmpt(element: &Element) -> Result<ProductCmpt> {
    if element.name != ELEMENT_PRODUCT_CMPT {
        return Err(ModelError::persistence_error(
            &element.name,
            format!("expected <{ELEMENT_PRODUCT_CMPT}>"),
        ));
    }
    let mut cmpt = ProductCmpt::new(
        element.required_attr("qualifiedName")?,
        element.required_attr("productCmptType")?,
    );
    cmpt.template = element.attr("template").map(str::to_string);
    cmpt.is_template = element.bool_attr("isTemplate");

    let stored = stored_ids(element)?;
    let mut free = (0..=PartId::MAX).filter(|id| !stored.contains(id));

    let mut container = PropertyValueContainer::new();
    read_container(element, &mut cmpt, &mut container, &mut free)?;
    cmpt.container = container;

    let date = Regex::new(r"^\d{4}-\d{2}-\d{2}$").map_err(|e| ModelError::internal_error(e.to_string()))?;
    for child in element.children_named(ELEMENT_GENERATION) {
        let valid_from = child.required_attr("validFrom")?;
        if !date.is_match(valid_from) {
            return Err(ModelError::persistence_error(
                ELEMENT_GENERATION,
                format!("validFrom '{valid_from}' is not a YYYY-MM-DD date"),
            ));
        }
        let index = cmpt.add_generation(valid_from);
        let mut container = PropertyValueContainer::new();
        read_container(child, &mut cmpt, &mut container, &mut free)?;
        cmpt.generations[index].container = container;
    }
    Ok(cmpt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmpt::MANY;

    #[test]
    fn test_inherited_value_writes_no_payload() {
        let value = PropertyValue::new(
            3,
            "x",
            PropertyValueType::AttributeValue,
            TemplateValue::Inherited {
                fallback: Some(PropertyContent::Attribute(ValueHolder::single("15"))),
            },
        );
        let element = write_property_value(&value);
        assert_eq!(element.attr(ATTR_STATUS), Some("inherited"));
        assert!(element.children.is_empty());
    }

    #[test]
    fn test_inherited_payload_is_ignored_on_read() {
        let element = Element::new("AttributeValue")
            .with_attr(ATTR_ID, "1")
            .with_attr("property", "x")
            .with_attr(ATTR_STATUS, "inherited")
            .with_child(value_element(Some("stale")));
        let value = read_property_value(&element, 0).unwrap();
        assert_eq!(value.value, TemplateValue::inherited());
    }

    #[test]
    fn test_link_max_many_is_star() {
        let link = ProductCmptLink::new(4, "Coverage", "cov.A", Cardinality::new(0, MANY, 1));
        let element = write_link(&link);
        assert_eq!(element.attr("maxCardinality"), Some("*"));
        assert_eq!(read_link(&element, 0).unwrap(), link);
    }

    #[test]
    fn test_missing_status_means_defined() {
        let element = Element::new("Formula")
            .with_attr("property", "premium")
            .with_child(Element::new(ELEMENT_EXPRESSION).with_text(Some("a + b")));
        let value = read_property_value(&element, 9).unwrap();
        assert_eq!(value.id, 9);
        assert_eq!(
            value.value,
            TemplateValue::Defined(PropertyContent::Formula(Some("a + b".into())))
        );
    }

    #[test]
    fn test_bad_link_is_persistence_error() {
        let element = Element::new(ELEMENT_LINK)
            .with_attr("association", "Coverage")
            .with_attr("target", "cov.A")
            .with_attr("maxCardinality", "lots");
        let err = read_link(&element, 0).unwrap_err();
        assert!(matches!(err, ModelError::PersistenceError { .. }));
        assert!(read_link(&Element::new(ELEMENT_LINK), 0).is_err());
    }

    #[test]
    fn test_generation_date_format() {
        let element = Element::new(ELEMENT_PRODUCT_CMPT)
            .with_attr("qualifiedName", "products.Basic")
            .with_attr("productCmptType", "model.Product")
            .with_child(Element::new(ELEMENT_GENERATION).with_attr("validFrom", "1.1.2024"));
        let err = read_product_cmpt(&element).unwrap_err();
        assert!(matches!(err, ModelError::PersistenceError { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_highest_part_id_is_readable() {
        let element = Element::new(ELEMENT_PRODUCT_CMPT)
            .with_attr("qualifiedName", "products.Basic")
            .with_attr("productCmptType", "model.Product")
            .with_child(
                Element::new("AttributeValue")
                    .with_attr(ATTR_ID, "4294967295")
                    .with_attr("property", "x"),
            )
            .with_child(Element::new("AttributeValue").with_attr("property", "y"));
        let mut cmpt = read_product_cmpt(&element).unwrap();
        let ids: Vec<PartId> = cmpt.container.values.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![PartId::MAX, 0]);
        assert_eq!(cmpt.allocate_part_id(), 1);
    }

    #[test]
    fn test_component_yaml_document() {
        let yaml = r#"
name: ProductCmpt
attributes:
  qualifiedName: products.Basic
  productCmptType: model.Product
  template: templates.Base
children:
  - name: AttributeValue
    attributes: { id: "0", property: x, templateValueStatus: undefined }
  - name: Generation
    attributes: { validFrom: "2024-01-01" }
    children:
      - name: ConfiguredValueSet
        attributes: { id: "5", property: sumInsured }
        children:
          - name: ValueSet
            attributes: { type: range, lowerBound: "1", upperBound: "9", containsNull: "false" }
      - name: Link
        attributes: { association: Coverage, target: cov.A, templateValueStatus: inherited }
"#;
        let element = Element::from_yaml("basic.cmpt.yaml", yaml).unwrap();
        let mut cmpt = read_product_cmpt(&element).unwrap();
        assert_eq!(cmpt.template.as_deref(), Some("templates.Base"));
        assert_eq!(cmpt.container.values[0].status(), TemplateValueStatus::Undefined);

        let generation = &cmpt.generations[0].container;
        assert_eq!(generation.values[0].id, 5);
        assert_eq!(generation.links[0].status(), TemplateValueStatus::Inherited);
        // ids read from storage are never handed out again
        assert!(cmpt.allocate_part_id() > 5);
    }
}
