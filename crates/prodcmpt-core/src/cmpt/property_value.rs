//! Property values stored in a container

use super::template_value::{TemplateValue, TemplateValueStatus};
use crate::model::{ProductCmptProperty, PropertyValueType, ValueSet};
use std::fmt;

/// Identifier of a part, unique within its product component
pub type PartId = u32;

/// Value of an attribute: one value or a list of values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueHolder {
    Single(Option<String>),
    Multi(Vec<Option<String>>),
}

impl ValueHolder {
    pub fn single(value: impl Into<String>) -> Self {
        ValueHolder::Single(Some(value.into()))
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, ValueHolder::Multi(_))
    }

    /// First value; for a single holder the value itself
    pub fn first(&self) -> Option<&str> {
        match self {
            ValueHolder::Single(value) => value.as_deref(),
            ValueHolder::Multi(values) => values.first().and_then(|v| v.as_deref()),
        }
    }

    /// Wrap a single value into a list, keeping it as the only element
    pub fn to_multi(&self) -> ValueHolder {
        match self {
            ValueHolder::Single(None) => ValueHolder::Multi(Vec::new()),
            ValueHolder::Single(Some(value)) => ValueHolder::Multi(vec![Some(value.clone())]),
            multi @ ValueHolder::Multi(_) => multi.clone(),
        }
    }

    /// Unwrap a list into its first element
    pub fn to_single(&self) -> ValueHolder {
        match self {
            single @ ValueHolder::Single(_) => single.clone(),
            ValueHolder::Multi(values) => ValueHolder::Single(values.first().cloned().flatten()),
        }
    }

    /// Holder of the given shape for an attribute default value
    pub fn for_default(default_value: Option<&str>, multi_value: bool) -> ValueHolder {
        let single = ValueHolder::Single(default_value.map(str::to_string));
        if multi_value {
            single.to_multi()
        } else {
            single
        }
    }
}

impl fmt::Display for ValueHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueHolder::Single(value) => f.write_str(value.as_deref().unwrap_or("<null>")),
            ValueHolder::Multi(values) => {
                let rendered: Vec<&str> = values
                    .iter()
                    .map(|v| v.as_deref().unwrap_or("<null>"))
                    .collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

/// Kind-specific payload of a property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyContent {
    Attribute(ValueHolder),
    Default(Option<String>),
    ValueSet(ValueSet),
    /// Name of the table content
    TableUsage(Option<String>),
    /// Formula expression text
    Formula(Option<String>),
    RuleConfig { active: bool },
}

impl PropertyContent {
    /// Empty payload for a value kind
    pub fn empty(value_type: PropertyValueType) -> Self {
        match value_type {
            PropertyValueType::AttributeValue => PropertyContent::Attribute(ValueHolder::Single(None)),
            PropertyValueType::ConfiguredDefault => PropertyContent::Default(None),
            PropertyValueType::ConfiguredValueSet => PropertyContent::ValueSet(ValueSet::default()),
            PropertyValueType::TableContentUsage => PropertyContent::TableUsage(None),
            PropertyValueType::Formula => PropertyContent::Formula(None),
            PropertyValueType::ValidationRuleConfig => PropertyContent::RuleConfig { active: true },
        }
    }

    /// Payload a freshly created value of a declared property starts with
    pub fn default_for(property: ProductCmptProperty<'_>, value_type: PropertyValueType) -> Self {
        match (property, value_type) {
            (ProductCmptProperty::Attribute(attribute), _) => PropertyContent::Attribute(
                ValueHolder::for_default(attribute.default_value.as_deref(), attribute.multi_value),
            ),
            (ProductCmptProperty::PolicyAttribute(attribute), PropertyValueType::ConfiguredValueSet) => {
                PropertyContent::ValueSet(attribute.value_set.convert_to(attribute.conversion_target()))
            }
            (ProductCmptProperty::PolicyAttribute(attribute), _) => {
                PropertyContent::Default(attribute.default_value.clone())
            }
            (ProductCmptProperty::ValidationRule(rule), _) => PropertyContent::RuleConfig {
                active: rule.active_by_default,
            },
            (ProductCmptProperty::TableUsage(_), _) | (ProductCmptProperty::Formula(_), _) => {
                PropertyContent::empty(value_type)
            }
        }
    }

    pub fn value_type(&self) -> PropertyValueType {
        match self {
            PropertyContent::Attribute(_) => PropertyValueType::AttributeValue,
            PropertyContent::Default(_) => PropertyValueType::ConfiguredDefault,
            PropertyContent::ValueSet(_) => PropertyValueType::ConfiguredValueSet,
            PropertyContent::TableUsage(_) => PropertyValueType::TableContentUsage,
            PropertyContent::Formula(_) => PropertyValueType::Formula,
            PropertyContent::RuleConfig { .. } => PropertyValueType::ValidationRuleConfig,
        }
    }
}

impl fmt::Display for PropertyContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyContent::Attribute(holder) => write!(f, "{holder}"),
            PropertyContent::ValueSet(value_set) => write!(f, "{value_set}"),
            PropertyContent::Default(text)
            | PropertyContent::TableUsage(text)
            | PropertyContent::Formula(text) => f.write_str(text.as_deref().unwrap_or("<null>")),
            PropertyContent::RuleConfig { active } => {
                f.write_str(if *active { "active" } else { "inactive" })
            }
        }
    }
}

/// One configurable property's value within one container
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    pub id: PartId,
    pub property_name: String,
    pub value_type: PropertyValueType,
    pub value: TemplateValue<PropertyContent>,
}

impl PropertyValue {
    pub fn new(
        id: PartId,
        property_name: impl Into<String>,
        value_type: PropertyValueType,
        value: TemplateValue<PropertyContent>,
    ) -> Self {
        debug_assert!(
            value.local().is_none_or(|c| c.value_type() == value_type),
            "content kind must match the value kind"
        );
        Self {
            id,
            property_name: property_name.into(),
            value_type,
            value,
        }
    }

    /// A defined attribute value holding a single value
    pub fn attribute(id: PartId, property_name: impl Into<String>, value: Option<&str>) -> Self {
        Self::new(
            id,
            property_name,
            PropertyValueType::AttributeValue,
            TemplateValue::Defined(PropertyContent::Attribute(ValueHolder::Single(
                value.map(str::to_string),
            ))),
        )
    }

    pub fn status(&self) -> TemplateValueStatus {
        self.value.status()
    }

    pub fn matches(&self, property_name: &str, value_type: PropertyValueType) -> bool {
        self.property_name == property_name && self.value_type == value_type
    }

    /// Locally stored content (defined value or inherited fallback)
    pub fn local_content(&self) -> Option<&PropertyContent> {
        self.value.local()
    }

    /// Locally stored attribute value, if this is an attribute value
    pub fn local_attribute_value(&self) -> Option<&ValueHolder> {
        match self.value.local() {
            Some(PropertyContent::Attribute(holder)) => Some(holder),
            _ => None,
        }
    }
}
