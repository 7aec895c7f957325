//! Product component types: the declared properties and associations of a component

use super::value_set::{ValueSet, ValueSetType};
use crate::cmpt::cardinality::{self, MANY};
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_true() -> bool {
    true
}

fn default_datatype() -> String {
    "String".to_string()
}

fn default_many() -> i32 {
    MANY
}

/// A product component type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCmptType {
    pub qualified_name: String,
    #[serde(default)]
    pub supertype: Option<String>,
    /// Whether components of this type have generations at all
    #[serde(default = "default_true")]
    pub changing_over_time: bool,
    #[serde(default)]
    pub attributes: Vec<ProductAttribute>,
    #[serde(default)]
    pub policy_attributes: Vec<PolicyAttribute>,
    #[serde(default)]
    pub table_usages: Vec<TableStructureUsage>,
    #[serde(default)]
    pub formulas: Vec<FormulaSignature>,
    #[serde(default)]
    pub validation_rules: Vec<ValidationRule>,
    #[serde(default)]
    pub associations: Vec<ProductAssociation>,
}

/// Attribute of the product component type itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAttribute {
    pub name: String,
    #[serde(default = "default_datatype")]
    pub datatype: String,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub value_set: ValueSet,
    #[serde(default)]
    pub multi_value: bool,
    #[serde(default = "default_true")]
    pub changing_over_time: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
}

/// Policy attribute whose default value and value set are configured in the product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyAttribute {
    pub name: String,
    #[serde(default = "default_datatype")]
    pub datatype: String,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub value_set: ValueSet,
    /// Value set kinds a product may configure; empty means derived from the model value set
    #[serde(default)]
    pub allowed_value_set_types: Vec<ValueSetType>,
    /// Only configured attributes are product properties
    #[serde(default = "default_true")]
    pub configured: bool,
    #[serde(default = "default_true")]
    pub changing_over_time: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStructureUsage {
    pub role_name: String,
    #[serde(default = "default_true")]
    pub changing_over_time: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaSignature {
    pub name: String,
    #[serde(default = "default_true")]
    pub changing_over_time: bool,
}

/// Validation rule of the policy side that products may switch on or off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    pub name: String,
    #[serde(default = "default_true")]
    pub configurable: bool,
    #[serde(default = "default_true")]
    pub active_by_default: bool,
    #[serde(default)]
    pub changing_over_time: bool,
}

/// Association from this type to another product component type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAssociation {
    /// Target role name; links refer to the association by this name
    pub name: String,
    pub target: String,
    #[serde(default)]
    pub min_cardinality: i32,
    #[serde(default = "default_many", with = "cardinality::serde_bound")]
    pub max_cardinality: i32,
    #[serde(default = "default_true")]
    pub changing_over_time: bool,
}

/// Category of a declared product property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyType {
    ProductAttribute,
    PolicyAttribute,
    TableStructureUsage,
    Formula,
    ValidationRule,
}

/// Kind of a stored property value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyValueType {
    AttributeValue,
    ConfiguredDefault,
    ConfiguredValueSet,
    TableContentUsage,
    Formula,
    ValidationRuleConfig,
}

impl PropertyValueType {
    pub const ALL: [PropertyValueType; 6] = [
        PropertyValueType::AttributeValue,
        PropertyValueType::ConfiguredDefault,
        PropertyValueType::ConfiguredValueSet,
        PropertyValueType::TableContentUsage,
        PropertyValueType::Formula,
        PropertyValueType::ValidationRuleConfig,
    ];

    /// Property type a value of this kind belongs to
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValueType::AttributeValue => PropertyType::ProductAttribute,
            PropertyValueType::ConfiguredDefault | PropertyValueType::ConfiguredValueSet => {
                PropertyType::PolicyAttribute
            }
            PropertyValueType::TableContentUsage => PropertyType::TableStructureUsage,
            PropertyValueType::Formula => PropertyType::Formula,
            PropertyValueType::ValidationRuleConfig => PropertyType::ValidationRule,
        }
    }

    /// Element name used in the persisted element tree
    pub fn element_name(&self) -> &'static str {
        match self {
            PropertyValueType::AttributeValue => "AttributeValue",
            PropertyValueType::ConfiguredDefault => "ConfiguredDefault",
            PropertyValueType::ConfiguredValueSet => "ConfiguredValueSet",
            PropertyValueType::TableContentUsage => "TableContentUsage",
            PropertyValueType::Formula => "Formula",
            PropertyValueType::ValidationRuleConfig => "ValidationRuleConfig",
        }
    }

    pub fn from_element_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.element_name() == name)
    }
}

impl fmt::Display for PropertyValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// A declared product property, borrowed from its type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProductCmptProperty<'a> {
    Attribute(&'a ProductAttribute),
    PolicyAttribute(&'a PolicyAttribute),
    TableUsage(&'a TableStructureUsage),
    Formula(&'a FormulaSignature),
    ValidationRule(&'a ValidationRule),
}

impl<'a> ProductCmptProperty<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            ProductCmptProperty::Attribute(a) => &a.name,
            ProductCmptProperty::PolicyAttribute(a) => &a.name,
            ProductCmptProperty::TableUsage(t) => &t.role_name,
            ProductCmptProperty::Formula(f) => &f.name,
            ProductCmptProperty::ValidationRule(r) => &r.name,
        }
    }

    pub fn property_type(&self) -> PropertyType {
        match self {
            ProductCmptProperty::Attribute(_) => PropertyType::ProductAttribute,
            ProductCmptProperty::PolicyAttribute(_) => PropertyType::PolicyAttribute,
            ProductCmptProperty::TableUsage(_) => PropertyType::TableStructureUsage,
            ProductCmptProperty::Formula(_) => PropertyType::Formula,
            ProductCmptProperty::ValidationRule(_) => PropertyType::ValidationRule,
        }
    }

    pub fn changing_over_time(&self) -> bool {
        match self {
            ProductCmptProperty::Attribute(a) => a.changing_over_time,
            ProductCmptProperty::PolicyAttribute(a) => a.changing_over_time,
            ProductCmptProperty::TableUsage(t) => t.changing_over_time,
            ProductCmptProperty::Formula(f) => f.changing_over_time,
            ProductCmptProperty::ValidationRule(r) => r.changing_over_time,
        }
    }

    /// Value kinds a container needs for this property
    pub fn value_types(&self) -> &'static [PropertyValueType] {
        match self {
            ProductCmptProperty::Attribute(_) => &[PropertyValueType::AttributeValue],
            ProductCmptProperty::PolicyAttribute(_) => &[
                PropertyValueType::ConfiguredDefault,
                PropertyValueType::ConfiguredValueSet,
            ],
            ProductCmptProperty::TableUsage(_) => &[PropertyValueType::TableContentUsage],
            ProductCmptProperty::Formula(_) => &[PropertyValueType::Formula],
            ProductCmptProperty::ValidationRule(_) => &[PropertyValueType::ValidationRuleConfig],
        }
    }

    pub fn has_value_type(&self, value_type: PropertyValueType) -> bool {
        self.value_types().contains(&value_type)
    }
}

impl ProductCmptType {
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            supertype: None,
            changing_over_time: true,
            attributes: Vec::new(),
            policy_attributes: Vec::new(),
            table_usages: Vec::new(),
            formulas: Vec::new(),
            validation_rules: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// Properties declared by this type (not its supertypes), in category then declaration order
    pub fn properties(&self) -> Vec<ProductCmptProperty<'_>> {
        let mut properties: Vec<ProductCmptProperty<'_>> = self
            .attributes
            .iter()
            .map(ProductCmptProperty::Attribute)
            .collect();
        properties.extend(
            self.policy_attributes
                .iter()
                .filter(|a| a.configured)
                .map(ProductCmptProperty::PolicyAttribute),
        );
        properties.extend(self.table_usages.iter().map(ProductCmptProperty::TableUsage));
        properties.extend(self.formulas.iter().map(ProductCmptProperty::Formula));
        properties.extend(
            self.validation_rules
                .iter()
                .filter(|r| r.configurable)
                .map(ProductCmptProperty::ValidationRule),
        );
        properties
    }

    pub fn find_association(&self, name: &str) -> Option<&ProductAssociation> {
        self.associations.iter().find(|a| a.name == name)
    }
}

impl ProductAttribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            datatype: default_datatype(),
            default_value: None,
            value_set: ValueSet::default(),
            multi_value: false,
            changing_over_time: true,
            visible: true,
        }
    }
}

impl PolicyAttribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            datatype: default_datatype(),
            default_value: None,
            value_set: ValueSet::default(),
            allowed_value_set_types: Vec::new(),
            configured: true,
            changing_over_time: true,
        }
    }

    /// Value set kinds a product may configure for this attribute
    pub fn allowed_value_set_types(&self) -> Vec<ValueSetType> {
        if !self.allowed_value_set_types.is_empty() {
            return self.allowed_value_set_types.clone();
        }
        match self.value_set.value_set_type() {
            ValueSetType::Unrestricted => vec![
                ValueSetType::Unrestricted,
                ValueSetType::Enum,
                ValueSetType::Range,
                ValueSetType::StringLength,
            ],
            ValueSetType::Range => vec![ValueSetType::Range, ValueSetType::Enum],
            other => vec![other],
        }
    }

    /// Kind a disallowed configured value set is converted to: the model's kind if allowed,
    /// otherwise the first allowed kind
    pub fn conversion_target(&self) -> ValueSetType {
        let allowed = self.allowed_value_set_types();
        let model_type = self.value_set.value_set_type();
        if allowed.contains(&model_type) {
            model_type
        } else {
            allowed.first().copied().unwrap_or(model_type)
        }
    }
}

impl ProductAssociation {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            min_cardinality: 0,
            max_cardinality: MANY,
            changing_over_time: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_in_category_order() {
        let mut product_type = ProductCmptType::new("model.Product");
        product_type.validation_rules.push(ValidationRule {
            name: "checkAge".into(),
            configurable: true,
            active_by_default: true,
            changing_over_time: false,
        });
        product_type.formulas.push(FormulaSignature {
            name: "premium".into(),
            changing_over_time: true,
        });
        product_type.attributes.push(ProductAttribute::new("x"));
        let mut unconfigured = PolicyAttribute::new("internal");
        unconfigured.configured = false;
        product_type.policy_attributes.push(unconfigured);
        product_type
            .policy_attributes
            .push(PolicyAttribute::new("sumInsured"));

        let names: Vec<&str> = product_type.properties().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["x", "sumInsured", "premium", "checkAge"]);
    }

    #[test]
    fn test_allowed_value_set_types() {
        let mut attribute = PolicyAttribute::new("a");
        attribute.value_set = ValueSet::Enum {
            values: vec!["1".into()],
            contains_null: false,
        };
        assert_eq!(attribute.allowed_value_set_types(), vec![ValueSetType::Enum]);
        assert_eq!(attribute.conversion_target(), ValueSetType::Enum);

        attribute.allowed_value_set_types = vec![ValueSetType::Range];
        assert_eq!(attribute.conversion_target(), ValueSetType::Range);
    }

    #[test]
    fn test_type_yaml_with_many_bound() {
        let yaml = r#"
qualifiedName: model.Product
associations:
  - name: Coverage
    target: model.CoverageType
    minCardinality: 1
    maxCardinality: "*"
    changingOverTime: false
  - name: Extra
    target: model.ExtraType
    maxCardinality: 2
"#;
        let parsed: ProductCmptType = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.associations[0].max_cardinality, MANY);
        assert!(!parsed.associations[0].changing_over_time);
        assert_eq!(parsed.associations[1].max_cardinality, 2);
        assert!(parsed.changing_over_time);
    }
}
