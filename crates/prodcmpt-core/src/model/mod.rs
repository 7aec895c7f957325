//! Read-only type model consulted by resolution, delta computation and validation
//!
//! The model is never looked up through global state. Every operation receives a
//! [`ModelContext`] that answers two questions: which type has this qualified name, and which
//! product component has this qualified name. Both lookups tolerate missing names by
//! returning `None`.

pub mod product_cmpt_type;
pub mod value_set;

pub use product_cmpt_type::{
    FormulaSignature, PolicyAttribute, ProductAssociation, ProductAttribute, ProductCmptProperty,
    ProductCmptType, PropertyType, PropertyValueType, TableStructureUsage, ValidationRule,
};
pub use value_set::{ValueSet, ValueSetType};

use crate::cmpt::ProductCmpt;
use std::collections::HashSet;
use tracing::warn;

/// Lookup of types and components by qualified name
pub trait ModelContext {
    fn find_product_cmpt_type(&self, qualified_name: &str) -> Option<&ProductCmptType>;

    fn find_product_cmpt(&self, qualified_name: &str) -> Option<&ProductCmpt>;

    /// The type and its supertypes, root supertype first.
    ///
    /// A supertype cycle is cut at the first repeated type.
    fn type_hierarchy(&self, qualified_name: &str) -> Vec<&ProductCmptType> {
        let mut visited = HashSet::new();
        let mut chain = Vec::new();
        let mut current = self.find_product_cmpt_type(qualified_name);
        while let Some(product_type) = current {
            if !visited.insert(product_type.qualified_name.as_str()) {
                warn!(
                    "Supertype cycle detected at type {}",
                    product_type.qualified_name
                );
                break;
            }
            chain.push(product_type);
            current = product_type
                .supertype
                .as_deref()
                .and_then(|name| self.find_product_cmpt_type(name));
        }
        chain.reverse();
        chain
    }

    /// All properties of the type including inherited ones, supertype properties first
    fn find_all_properties(&self, qualified_name: &str) -> Vec<ProductCmptProperty<'_>> {
        let mut properties: Vec<ProductCmptProperty<'_>> = Vec::new();
        for product_type in self.type_hierarchy(qualified_name) {
            for property in product_type.properties() {
                // a subtype redeclaring a property name overrides the supertype declaration
                if let Some(pos) = properties.iter().position(|p| {
                    p.name() == property.name() && p.property_type() == property.property_type()
                }) {
                    properties[pos] = property;
                } else {
                    properties.push(property);
                }
            }
        }
        properties
    }

    /// Find the declared property of the given name that needs a value of the given kind
    fn find_property(
        &self,
        qualified_name: &str,
        property_name: &str,
        value_type: PropertyValueType,
    ) -> Option<ProductCmptProperty<'_>> {
        self.find_all_properties(qualified_name)
            .into_iter()
            .find(|p| p.name() == property_name && p.has_value_type(value_type))
    }

    /// All associations of the type including inherited ones, supertype associations first
    fn find_all_associations(&self, qualified_name: &str) -> Vec<&ProductAssociation> {
        let mut associations: Vec<&ProductAssociation> = Vec::new();
        for product_type in self.type_hierarchy(qualified_name) {
            for association in &product_type.associations {
                if let Some(pos) = associations
                    .iter()
                    .position(|a| a.name == association.name)
                {
                    associations[pos] = association;
                } else {
                    associations.push(association);
                }
            }
        }
        associations
    }

    fn find_association(&self, qualified_name: &str, name: &str) -> Option<&ProductAssociation> {
        self.find_all_associations(qualified_name)
            .into_iter()
            .find(|a| a.name == name)
    }

    /// Whether `candidate` is `qualified_name` itself or one of its supertypes
    fn is_same_or_supertype(&self, candidate: &str, qualified_name: &str) -> bool {
        self.type_hierarchy(qualified_name)
            .iter()
            .any(|t| t.qualified_name == candidate)
    }
}
