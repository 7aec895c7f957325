//! Product components, their generations and the property value containers they own

use super::link::ProductCmptLink;
use super::property_value::{PartId, PropertyValue};
use crate::model::PropertyValueType;
use std::collections::HashSet;
use std::fmt;

/// Addresses one container of a component: the component itself or one of its generations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContainerId {
    Cmpt,
    /// Index into [`ProductCmpt::generations`]
    Generation(usize),
}

impl ContainerId {
    pub fn is_generation(&self) -> bool {
        matches!(self, ContainerId::Generation(_))
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerId::Cmpt => f.write_str("component"),
            ContainerId::Generation(index) => write!(f, "generation {index}"),
        }
    }
}

/// Ordered property values and links of one container.
///
/// Values are unique per (property name, value kind); links per (association, target).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyValueContainer {
    pub values: Vec<PropertyValue>,
    pub links: Vec<ProductCmptLink>,
}

impl PropertyValueContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_value(&self, property_name: &str, value_type: PropertyValueType) -> Option<&PropertyValue> {
        self.values.iter().find(|v| v.matches(property_name, value_type))
    }

    pub fn find_value_mut(
        &mut self,
        property_name: &str,
        value_type: PropertyValueType,
    ) -> Option<&mut PropertyValue> {
        self.values
            .iter_mut()
            .find(|v| v.matches(property_name, value_type))
    }

    /// All values stored for a property name, of any kind
    pub fn values_named<'a>(&'a self, property_name: &'a str) -> impl Iterator<Item = &'a PropertyValue> {
        self.values.iter().filter(move |v| v.property_name == property_name)
    }

    pub fn value_by_id(&self, id: PartId) -> Option<&PropertyValue> {
        self.values.iter().find(|v| v.id == id)
    }

    pub fn value_by_id_mut(&mut self, id: PartId) -> Option<&mut PropertyValue> {
        self.values.iter_mut().find(|v| v.id == id)
    }

    /// Add a value, replacing an existing one of the same property and kind
    pub fn add_value(&mut self, value: PropertyValue) {
        if let Some(existing) = self.find_value_mut(&value.property_name, value.value_type) {
            *existing = value;
        } else {
            self.values.push(value);
        }
    }

    pub fn remove_value(&mut self, id: PartId) -> Option<PropertyValue> {
        let pos = self.values.iter().position(|v| v.id == id)?;
        Some(self.values.remove(pos))
    }

    pub fn find_link(&self, association: &str, target: &str) -> Option<&ProductCmptLink> {
        self.links
            .iter()
            .find(|l| l.association == association && l.target == target)
    }

    pub fn links_for<'a>(&'a self, association: &'a str) -> impl Iterator<Item = &'a ProductCmptLink> {
        self.links.iter().filter(move |l| l.association == association)
    }

    pub fn link_by_id(&self, id: PartId) -> Option<&ProductCmptLink> {
        self.links.iter().find(|l| l.id == id)
    }

    pub fn link_by_id_mut(&mut self, id: PartId) -> Option<&mut ProductCmptLink> {
        self.links.iter_mut().find(|l| l.id == id)
    }

    pub fn add_link(&mut self, link: ProductCmptLink) {
        self.links.push(link);
    }

    pub fn remove_link(&mut self, id: PartId) -> Option<ProductCmptLink> {
        let pos = self.links.iter().position(|l| l.id == id)?;
        Some(self.links.remove(pos))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.links.is_empty()
    }
}

/// Time slice of a component holding its changing-over-time values
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCmptGeneration {
    /// Date from which this generation is effective, `YYYY-MM-DD`
    pub valid_from: String,
    pub container: PropertyValueContainer,
}

impl ProductCmptGeneration {
    pub fn new(valid_from: impl Into<String>) -> Self {
        Self {
            valid_from: valid_from.into(),
            container: PropertyValueContainer::new(),
        }
    }
}

/// A product component: an instance of a [`crate::model::ProductCmptType`], possibly based on a
/// template and possibly a template itself
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCmpt {
    pub qualified_name: String,
    pub product_cmpt_type: String,
    /// Qualified name of the template this component is based on
    pub template: Option<String>,
    pub is_template: bool,
    /// Values of static (not changing over time) properties
    pub container: PropertyValueContainer,
    /// Generations ordered by valid-from date
    pub generations: Vec<ProductCmptGeneration>,
    /// `None` once the id space above the highest stored id is used up
    next_part_id: Option<PartId>,
}

impl ProductCmpt {
    pub fn new(qualified_name: impl Into<String>, product_cmpt_type: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            product_cmpt_type: product_cmpt_type.into(),
            template: None,
            is_template: false,
            container: PropertyValueContainer::new(),
            generations: Vec::new(),
            next_part_id: Some(0),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn as_template(mut self) -> Self {
        self.is_template = true;
        self
    }

    pub fn uses_template(&self) -> bool {
        self.template.is_some()
    }

    /// Hand out a fresh part id.
    ///
    /// Ids count up from the highest reserved one. Once that reaches [`PartId::MAX`] the lowest
    /// id no part of this component uses is handed out instead.
    pub fn allocate_part_id(&mut self) -> PartId {
        match self.next_part_id {
            Some(id) => {
                self.next_part_id = id.checked_add(1);
                id
            }
            None => self.lowest_free_part_id(),
        }
    }

    /// Make sure future ids do not collide with an id read from storage
    pub fn reserve_part_id(&mut self, id: PartId) {
        if let Some(next) = self.next_part_id
            && id >= next
        {
            self.next_part_id = id.checked_add(1);
        }
    }

    fn lowest_free_part_id(&self) -> PartId {
        let used: HashSet<PartId> = self
            .container_ids()
            .into_iter()
            .filter_map(|id| self.container(id))
            .flat_map(|c| {
                c.values
                    .iter()
                    .map(|v| v.id)
                    .chain(c.links.iter().map(|l| l.id))
            })
            .collect();
        (0..PartId::MAX)
            .find(|id| !used.contains(id))
            .unwrap_or(PartId::MAX)
    }

    /// Insert a generation keeping the valid-from order, returning its index
    pub fn add_generation(&mut self, valid_from: impl Into<String>) -> usize {
        let generation = ProductCmptGeneration::new(valid_from);
        let pos = self
            .generations
            .iter()
            .position(|g| g.valid_from > generation.valid_from)
            .unwrap_or(self.generations.len());
        self.generations.insert(pos, generation);
        pos
    }

    pub fn container(&self, id: ContainerId) -> Option<&PropertyValueContainer> {
        match id {
            ContainerId::Cmpt => Some(&self.container),
            ContainerId::Generation(index) => self.generations.get(index).map(|g| &g.container),
        }
    }

    pub fn container_mut(&mut self, id: ContainerId) -> Option<&mut PropertyValueContainer> {
        match id {
            ContainerId::Cmpt => Some(&mut self.container),
            ContainerId::Generation(index) => {
                self.generations.get_mut(index).map(|g| &mut g.container)
            }
        }
    }

    /// The component container followed by every generation
    pub fn container_ids(&self) -> Vec<ContainerId> {
        std::iter::once(ContainerId::Cmpt)
            .chain((0..self.generations.len()).map(ContainerId::Generation))
            .collect()
    }

    pub fn generation_ids(&self) -> impl Iterator<Item = ContainerId> + '_ {
        (0..self.generations.len()).map(ContainerId::Generation)
    }

    pub fn latest_generation(&self) -> Option<ContainerId> {
        self.generations
            .len()
            .checked_sub(1)
            .map(ContainerId::Generation)
    }

    /// Generation effective on `date`, or the first generation when none is effective yet
    pub fn best_matching_generation(&self, date: &str) -> Option<ContainerId> {
        self.generations
            .iter()
            .rposition(|g| g.valid_from.as_str() <= date)
            .or(if self.generations.is_empty() { None } else { Some(0) })
            .map(ContainerId::Generation)
    }

    /// Human-readable label of a container, used in message object paths
    pub fn container_label(&self, id: ContainerId) -> String {
        match id {
            ContainerId::Cmpt => self.qualified_name.clone(),
            ContainerId::Generation(index) => match self.generations.get(index) {
                Some(generation) => format!("{}@{}", self.qualified_name, generation.valid_from),
                None => format!("{}@#{index}", self.qualified_name),
            },
        }
    }

    /// Object path of a part within a container, e.g. `products.Basic@2024-01-01/premium`
    pub fn part_path(&self, id: ContainerId, part: &str) -> String {
        format!("{}/{}", self.container_label(id), part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generations_stay_ordered() {
        let mut cmpt = ProductCmpt::new("products.Basic", "model.Product");
        cmpt.add_generation("2024-01-01");
        cmpt.add_generation("2022-06-01");
        cmpt.add_generation("2023-01-01");
        let dates: Vec<&str> = cmpt.generations.iter().map(|g| g.valid_from.as_str()).collect();
        assert_eq!(dates, vec!["2022-06-01", "2023-01-01", "2024-01-01"]);
        assert_eq!(cmpt.latest_generation(), Some(ContainerId::Generation(2)));
    }

    #[test]
    fn test_best_matching_generation() {
        let mut cmpt = ProductCmpt::new("products.Basic", "model.Product");
        assert_eq!(cmpt.best_matching_generation("2024-01-01"), None);
        cmpt.add_generation("2022-01-01");
        cmpt.add_generation("2024-01-01");

        assert_eq!(
            cmpt.best_matching_generation("2023-05-05"),
            Some(ContainerId::Generation(0))
        );
        assert_eq!(
            cmpt.best_matching_generation("2024-01-01"),
            Some(ContainerId::Generation(1))
        );
        // nothing effective yet, first generation
        assert_eq!(
            cmpt.best_matching_generation("2000-01-01"),
            Some(ContainerId::Generation(0))
        );
    }

    #[test]
    fn test_part_ids_and_paths() {
        let mut cmpt = ProductCmpt::new("products.Basic", "model.Product");
        cmpt.reserve_part_id(7);
        assert_eq!(cmpt.allocate_part_id(), 8);
        cmpt.add_generation("2024-01-01");
        assert_eq!(
            cmpt.part_path(ContainerId::Generation(0), "premium"),
            "products.Basic@2024-01-01/premium"
        );
        assert_eq!(cmpt.part_path(ContainerId::Cmpt, "x"), "products.Basic/x");
    }

    #[test]
    fn test_part_ids_past_the_highest_id() {
        let mut cmpt = ProductCmpt::new("products.Basic", "model.Product");
        cmpt.container.add_value(PropertyValue::attribute(0, "x", Some("1")));
        cmpt.container
            .add_value(PropertyValue::attribute(PartId::MAX, "y", Some("2")));
        cmpt.reserve_part_id(0);
        cmpt.reserve_part_id(PartId::MAX);
        assert_eq!(cmpt.allocate_part_id(), 1);
        cmpt.reserve_part_id(5);
        assert_eq!(cmpt.allocate_part_id(), 1);
    }

    #[test]
    fn test_add_value_replaces_same_kind() {
        let mut container = PropertyValueContainer::new();
        container.add_value(PropertyValue::attribute(0, "x", Some("1")));
        container.add_value(PropertyValue::attribute(1, "x", Some("2")));
        assert_eq!(container.values.len(), 1);
        assert_eq!(container.values[0].id, 1);
    }
}
