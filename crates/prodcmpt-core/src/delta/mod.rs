//! Differences between stored product components and their current type
//!
//! [`compute_delta`] walks a component and its generations once and returns an immutable
//! [`ProductCmptDelta`]: one [`ContainerDelta`] for the component and one per generation, each
//! with typed [`DeltaEntry`]s. Every entry captures the data its fix needs at computation time,
//! so [`fix_delta`] only writes and never has to look anything up again. Entries may name a
//! predecessor entry that has to be fixed first.

mod compute;
mod fix;

pub use compute::{DeltaOptions, compute_delta};
pub use fix::{FixReport, fix_delta};

use crate::cmpt::{
    Cardinality, ContainerId, PartId, ProductCmptLink, PropertyContent, TemplateValue,
};
use crate::model::PropertyValueType;
use std::fmt;

/// Kind of discrepancy between a container and its type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeltaType {
    /// The type declares a property the container has no value for
    MissingPropertyValue,
    /// A stored value whose property is gone or lives on the other level now
    ValueWithoutProperty,
    /// A stored value of the wrong kind for its property
    PropertyTypeMismatch,
    /// A configured value set whose kind is no longer allowed
    ValueSetMismatch,
    /// Single value stored for a multi-value attribute or the other way round
    ValueHolderMismatch,
    /// An inherited value whose cached fallback differs from the template
    InheritedTemplateMismatch,
    /// A hidden attribute whose value differs from the model default
    HiddenAttributeMismatch,
    /// A template link the component does not have yet
    MissingTemplateLink,
    /// An inherited link whose template no longer has it
    RemovedTemplateLink,
    /// A link whose association no longer exists
    LinkWithoutAssociation,
    /// A link stored on the wrong level for its association
    LinkChangingOverTimeMismatch,
}

impl DeltaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeltaType::MissingPropertyValue => "MISSING_PROPERTY_VALUE",
            DeltaType::ValueWithoutProperty => "VALUE_WITHOUT_PROPERTY",
            DeltaType::PropertyTypeMismatch => "PROPERTY_TYPE_MISMATCH",
            DeltaType::ValueSetMismatch => "VALUE_SET_MISMATCH",
            DeltaType::ValueHolderMismatch => "VALUE_HOLDER_MISMATCH",
            DeltaType::InheritedTemplateMismatch => "INHERITED_TEMPLATE_MISMATCH",
            DeltaType::HiddenAttributeMismatch => "HIDDEN_ATTRIBUTE_MISMATCH",
            DeltaType::MissingTemplateLink => "MISSING_TEMPLATE_LINK",
            DeltaType::RemovedTemplateLink => "REMOVED_TEMPLATE_LINK",
            DeltaType::LinkWithoutAssociation => "LINK_WITHOUT_ASSOCIATION",
            DeltaType::LinkChangingOverTimeMismatch => "LINK_CHANGING_OVER_TIME_MISMATCH",
        }
    }
}

impl fmt::Display for DeltaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of an entry, unique within one [`ProductCmptDelta`]
pub type EntryId = usize;

/// What fixing an entry writes, with every value captured when the delta was computed
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaAction {
    CreateValue {
        value_type: PropertyValueType,
        value: TemplateValue<PropertyContent>,
    },
    RemoveValue {
        value_id: PartId,
    },
    /// Drop values of foreign kinds and create the kinds the property needs
    ReplaceValues {
        remove: Vec<PartId>,
        create: Vec<(PropertyValueType, TemplateValue<PropertyContent>)>,
    },
    SetValue {
        value_id: PartId,
        value: TemplateValue<PropertyContent>,
    },
    CreateLink {
        association: String,
        target: String,
        cardinality: TemplateValue<Cardinality>,
    },
    RemoveLink {
        link_id: PartId,
    },
    /// Remove the link here and add a copy to each destination
    MoveLink {
        link_id: PartId,
        link: ProductCmptLink,
        destinations: Vec<ContainerId>,
    },
}

/// One discrepancy in one container
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaEntry {
    pub id: EntryId,
    pub container: ContainerId,
    pub delta_type: DeltaType,
    /// Property name, or `association:target` for links
    pub part_name: String,
    pub value_type: Option<PropertyValueType>,
    /// Entry that must be fixed before this one
    pub predecessor: Option<EntryId>,
    pub description: String,
    pub action: DeltaAction,
}

impl fmt::Display for DeltaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.delta_type, self.part_name)?;
        if let Some(value_type) = self.value_type {
            write!(f, " ({value_type})")?;
        }
        write!(f, ": {}", self.description)?;
        if let Some(predecessor) = self.predecessor {
            write!(f, " [after #{predecessor}]")?;
        }
        Ok(())
    }
}

/// Entries of one container
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerDelta {
    pub container: ContainerId,
    pub label: String,
    pub entries: Vec<DeltaEntry>,
}

impl ContainerDelta {
    pub fn new(container: ContainerId, label: impl Into<String>) -> Self {
        Self {
            container,
            label: label.into(),
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Delta of a component: the component level with one child per generation
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCmptDelta {
    pub cmpt: String,
    pub root: ContainerDelta,
    pub generations: Vec<ContainerDelta>,
}

impl ProductCmptDelta {
    /// True when no level has any entry
    pub fn is_empty(&self) -> bool {
        self.root.is_empty() && self.generations.iter().all(ContainerDelta::is_empty)
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    /// All entries, component level first
    pub fn entries(&self) -> impl Iterator<Item = &DeltaEntry> {
        self.root
            .entries
            .iter()
            .chain(self.generations.iter().flat_map(|g| g.entries.iter()))
    }

    pub fn entries_of_type(&self, delta_type: DeltaType) -> Vec<&DeltaEntry> {
        self.entries()
            .filter(|e| e.delta_type == delta_type)
            .collect()
    }

    pub fn entry(&self, id: EntryId) -> Option<&DeltaEntry> {
        self.entries().find(|e| e.id == id)
    }
}

impl fmt::Display for ProductCmptDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.cmpt)?;
        for entry in &self.root.entries {
            writeln!(f, "  #{} {}", entry.id, entry)?;
        }
        for generation in &self.generations {
            if generation.is_empty() {
                continue;
            }
            writeln!(f, "  {}", generation.label)?;
            for entry in &generation.entries {
                writeln!(f, "    #{} {}", entry.id, entry)?;
            }
        }
        Ok(())
    }
}
