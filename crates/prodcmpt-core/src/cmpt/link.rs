use super::cardinality::Cardinality;
use super::property_value::PartId;
use super::template_value::{TemplateValue, TemplateValueStatus};

/// Instance of a product association, pointing at another product component
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCmptLink {
    pub id: PartId,
    /// Name of the association this link instantiates
    pub association: String,
    /// Qualified name of the target component
    pub target: String,
    pub cardinality: TemplateValue<Cardinality>,
}

impl ProductCmptLink {
    pub fn new(
        id: PartId,
        association: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            id,
            association: association.into(),
            target: target.into(),
            cardinality: TemplateValue::Defined(cardinality),
        }
    }

    pub fn inherited(id: PartId, association: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id,
            association: association.into(),
            target: target.into(),
            cardinality: TemplateValue::inherited(),
        }
    }

    pub fn status(&self) -> TemplateValueStatus {
        self.cardinality.status()
    }

    /// Links are identified across template levels by association and target
    pub fn same_link(&self, other: &ProductCmptLink) -> bool {
        self.association == other.association && self.target == other.target
    }

    pub fn name(&self) -> String {
        format!("{}:{}", self.association, self.target)
    }
}
