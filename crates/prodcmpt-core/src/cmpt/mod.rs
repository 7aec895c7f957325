//! Instance side: product components, generations, property values and links

pub mod cardinality;
pub mod container;
pub mod link;
pub mod property_value;
pub mod template_value;

pub use cardinality::{Cardinality, MANY};
pub use container::{ContainerId, ProductCmpt, ProductCmptGeneration, PropertyValueContainer};
pub use link::ProductCmptLink;
pub use property_value::{PartId, PropertyContent, PropertyValue, ValueHolder};
pub use template_value::{TemplateValue, TemplateValueStatus};
