//! Tri-state inheritance of template values
//!
//! Every overridable value is either defined locally, inherited from the template chain, or
//! explicitly undefined. The state and the local value live in one variant so that a status
//! change is a single operation on [`TemplateValue`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inheritance status of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TemplateValueStatus {
    /// The local value is authoritative
    #[default]
    Defined,
    /// The value comes from the nearest template defining it
    Inherited,
    /// No value here, and template resolution stops here
    Undefined,
}

impl TemplateValueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateValueStatus::Defined => "defined",
            TemplateValueStatus::Inherited => "inherited",
            TemplateValueStatus::Undefined => "undefined",
        }
    }
}

impl fmt::Display for TemplateValueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateValueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "defined" => Ok(TemplateValueStatus::Defined),
            "inherited" => Ok(TemplateValueStatus::Inherited),
            "undefined" => Ok(TemplateValueStatus::Undefined),
            other => Err(format!("unknown template value status '{other}'")),
        }
    }
}

/// A value together with its inheritance status
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue<T> {
    Defined(T),
    /// `fallback` is used while the template chain cannot be resolved
    Inherited { fallback: Option<T> },
    Undefined,
}

impl<T: Clone + PartialEq> TemplateValue<T> {
    pub fn inherited() -> Self {
        TemplateValue::Inherited { fallback: None }
    }

    pub fn status(&self) -> TemplateValueStatus {
        match self {
            TemplateValue::Defined(_) => TemplateValueStatus::Defined,
            TemplateValue::Inherited { .. } => TemplateValueStatus::Inherited,
            TemplateValue::Undefined => TemplateValueStatus::Undefined,
        }
    }

    /// The locally defined value
    pub fn defined(&self) -> Option<&T> {
        match self {
            TemplateValue::Defined(value) => Some(value),
            _ => None,
        }
    }

    /// The locally stored value: the defined value or the inherited fallback
    pub fn local(&self) -> Option<&T> {
        match self {
            TemplateValue::Defined(value) => Some(value),
            TemplateValue::Inherited { fallback } => fallback.as_ref(),
            TemplateValue::Undefined => None,
        }
    }

    pub fn local_mut(&mut self) -> Option<&mut T> {
        match self {
            TemplateValue::Defined(value) => Some(value),
            TemplateValue::Inherited { fallback } => fallback.as_mut(),
            TemplateValue::Undefined => None,
        }
    }

    /// Effective value given the value resolved from the template chain.
    ///
    /// An inherited value prefers the live template value and only falls back to the cached
    /// copy when the chain does not resolve.
    pub fn effective<'a>(&'a self, template: Option<&'a T>) -> Option<&'a T> {
        match self {
            TemplateValue::Defined(value) => Some(value),
            TemplateValue::Inherited { fallback } => template.or(fallback.as_ref()),
            TemplateValue::Undefined => None,
        }
    }

    /// Change the status.
    ///
    /// * `Defined` copies `effective` (the value currently in effect) into the local slot, so
    ///   decoupling from the template never changes the value.
    /// * `Inherited` drops the local value; the fallback becomes the live template value, or
    ///   keeps the previous local value when no template value resolves.
    /// * `Undefined` clears the local slot.
    pub fn set_status(&mut self, status: TemplateValueStatus, effective: T, template: Option<T>) {
        *self = match status {
            TemplateValueStatus::Defined => TemplateValue::Defined(effective),
            TemplateValueStatus::Inherited => TemplateValue::Inherited {
                fallback: template.or_else(|| self.local().cloned()),
            },
            TemplateValueStatus::Undefined => TemplateValue::Undefined,
        };
    }

    /// Map the stored value, keeping the status
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> TemplateValue<U> {
        match self {
            TemplateValue::Defined(value) => TemplateValue::Defined(f(value)),
            TemplateValue::Inherited { fallback } => TemplateValue::Inherited {
                fallback: fallback.map(f),
            },
            TemplateValue::Undefined => TemplateValue::Undefined,
        }
    }
}
