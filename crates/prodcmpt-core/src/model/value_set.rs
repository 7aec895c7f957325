//! Value sets describing the permitted values of an attribute
//!
//! The engine never checks whether a configured value set is a subset of the model's value
//! set; it only cares about the *kind* of value set and how to convert between kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound for expanding a range into an enumeration
const MAX_ENUM_CONVERSION_VALUES: i64 = 1000;

fn default_true() -> bool {
    true
}

/// Kind of a value set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueSetType {
    Unrestricted,
    Enum,
    Range,
    StringLength,
    Derived,
}

impl ValueSetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueSetType::Unrestricted => "unrestricted",
            ValueSetType::Enum => "enum",
            ValueSetType::Range => "range",
            ValueSetType::StringLength => "stringLength",
            ValueSetType::Derived => "derived",
        }
    }
}

impl fmt::Display for ValueSetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueSetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unrestricted" => Ok(ValueSetType::Unrestricted),
            "enum" => Ok(ValueSetType::Enum),
            "range" => Ok(ValueSetType::Range),
            "stringLength" => Ok(ValueSetType::StringLength),
            "derived" => Ok(ValueSetType::Derived),
            other => Err(format!("unknown value set type '{other}'")),
        }
    }
}

/// Permitted values of an attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ValueSet {
    Unrestricted {
        #[serde(default = "default_true")]
        contains_null: bool,
    },
    Enum {
        #[serde(default)]
        values: Vec<String>,
        #[serde(default)]
        contains_null: bool,
    },
    Range {
        #[serde(default)]
        lower: Option<String>,
        #[serde(default)]
        upper: Option<String>,
        #[serde(default)]
        step: Option<String>,
        #[serde(default)]
        contains_null: bool,
    },
    StringLength {
        #[serde(default)]
        max_length: Option<u32>,
        #[serde(default)]
        contains_null: bool,
    },
    Derived,
}

impl Default for ValueSet {
    fn default() -> Self {
        ValueSet::Unrestricted {
            contains_null: true,
        }
    }
}

impl ValueSet {
    pub fn value_set_type(&self) -> ValueSetType {
        match self {
            ValueSet::Unrestricted { .. } => ValueSetType::Unrestricted,
            ValueSet::Enum { .. } => ValueSetType::Enum,
            ValueSet::Range { .. } => ValueSetType::Range,
            ValueSet::StringLength { .. } => ValueSetType::StringLength,
            ValueSet::Derived => ValueSetType::Derived,
        }
    }

    pub fn contains_null(&self) -> bool {
        match self {
            ValueSet::Unrestricted { contains_null }
            | ValueSet::Enum { contains_null, .. }
            | ValueSet::Range { contains_null, .. }
            | ValueSet::StringLength { contains_null, .. } => *contains_null,
            ValueSet::Derived => true,
        }
    }

    /// Concrete values this value set enumerates.
    ///
    /// Enums list their values; integer ranges with a step are expanded as long as they stay
    /// small. Everything else has no enumerable values.
    pub fn concrete_values(&self) -> Vec<String> {
        match self {
            ValueSet::Enum { values, .. } => values.clone(),
            ValueSet::Range {
                lower: Some(lower),
                upper: Some(upper),
                step,
                ..
            } => expand_range(lower, upper, step.as_deref()).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Convert this value set to another kind.
    ///
    /// The conversion is deterministic: converting to an enum collects the concrete values,
    /// converting to an unrestricted set drops all constraints, converting an integer enum to
    /// a range spans its minimum and maximum. `containsNull` is preserved where the target
    /// kind has it.
    pub fn convert_to(&self, target: ValueSetType) -> ValueSet {
        if self.value_set_type() == target {
            return self.clone();
        }
        let contains_null = self.contains_null();
        match target {
            ValueSetType::Unrestricted => ValueSet::Unrestricted { contains_null },
            ValueSetType::Enum => ValueSet::Enum {
                values: self.concrete_values(),
                contains_null,
            },
            ValueSetType::Range => {
                let numbers: Option<Vec<i64>> = match self {
                    ValueSet::Enum { values, .. } if !values.is_empty() => {
                        values.iter().map(|v| v.trim().parse::<i64>().ok()).collect()
                    }
                    _ => None,
                };
                let (lower, upper) = match numbers {
                    Some(numbers) => (
                        numbers.iter().min().map(|n| n.to_string()),
                        numbers.iter().max().map(|n| n.to_string()),
                    ),
                    None => (None, None),
                };
                ValueSet::Range {
                    lower,
                    upper,
                    step: None,
                    contains_null,
                }
            }
            ValueSetType::StringLength => ValueSet::StringLength {
                max_length: None,
                contains_null,
            },
            ValueSetType::Derived => ValueSet::Derived,
        }
    }
}

impl fmt::Display for ValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSet::Unrestricted { .. } => write!(f, "unrestricted"),
            ValueSet::Enum { values, .. } => write!(f, "[{}]", values.join(", ")),
            ValueSet::Range {
                lower, upper, step, ..
            } => {
                write!(
                    f,
                    "{}..{}",
                    lower.as_deref().unwrap_or("*"),
                    upper.as_deref().unwrap_or("*")
                )?;
                if let Some(step) = step {
                    write!(f, " step {step}")?;
                }
                Ok(())
            }
            ValueSet::StringLength { max_length, .. } => match max_length {
                Some(max) => write!(f, "length <= {max}"),
                None => write!(f, "length unrestricted"),
            },
            ValueSet::Derived => write!(f, "derived"),
        }
    }
}

fn expand_range(lower: &str, upper: &str, step: Option<&str>) -> Option<Vec<String>> {
    let lower = lower.trim().parse::<i64>().ok()?;
    let upper = upper.trim().parse::<i64>().ok()?;
    let step = match step {
        Some(step) => step.trim().parse::<i64>().ok()?,
        None => 1,
    };
    if step <= 0 || upper < lower {
        return None;
    }
    // the span of two i64 bounds can exceed i64::MAX
    let span = i128::from(upper) - i128::from(lower);
    if span / i128::from(step) >= i128::from(MAX_ENUM_CONVERSION_VALUES) {
        return None;
    }
    let mut values = Vec::new();
    let mut current = Some(lower);
    while let Some(value) = current
        && value <= upper
    {
        values.push(value.to_string());
        current = value.checked_add(step);
    }
    Some(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(lower: &str, upper: &str, step: Option<&str>) -> ValueSet {
        ValueSet::Range {
            lower: Some(lower.to_string()),
            upper: Some(upper.to_string()),
            step: step.map(str::to_string),
            contains_null: false,
        }
    }

    #[test]
    fn test_range_to_enum_collects_values() {
        let converted = range("0", "10", Some("5")).convert_to(ValueSetType::Enum);
        assert_eq!(
            converted,
            ValueSet::Enum {
                values: vec!["0".into(), "5".into(), "10".into()],
                contains_null: false,
            }
        );
    }

    #[test]
    fn test_unbounded_range_to_enum_is_empty() {
        let unbounded = ValueSet::Range {
            lower: None,
            upper: Some("10".into()),
            step: None,
            contains_null: true,
        };
        assert_eq!(
            unbounded.convert_to(ValueSetType::Enum),
            ValueSet::Enum {
                values: vec![],
                contains_null: true,
            }
        );
    }

    #[test]
    fn test_huge_range_is_not_expanded() {
        assert!(range("0", "1000000", None).concrete_values().is_empty());
    }

    #[test]
    fn test_range_at_integer_limits() {
        let top = range("9223372036854775805", "9223372036854775807", None);
        assert_eq!(
            top.concrete_values(),
            vec![
                "9223372036854775805".to_string(),
                "9223372036854775806".to_string(),
                "9223372036854775807".to_string(),
            ]
        );
        let stepped = range("9223372036854775800", "9223372036854775807", Some("5"));
        assert_eq!(stepped.concrete_values().len(), 2);
        let full = range("-9223372036854775808", "9223372036854775807", None);
        assert!(full.concrete_values().is_empty());
    }

    #[test]
    fn test_enum_to_range_spans_numbers() {
        let enum_set = ValueSet::Enum {
            values: vec!["7".into(), "2".into(), "9".into()],
            contains_null: false,
        };
        assert_eq!(enum_set.convert_to(ValueSetType::Range), {
            let mut expected = range("2", "9", None);
            if let ValueSet::Range { contains_null, .. } = &mut expected {
                *contains_null = false;
            }
            expected
        });
    }

    #[test]
    fn test_to_unrestricted_drops_constraints() {
        let converted = range("1", "3", None).convert_to(ValueSetType::Unrestricted);
        assert_eq!(
            converted,
            ValueSet::Unrestricted {
                contains_null: false
            }
        );
    }

    #[test]
    fn test_value_set_yaml() {
        let yaml = "type: range\nlower: '1'\nupper: '5'\n";
        let parsed: ValueSet = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.value_set_type(), ValueSetType::Range);
        assert_eq!(parsed.concrete_values().len(), 5);
        assert_eq!(parsed.to_string(), "1..5");
    }
}
