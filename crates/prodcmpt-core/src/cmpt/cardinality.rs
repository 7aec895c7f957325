//! Cardinality of a product component link

use crate::diagnostics::{Message, MessageList};
use std::cmp::Ordering;
use std::fmt;

/// Sentinel for an unbounded maximum
pub const MANY: i32 = i32::MAX;

pub const MSGCODE_PREFIX: &str = "PRODUCTCMPT_LINK-";
pub const MSGCODE_MIN_CARDINALITY_BELOW_ZERO: &str = "PRODUCTCMPT_LINK-MinCardinalityBelowZero";
pub const MSGCODE_MAX_CARDINALITY_BELOW_ONE: &str = "PRODUCTCMPT_LINK-MaxCardinalityIsLessThan1";
pub const MSGCODE_MAX_CARDINALITY_LESS_THAN_MIN: &str =
    "PRODUCTCMPT_LINK-MaxCardinalityIsLessThanMin";
pub const MSGCODE_DEFAULT_CARDINALITY_OUT_OF_RANGE: &str =
    "PRODUCTCMPT_LINK-DefaultCardinalityOutOfRange";

pub const PROPERTY_MIN_CARDINALITY: &str = "minCardinality";
pub const PROPERTY_MAX_CARDINALITY: &str = "maxCardinality";
pub const PROPERTY_DEFAULT_CARDINALITY: &str = "defaultCardinality";

/// Immutable (min, max, default) triple.
///
/// [`Cardinality::UNDEFINED`] is a distinct singleton: it orders below every concrete
/// cardinality and equals only itself, even compared with a concrete `(0, 0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cardinality {
    min: i32,
    max: i32,
    default: i32,
    undefined: bool,
}

impl Cardinality {
    pub const UNDEFINED: Cardinality = Cardinality {
        min: 0,
        max: 0,
        default: 0,
        undefined: true,
    };

    /// Optional (0..1, default 0)
    pub const OPTIONAL: Cardinality = Cardinality::new(0, 1, 0);

    /// Mandatory (1..1, default 1)
    pub const MANDATORY: Cardinality = Cardinality::new(1, 1, 1);

    /// Create a concrete cardinality; values are not checked, see [`Cardinality::validate`]
    pub const fn new(min: i32, max: i32, default: i32) -> Self {
        Self {
            min,
            max,
            default,
            undefined: false,
        }
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn default_cardinality(&self) -> i32 {
        self.default
    }

    pub fn is_undefined(&self) -> bool {
        self.undefined
    }

    pub fn is_to_many(&self) -> bool {
        !self.undefined && self.max > 1
    }

    pub fn is_mandatory(&self) -> bool {
        !self.undefined && self.min > 0
    }

    pub fn with_min(self, min: i32) -> Self {
        Self::new(min, self.max, self.default)
    }

    pub fn with_max(self, max: i32) -> Self {
        Self::new(self.min, max, self.default)
    }

    pub fn with_default(self, default: i32) -> Self {
        Self::new(self.min, self.max, default)
    }

    /// Compare against an optional cardinality; "no object" always compares as less
    pub fn compare_to(&self, other: Option<&Cardinality>) -> Ordering {
        match other {
            Some(other) => self.cmp(other),
            None => Ordering::Less,
        }
    }

    /// Check the structural invariants, reporting at most one message.
    ///
    /// Priority: min below zero, max below one, max below min, default outside min..max.
    /// `object` identifies the owning link in the message.
    pub fn validate(&self, object: &str) -> MessageList {
        let mut list = MessageList::new();
        if self.undefined {
            return list;
        }
        let message = if self.min < 0 {
            Some(
                Message::error(
                    MSGCODE_MIN_CARDINALITY_BELOW_ZERO,
                    format!("Minimum cardinality {} is below 0.", self.min),
                )
                .with_property(object, PROPERTY_MIN_CARDINALITY),
            )
        } else if self.max < 1 {
            Some(
                Message::error(
                    MSGCODE_MAX_CARDINALITY_BELOW_ONE,
                    format!("Maximum cardinality {} is less than 1.", self.max),
                )
                .with_property(object, PROPERTY_MAX_CARDINALITY),
            )
        } else if self.max < self.min {
            Some(
                Message::error(
                    MSGCODE_MAX_CARDINALITY_LESS_THAN_MIN,
                    format!(
                        "Maximum cardinality {} is less than minimum cardinality {}.",
                        self.max, self.min
                    ),
                )
                .with_property(object, PROPERTY_MAX_CARDINALITY)
                .with_property(object, PROPERTY_MIN_CARDINALITY),
            )
        } else if self.default < self.min || self.default > self.max {
            Some(
                Message::error(
                    MSGCODE_DEFAULT_CARDINALITY_OUT_OF_RANGE,
                    format!(
                        "Default cardinality {} is not within {}..{}.",
                        self.default,
                        self.min,
                        format_bound(self.max)
                    ),
                )
                .with_property(object, PROPERTY_DEFAULT_CARDINALITY),
            )
        } else {
            None
        };
        if let Some(message) = message {
            list.add(message);
        }
        list
    }

    /// Render as `[min..max, default]`
    pub fn format(&self) -> String {
        format!("[{}..{}, {}]", self.min, self.max, self.default)
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Cardinality::OPTIONAL
    }
}

impl Ord for Cardinality {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.undefined, other.undefined) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .min
                .cmp(&other.min)
                .then(self.max.cmp(&other.max))
                .then(self.default.cmp(&other.default)),
        }
    }
}

impl PartialOrd for Cardinality {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.undefined {
            return f.write_str("[undefined]");
        }
        f.write_str(&self.format())
    }
}

/// Render a maximum bound, `*` for [`MANY`]
pub fn format_bound(bound: i32) -> String {
    if bound == MANY {
        "*".to_string()
    } else {
        bound.to_string()
    }
}

/// Parse a bound that is either an integer or `*`
pub fn parse_bound(text: &str) -> Option<i32> {
    match text.trim() {
        "*" => Some(MANY),
        other => other.parse().ok(),
    }
}

/// Serde support for maximum cardinalities written as integers or `*`
pub mod serde_bound {
    use super::{MANY, format_bound, parse_bound};
    use serde::{Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Bound {
        Number(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(bound: &i32, serializer: S) -> Result<S::Ok, S::Error> {
        if *bound == MANY {
            serializer.serialize_str(&format_bound(*bound))
        } else {
            serializer.serialize_i32(*bound)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
        match Bound::deserialize(deserializer)? {
            Bound::Number(n) => i32::try_from(n).map_err(de::Error::custom),
            Bound::Text(text) => parse_bound(&text)
                .ok_or_else(|| de::Error::custom(format!("invalid cardinality bound '{text}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexicographic_ordering() {
        let a = Cardinality::new(0, 1, 0);
        let b = Cardinality::new(0, 2, 0);
        let c = Cardinality::new(1, 1, 1);
        let d = Cardinality::new(1, 1, 0);
        assert!(a < b);
        assert!(b < c);
        assert!(d < c);
        assert_eq!(a.cmp(&Cardinality::new(0, 1, 0)), Ordering::Equal);
    }

    #[test]
    fn test_undefined_is_lowest_and_only_equal_to_itself() {
        let zero = Cardinality::new(0, 0, 0);
        assert_ne!(Cardinality::UNDEFINED, zero);
        assert!(Cardinality::UNDEFINED < zero);
        assert!(Cardinality::UNDEFINED < Cardinality::new(-5, -5, -5));
        assert_eq!(
            Cardinality::UNDEFINED.cmp(&Cardinality::UNDEFINED),
            Ordering::Equal
        );
    }

    #[test]
    fn test_compare_to_nothing_is_less() {
        assert_eq!(Cardinality::MANDATORY.compare_to(None), Ordering::Less);
        assert_eq!(Cardinality::UNDEFINED.compare_to(None), Ordering::Less);
    }

    #[test]
    fn test_validate_priority() {
        let messages = Cardinality::new(-1, 1, 0).validate("link");
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages.iter().next().unwrap().code,
            MSGCODE_MIN_CARDINALITY_BELOW_ZERO
        );

        let messages = Cardinality::new(2, 0, 5).validate("link");
        assert_eq!(messages.len(), 1);
        assert!(
            messages
                .message_by_code(MSGCODE_MAX_CARDINALITY_BELOW_ONE)
                .is_some()
        );

        let messages = Cardinality::new(3, 2, 2).validate("link");
        assert!(
            messages
                .message_by_code(MSGCODE_MAX_CARDINALITY_LESS_THAN_MIN)
                .is_some()
        );

        let messages = Cardinality::new(1, 3, 4).validate("link");
        let message = messages
            .message_by_code(MSGCODE_DEFAULT_CARDINALITY_OUT_OF_RANGE)
            .unwrap();
        assert_eq!(
            message.invalid_properties[0].property.as_deref(),
            Some(PROPERTY_DEFAULT_CARDINALITY)
        );
    }

    #[test]
    fn test_valid_cardinalities() {
        assert!(Cardinality::new(0, MANY, 1).validate("link").is_empty());
        assert!(Cardinality::MANDATORY.validate("link").is_empty());
        assert!(Cardinality::UNDEFINED.validate("link").is_empty());
    }

    #[test]
    fn test_format() {
        insta::assert_snapshot!(Cardinality::new(1, 3, 2).format(), @"[1..3, 2]");
        insta::assert_snapshot!(Cardinality::new(0, MANY, 0).format(), @"[0..2147483647, 0]");
    }

    #[test]
    fn test_parse_bound() {
        assert_eq!(parse_bound("*"), Some(MANY));
        assert_eq!(parse_bound(" 4 "), Some(4));
        assert_eq!(parse_bound("many"), None);
    }
}
