use std::{
    borrow::Cow,
    fmt::{Display, Formatter},
};

use bincode::{Decode, Encode};

/// The type of an attribute field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum FieldType {
    Integer,
    Real,
    String,
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Integer => write!(f, "Integer"),
            FieldType::Real => write!(f, "Real"),
            FieldType::String => write!(f, "String"),
        }
    }
}

/// The value of one attribute field of a feature
#[derive(Debug, PartialEq, Clone, Default, Encode, Decode)]
pub enum FieldValue {
    /// The field has not been set
    #[default]
    Null,
    String(String),
    Real(f64),
    Integer(i64),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Interprets the value as a number. Strings are parsed; `Null` and
    /// unparsable strings yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Null => None,
            FieldValue::String(s) => s.trim().parse().ok(),
            FieldValue::Real(r) => Some(*r),
            FieldValue::Integer(i) => Some(*i as f64),
        }
    }

    /// The field type this value naturally belongs to
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            FieldValue::Null => None,
            FieldValue::String(_) => Some(FieldType::String),
            FieldValue::Real(_) => Some(FieldType::Real),
            FieldValue::Integer(_) => Some(FieldType::Integer),
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Real(r) => write!(f, "{}", r),
            FieldValue::Integer(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.into())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<Cow<'_, str>> for FieldValue {
    fn from(value: Cow<str>) -> Self {
        FieldValue::String(value.into())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Real(value)
    }
}

#[cfg(test)]
mod tests {
    use assertor::{assert_that, EqualityAssertion, OptionAssertion};

    use super::FieldValue;

    #[test]
    fn numeric_interpretation() {
        assert_that!(FieldValue::from(3i64).as_f64()).is_equal_to(Some(3.0));
        assert_that!(FieldValue::from(2.5).as_f64()).is_equal_to(Some(2.5));
        assert_that!(FieldValue::from(" 12.5 ").as_f64()).is_equal_to(Some(12.5));
        assert_that!(FieldValue::from("abc").as_f64()).is_none();
        assert_that!(FieldValue::Null.as_f64()).is_none();
    }
}
