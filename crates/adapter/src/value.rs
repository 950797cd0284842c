//! Property types and values, and their XML text forms.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MappingError, Result, ValueError};
use crate::observe::ObservableList;

/// Types that map to a single XML text value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// Plain text.
    Text,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Float,
    /// `true` or `false`.
    Boolean,
}

impl ScalarType {
    /// Name used in mapping files and messages.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Text => "text",
            ScalarType::Integer => "integer",
            ScalarType::Float => "float",
            ScalarType::Boolean => "boolean",
        }
    }

    /// Element name used for collection items when none is declared.
    pub fn default_item_name(&self) -> &'static str {
        match self {
            ScalarType::Text => "string",
            ScalarType::Integer => "int",
            ScalarType::Float => "double",
            ScalarType::Boolean => "boolean",
        }
    }

    /// Converts XML text to a value.
    ///
    /// Empty text is no value for every type except text.
    pub fn parse_text(&self, property: &str, text: &str) -> Result<Option<PropertyValue>> {
        if *self == ScalarType::Text {
            return Ok(Some(PropertyValue::Text(text.to_string())));
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let parsed = match self {
            ScalarType::Text => None,
            ScalarType::Integer => trimmed.parse::<i64>().ok().map(PropertyValue::Integer),
            ScalarType::Float => trimmed.parse::<f64>().ok().map(PropertyValue::Float),
            ScalarType::Boolean => match trimmed {
                "true" | "1" => Some(PropertyValue::Boolean(true)),
                "false" | "0" => Some(PropertyValue::Boolean(false)),
                _ => None,
            },
        };

        match parsed {
            Some(value) => Ok(Some(value)),
            None => Err(ValueError::Conversion {
                property: property.to_string(),
                text: text.to_string(),
                expected: self.name().to_string(),
            }
            .into()),
        }
    }

    /// Converts a value to XML text, checking that it has this type.
    pub fn format_value(&self, property: &str, value: &PropertyValue) -> Result<String> {
        match (self, value) {
            (ScalarType::Text, PropertyValue::Text(s)) => Ok(s.clone()),
            (ScalarType::Integer, PropertyValue::Integer(i)) => Ok(i.to_string()),
            (ScalarType::Float, PropertyValue::Float(f)) => Ok(f.to_string()),
            (ScalarType::Float, PropertyValue::Integer(i)) => Ok((*i as f64).to_string()),
            (ScalarType::Boolean, PropertyValue::Boolean(b)) => Ok(b.to_string()),
            _ => Err(ValueError::TypeMismatch {
                property: property.to_string(),
                expected: self.name().to_string(),
                found: value.type_name().to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalarType {
    type Err = MappingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "text" | "string" => Ok(ScalarType::Text),
            "integer" | "int" => Ok(ScalarType::Integer),
            "float" | "double" => Ok(ScalarType::Float),
            "boolean" | "bool" => Ok(ScalarType::Boolean),
            other => Err(MappingError::InvalidPropertyType(other.to_string())),
        }
    }
}

/// The type associated with a property.
///
/// Written in mapping files as `text`, `integer`, `float`, `boolean`,
/// `list<item>` or `map<item>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PropertyType {
    /// Plain text.
    Text,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Float,
    /// `true` or `false`.
    Boolean,
    /// Ordered items of one scalar type.
    List(ScalarType),
    /// Keyed items of one scalar type.
    Map(ScalarType),
}

impl PropertyType {
    /// The scalar type of a single-valued property.
    pub fn scalar(&self) -> Option<ScalarType> {
        match self {
            PropertyType::Text => Some(ScalarType::Text),
            PropertyType::Integer => Some(ScalarType::Integer),
            PropertyType::Float => Some(ScalarType::Float),
            PropertyType::Boolean => Some(ScalarType::Boolean),
            PropertyType::List(_) | PropertyType::Map(_) => None,
        }
    }

    /// The scalar type of the value or of each collection item.
    pub fn item_type(&self) -> ScalarType {
        match self {
            PropertyType::List(item) | PropertyType::Map(item) => *item,
            other => other.scalar().unwrap_or(ScalarType::Text),
        }
    }

    /// True for lists and maps.
    pub fn is_collection(&self) -> bool {
        matches!(self, PropertyType::List(_) | PropertyType::Map(_))
    }

    /// An empty value of a collection type.
    pub fn empty_collection(&self) -> Option<PropertyValue> {
        match self {
            PropertyType::List(_) => Some(PropertyValue::List(ObservableList::new())),
            PropertyType::Map(_) => Some(PropertyValue::Map(BTreeMap::new())),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::List(item) => write!(f, "list<{}>", item),
            PropertyType::Map(item) => write!(f, "map<{}>", item),
            other => f.write_str(other.item_type().name()),
        }
    }
}

impl FromStr for PropertyType {
    type Err = MappingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let generic = |prefix: &str| {
            s.strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix('>'))
                .map(|item| item.parse::<ScalarType>())
        };

        if let Some(item) = generic("list<") {
            return Ok(PropertyType::List(item?));
        }
        if let Some(item) = generic("map<") {
            return Ok(PropertyType::Map(item?));
        }
        Ok(match s.parse::<ScalarType>()? {
            ScalarType::Text => PropertyType::Text,
            ScalarType::Integer => PropertyType::Integer,
            ScalarType::Float => PropertyType::Float,
            ScalarType::Boolean => PropertyType::Boolean,
        })
    }
}

impl TryFrom<String> for PropertyType {
    type Error = MappingError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PropertyType> for String {
    fn from(value: PropertyType) -> Self {
        value.to_string()
    }
}

/// A property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Text value.
    Text(String),
    /// Integer value.
    Integer(i64),
    /// Float value.
    Float(f64),
    /// Boolean value.
    Boolean(bool),
    /// List value; changes are observable.
    List(ObservableList),
    /// Map value, ordered by key.
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Short type name for messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Text(_) => "text",
            PropertyValue::Integer(_) => "integer",
            PropertyValue::Float(_) => "float",
            PropertyValue::Boolean(_) => "boolean",
            PropertyValue::List(_) => "list",
            PropertyValue::Map(_) => "map",
        }
    }

    /// Text form of a scalar; `None` for collections.
    pub fn to_text(&self) -> Option<String> {
        match self {
            PropertyValue::Text(s) => Some(s.clone()),
            PropertyValue::Integer(i) => Some(i.to_string()),
            PropertyValue::Float(f) => Some(f.to_string()),
            PropertyValue::Boolean(b) => Some(b.to_string()),
            PropertyValue::List(_) | PropertyValue::Map(_) => None,
        }
    }

    /// Empty text or an empty collection.
    pub fn is_empty(&self) -> bool {
        match self {
            PropertyValue::Text(s) => s.is_empty(),
            PropertyValue::List(list) => list.is_empty(),
            PropertyValue::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    /// The list, if this is a list value.
    pub fn as_list(&self) -> Option<&ObservableList> {
        match self {
            PropertyValue::List(list) => Some(list),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::List(list) => {
                let items: Vec<String> = list.items().iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            PropertyValue::Map(map) => {
                let entries: Vec<String> =
                    map.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", entries.join(", "))
            }
            scalar => f.write_str(&scalar.to_text().unwrap_or_default()),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<ObservableList> for PropertyValue {
    fn from(value: ObservableList) -> Self {
        PropertyValue::List(value)
    }
}
