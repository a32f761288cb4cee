//! Racer records and identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Group name used when a racer row leaves the group blank.
pub const DEFAULT_GROUP: &str = "General";

/// Integer-like car number, unique within a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CarId(pub u32);

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CarId {
    type Err = String;

    /// Accepts `"101"` as well as spreadsheet-style `"101.0"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u32>() {
            return Ok(CarId(n));
        }
        match s.parse::<f64>() {
            Ok(x) if x.fract() == 0.0 && x >= 0.0 && x <= u32::MAX as f64 => Ok(CarId(x as u32)),
            _ => Err(format!("'{s}' is not a car number")),
        }
    }
}

impl From<u32> for CarId {
    fn from(n: u32) -> Self {
        CarId(n)
    }
}

/// A (class, group) pair: the unit that gets its own heat schedule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Division {
    pub class: String,
    pub group: String,
}

impl Division {
    pub fn new(class: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            group: group.into(),
        }
    }

    /// Table title for this division's heats, e.g. `Tiger_A`.
    pub fn table_name(&self) -> String {
        sanitize_table_title(&format!("{}_{}", self.class, self.group))
    }

    /// Table title for this division's rankings, e.g. `Tiger_A_Rankings`.
    pub fn rankings_table_name(&self) -> String {
        format!("{}_Rankings", self.table_name())
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.class, self.group)
    }
}

/// Keeps `[A-Za-z0-9 _-]`, turns spaces into underscores and truncates to
/// 31 characters (the spreadsheet sheet-name limit).
pub fn sanitize_table_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .map(|c| if c == ' ' { '_' } else { c })
        .take(31)
        .collect()
}

/// A validated racer. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Racer {
    pub car: CarId,
    pub name: String,
    pub class: String,
    pub group: String,
    pub description: Option<String>,
}

impl Racer {
    pub fn division(&self) -> Division {
        Division::new(self.class.clone(), self.group.clone())
    }
}

/// A raw row of the "Racers" table before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RacerRecord {
    #[serde(rename = "Car", default)]
    pub car: Option<String>,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Class", default)]
    pub class: Option<String>,
    #[serde(rename = "Group", default)]
    pub group: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
}

impl RacerRecord {
    pub fn new(car: impl ToString, name: &str, class: &str, group: &str) -> Self {
        Self {
            car: Some(car.to_string()),
            name: Some(name.to_string()),
            class: Some(class.to_string()),
            group: Some(group.to_string()),
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Trimmed value of a field; blank cells count as absent.
    pub fn field(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Car => &self.car,
            Field::Name => &self.name,
            Field::Class => &self.class,
            Field::Group => &self.group,
            Field::Description => &self.description,
        };
        value.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Columns of the "Racers" table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Car,
    Name,
    Class,
    Group,
    Description,
}

impl Field {
    pub fn column(self) -> &'static str {
        match self {
            Field::Car => "Car",
            Field::Name => "Name",
            Field::Class => "Class",
            Field::Group => "Group",
            Field::Description => "Description",
        }
    }
}

/// Which racer columns must be present. Validated once at load.
///
/// # Examples
///
/// ```
/// use u_derby::catalog::{Field, RacerSchema};
///
/// let schema = RacerSchema::default().with_required(Field::Group);
/// assert!(schema.is_required(Field::Car));
/// assert!(schema.is_required(Field::Group));
/// assert!(!schema.is_required(Field::Description));
/// ```
#[derive(Debug, Clone)]
pub struct RacerSchema {
    required: Vec<Field>,
}

impl Default for RacerSchema {
    fn default() -> Self {
        Self {
            required: vec![Field::Car, Field::Name, Field::Class],
        }
    }
}

impl RacerSchema {
    /// Marks an optional column as required.
    pub fn with_required(mut self, field: Field) -> Self {
        if !self.required.contains(&field) {
            self.required.push(field);
        }
        self
    }

    pub fn is_required(&self, field: Field) -> bool {
        self.required.contains(&field)
    }

    pub fn required(&self) -> &[Field] {
        &self.required
    }
}
