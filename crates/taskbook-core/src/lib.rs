use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod field;

pub use field::{FieldUpdate, RecordField};

/// Identifier assigned by the store. Ids start at 1.
pub type RecordId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("name cannot be empty")]
    EmptyName,
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error("unknown priority: {0} (expected low, middle or high)")]
    UnknownPriority(String),
    #[error("unknown status: {0}")]
    UnknownStatus(String),
    #[error("invalid deadline `{0}`: expected YYYY.MM.DD")]
    InvalidDeadline(String),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("field `{0}` cannot be edited directly")]
    ReadOnlyField(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Home,
    Work,
    Study,
    Personal,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Home,
        Category::Work,
        Category::Study,
        Category::Personal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Home => "home",
            Category::Work => "work",
            Category::Study => "study",
            Category::Personal => "personal",
        }
    }

    /// Localized label accepted from interactive input.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Home => "Дом",
            Category::Work => "Работа",
            Category::Study => "Учеба",
            Category::Personal => "Личное",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ModelError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let normalized = trimmed.to_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| {
                category.as_str() == normalized || category.label().to_lowercase() == normalized
            })
            .ok_or_else(|| ModelError::UnknownCategory(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Middle,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Middle => "middle",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ModelError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "middle" | "medium" => Ok(Priority::Middle),
            "high" => Ok(Priority::High),
            _ => Err(ModelError::UnknownPriority(input.trim().to_string())),
        }
    }
}

/// Completion state. Older data files spell the values `Not complete` and
/// `Complete`; both are still accepted on read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[serde(alias = "Not complete")]
    Incomplete,
    #[serde(alias = "Complete")]
    Complete,
}

impl Default for Status {
    fn default() -> Self {
        Self::Incomplete
    }
}

impl Status {
    pub const ALL: [Status; 2] = [Status::Incomplete, Status::Complete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Incomplete => "incomplete",
            Status::Complete => "complete",
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Status::Complete)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ModelError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "incomplete" | "not complete" | "not-complete" | "open" => Ok(Status::Incomplete),
            "complete" | "done" => Ok(Status::Complete),
            _ => Err(ModelError::UnknownStatus(input.trim().to_string())),
        }
    }
}

/// Calendar date a record is due, written as `YYYY.MM.DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Deadline(NaiveDate);

impl Deadline {
    pub const FORMAT: &'static str = "%Y.%m.%d";
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl FromStr for Deadline {
    type Err = ModelError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        NaiveDate::parse_from_str(trimmed, Self::FORMAT)
            .map(Deadline)
            .map_err(|_| ModelError::InvalidDeadline(trimmed.to_string()))
    }
}

impl Serialize for Deadline {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Deadline {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One stored task. The id is the key of the primary mapping and is not part
/// of the persisted object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub deadline: Deadline,
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
}

impl Record {
    /// Substring match over the wire text of every field.
    pub fn matches_keyword(&self, text: &str) -> bool {
        self.name.contains(text)
            || self.description.contains(text)
            || self.category.as_str().contains(text)
            || self.deadline.to_string().contains(text)
            || self.priority.as_str().contains(text)
            || self.status.as_str().contains(text)
    }

    /// Writes a single field. Callers that keep indexes over `category` must
    /// update them together with this call.
    pub fn apply(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::Name(name) => self.name = name,
            FieldUpdate::Description(description) => self.description = description,
            FieldUpdate::Category(category) => self.category = category,
            FieldUpdate::Deadline(deadline) => self.deadline = deadline,
            FieldUpdate::Priority(priority) => self.priority = priority,
        }
    }
}

/// Fields of a record about to be created. Status always starts incomplete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub deadline: Deadline,
    pub priority: Priority,
}

impl NewRecord {
    /// Validates raw user input into a record draft.
    pub fn parse(
        name: &str,
        description: &str,
        category: &str,
        deadline: &str,
        priority: &str,
    ) -> Result<Self, ModelError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ModelError::EmptyName);
        }
        Ok(Self {
            name: name.to_string(),
            description: description.trim().to_string(),
            category: category.parse()?,
            deadline: deadline.parse()?,
            priority: priority.parse()?,
        })
    }

    pub fn into_record(self) -> Record {
        Record {
            name: self.name,
            description: self.description,
            category: self.category,
            deadline: self.deadline,
            priority: self.priority,
            status: Status::default(),
        }
    }
}
