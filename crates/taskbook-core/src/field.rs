use crate::{Category, Deadline, ModelError, Priority};
use std::fmt;
use std::str::FromStr;

/// Editable record attributes. `Category` is the only one backed by an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    Name,
    Description,
    Category,
    Deadline,
    Priority,
}

impl RecordField {
    pub const ALL: [RecordField; 5] = [
        RecordField::Name,
        RecordField::Description,
        RecordField::Category,
        RecordField::Deadline,
        RecordField::Priority,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordField::Name => "name",
            RecordField::Description => "description",
            RecordField::Category => "category",
            RecordField::Deadline => "deadline",
            RecordField::Priority => "priority",
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, RecordField::Category)
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordField {
    type Err = ModelError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        if normalized == "status" {
            return Err(ModelError::ReadOnlyField(normalized));
        }
        RecordField::ALL
            .into_iter()
            .find(|field| field.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownField(input.trim().to_string()))
    }
}

/// A typed value for exactly one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Name(String),
    Description(String),
    Category(Category),
    Deadline(Deadline),
    Priority(Priority),
}

impl FieldUpdate {
    pub fn parse(field: RecordField, value: &str) -> Result<Self, ModelError> {
        match field {
            RecordField::Name => {
                let name = value.trim();
                if name.is_empty() {
                    return Err(ModelError::EmptyName);
                }
                Ok(FieldUpdate::Name(name.to_string()))
            }
            RecordField::Description => Ok(FieldUpdate::Description(value.trim().to_string())),
            RecordField::Category => value.parse().map(FieldUpdate::Category),
            RecordField::Deadline => value.parse().map(FieldUpdate::Deadline),
            RecordField::Priority => value.parse().map(FieldUpdate::Priority),
        }
    }

    pub fn field(&self) -> RecordField {
        match self {
            FieldUpdate::Name(_) => RecordField::Name,
            FieldUpdate::Description(_) => RecordField::Description,
            FieldUpdate::Category(_) => RecordField::Category,
            FieldUpdate::Deadline(_) => RecordField::Deadline,
            FieldUpdate::Priority(_) => RecordField::Priority,
        }
    }
}
