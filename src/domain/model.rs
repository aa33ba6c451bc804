use crate::utils::error::{BatchError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Column names of the input file, in positional order.
pub const INPUT_COLUMNS: [&str; 9] = [
    "id",
    "userId",
    "firstName",
    "lastName",
    "sex",
    "email",
    "phone",
    "dateOfBirth",
    "jobTitle",
];

/// Display header written at the top of every export file.
pub const EXPORT_HEADER: [&str; 9] = [
    "id",
    "User Id",
    "First Name",
    "Last Name",
    "Sex",
    "Email",
    "Phone",
    "Date of Birth",
    "Job Title",
];

/// 單一使用者記錄，檔案與資料表之間搬移的唯一實體
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Assigned by the table on first insert; `None` for freshly parsed rows.
    pub id: Option<i64>,
    /// External user id carried over from the source file.
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub sex: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: String,
    pub job_title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Id,
    UserId,
    FirstName,
    LastName,
    Sex,
    Email,
    Phone,
    DateOfBirth,
    JobTitle,
}

impl UserField {
    pub const ALL: [UserField; 9] = [
        UserField::Id,
        UserField::UserId,
        UserField::FirstName,
        UserField::LastName,
        UserField::Sex,
        UserField::Email,
        UserField::Phone,
        UserField::DateOfBirth,
        UserField::JobTitle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            UserField::Id => "id",
            UserField::UserId => "userId",
            UserField::FirstName => "firstName",
            UserField::LastName => "lastName",
            UserField::Sex => "sex",
            UserField::Email => "email",
            UserField::Phone => "phone",
            UserField::DateOfBirth => "dateOfBirth",
            UserField::JobTitle => "jobTitle",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }
}

impl UserRecord {
    /// Text form of a field; an unassigned id renders as an empty string.
    pub fn field_text(&self, field: UserField) -> Cow<'_, str> {
        match field {
            UserField::Id => match self.id {
                Some(id) => Cow::Owned(id.to_string()),
                None => Cow::Borrowed(""),
            },
            UserField::UserId => Cow::Borrowed(&self.user_id),
            UserField::FirstName => Cow::Borrowed(&self.first_name),
            UserField::LastName => Cow::Borrowed(&self.last_name),
            UserField::Sex => Cow::Borrowed(&self.sex),
            UserField::Email => Cow::Borrowed(&self.email),
            UserField::Phone => Cow::Borrowed(&self.phone),
            UserField::DateOfBirth => Cow::Borrowed(&self.date_of_birth),
            UserField::JobTitle => Cow::Borrowed(&self.job_title),
        }
    }

    pub fn set_field(&mut self, field: UserField, value: &str) -> Result<()> {
        match field {
            UserField::Id => {
                let trimmed = value.trim();
                self.id = if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.parse::<i64>().map_err(|e| {
                        BatchError::input_format(format!("invalid id '{}': {}", value, e))
                    })?)
                };
            }
            UserField::UserId => self.user_id = value.to_string(),
            UserField::FirstName => self.first_name = value.to_string(),
            UserField::LastName => self.last_name = value.to_string(),
            UserField::Sex => self.sex = value.to_string(),
            UserField::Email => self.email = value.to_string(),
            UserField::Phone => self.phone = value.to_string(),
            UserField::DateOfBirth => self.date_of_birth = value.to_string(),
            UserField::JobTitle => self.job_title = value.to_string(),
        }
        Ok(())
    }
}

/// Ordered column-to-field binding, resolved once when a reader or writer is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    fields: Vec<UserField>,
}

impl ColumnLayout {
    /// Resolves column names to fields, rejecting unknown or repeated names.
    pub fn new(names: &[&str]) -> Result<Self> {
        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            let field = UserField::from_name(name).ok_or_else(|| BatchError::ConfigError {
                message: format!("unknown column '{}' in layout", name),
            })?;
            if fields.contains(&field) {
                return Err(BatchError::ConfigError {
                    message: format!("column '{}' appears more than once in layout", name),
                });
            }
            fields.push(field);
        }

        if fields.is_empty() {
            return Err(BatchError::ConfigError {
                message: "column layout cannot be empty".to_string(),
            });
        }

        Ok(Self { fields })
    }

    /// `id, userId, firstName, ... jobTitle`, shared by input, table and output.
    pub fn standard() -> Self {
        Self {
            fields: UserField::ALL.to_vec(),
        }
    }

    pub fn fields(&self) -> &[UserField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_layout_matches_input_columns() {
        let layout = ColumnLayout::new(&INPUT_COLUMNS).unwrap();
        assert_eq!(layout, ColumnLayout::standard());
        assert_eq!(layout.len(), EXPORT_HEADER.len());
    }

    #[test]
    fn test_layout_rejects_unknown_column() {
        let err = ColumnLayout::new(&["id", "nickname"]).unwrap_err();
        assert!(err.to_string().contains("nickname"));
    }

    #[test]
    fn test_layout_rejects_repeated_column() {
        assert!(ColumnLayout::new(&["email", "email"]).is_err());
        assert!(ColumnLayout::new(&[]).is_err());
    }

    #[test]
    fn test_set_field_parses_id() {
        let mut record = UserRecord::default();
        record.set_field(UserField::Id, "").unwrap();
        assert_eq!(record.id, None);

        record.set_field(UserField::Id, " 42 ").unwrap();
        assert_eq!(record.id, Some(42));
        assert_eq!(record.field_text(UserField::Id), "42");

        assert!(record.set_field(UserField::Id, "abc").is_err());
    }
}
