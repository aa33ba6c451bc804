//! Comma-delimited codec between a [`UserRecord`] and one line of text.
//!
//! No quoting or escaping is interpreted in either direction: a value that
//! itself contains a comma shifts every following field.

use crate::domain::model::{ColumnLayout, UserRecord};
use crate::utils::error::Result;
use std::borrow::Cow;

pub const DELIMITER: u8 = b',';
const DELIMITER_STR: &str = ",";

/// Assigns values to fields by position, up to the shorter of the two.
/// Missing trailing fields stay empty; extra trailing values are ignored.
pub fn decode_fields<'a, I>(values: I, layout: &ColumnLayout) -> Result<UserRecord>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut record = UserRecord::default();
    for (field, value) in layout.fields().iter().zip(values) {
        record.set_field(*field, value)?;
    }
    Ok(record)
}

/// Renders the fields named by `layout`, in that order, without a line terminator.
pub fn encode_line(record: &UserRecord, layout: &ColumnLayout) -> String {
    let fields: Vec<Cow<'_, str>> = layout
        .fields()
        .iter()
        .map(|field| record.field_text(*field))
        .collect();
    fields.join(DELIMITER_STR)
}

/// The header is a fixed literal, independent of the layout used for rows.
pub fn header_line(display_names: &[&str]) -> String {
    display_names.join(DELIMITER_STR)
}
