use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable)]
#[diesel(table_name = deeds)]
pub struct Deed {
    pub id: Uuid,
    pub title: String,
    pub document_type: String,
    pub has_inquiry_history: bool,
    pub inquiry_date: Option<NaiveDate>,
    pub deed_date: Option<NaiveDate>,
    pub uses_tashil_law: bool,
    pub inquiry_response_has_issue: bool,
    pub text: String,
    pub analysis_result: Option<String>,
    pub analysis_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = deeds)]
pub struct NewDeed {
    pub id: Uuid,
    pub title: String,
    pub document_type: String,
    pub has_inquiry_history: bool,
    pub inquiry_date: Option<NaiveDate>,
    pub deed_date: Option<NaiveDate>,
    pub uses_tashil_law: bool,
    pub inquiry_response_has_issue: bool,
    pub text: String,
}

/// Partial update of the user-editable deed fields. `None` leaves a column
/// untouched; for the date columns `Some(None)` clears the stored date.
/// Analysis fields are not patchable; only the analyze operation writes them.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = deeds)]
pub struct DeedPatch {
    pub title: Option<String>,
    pub document_type: Option<String>,
    pub has_inquiry_history: Option<bool>,
    pub inquiry_date: Option<Option<NaiveDate>>,
    pub deed_date: Option<Option<NaiveDate>>,
    pub uses_tashil_law: Option<bool>,
    pub inquiry_response_has_issue: Option<bool>,
    pub text: Option<String>,
}

impl DeedPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the patch to an in-memory record. Used by stores that do not
    /// go through a SQL changeset.
    pub fn apply_to(&self, deed: &mut Deed) {
        if let Some(title) = &self.title {
            deed.title = title.clone();
        }
        if let Some(document_type) = &self.document_type {
            deed.document_type = document_type.clone();
        }
        if let Some(value) = self.has_inquiry_history {
            deed.has_inquiry_history = value;
        }
        if let Some(value) = self.inquiry_date {
            deed.inquiry_date = value;
        }
        if let Some(value) = self.deed_date {
            deed.deed_date = value;
        }
        if let Some(value) = self.uses_tashil_law {
            deed.uses_tashil_law = value;
        }
        if let Some(value) = self.inquiry_response_has_issue {
            deed.inquiry_response_has_issue = value;
        }
        if let Some(text) = &self.text {
            deed.text = text.clone();
        }
    }
}
