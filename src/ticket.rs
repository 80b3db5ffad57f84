//! Typed SysAid ticket requests and their web form encoding.

use crate::config::SysAidSettings;
use crate::document::RequestElement;

/// Content type of every outbound submission.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Request element children that must be present.
pub const MANDATORY_FIELDS: &[&str] = &[
    "Description",
    "Category",
    "Subcategory",
    "Title",
    "FirstName",
    "LastName",
    "Email",
];

/// Optional campus qualifier child.
pub const CAMPUS_FIELD: &str = "USMAICampus";

/// A validated ticket request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRequest {
    pub description: String,
    pub category: String,
    pub subcategory: String,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub campus: Option<String>,
}

impl TryFrom<&RequestElement> for TicketRequest {
    type Error = FieldError;

    fn try_from(element: &RequestElement) -> Result<Self, Self::Error> {
        let field = |name: &'static str| {
            element
                .get(name)
                .map(str::to_string)
                .ok_or(FieldError::Missing(name))
        };

        Ok(Self {
            description: field("Description")?,
            category: field("Category")?,
            subcategory: field("Subcategory")?,
            title: field("Title")?,
            first_name: field("FirstName")?,
            last_name: field("LastName")?,
            email: field("Email")?,
            campus: element.get(CAMPUS_FIELD).map(str::to_string),
        })
    }
}

impl TicketRequest {
    /// SysAid web form parameters, in submission order.
    pub fn form_fields<'a>(&'a self, identity: &'a SysAidSettings) -> Vec<(&'static str, &'a str)> {
        let mut fields = vec![
            ("desc", self.description.as_str()),
            ("accountID", identity.account_id.as_str()),
            ("formID", identity.form_id.as_str()),
            ("problem_type", self.category.as_str()),
            ("subcategory", self.subcategory.as_str()),
            ("title", self.title.as_str()),
            ("firstName", self.first_name.as_str()),
            ("lastName", self.last_name.as_str()),
            ("email", self.email.as_str()),
        ];
        if let Some(campus) = &self.campus {
            fields.push(("Campus", campus.as_str()));
        }
        fields
    }

    /// UTF-8 form-encoded body.
    pub fn encode(&self, identity: &SysAidSettings) -> String {
        encode_form(&self.form_fields(identity))
    }
}

/// Encode name/value pairs as `application/x-www-form-urlencoded`.
pub fn encode_form(fields: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish()
}

/// A Request element that cannot become a ticket.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("Mandatory field '{0}' is missing")]
    Missing(&'static str),
}
