use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Where a submission came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Form,
    Csv,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Form => "form",
            Source::Csv => "csv",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "form" => Some(Source::Form),
            "csv" => Some(Source::Csv),
            _ => None,
        }
    }
}

/// The declared attributes of a submission, keyed by their wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Name,
    Email,
    UserType,
    School,
    Grade,
    Major,
    Company,
    Position,
    Experience,
    Skills,
    BusinessName,
    Industry,
    Employees,
    Revenue,
    Interests,
    Newsletter,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::Name,
        Field::Email,
        Field::UserType,
        Field::School,
        Field::Grade,
        Field::Major,
        Field::Company,
        Field::Position,
        Field::Experience,
        Field::Skills,
        Field::BusinessName,
        Field::Industry,
        Field::Employees,
        Field::Revenue,
        Field::Interests,
        Field::Newsletter,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::UserType => "userType",
            Field::School => "school",
            Field::Grade => "grade",
            Field::Major => "major",
            Field::Company => "company",
            Field::Position => "position",
            Field::Experience => "experience",
            Field::Skills => "skills",
            Field::BusinessName => "businessName",
            Field::Industry => "industry",
            Field::Employees => "employees",
            Field::Revenue => "revenue",
            Field::Interests => "interests",
            Field::Newsletter => "newsletter",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Field::ALL.into_iter().find(|f| f.key() == key)
    }
}

/// A coerced value for a declared field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employees: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newsletter: Option<bool>,
}

impl SubmissionFields {
    fn text_mut(&mut self, field: Field) -> Option<&mut Option<String>> {
        let slot = match field {
            Field::Name => &mut self.name,
            Field::Email => &mut self.email,
            Field::UserType => &mut self.user_type,
            Field::School => &mut self.school,
            Field::Grade => &mut self.grade,
            Field::Major => &mut self.major,
            Field::Company => &mut self.company,
            Field::Position => &mut self.position,
            Field::Experience => &mut self.experience,
            Field::Skills => &mut self.skills,
            Field::BusinessName => &mut self.business_name,
            Field::Industry => &mut self.industry,
            Field::Employees => &mut self.employees,
            Field::Revenue => &mut self.revenue,
            Field::Interests => &mut self.interests,
            Field::Newsletter => return None,
        };
        Some(slot)
    }

    /// Set or clear a declared field. A value of the wrong kind for the
    /// field is ignored; coercion happens before values reach here.
    pub fn set(&mut self, field: Field, value: Option<FieldValue>) {
        match (field, value) {
            (Field::Newsletter, None) => self.newsletter = None,
            (Field::Newsletter, Some(FieldValue::Flag(b))) => self.newsletter = Some(b),
            (Field::Newsletter, Some(FieldValue::Text(_))) => {}
            (field, value) => {
                if let Some(slot) = self.text_mut(field) {
                    match value {
                        None => *slot = None,
                        Some(FieldValue::Text(s)) => *slot = Some(s),
                        Some(FieldValue::Flag(_)) => {}
                    }
                }
            }
        }
    }

    /// The text fields matched by free-text search.
    pub fn searchable(&self) -> [Option<&str>; 5] {
        [
            self.name.as_deref(),
            self.email.as_deref(),
            self.company.as_deref(),
            self.business_name.as_deref(),
            self.school.as_deref(),
        ]
    }
}

/// A stored form submission. Undeclared attributes live in `extra` and are
/// serialized back alongside the declared ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: SubmissionFields,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    pub submitted_at: DateTime<Utc>,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_data: Option<Map<String, Value>>,
}

impl Submission {
    pub fn apply(&mut self, patch: &SubmissionPatch) {
        for (field, value) in &patch.fields {
            self.fields.set(*field, value.clone());
        }
        for (key, value) in &patch.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// A submission that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub id: Uuid,
    pub fields: SubmissionFields,
    pub extra: Map<String, Value>,
    pub submitted_at: DateTime<Utc>,
    pub source: Source,
    pub csv_data: Option<Map<String, Value>>,
}

impl NewSubmission {
    pub fn form(patch: SubmissionPatch) -> Self {
        let mut fields = SubmissionFields::default();
        for (field, value) in patch.fields {
            fields.set(field, value);
        }
        Self {
            id: Uuid::now_v7(),
            fields,
            extra: patch.extra,
            submitted_at: Utc::now(),
            source: Source::Form,
            csv_data: None,
        }
    }

    pub fn csv(
        row: Map<String, Value>,
        fields: SubmissionFields,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            fields,
            extra: Map::new(),
            submitted_at,
            source: Source::Csv,
            csv_data: Some(row),
        }
    }

    pub fn into_submission(self) -> Submission {
        Submission {
            id: self.id,
            fields: self.fields,
            extra: self.extra,
            submitted_at: self.submitted_at,
            source: self.source,
            csv_data: self.csv_data,
        }
    }
}

/// Client-supplied changes: declared fields (a `None` value clears the
/// field) plus undeclared attributes to merge into `extra`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionPatch {
    pub fields: Vec<(Field, Option<FieldValue>)>,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub source: Option<Source>,
    pub user_type: Option<String>,
}

impl SubmissionFilter {
    pub fn matches(&self, submission: &Submission) -> bool {
        self.source.is_none_or(|s| s == submission.source)
            && self
                .user_type
                .as_deref()
                .is_none_or(|u| submission.fields.user_type.as_deref() == Some(u))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTypeCount {
    pub user_type: String,
    pub count: i64,
}

/// The summary shape used in the analytics feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSubmission {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub user_type: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub source: Source,
}

impl From<Submission> for RecentSubmission {
    fn from(s: Submission) -> Self {
        Self {
            id: s.id,
            name: s.fields.name,
            email: s.fields.email,
            user_type: s.fields.user_type,
            submitted_at: s.submitted_at,
            source: s.source,
        }
    }
}
