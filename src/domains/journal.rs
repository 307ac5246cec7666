use serde::{Deserialize, Serialize};

/// The four kinds of captured moments. Stored in canonical uppercase form;
/// parsing tolerates any casing from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FragmentType {
    Text,
    Image,
    Link,
    Location,
}

impl FragmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FragmentType::Text => "TEXT",
            FragmentType::Image => "IMAGE",
            FragmentType::Link => "LINK",
            FragmentType::Location => "LOCATION",
        }
    }
}

impl std::str::FromStr for FragmentType {
    type Err = ();

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_uppercase().as_str() {
            "TEXT" => Ok(FragmentType::Text),
            "IMAGE" => Ok(FragmentType::Image),
            "LINK" => Ok(FragmentType::Link),
            "LOCATION" => Ok(FragmentType::Location),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for FragmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single captured moment. Immutable after creation.
#[derive(Debug, Clone, Serialize)]
pub struct Fragment {
    pub id: i32,
    pub user_id: String,
    pub kind: FragmentType,
    pub content: String,
    pub media_url: Option<String>,
    pub created_at: i64,
}

/// One generated reflection attached to a fragment. Absence is a valid state.
#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    pub id: i32,
    pub fragment_id: i32,
    pub content: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FragmentWithInsight {
    #[serde(flatten)]
    pub fragment: Fragment,
    pub insight: Option<Insight>,
}

/// One user's one calendar day, compiled into a short narrative.
/// `date` is the UTC day-start epoch second; `(user_id, date)` is unique.
#[derive(Debug, Clone, Serialize)]
pub struct DailyMemory {
    pub id: i32,
    pub user_id: String,
    pub date: i64,
    pub summary: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Identity embedded in a session resolved by the auth collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}
