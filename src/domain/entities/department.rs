use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub archived: bool,
    /// Window ids ordered by weekday then start time; filled in on read
    #[serde(default)]
    pub business_hours: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Department {
    pub fn new(name: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            archived: false,
            business_hours: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateDepartmentRequest {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDepartmentRequest {
    pub name: Option<String>,
    pub archived: Option<bool>,
}
