use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::NaiveTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub specialty: String,
    pub clinic: Option<String>,
    pub location: Option<String>,
    /// Recurring weekly template. Carried for callers; the slot search does
    /// not filter on it.
    #[serde(default)]
    pub availability: Vec<WeeklyAvailability>,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// A blank location counts as no location.
    pub fn has_location(&self) -> bool {
        self.location.as_deref().is_some_and(|l| !l.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAvailability {
    pub day_of_week: i32, // 0 = Sunday, 1 = Monday, etc.
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}
