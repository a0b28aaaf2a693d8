use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A time-bounded record assigned to one or more people
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment<T = DateTime<Utc>> {
    pub id: String,
    pub start: T, // inclusive
    pub end: T,
}

impl<T> Appointment<T> {
    pub fn new(id: impl Into<String>, start: T, end: T) -> Self {
        Self {
            id: id.into(),
            start,
            end,
        }
    }
}

/// A person (or resource) and the appointments linked to them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub display_name: String,
    pub appointment_ids: Vec<String>,
}

impl Person {
    pub fn new<I, S>(
        id: impl Into<String>,
        display_name: impl Into<String>,
        appointment_ids: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            appointment_ids: appointment_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// Report unit: one person plus every appointment of theirs that overlaps another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictGroup<T = DateTime<Utc>> {
    pub person: String,
    pub person_id: String,
    pub conflicting_appointments: Vec<Appointment<T>>, // unique by id
}

impl<T> ConflictGroup<T> {
    pub fn contains(&self, appointment_id: &str) -> bool {
        self.conflicting_appointments
            .iter()
            .any(|a| a.id == appointment_id)
    }
}
