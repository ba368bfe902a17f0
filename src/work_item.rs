//! Work item module: the task tracker's record type and its field registry.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{EnumDomain, FieldRegistry, Queryable};
use crate::types::{FieldKind, Value};
use crate::{QueryError, QueryResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const DOMAIN: EnumDomain = EnumDomain::new(&[("Low", 0), ("Medium", 1), ("High", 2), ("Urgent", 3)]);
}

impl From<Priority> for u32 {
    fn from(priority: Priority) -> u32 {
        priority as u32
    }
}

impl TryFrom<u32> for Priority {
    type Error = String;

    fn try_from(ordinal: u32) -> Result<Self, Self::Error> {
        match ordinal {
            0 => Ok(Priority::Low),
            1 => Ok(Priority::Medium),
            2 => Ok(Priority::High),
            3 => Ok(Priority::Urgent),
            other => Err(format!("unknown priority {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum WorkItemStatus {
    #[default]
    ToDo,
    InProgress,
    Done,
    Blocked,
}

impl WorkItemStatus {
    pub const DOMAIN: EnumDomain =
        EnumDomain::new(&[("ToDo", 0), ("InProgress", 1), ("Done", 2), ("Blocked", 3)]);
}

impl From<WorkItemStatus> for u32 {
    fn from(status: WorkItemStatus) -> u32 {
        status as u32
    }
}

impl TryFrom<u32> for WorkItemStatus {
    type Error = String;

    fn try_from(ordinal: u32) -> Result<Self, Self::Error> {
        match ordinal {
            0 => Ok(WorkItemStatus::ToDo),
            1 => Ok(WorkItemStatus::InProgress),
            2 => Ok(WorkItemStatus::Done),
            3 => Ok(WorkItemStatus::Blocked),
            other => Err(format!("unknown work item status {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

impl fmt::Display for Assignee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub priority: Priority,
    pub status: WorkItemStatus,
    pub assignee: Option<Assignee>,
}

impl WorkItem {
    pub fn new(title: impl Into<String>, due_date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            due_date,
            priority: Priority::default(),
            status: WorkItemStatus::default(),
            assignee: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: WorkItemStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_assignee(mut self, assignee: Assignee) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// Changes the status; setting the current status again is a no-op.
    pub fn change_status(&mut self, status: WorkItemStatus) {
        if self.status != status {
            self.status = status;
        }
    }

    pub fn to_dto(&self) -> WorkItemDto {
        WorkItemDto {
            id: self.id,
            title: self.title.clone(),
            description: Some(self.description.clone()).filter(|d| !d.is_empty()),
            due_date: self.due_date,
            priority: self.priority,
            status: self.status,
            assignee_id: self.assignee.as_ref().map(|a| a.id),
            assignee_name: self.assignee.as_ref().map(Assignee::to_string),
        }
    }
}

fn work_item_registry() -> QueryResult<FieldRegistry<WorkItem>> {
    FieldRegistry::<WorkItem>::builder()
        .key_field("id", |w| Value::Text(w.id.to_string().into()))
        .field("title", FieldKind::Text, |w| Value::text(&w.title))
        .field("description", FieldKind::Text, |w| Value::text(&w.description))
        .field("dueDate", FieldKind::Timestamp, |w| Value::Timestamp(w.due_date))
        .enum_field("priority", Priority::DOMAIN, |w| Value::EnumTag(w.priority.into()))
        .enum_field("status", WorkItemStatus::DOMAIN, |w| Value::EnumTag(w.status.into()))
        // Unassigned items read as the empty string.
        .key_field("assigneeId", |w| {
            Value::Text(w.assignee.as_ref().map(|a| a.id.to_string()).unwrap_or_default().into())
        })
        .build()
}

impl Queryable for WorkItem {
    fn registry() -> QueryResult<&'static FieldRegistry<Self>> {
        static REGISTRY: OnceLock<QueryResult<FieldRegistry<WorkItem>>> = OnceLock::new();
        REGISTRY
            .get_or_init(work_item_registry)
            .as_ref()
            .map_err(QueryError::clone)
    }
}

/// Response projection of a work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemDto {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub priority: Priority,
    pub status: WorkItemStatus,
    pub assignee_id: Option<Uuid>,
    pub assignee_name: Option<String>,
}

impl From<&WorkItem> for WorkItemDto {
    fn from(item: &WorkItem) -> Self {
        item.to_dto()
    }
}

impl From<WorkItem> for WorkItemDto {
    fn from(item: WorkItem) -> Self {
        item.to_dto()
    }
}
