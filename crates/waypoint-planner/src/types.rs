//! Planner records and request parameters.
//!
//! Records serialize with snake_case field names; they are what the HTTP
//! layer returns. `*Params` types are what it deserializes request bodies
//! into. Patch fields that can be cleared use `Option<Option<T>>` with
//! [`waypoint_core::nullable`].

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Goal hierarchy
// ─────────────────────────────────────────────────────────────────────────────

/// A life area. Default areas have no owner and are visible to everyone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LifeArea {
    /// Unique ID.
    pub id: String,
    /// Owner, `None` for shared defaults.
    pub user_id: Option<String>,
    /// Display name.
    pub designation: String,
    /// Icon asset path.
    pub icon_path: String,
    /// Shared, read-only area.
    pub is_default: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// A purpose statement under a life area.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Purpose {
    /// Unique ID.
    pub id: String,
    /// Owner.
    pub user_id: String,
    /// Parent life area.
    pub life_area_id: String,
    /// Statement text.
    pub description: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// A long-term vision under a life area.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LongTermVision {
    /// Unique ID.
    pub id: String,
    /// Owner.
    pub user_id: String,
    /// Parent life area.
    pub life_area_id: String,
    /// Vision text.
    pub description: String,
    /// Target date (`YYYY-MM-DD`).
    pub deadline: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// A yearly goal under a long-term vision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnnualGoal {
    /// Unique ID.
    pub id: String,
    /// Owner.
    pub user_id: String,
    /// Parent vision.
    pub long_term_vision_id: String,
    /// Goal text.
    pub description: String,
    /// Calendar year.
    pub year: i32,
    /// Achieved flag.
    pub status: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// A monthly goal under an annual goal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MonthlyGoal {
    /// Unique ID.
    pub id: String,
    /// Owner.
    pub user_id: String,
    /// Parent annual goal.
    pub annual_goal_id: String,
    /// Goal text.
    pub description: String,
    /// Month number, 1–12.
    pub month: u8,
    /// Achieved flag.
    pub status: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// A project under a monthly goal, with its ordered actions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Project {
    /// Unique ID.
    pub id: String,
    /// Owner.
    pub user_id: String,
    /// Parent monthly goal.
    pub monthly_goal_id: String,
    /// Title.
    pub title: String,
    /// Why the project exists.
    pub purpose: String,
    /// What done looks like.
    pub expected_result: String,
    /// Hidden from the default listing.
    pub is_archived: bool,
    /// Actions ordered by `order_index`.
    pub actions: Vec<ProjectAction>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// One ordered step of a project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProjectAction {
    /// Unique ID.
    pub id: String,
    /// Owning project.
    pub project_id: String,
    /// Step text.
    pub description: String,
    /// Position within the project.
    pub order_index: Option<i64>,
    /// Completion flag.
    pub is_done: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Lists and tasks
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of task list. Entry lists reject scheduling fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// Plain capture list; tasks carry no deadline, time, or frequency.
    Entry,
    /// Actionable list; may mirror project work.
    Action,
}

impl ListKind {
    /// SQL column value.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Action => "action",
        }
    }

    /// Parse the SQL column value.
    pub fn from_sql(value: &str) -> Self {
        match value {
            "action" => Self::Action,
            _ => Self::Entry,
        }
    }
}

/// A user-owned task list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TaskList {
    /// Unique ID.
    pub id: String,
    /// Owner.
    pub user_id: String,
    /// Display name.
    pub designation: String,
    /// List kind.
    #[serde(rename = "type")]
    pub kind: ListKind,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// A task attached to a list, a project, or (via linking) both.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Task {
    /// Unique ID.
    pub id: String,
    /// Owner.
    pub user_id: String,
    /// Containing list.
    pub list_id: Option<String>,
    /// Containing project.
    pub project_id: Option<String>,
    /// Task text.
    pub description: String,
    /// Position within the project; `None` outside projects.
    pub order_index: Option<i64>,
    /// Due date.
    pub deadline: Option<String>,
    /// Time of day.
    pub time: Option<String>,
    /// Recurrence rule (free-form JSON).
    pub frequency: Option<serde_json::Value>,
    /// Completion flag.
    pub completed: bool,
    /// Project action this task mirrors.
    pub linked_action_id: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl Task {
    /// Whether the task is attached to both a list and a project.
    pub fn is_dual_attached(&self) -> bool {
        self.list_id.is_some() && self.project_id.is_some()
    }
}

/// A task with the context its listing view needs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaskView {
    /// The task itself.
    #[serde(flatten)]
    pub task: Task,
    /// Kind of the containing list, if any.
    pub list_type: Option<ListKind>,
    /// Name of the containing list, if any.
    pub list_designation: Option<String>,
    /// Title of the containing project, if any.
    pub project_title: Option<String>,
}

/// Filters for task listings.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TaskFilter {
    /// Only tasks with this completion state.
    pub completed: Option<bool>,
    /// Only tasks in this list.
    pub list_id: Option<String>,
    /// Only tasks in this project; switches to project ordering.
    pub project_id: Option<String>,
    /// Only tasks whose list has this kind.
    #[serde(rename = "type")]
    pub list_type: Option<ListKind>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Request parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Create or replace a life area.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LifeAreaParams {
    /// Caller-supplied ID for idempotent upsert.
    pub id: Option<String>,
    /// Display name (≤ 55 chars).
    pub designation: String,
    /// Icon asset path.
    pub icon_path: String,
}

/// Partial life area update.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LifeAreaPatch {
    /// New name.
    pub designation: Option<String>,
    /// New icon.
    pub icon_path: Option<String>,
}

/// Create or replace a purpose.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PurposeParams {
    /// Caller-supplied ID for idempotent upsert.
    pub id: Option<String>,
    /// Parent life area.
    pub life_area_id: String,
    /// Statement text (≤ 250 chars).
    pub description: String,
}

/// Partial purpose update.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PurposePatch {
    /// New parent life area.
    pub life_area_id: Option<String>,
    /// New text.
    pub description: Option<String>,
}

/// Create or replace a long-term vision.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct VisionParams {
    /// Caller-supplied ID for idempotent upsert.
    pub id: Option<String>,
    /// Parent life area.
    pub life_area_id: String,
    /// Vision text (≤ 250 chars).
    pub description: String,
    /// Target date (`YYYY-MM-DD`).
    pub deadline: String,
}

/// Partial long-term vision update.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct VisionPatch {
    /// New parent life area.
    pub life_area_id: Option<String>,
    /// New text.
    pub description: Option<String>,
    /// New target date.
    pub deadline: Option<String>,
}

/// Create or replace an annual goal.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AnnualGoalParams {
    /// Caller-supplied ID for idempotent upsert.
    pub id: Option<String>,
    /// Parent vision.
    pub long_term_vision_id: String,
    /// Goal text.
    pub description: String,
    /// Calendar year.
    pub year: i32,
    /// Achieved flag.
    #[serde(default)]
    pub status: bool,
}

/// Partial annual goal update.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AnnualGoalPatch {
    /// New parent vision.
    pub long_term_vision_id: Option<String>,
    /// New text.
    pub description: Option<String>,
    /// New year.
    pub year: Option<i32>,
    /// New achieved flag.
    pub status: Option<bool>,
}

/// A month given as a number or a month name.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MonthInput {
    /// 1–12.
    Number(i64),
    /// Month name or numeric string.
    Name(String),
}

/// Create or replace a monthly goal.
#[derive(Clone, Debug, Deserialize)]
pub struct MonthlyGoalParams {
    /// Caller-supplied ID for idempotent upsert.
    pub id: Option<String>,
    /// Parent annual goal.
    pub annual_goal_id: String,
    /// Goal text.
    pub description: String,
    /// Month number or name.
    pub month: MonthInput,
    /// Achieved flag.
    #[serde(default)]
    pub status: bool,
}

/// Partial monthly goal update.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MonthlyGoalPatch {
    /// New parent annual goal.
    pub annual_goal_id: Option<String>,
    /// New text.
    pub description: Option<String>,
    /// New month.
    pub month: Option<MonthInput>,
    /// New achieved flag.
    pub status: Option<bool>,
}

/// Create or replace a project.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProjectParams {
    /// Caller-supplied ID for idempotent upsert.
    pub id: Option<String>,
    /// Parent monthly goal.
    pub monthly_goal_id: String,
    /// Title (≤ 255 chars).
    pub title: String,
    /// Why the project exists.
    pub purpose: String,
    /// What done looks like.
    pub expected_result: String,
}

/// Partial project update.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProjectPatch {
    /// New parent monthly goal.
    pub monthly_goal_id: Option<String>,
    /// New title.
    pub title: Option<String>,
    /// New purpose.
    pub purpose: Option<String>,
    /// New expected result.
    pub expected_result: Option<String>,
    /// New archive flag.
    pub is_archived: Option<bool>,
}

/// Create or replace a list.
#[derive(Clone, Debug, Deserialize)]
pub struct ListParams {
    /// Caller-supplied ID for idempotent upsert.
    pub id: Option<String>,
    /// Display name.
    pub designation: String,
    /// List kind.
    #[serde(rename = "type")]
    pub kind: ListKind,
}

/// Partial list update.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListPatch {
    /// New name.
    pub designation: Option<String>,
    /// New kind.
    #[serde(rename = "type")]
    pub kind: Option<ListKind>,
}

/// Create or replace a task.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TaskParams {
    /// Caller-supplied ID for idempotent upsert.
    pub id: Option<String>,
    /// Containing list.
    pub list_id: Option<String>,
    /// Containing project.
    pub project_id: Option<String>,
    /// Task text.
    #[serde(alias = "designation")]
    pub description: String,
    /// Explicit position within the project.
    pub order_index: Option<i64>,
    /// Due date.
    pub deadline: Option<String>,
    /// Time of day.
    pub time: Option<String>,
    /// Recurrence rule.
    pub frequency: Option<serde_json::Value>,
    /// Completion flag.
    #[serde(default)]
    pub completed: bool,
}

/// Partial task update.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TaskPatch {
    /// New text.
    #[serde(alias = "designation")]
    pub description: Option<String>,
    /// Attach to / detach from a list.
    #[serde(default, deserialize_with = "waypoint_core::nullable::deserialize")]
    pub list_id: Option<Option<String>>,
    /// Attach to / detach from a project.
    #[serde(default, deserialize_with = "waypoint_core::nullable::deserialize")]
    pub project_id: Option<Option<String>>,
    /// Reposition within the project.
    #[serde(default, deserialize_with = "waypoint_core::nullable::deserialize")]
    pub order_index: Option<Option<i64>>,
    /// Set or clear the due date.
    #[serde(default, deserialize_with = "waypoint_core::nullable::deserialize")]
    pub deadline: Option<Option<String>>,
    /// Set or clear the time of day.
    #[serde(default, deserialize_with = "waypoint_core::nullable::deserialize")]
    pub time: Option<Option<String>>,
    /// Set or clear the recurrence rule.
    #[serde(default, deserialize_with = "waypoint_core::nullable::deserialize")]
    pub frequency: Option<Option<serde_json::Value>>,
    /// New completion flag.
    pub completed: Option<bool>,
}

/// Create or replace a project action.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ActionParams {
    /// Caller-supplied ID for idempotent upsert.
    pub id: Option<String>,
    /// Owning project.
    pub project_id: String,
    /// Step text.
    pub description: String,
    /// Explicit position.
    pub order_index: Option<i64>,
    /// Completion flag.
    #[serde(default)]
    pub is_done: bool,
}

/// Partial project action update.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ActionPatch {
    /// New text, propagated to mirrors.
    pub description: Option<String>,
    /// New completion flag, propagated to mirrors.
    pub is_done: Option<bool>,
    /// New position within the project.
    pub order_index: Option<i64>,
}

/// Result of moving several tasks into a list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovedToList {
    /// How many tasks moved.
    pub moved_count: usize,
    /// Destination list.
    pub list: TaskList,
}

/// Result of mirroring a project action into an action list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionMirror {
    /// The source action.
    pub project_action: ProjectAction,
    /// The mirrored task.
    pub task: Task,
}
