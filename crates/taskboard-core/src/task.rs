use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Category {
    #[default]
    Work,
    Personal,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Work, Category::Personal];

    pub fn label(self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Personal => "Personal",
        }
    }

    /// Imported todos land in `Work` when their owner id is a multiple of four.
    pub fn from_remote_user(user_id: u64) -> Self {
        if user_id % 4 == 0 {
            Category::Work
        } else {
            Category::Personal
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Stage {
    #[default]
    New,
    Ongoing,
    Finished,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::New, Stage::Ongoing, Stage::Finished];

    pub fn label(self) -> &'static str {
        match self {
            Stage::New => "New",
            Stage::Ongoing => "Ongoing",
            Stage::Finished => "Finished",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("unknown category: {s} (expected Work or Personal)"))
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|st| st.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("unknown stage: {s} (expected New, Ongoing or Finished)"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: u64,
    pub task: String,
    pub category: Category,
    pub stage: Stage,
}

impl Task {
    pub fn new(id: u64, task: impl Into<String>, category: Category, stage: Stage) -> Self {
        Self {
            id,
            task: task.into(),
            category,
            stage,
        }
    }
}

/// Wire shape of an item returned by `GET /todos`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTodo {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub completed: bool,
}

impl From<RemoteTodo> for Task {
    fn from(remote: RemoteTodo) -> Self {
        let stage = if remote.completed {
            Stage::Finished
        } else {
            Stage::New
        };
        Self {
            id: remote.id,
            task: remote.title,
            category: Category::from_remote_user(remote.user_id),
            stage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_maps_owner_and_completion() {
        let remote = RemoteTodo {
            id: 5,
            user_id: 4,
            title: "X".to_string(),
            completed: true,
        };
        assert_eq!(
            Task::from(remote),
            Task::new(5, "X", Category::Work, Stage::Finished)
        );

        let open: RemoteTodo = serde_json::from_str(
            r#"{"userId":1,"id":2,"title":"quis ut nam","completed":false}"#,
        )
        .expect("parse remote todo");
        let task = Task::from(open);
        assert_eq!(task.category, Category::Personal);
        assert_eq!(task.stage, Stage::New);
    }

    #[test]
    fn serializes_with_plain_labels() {
        let task = Task::new(1, "A", Category::Work, Stage::Ongoing);
        let json = serde_json::to_string(&task).expect("serialize");
        assert_eq!(
            json,
            r#"{"id":1,"task":"A","category":"Work","stage":"Ongoing"}"#
        );
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("personal".parse::<Category>().expect("category"), Category::Personal);
        assert_eq!(" FINISHED ".parse::<Stage>().expect("stage"), Stage::Finished);
        assert!("Home".parse::<Category>().is_err());
        assert!("done".parse::<Stage>().is_err());
    }
}
