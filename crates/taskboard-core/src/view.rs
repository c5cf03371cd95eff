use crate::controller::Action;
use crate::store::TaskStore;
use crate::task::{Category, Stage, Task};

/// The rendered fragment for one category tab. Rebuilt from scratch on every
/// change; nothing is diffed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryView {
    pub category: Category,
    pub items: Vec<TaskItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub text: EditableText,
    pub stage: Stage,
    pub stage_controls: [StageControl; 3],
    pub delete: DeleteControl,
}

/// Inline-editable task text. Commits when focus leaves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableText {
    pub id: u64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageControl {
    pub id: u64,
    pub target: Stage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteControl {
    pub id: u64,
}

impl CategoryView {
    #[tracing::instrument(skip(store))]
    pub fn build(store: &TaskStore, category: Category) -> Self {
        let items = store.in_category(category).map(TaskItem::from_task).collect();
        Self { category, items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, id: u64) -> Option<&TaskItem> {
        self.items.iter().find(|item| item.id() == id)
    }
}

impl TaskItem {
    fn from_task(task: &Task) -> Self {
        Self {
            text: EditableText {
                id: task.id,
                text: task.task.clone(),
            },
            stage: task.stage,
            stage_controls: Stage::ALL.map(|target| StageControl { id: task.id, target }),
            delete: DeleteControl { id: task.id },
        }
    }

    pub fn id(&self) -> u64 {
        self.text.id
    }
}

impl EditableText {
    /// Blank content is dropped; the stale text stays until the next render.
    pub fn commit(&self, raw: &str) -> Option<Action> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }
        Some(Action::Edit {
            id: self.id,
            text: text.to_string(),
        })
    }
}

impl StageControl {
    pub fn label(&self) -> String {
        format!("To {}", self.target)
    }

    pub fn action(&self) -> Action {
        Action::SetStage {
            id: self.id,
            stage: self.target,
        }
    }
}

impl DeleteControl {
    pub fn action(&self) -> Action {
        Action::Remove { id: self.id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TaskStore {
        TaskStore::new(vec![
            Task::new(1, "A", Category::Work, Stage::New),
            Task::new(2, "B", Category::Personal, Stage::Finished),
            Task::new(3, "C", Category::Work, Stage::Ongoing),
        ])
    }

    #[test]
    fn shows_only_the_selected_category_in_order() {
        let view = CategoryView::build(&store(), Category::Work);
        let ids: Vec<u64> = view.items.iter().map(TaskItem::id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(view.items[1].stage, Stage::Ongoing);
        assert_eq!(view.items[1].text.text, "C");
    }

    #[test]
    fn every_item_has_three_stage_controls_and_delete() {
        let view = CategoryView::build(&store(), Category::Personal);
        let item = view.item(2).expect("item");
        let labels: Vec<String> = item.stage_controls.iter().map(StageControl::label).collect();
        assert_eq!(labels, vec!["To New", "To Ongoing", "To Finished"]);
        assert_eq!(
            item.stage_controls[0].action(),
            Action::SetStage {
                id: 2,
                stage: Stage::New
            }
        );
        assert_eq!(item.delete.action(), Action::Remove { id: 2 });
    }

    #[test]
    fn commit_trims_and_drops_blank_text() {
        let text = EditableText {
            id: 4,
            text: "old".to_string(),
        };
        assert_eq!(text.commit("   "), None);
        assert_eq!(
            text.commit("  new text "),
            Some(Action::Edit {
                id: 4,
                text: "new text".to_string()
            })
        );
    }

    #[test]
    fn empty_category_renders_empty_fragment() {
        let store = TaskStore::new(vec![Task::new(1, "A", Category::Work, Stage::New)]);
        assert!(CategoryView::build(&store, Category::Personal).is_empty());
    }
}
