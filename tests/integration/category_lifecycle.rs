//! Integration tests for the category lifecycle.
//!
//! Categories live beside the checklist: they are created, renamed,
//! recolored, and deleted independently, and tasks reference them loosely.
//! Deleting a category never touches the tasks that point at it.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use taskflow::checklist::{CategorySet, ChecklistManager, WritePlan};
use taskflow_proto::category::{COLOR_SWATCH, CategoryId, CategoryRecord};
use taskflow_proto::task::TaskPatch;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn make_category(user_id: &str, name: &str, created_at: u64) -> CategoryRecord {
    CategoryRecord {
        id: CategoryId::new(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        color: COLOR_SWATCH[0].to_string(),
        created_at,
        updated_at: created_at,
    }
}

// ---------------------------------------------------------------------------
// Category set lifecycle
// ---------------------------------------------------------------------------

#[test]
fn swatch_rotation_wraps_after_ten_categories() {
    let mut set = CategorySet::new("user-1");
    let mut ids = Vec::new();
    for i in 0..11 {
        let (id, _) = set.create(&format!("Category {i}"), None).expect("create");
        ids.push(id);
    }
    assert_eq!(set.category(ids[0]).expect("first").color, COLOR_SWATCH[0]);
    assert_eq!(set.category(ids[9]).expect("tenth").color, COLOR_SWATCH[9]);
    assert_eq!(
        set.category(ids[10]).expect("eleventh").color,
        COLOR_SWATCH[0],
        "the swatch wraps around"
    );
}

#[test]
fn full_lifecycle_produces_matching_write_plans() {
    let mut set = CategorySet::new("user-1");

    let (id, create_plan) = set.create("Prep", None).expect("create");
    assert!(matches!(create_plan, WritePlan::CreateCategory(_)));

    let rename_plan = set.rename(id, "Rigging").expect("rename");
    assert!(matches!(rename_plan, WritePlan::UpdateCategory(got, _) if got == id));

    let recolor_plan = set.recolor(id, "#dc3545").expect("recolor");
    assert!(matches!(recolor_plan, WritePlan::UpdateCategory(got, _) if got == id));
    assert_eq!(set.category(id).expect("category").color, "#dc3545");

    let delete_plan = set.delete(id).expect("delete");
    assert_eq!(delete_plan, WritePlan::DeleteCategory(id));
    assert!(set.categories().is_empty());
}

#[test]
fn snapshot_orders_by_creation_time() {
    let mut set = CategorySet::new("user-1");
    let older = make_category("user-1", "Older", 100);
    let newer = make_category("user-1", "Newer", 200);
    set.apply_snapshot(vec![newer, older.clone()]);

    let names: Vec<&str> = set.categories().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Older", "Newer"]);
    assert_eq!(set.categories()[0].id, older.id);
}

// ---------------------------------------------------------------------------
// Tasks referencing categories
// ---------------------------------------------------------------------------

#[test]
fn assignment_patches_only_the_category_reference() {
    let mut set = CategorySet::new("user-1");
    let (category, _) = set.create("Gear", None).expect("create");

    let mut manager = ChecklistManager::new("user-1");
    let (task, command) = manager.add_task("Inspect gear", None).expect("add");
    manager.confirm(command);

    let command = manager
        .assign_category(task, Some(category))
        .expect("assign");
    match manager.write_plan(command).expect("plan") {
        WritePlan::UpdateTask(got, patch) => {
            assert_eq!(*got, task);
            assert_eq!(
                *patch,
                TaskPatch {
                    category_id: Some(Some(category)),
                    ..TaskPatch::default()
                }
            );
        }
        other => panic!("expected UpdateTask, got {other:?}"),
    }
    assert_eq!(manager.task(task).expect("task").category_id, Some(category));
}

#[test]
fn clearing_an_assignment_uses_the_double_option() {
    let mut manager = ChecklistManager::new("user-1");
    let category = CategoryId::new();
    let (task, command) = manager
        .add_task("Load gear in van", Some(category))
        .expect("add");
    manager.confirm(command);

    let command = manager.assign_category(task, None).expect("clear");
    match manager.write_plan(command).expect("plan") {
        WritePlan::UpdateTask(_, patch) => assert_eq!(patch.category_id, Some(None)),
        other => panic!("expected UpdateTask, got {other:?}"),
    }
    assert_eq!(manager.task(task).expect("task").category_id, None);
}

#[test]
fn deleting_a_category_leaves_task_references_dangling() {
    let mut set = CategorySet::new("user-1");
    let (category, _) = set.create("Gear", None).expect("create");

    let mut manager = ChecklistManager::new("user-1");
    let (task, _) = manager
        .add_task("Set up sail", Some(category))
        .expect("add");

    set.delete(category).expect("delete");

    // The task still carries the id; rendering resolves it to no color.
    assert_eq!(
        manager.task(task).expect("task").category_id,
        Some(category)
    );
    assert!(set.color_of(Some(category)).is_none());
}

#[test]
fn assignment_works_on_locked_and_completed_tasks() {
    let mut manager = ChecklistManager::new("user-1");
    for i in 0..2 {
        let (_, command) = manager
            .add_task(&format!("Task {i}"), None)
            .expect("add");
        manager.confirm(command);
    }
    let category = CategoryId::new();

    // The second task is locked; categorizing it is still allowed.
    let locked = manager.tasks()[1].id;
    assert!(manager.tasks()[1].locked);
    manager
        .assign_category(locked, Some(category))
        .expect("assign to locked");

    let head = manager.tasks()[0].id;
    let command = manager.toggle_task(head).expect("complete head");
    manager.confirm(command);
    manager
        .assign_category(head, Some(category))
        .expect("assign to completed");

    assert!(
        manager
            .tasks()
            .iter()
            .all(|t| t.category_id == Some(category))
    );
}
