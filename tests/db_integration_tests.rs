//! Integration tests for the database layer.
//!
//! These tests verify the core database operations using an in-memory SQLite database.
//! Tests are organized by module and functionality.

use tasklist_server::db::Database;
use tasklist_server::error::{ErrorCode, ReferenceError, TaskError};
use tasklist_server::types::{CreateTask, PatchField, Scope, ScopePolicy, TaskPatch};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn global() -> Scope {
    Scope::global()
}

mod create_tests {
    use super::*;

    #[test]
    fn create_then_get_matches_input() {
        let db = setup_db();
        let input = CreateTask {
            title: "Buy milk".to_string(),
            description: Some("semi-skimmed".to_string()),
            location: Some("corner shop".to_string()),
            date: Some("2023-05-06".to_string()),
            time: Some("18:00".to_string()),
            ..CreateTask::default()
        };

        let id = db.create_task(&input, &global()).unwrap();
        let task = db.get_task(id, &global()).unwrap();

        assert_eq!(task.id, id);
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description.as_deref(), Some("semi-skimmed"));
        assert_eq!(task.location.as_deref(), Some("corner shop"));
        assert_eq!(task.date.as_deref(), Some("2023-05-06"));
        assert_eq!(task.time.as_deref(), Some("18:00"));
        assert!(task.next_task_ids.is_empty());
    }

    #[test]
    fn create_with_empty_optional_fields_omits_them() {
        let db = setup_db();
        let input = CreateTask {
            description: Some(String::new()),
            ..CreateTask::titled("Bare")
        };

        let id = db.create_task(&input, &global()).unwrap();
        let task = db.get_task(id, &global()).unwrap();

        assert_eq!(task.description, None);
        assert_eq!(task.location, None);
        assert_eq!(task.date, None);
        assert_eq!(task.time, None);
    }

    #[test]
    fn create_with_predecessor_adds_successor_edge() {
        let db = setup_db();
        let a = db.create_task(&CreateTask::titled("A"), &global()).unwrap();
        let b = db
            .create_task(
                &CreateTask {
                    previous_task_ids: vec![a],
                    ..CreateTask::titled("B")
                },
                &global(),
            )
            .unwrap();

        assert_eq!(db.get_task(a, &global()).unwrap().next_task_ids, vec![b]);
        assert!(db.get_task(b, &global()).unwrap().next_task_ids.is_empty());
        assert_eq!(db.get_predecessors(b).unwrap(), vec![a]);
    }

    #[test]
    fn successors_keep_insertion_order() {
        let db = setup_db();
        let one = db.create_task(&CreateTask::titled("1"), &global()).unwrap();
        let two = db.create_task(&CreateTask::titled("2"), &global()).unwrap();
        let three = db.create_task(&CreateTask::titled("3"), &global()).unwrap();

        let root = db
            .create_task(
                &CreateTask {
                    next_task_ids: vec![three, one, two],
                    ..CreateTask::titled("root")
                },
                &global(),
            )
            .unwrap();

        assert_eq!(
            db.get_task(root, &global()).unwrap().next_task_ids,
            vec![three, one, two]
        );
    }

    #[test]
    fn create_with_missing_successor_leaves_no_orphan() {
        let db = setup_db();
        let existing = db.create_task(&CreateTask::titled("exists"), &global()).unwrap();

        let err = db
            .create_task(
                &CreateTask {
                    next_task_ids: vec![existing, 999],
                    ..CreateTask::titled("dangling")
                },
                &global(),
            )
            .unwrap_err();

        assert!(matches!(err, TaskError::Reference(ReferenceError::MissingTask)));
        let tasks = db.list_tasks(&global()).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, existing);
        assert_eq!(db.edge_count().unwrap(), 0);
    }

    #[test]
    fn create_with_missing_predecessor_leaves_no_orphan() {
        let db = setup_db();

        let err = db
            .create_task(
                &CreateTask {
                    previous_task_ids: vec![42],
                    ..CreateTask::titled("dangling")
                },
                &global(),
            )
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::MissingReference);
        assert!(db.list_tasks(&global()).unwrap().is_empty());
    }

    #[test]
    fn create_rejects_invalid_input() {
        let db = setup_db();

        let err = db.create_task(&CreateTask::titled(""), &global()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingRequiredField);

        let err = db
            .create_task(
                &CreateTask {
                    date: Some("2023-13-40".to_string()),
                    ..CreateTask::titled("bad date")
                },
                &global(),
            )
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidFieldValue);

        let err = db
            .create_task(
                &CreateTask {
                    time: Some("25:00".to_string()),
                    ..CreateTask::titled("bad time")
                },
                &global(),
            )
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidFieldValue);

        assert!(db.list_tasks(&global()).unwrap().is_empty());
    }
}

mod update_tests {
    use super::*;

    #[test]
    fn title_update_changes_only_title() {
        let db = setup_db();
        let next = db.create_task(&CreateTask::titled("next"), &global()).unwrap();
        let id = db
            .create_task(
                &CreateTask {
                    title: "Old".to_string(),
                    description: Some("desc".to_string()),
                    location: Some("here".to_string()),
                    date: Some("2024-01-02".to_string()),
                    time: Some("09:30".to_string()),
                    next_task_ids: vec![next],
                    previous_task_ids: vec![],
                },
                &global(),
            )
            .unwrap();
        let before = db.get_task(id, &global()).unwrap();

        let patch = TaskPatch::from_changed(
            CreateTask {
                description: Some("ignored".to_string()),
                ..CreateTask::titled("New")
            },
            &[PatchField::Title],
        );
        db.update_task(id, &patch, &global()).unwrap();

        let after = db.get_task(id, &global()).unwrap();
        assert_eq!(after.title, "New");
        assert_eq!(after.description, before.description);
        assert_eq!(after.location, before.location);
        assert_eq!(after.date, before.date);
        assert_eq!(after.time, before.time);
        assert_eq!(after.next_task_ids, before.next_task_ids);
    }

    #[test]
    fn empty_text_clears_optional_field() {
        let db = setup_db();
        let id = db
            .create_task(
                &CreateTask {
                    location: Some("office".to_string()),
                    ..CreateTask::titled("t")
                },
                &global(),
            )
            .unwrap();

        let patch = TaskPatch {
            location: Some(String::new()),
            ..TaskPatch::default()
        };
        db.update_task(id, &patch, &global()).unwrap();

        assert_eq!(db.get_task(id, &global()).unwrap().location, None);
    }

    #[test]
    fn successor_update_replaces_edges() {
        let db = setup_db();
        let a = db.create_task(&CreateTask::titled("a"), &global()).unwrap();
        let b = db.create_task(&CreateTask::titled("b"), &global()).unwrap();
        let root = db
            .create_task(
                &CreateTask {
                    next_task_ids: vec![a],
                    ..CreateTask::titled("root")
                },
                &global(),
            )
            .unwrap();

        let patch = TaskPatch {
            next_task_ids: Some(vec![b]),
            ..TaskPatch::default()
        };
        db.update_task(root, &patch, &global()).unwrap();

        assert_eq!(db.get_task(root, &global()).unwrap().next_task_ids, vec![b]);
        assert_eq!(db.edge_count().unwrap(), 1);
    }

    #[test]
    fn predecessor_update_replaces_incoming_edges() {
        let db = setup_db();
        let a = db.create_task(&CreateTask::titled("a"), &global()).unwrap();
        let b = db.create_task(&CreateTask::titled("b"), &global()).unwrap();
        let target = db
            .create_task(
                &CreateTask {
                    previous_task_ids: vec![a],
                    ..CreateTask::titled("target")
                },
                &global(),
            )
            .unwrap();

        let patch = TaskPatch {
            previous_task_ids: Some(vec![b]),
            ..TaskPatch::default()
        };
        db.update_task(target, &patch, &global()).unwrap();

        assert!(db.get_task(a, &global()).unwrap().next_task_ids.is_empty());
        assert_eq!(db.get_task(b, &global()).unwrap().next_task_ids, vec![target]);
    }

    #[test]
    fn failed_edge_stage_rolls_back_scalar_fields() {
        let db = setup_db();
        let id = db.create_task(&CreateTask::titled("Original"), &global()).unwrap();
        let kept = db.create_task(&CreateTask::titled("kept"), &global()).unwrap();
        db.update_task(
            id,
            &TaskPatch {
                next_task_ids: Some(vec![kept]),
                ..TaskPatch::default()
            },
            &global(),
        )
        .unwrap();

        let patch = TaskPatch {
            title: Some("Changed".to_string()),
            next_task_ids: Some(vec![kept, 777]),
            ..TaskPatch::default()
        };
        let err = db.update_task(id, &patch, &global()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingReference);

        let task = db.get_task(id, &global()).unwrap();
        assert_eq!(task.title, "Original");
        assert_eq!(task.next_task_ids, vec![kept]);
    }

    #[test]
    fn failed_predecessor_stage_rolls_back_earlier_stages() {
        let db = setup_db();
        let id = db.create_task(&CreateTask::titled("Original"), &global()).unwrap();
        let old_next = db.create_task(&CreateTask::titled("old next"), &global()).unwrap();
        let new_next = db.create_task(&CreateTask::titled("new next"), &global()).unwrap();
        db.update_task(
            id,
            &TaskPatch {
                next_task_ids: Some(vec![old_next]),
                ..TaskPatch::default()
            },
            &global(),
        )
        .unwrap();

        let patch = TaskPatch {
            title: Some("Changed".to_string()),
            next_task_ids: Some(vec![new_next]),
            previous_task_ids: Some(vec![888]),
            ..TaskPatch::default()
        };
        let err = db.update_task(id, &patch, &global()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingReference);

        let task = db.get_task(id, &global()).unwrap();
        assert_eq!(task.title, "Original");
        assert_eq!(task.next_task_ids, vec![old_next]);
        assert!(db.get_predecessors(id).unwrap().is_empty());
        assert_eq!(db.edge_count().unwrap(), 1);
    }

    #[test]
    fn update_missing_task_is_not_found() {
        let db = setup_db();
        let patch = TaskPatch {
            title: Some("x".to_string()),
            ..TaskPatch::default()
        };
        let err = db.update_task(5, &patch, &global()).unwrap_err();
        assert!(matches!(err, TaskError::NotFound(5)));
    }

    #[test]
    fn update_rejects_empty_title() {
        let db = setup_db();
        let id = db.create_task(&CreateTask::titled("keep"), &global()).unwrap();
        let patch = TaskPatch {
            title: Some(String::new()),
            ..TaskPatch::default()
        };
        let err = db.update_task(id, &patch, &global()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingRequiredField);
        assert_eq!(db.get_task(id, &global()).unwrap().title, "keep");
    }
}

mod delete_tests {
    use super::*;

    #[test]
    fn delete_referenced_task_is_blocked() {
        let db = setup_db();
        let target = db.create_task(&CreateTask::titled("target"), &global()).unwrap();
        let source = db
            .create_task(
                &CreateTask {
                    next_task_ids: vec![target],
                    ..CreateTask::titled("source")
                },
                &global(),
            )
            .unwrap();

        let err = db.delete_task(target, &global()).unwrap_err();
        assert!(matches!(
            err,
            TaskError::Reference(ReferenceError::DependencyBlocksDelete(id)) if id == target
        ));

        assert!(db.task_exists(target).unwrap());
        assert_eq!(db.get_task(source, &global()).unwrap().next_task_ids, vec![target]);
    }

    #[test]
    fn delete_cascades_outgoing_edges() {
        let db = setup_db();
        let target = db.create_task(&CreateTask::titled("target"), &global()).unwrap();
        let source = db
            .create_task(
                &CreateTask {
                    next_task_ids: vec![target],
                    ..CreateTask::titled("source")
                },
                &global(),
            )
            .unwrap();

        db.delete_task(source, &global()).unwrap();

        assert_eq!(db.edge_count().unwrap(), 0);
        assert!(matches!(
            db.get_task(source, &global()),
            Err(TaskError::NotFound(id)) if id == source
        ));
        db.delete_task(target, &global()).unwrap();
    }

    #[test]
    fn delete_missing_task_is_not_found() {
        let db = setup_db();
        assert!(matches!(db.delete_task(3, &global()), Err(TaskError::NotFound(3))));
    }
}

mod scope_tests {
    use super::*;

    fn owner(name: &str) -> Scope {
        Scope::new(name, ScopePolicy::Owner)
    }

    #[test]
    fn owner_scope_hides_other_callers_tasks() {
        let db = setup_db();
        let alice_task = db.create_task(&CreateTask::titled("alice's"), &owner("alice")).unwrap();
        let bob_task = db.create_task(&CreateTask::titled("bob's"), &owner("bob")).unwrap();

        let alice_view = db.list_tasks(&owner("alice")).unwrap();
        assert_eq!(alice_view.len(), 1);
        assert_eq!(alice_view[0].id, alice_task);

        assert!(matches!(
            db.get_task(bob_task, &owner("alice")),
            Err(TaskError::NotFound(_))
        ));
        assert!(matches!(
            db.delete_task(bob_task, &owner("alice")),
            Err(TaskError::NotFound(_))
        ));
        let patch = TaskPatch {
            title: Some("mine now".to_string()),
            ..TaskPatch::default()
        };
        assert!(matches!(
            db.update_task(bob_task, &patch, &owner("alice")),
            Err(TaskError::NotFound(_))
        ));

        assert_eq!(db.list_tasks(&global()).unwrap().len(), 2);
    }

    #[test]
    fn owner_scope_rejects_edges_to_other_callers_tasks() {
        let db = setup_db();
        let bob_task = db.create_task(&CreateTask::titled("bob's"), &owner("bob")).unwrap();

        let err = db
            .create_task(
                &CreateTask {
                    previous_task_ids: vec![bob_task],
                    ..CreateTask::titled("alice's")
                },
                &owner("alice"),
            )
            .unwrap_err();
        assert!(matches!(err, TaskError::Reference(ReferenceError::MissingTask)));

        let alice_task = db.create_task(&CreateTask::titled("alice's"), &owner("alice")).unwrap();
        let patch = TaskPatch {
            next_task_ids: Some(vec![bob_task]),
            ..TaskPatch::default()
        };
        let err = db.update_task(alice_task, &patch, &owner("alice")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingReference);

        assert!(db.get_task(bob_task, &owner("bob")).unwrap().next_task_ids.is_empty());
        assert_eq!(db.edge_count().unwrap(), 0);
        assert_eq!(db.list_tasks(&global()).unwrap().len(), 2);
    }

    #[test]
    fn clearing_predecessors_keeps_other_callers_edges() {
        let db = setup_db();
        let alice_task = db.create_task(&CreateTask::titled("alice's"), &owner("alice")).unwrap();
        let alice_prev = db
            .create_task(&CreateTask::titled("alice's prev"), &owner("alice"))
            .unwrap();
        let bob_task = db.create_task(&CreateTask::titled("bob's"), &owner("bob")).unwrap();

        db.update_task(
            alice_task,
            &TaskPatch {
                previous_task_ids: Some(vec![alice_prev]),
                ..TaskPatch::default()
            },
            &owner("alice"),
        )
        .unwrap();
        db.update_task(
            bob_task,
            &TaskPatch {
                next_task_ids: Some(vec![alice_task]),
                ..TaskPatch::default()
            },
            &global(),
        )
        .unwrap();

        let clear = TaskPatch {
            previous_task_ids: Some(vec![]),
            ..TaskPatch::default()
        };
        db.update_task(alice_task, &clear, &owner("alice")).unwrap();

        assert!(db.get_task(alice_prev, &owner("alice")).unwrap().next_task_ids.is_empty());
        assert_eq!(
            db.get_task(bob_task, &owner("bob")).unwrap().next_task_ids,
            vec![alice_task]
        );
        assert_eq!(db.get_predecessors(alice_task).unwrap(), vec![bob_task]);
    }

    #[test]
    fn global_scope_shares_tasks() {
        let db = setup_db();
        let id = db
            .create_task(&CreateTask::titled("shared"), &Scope::new("alice", ScopePolicy::Global))
            .unwrap();

        let bob = Scope::new("bob", ScopePolicy::Global);
        assert_eq!(db.get_task(id, &bob).unwrap().title, "shared");
        db.delete_task(id, &bob).unwrap();
    }
}

mod scenario_tests {
    use super::*;

    #[test]
    fn successor_lifecycle() {
        let db = setup_db();

        let first = db
            .create_task(
                &CreateTask {
                    date: Some("2023-05-06".to_string()),
                    time: Some("18:00".to_string()),
                    ..CreateTask::titled("Task 1")
                },
                &global(),
            )
            .unwrap();
        let second = db.create_task(&CreateTask::titled("Task 2"), &global()).unwrap();
        assert_ne!(first, second);

        let link = TaskPatch {
            next_task_ids: Some(vec![second]),
            ..TaskPatch::default()
        };
        db.update_task(first, &link, &global()).unwrap();

        let task = db.get_task(first, &global()).unwrap();
        assert_eq!(task.title, "Task 1");
        assert_eq!(task.date.as_deref(), Some("2023-05-06"));
        assert_eq!(task.time.as_deref(), Some("18:00"));
        assert_eq!(task.next_task_ids, vec![second]);

        let err = db.delete_task(second, &global()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DependencyBlocksDelete);

        let unlink = TaskPatch {
            next_task_ids: Some(vec![]),
            ..TaskPatch::default()
        };
        db.update_task(first, &unlink, &global()).unwrap();
        db.delete_task(second, &global()).unwrap();

        let remaining = db.list_tasks(&global()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].next_task_ids.is_empty());
    }
}

mod user_tests {
    use super::*;
    use tasklist_server::error::AuthError;
    use tasklist_server::types::User;

    fn user(name: &str) -> User {
        User {
            username: name.to_string(),
            fullname: "Full Name".to_string(),
            email: format!("{}@example.com", name),
            password_hash: vec![1, 2, 3],
            salt: vec![9; 10],
        }
    }

    #[test]
    fn insert_and_get_user() {
        let db = setup_db();
        db.insert_user(&user("alice")).unwrap();

        let stored = db.get_user("alice").unwrap().unwrap();
        assert_eq!(stored, user("alice"));
        assert!(db.get_user("bob").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = setup_db();
        db.insert_user(&user("alice")).unwrap();

        let err = db.insert_user(&user("alice")).unwrap_err();
        assert!(matches!(err, AuthError::UserExists(name) if name == "alice"));
    }
}
