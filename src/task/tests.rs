#[cfg(test)]
mod tests {
    use crate::task::list::TaskList;
    use crate::task::types::{TaskRecord, TaskStatus};
    use chrono::{Duration, Utc};

    fn task(id: &str, priority: i32, deps: &[&str]) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            title: format!("Task {id}"),
            description: format!("Do the work for {id}"),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            status: TaskStatus::Pending,
            priority,
            started_at: None,
            completed_at: None,
            blocked_at: None,
            duration: None,
            error: None,
        }
    }

    #[test]
    fn test_status_transitions_and_duration() {
        let mut record = task("task_001", 5, &[]);
        let start = Utc::now();
        record.mark_started(start);
        record.mark_completed(start + Duration::milliseconds(1234));

        assert_eq!(record.status, TaskStatus::Completed);
        assert!(record.is_terminal());
        assert_eq!(record.duration, Some(1.23));
        assert!(record.completed_at.is_some());
        assert!(record.blocked_at.is_none());
    }

    #[test]
    fn test_blocked_records_reason() {
        let mut record = task("task_001", 5, &[]);
        let start = Utc::now();
        record.mark_started(start);
        record.mark_blocked(start + Duration::seconds(2), "timeout");

        assert_eq!(record.status, TaskStatus::Blocked);
        assert_eq!(record.error.as_deref(), Some("timeout"));
        assert_eq!(record.duration, Some(2.0));
    }

    #[test]
    fn test_validate_accepts_well_formed_list() {
        let records = vec![
            task("task_001", 1, &[]),
            task("task_002", 1, &["task_001"]),
            task("task_003", 1, &["task_001", "task_002"]),
        ];
        assert!(TaskList::validate_new(&records).is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let records = vec![task("task_001", 1, &[]), task("task_001", 1, &[])];
        let err = TaskList::validate_new(&records).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_validate_rejects_unknown_dependency() {
        let records = vec![task("task_001", 1, &["task_999"])];
        let err = TaskList::validate_new(&records).unwrap_err();
        assert!(err.to_string().contains("unknown task"));
    }

    #[test]
    fn test_validate_rejects_self_dependency() {
        let records = vec![task("task_001", 1, &["task_001"])];
        let err = TaskList::validate_new(&records).unwrap_err();
        assert!(err.to_string().contains("itself"));
    }

    #[test]
    fn test_validate_rejects_cycle() {
        let records = vec![
            task("task_001", 1, &["task_003"]),
            task("task_002", 1, &["task_001"]),
            task("task_003", 1, &["task_002"]),
        ];
        let err = TaskList::validate_new(&records).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_validate_rejects_non_pending_status() {
        let mut record = task("task_001", 1, &[]);
        record.status = TaskStatus::Completed;
        let err = TaskList::validate_new(&[record]).unwrap_err();
        assert!(err.to_string().contains("pending"));
    }

    #[test]
    fn test_selection_prefers_priority_then_order() {
        // priorities 1, 10, 5 -> expect index 1, then 2, then 0
        let list = TaskList::new(vec![
            task("task_a", 1, &[]),
            task("task_b", 10, &[]),
            task("task_c", 5, &[]),
        ]);
        assert_eq!(list.select_next(), Some(1));

        let mut list = list;
        let now = Utc::now();
        list.get_mut(1).unwrap().mark_started(now);
        list.get_mut(1).unwrap().mark_completed(now);
        assert_eq!(list.select_next(), Some(2));

        list.get_mut(2).unwrap().mark_started(now);
        list.get_mut(2).unwrap().mark_completed(now);
        assert_eq!(list.select_next(), Some(0));
    }

    #[test]
    fn test_selection_ties_break_by_array_order() {
        let list = TaskList::new(vec![task("task_a", 5, &[]), task("task_b", 5, &[])]);
        assert_eq!(list.select_next(), Some(0));
    }

    #[test]
    fn test_selection_honors_dependencies() {
        let mut list = TaskList::new(vec![
            task("task_a", 1, &[]),
            // higher priority but gated on task_a
            task("task_b", 10, &["task_a"]),
        ]);
        assert_eq!(list.select_next(), Some(0));

        let now = Utc::now();
        list.get_mut(0).unwrap().mark_started(now);
        list.get_mut(0).unwrap().mark_completed(now);
        assert_eq!(list.select_next(), Some(1));
    }

    #[test]
    fn test_blocked_dependency_makes_task_ineligible() {
        let mut list = TaskList::new(vec![task("task_a", 1, &[]), task("task_b", 1, &["task_a"])]);
        let now = Utc::now();
        list.get_mut(0).unwrap().mark_started(now);
        list.get_mut(0).unwrap().mark_blocked(now, "timeout");

        assert_eq!(list.select_next(), None);
        assert!(list.has_pending());

        let blocked = list.block_unreachable(now);
        assert_eq!(blocked, vec!["task_b".to_string()]);
        assert!(!list.has_pending());
        assert_eq!(
            list.find_by_id("task_b").unwrap().error.as_deref(),
            Some("dependency_blocked")
        );
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");

        let mut list = TaskList::new(vec![task("task_001", 3, &[]), task("task_002", 1, &["task_001"])]);
        let now = Utc::now();
        list.get_mut(0).unwrap().mark_started(now);
        list.get_mut(0).unwrap().mark_completed(now + Duration::seconds(1));

        list.save(&path).await.unwrap();
        let loaded = TaskList::load(&path).await.unwrap();
        assert_eq!(loaded, list);
        // atomic write leaves no temp file behind
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let err = TaskList::load(&path).await.unwrap_err();
        assert_eq!(err.kind(), "state");
    }

    #[test]
    fn test_settled_count_and_status_counts() {
        let mut list = TaskList::new(vec![
            task("task_a", 1, &[]),
            task("task_b", 1, &[]),
            task("task_c", 1, &[]),
        ]);
        let now = Utc::now();
        list.get_mut(0).unwrap().mark_started(now);
        list.get_mut(0).unwrap().mark_completed(now);
        list.get_mut(1).unwrap().mark_started(now);
        list.get_mut(1).unwrap().mark_blocked(now, "nonzero_exit");

        assert_eq!(list.settled_count(), 2);
        assert_eq!(list.count_with_status(TaskStatus::Completed), 1);
        assert_eq!(list.count_with_status(TaskStatus::Blocked), 1);
        assert_eq!(list.count_with_status(TaskStatus::Pending), 1);
    }
}
