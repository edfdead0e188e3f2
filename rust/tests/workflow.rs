use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use tasksched::{
    dependency_order, export_to_path, import_from_path, rank_by_urgency, resolve, GraphError,
    NewTask, OptimizeOptions, Priority, ResolverConfig, Scheduler, SchedulerError,
    SchedulingConfig, ScoringMode, Task, TaskStore, TaskUpdate,
};

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

fn dt(day: u32, h: u32, m: u32) -> NaiveDateTime {
    d(day).and_hms_opt(h, m, 0).unwrap()
}

fn project_store() -> TaskStore {
    let mut store = TaskStore::new();
    store
        .add(NewTask::new("draft").duration(120).priority(Priority::High))
        .unwrap();
    store
        .add(NewTask::new("review").duration(60).depends_on("task_0"))
        .unwrap();
    store
        .add(
            NewTask::new("publish")
                .duration(30)
                .depends_on("task_1")
                .deadline(dt(11, 12, 0)),
        )
        .unwrap();
    store
        .add(NewTask::new("inbox").duration(240).priority(Priority::Low))
        .unwrap();
    store
        .add(NewTask::new("retro").duration(90).tag("team"))
        .unwrap();
    store
}

#[test]
fn optimize_respects_dependencies_and_work_hours() {
    let mut store = project_store();
    let scheduled = Scheduler::default()
        .optimize(&mut store, &OptimizeOptions::starting(d(10)))
        .unwrap();

    let plan: Vec<(&str, NaiveDateTime, NaiveDateTime)> = scheduled
        .iter()
        .map(|s| (s.task_id.as_str(), s.start_time, s.end_time))
        .collect();
    assert_eq!(
        plan,
        vec![
            ("task_0", dt(10, 9, 0), dt(10, 11, 0)),
            ("task_3", dt(10, 11, 15), dt(10, 15, 15)),
            ("task_4", dt(10, 15, 30), dt(10, 17, 0)),
            ("task_1", dt(10, 17, 15), dt(10, 18, 15)),
            ("task_2", dt(11, 9, 0), dt(11, 9, 30)),
        ]
    );

    let order = dependency_order(store.tasks()).unwrap();
    for task in store.tasks() {
        let pos = order.iter().position(|id| *id == task.id).unwrap();
        for dep in &task.dependencies {
            assert!(order.iter().position(|id| id == dep).unwrap() < pos);
        }
    }
}

#[test]
fn resolver_fixes_late_task_after_packing() {
    let mut store = project_store();
    let options = OptimizeOptions {
        resolve_conflicts: true,
        ..OptimizeOptions::starting(d(10))
    };
    let scheduled = Scheduler::default().optimize(&mut store, &options).unwrap();

    // review ended 18:15; it moves to the next morning and publish follows it
    assert_eq!(scheduled[3].task_id, "task_1");
    assert_eq!(scheduled[3].start_time, dt(11, 9, 0));
    assert_eq!(scheduled[4].start_time, dt(11, 10, 15));

    // resolving an already resolved plan changes nothing
    let mut copies: Vec<Task> = scheduled
        .iter()
        .map(|s| store.get(&s.task_id).unwrap().clone())
        .collect();
    let again = resolve(copies.iter_mut(), &ResolverConfig::default()).unwrap();
    assert_eq!(again, scheduled);
}

#[test]
fn snapshot_round_trip_keeps_schedule_and_counter() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");

    let mut store = project_store();
    Scheduler::default()
        .optimize(&mut store, &OptimizeOptions::starting(d(10)))
        .unwrap();
    store.mark_completed("task_0").unwrap();
    store.delete("task_4").unwrap();
    export_to_path(&store, &path).unwrap();

    let mut restored = TaskStore::new();
    import_from_path(&mut restored, &path).unwrap();
    assert_eq!(restored.tasks(), store.tasks());
    assert_eq!(restored.next_id(), 4);
    assert_eq!(restored.add(NewTask::new("next")).unwrap().id, "task_4");

    let stats = restored.statistics(dt(1, 9, 0));
    assert_eq!(stats.total_tasks, 5);
    assert_eq!(stats.completion_rate, 20.0);
}

#[test]
fn cycle_introduced_by_update_blocks_scheduling() {
    let mut store = project_store();
    store
        .update(
            "task_0",
            vec![TaskUpdate::Dependencies(vec!["task_2".to_string()])],
        )
        .unwrap();

    let err = Scheduler::default()
        .optimize(&mut store, &OptimizeOptions::starting(d(10)))
        .unwrap_err();
    assert_eq!(
        err,
        SchedulerError::Graph(GraphError::Cycle(vec![
            "task_0".to_string(),
            "task_1".to_string(),
            "task_2".to_string(),
        ]))
    );
    assert!(err.to_string().contains("circular dependency"));
    assert!(store.tasks().iter().all(|t| t.start_time.is_none()));
}

#[test]
fn custom_hours_shift_the_plan() {
    let config = SchedulingConfig::new(Some(8), Some(12), Some(0), None).unwrap();
    let scheduler = Scheduler::new(config).unwrap();
    let mut store = TaskStore::new();
    for _ in 0..3 {
        store.add(NewTask::new("block").duration(120)).unwrap();
    }
    let scheduled = scheduler
        .optimize(&mut store, &OptimizeOptions::starting(d(10)))
        .unwrap();
    let starts: Vec<NaiveDateTime> = scheduled.iter().map(|s| s.start_time).collect();
    assert_eq!(starts, vec![dt(10, 8, 0), dt(10, 10, 0), dt(11, 8, 0)]);
}

#[test]
fn ranking_orders_by_score() {
    let store = project_store();
    let ranked = rank_by_urgency(store.tasks(), dt(11, 0, 0), ScoringMode::Detailed);
    let ids: Vec<&str> = ranked.iter().map(|(id, _)| id.as_str()).collect();
    // publish: 0.5 + 0.5 - 0.05 = 0.95; draft 0.8; review 0.45; retro 0.5; inbox 0.3
    assert_eq!(ids, vec!["task_2", "task_0", "task_4", "task_1", "task_3"]);
}
