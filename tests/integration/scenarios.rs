use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use steprun::routine;
use steprun::{OwnerId, Runtime, StateMask, StepSource, TaskGroup, TaskState};

fn last_i32(task: &steprun::Task) -> Option<i32> {
    task.last_result_as::<i32>().map(|v| *v)
}

#[test]
fn test_three_step_task_completes() {
    let rt = Runtime::default();
    let a = rt.create(|| routine::values([1, 2, 3]));

    a.run().unwrap();
    for _ in 0..3 {
        rt.tick();
    }

    assert_eq!(a.state(), TaskState::Completed);
    assert_eq!(last_i32(&a), Some(3));
}

#[test]
fn test_all_combinator_over_short_and_long_task() {
    let rt = Runtime::default();
    let a = rt.create(|| routine::values([1, 2]));
    let b = rt.create(|| routine::values([1, 2, 3, 4, 5]));
    let mut all = routine::all_of([&a, &b]);

    a.run().unwrap();
    b.run().unwrap();

    rt.tick();
    rt.tick();
    assert!(a.is_completed());
    assert!(all.poll().unwrap());

    for _ in 0..3 {
        rt.tick();
    }
    assert!(!all.poll().unwrap());
}

#[test]
fn test_owner_deactivated_then_removed() {
    let rt = Runtime::default();
    let owner = OwnerId::new(1);
    let c = rt
        .builder()
        .owner(owner)
        .start(|| routine::values(0..100))
        .unwrap();

    rt.owner_deactivated(owner).unwrap();
    assert_eq!(c.state(), TaskState::Stopped);

    rt.owner_removed(owner).unwrap();
    assert_eq!(c.owner(), None);
    assert_eq!(c.state(), TaskState::Stopped);
    assert!(rt.contains(c.id()));
}

#[test]
fn test_group_run_fires_once() {
    let rt = Runtime::default();
    let fired = Arc::new(AtomicUsize::new(0));
    let mut group: TaskGroup = vec![
        rt.create(|| routine::values([1, 2])),
        rt.create(|| routine::values([1, 2])),
    ]
    .into_iter()
    .collect();

    let counter = fired.clone();
    group.on_run(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert!(group.is_reset());
    assert!(group.run().is_ok());
    assert!(group.iter().all(|task| task.state() == TaskState::Running));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_destroyed_task_leaves_every_index() {
    let rt = Runtime::default();
    let owner = OwnerId::new(2);
    let task = rt.builder().owner(owner).start(|| routine::values([1, 2])).unwrap();

    task.destroy().unwrap();

    assert!(!rt.contains(task.id()));
    assert!(rt.tasks(StateMask::ALL).is_empty());
    assert!(rt.tasks_of(owner, StateMask::ALL).is_err());
    assert!(task.run().is_err());
    assert!(task.reset().is_err());
    assert!(task.set_owner(owner).is_err());
    assert!(!rt.contains(task.id()));
}

#[test]
fn test_reset_then_run_replays_from_start() {
    let rt = Runtime::default();
    let task = rt.start(|| routine::values([10, 20, 30])).unwrap();
    rt.tick();
    assert_eq!(last_i32(&task), Some(20));

    task.reset().unwrap();
    assert!(task.last_result().is_none());

    task.run().unwrap();
    assert_eq!(last_i32(&task), Some(10));
    rt.tick();
    rt.tick();
    assert_eq!(last_i32(&task), Some(30));
    rt.tick();
    assert!(task.is_completed());
}

#[test]
fn test_auto_destroy_within_completing_tick() {
    let rt = Runtime::default();
    let fleeting = rt.start(|| routine::values([1])).unwrap();
    fleeting.set_auto_destroy(true);
    let kept = rt.start(|| routine::values([1])).unwrap();

    let report = rt.tick();
    assert_eq!(report.completed, vec![fleeting.id(), kept.id()]);
    assert!(fleeting.is_destroyed());
    assert!(kept.is_completed());

    for _ in 0..10 {
        rt.tick();
    }
    assert!(kept.is_completed());
}
