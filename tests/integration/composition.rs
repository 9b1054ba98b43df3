use std::fs;

use steprun::routine;
use steprun::util::config::{load_config, save_config, RuntimeConfig};
use steprun::{Runtime, Step, TaskGroup, TaskState, WaitCombinator};

#[test]
fn test_routine_waits_for_group() {
    let rt = Runtime::default();
    let workers: TaskGroup = (1..=3)
        .map(|n| rt.create(move || routine::values(0..n)))
        .collect();

    let group = workers.clone();
    let waiter = rt
        .builder()
        .name("waiter")
        .spawn(move || {
            routine::from_iter([
                Step::wait(group.wait_for_completed()),
                Step::value("done"),
            ])
        });

    workers.run();
    waiter.run().unwrap();
    assert!(waiter.last_result().is_none());

    for _ in 0..2 {
        rt.tick();
        assert!(waiter.last_result().is_none());
    }

    // Workers are polled before the waiter, so it resumes on the tick the
    // last worker completes.
    rt.tick();
    assert!(workers.is_completed());
    assert_eq!(*waiter.last_result_as::<&'static str>().unwrap(), "done");

    rt.tick();
    assert_eq!(waiter.state(), TaskState::Completed);
}

#[test]
fn test_routine_waits_for_any_of_ticks() {
    let rt = Runtime::default();
    let task = rt
        .start(|| {
            routine::from_iter([
                Step::wait(WaitCombinator::any([routine::ticks(2), routine::ticks(6)])),
                Step::value(1u32),
            ])
        })
        .unwrap();

    rt.tick();
    rt.tick();
    assert!(task.last_result().is_none());
    rt.tick();
    assert_eq!(*task.last_result_as::<u32>().unwrap(), 1);
}

#[test]
fn test_task_as_wait_member() {
    let rt = Runtime::default();
    let inner = rt.create(|| routine::values([1, 2]));
    let handle = inner.clone();
    let outer = rt
        .start(move || routine::from_iter([Step::wait(handle.clone()), Step::value(99)]))
        .unwrap();

    rt.tick();
    rt.tick();
    assert!(outer.last_result().is_none());

    inner.run().unwrap();
    rt.tick();
    rt.tick();
    assert!(inner.is_completed());
    assert_eq!(*outer.last_result_as::<i32>().unwrap(), 99);
}

#[test]
fn test_runtime_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("steprun").join("runtime.ron");

    assert_eq!(load_config(&path).unwrap(), RuntimeConfig::default());

    let config = RuntimeConfig {
        name_prefix: "Co".to_string(),
        default_auto_destroy: true,
        trace_steps: false,
    };
    save_config(&path, &config).unwrap();
    assert!(fs::read_to_string(&path).unwrap().contains("name_prefix"));

    let rt = Runtime::new(load_config(&path).unwrap());
    let task = rt.start(|| routine::values([1])).unwrap();
    assert_eq!(task.name(), "Co(0)");

    rt.tick();
    assert!(task.is_destroyed());
    assert!(rt.is_empty());
}
