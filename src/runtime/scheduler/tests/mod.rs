//! Scheduler 单元测试
//!
//! 测试 tick 驱动、注册顺序、同一 tick 内的销毁与新建，以及运行时配置

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::routine;
use crate::runtime::{Runtime, Step, Task, TaskError, TaskState};
use crate::util::config::RuntimeConfig;
use crate::util::logger::{self, LogLevel};

fn runtime_with(config: RuntimeConfig) -> Runtime {
    Runtime::new(config)
}

#[cfg(test)]
mod tick_tests {
    use super::*;

    #[test]
    fn test_tick_report_counts() {
        let rt = Runtime::default();
        let short = rt.start(|| routine::values([1])).unwrap();
        let long = rt.start(|| routine::values([1, 2, 3])).unwrap();
        let idle = rt.create(|| routine::values([1]));

        let report = rt.tick();
        assert_eq!(report.tick, 1);
        assert_eq!(report.advanced, 2);
        assert_eq!(report.completed, vec![short.id()]);
        assert!(report.is_clean());

        let report = rt.tick();
        assert_eq!(report.tick, 2);
        assert_eq!(report.advanced, 1);
        assert!(report.completed.is_empty());

        assert_eq!(rt.ticks(), 2);
        assert!(long.is_running());
        assert!(idle.is_reset());
    }

    #[test]
    fn test_empty_tick() {
        let rt = Runtime::default();
        let report = rt.tick();
        assert_eq!(report.advanced, 0);
        assert!(report.completed.is_empty());
        assert!(rt.is_empty());
    }

    #[test]
    fn test_tasks_advance_in_registration_order() {
        let rt = Runtime::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["a", "b", "c"] {
            let order = order.clone();
            rt.start(move || {
                let order = order.clone();
                routine::from_fn(move || {
                    order.lock().push(label);
                    Ok(Some(Step::value(label)))
                })
            })
            .unwrap();
        }

        order.lock().clear();
        rt.tick();
        rt.tick();
        assert_eq!(*order.lock(), vec!["a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn test_fault_is_reported() {
        let rt = Runtime::default();
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let task = rt
            .start(move || {
                let counter = counter.clone();
                routine::from_fn(move || {
                    let mut calls = counter.lock();
                    *calls += 1;
                    if *calls > 1 {
                        return Err(TaskError::fault("boom"));
                    }
                    Ok(Some(Step::value(*calls)))
                })
            })
            .unwrap();

        let report = rt.tick();
        assert!(!report.is_clean());
        assert_eq!(report.completed, vec![task.id()]);
        assert!(matches!(
            report.faults.as_slice(),
            [TaskError::RoutineFault { task: id, .. }] if *id == task.id()
        ));
        assert_eq!(task.state(), TaskState::Completed);
        assert!(task.fault().is_some());

        // A completed task is never polled again.
        assert_eq!(rt.tick().advanced, 0);
        assert_eq!(*calls.lock(), 2);
    }
}

#[cfg(test)]
mod same_tick_tests {
    use super::*;

    #[test]
    fn test_listener_destroys_later_task() {
        let rt = Runtime::default();
        let first = rt.start(|| routine::values([1])).unwrap();
        let second = rt.start(|| routine::values([1, 2, 3])).unwrap();

        let victim = second.clone();
        first.on_completed(move |_| {
            let _ = victim.destroy();
        });

        let report = rt.tick();
        assert_eq!(report.advanced, 1);
        assert_eq!(report.completed, vec![first.id()]);
        assert!(second.is_destroyed());
        assert_eq!(*second.last_result_as::<i32>().unwrap(), 1);
        assert_eq!(rt.len(), 1);
    }

    #[test]
    fn test_listener_stops_later_task() {
        let rt = Runtime::default();
        let first = rt.start(|| routine::values([1])).unwrap();
        let second = rt.start(|| routine::values([1, 2, 3])).unwrap();

        let target = second.clone();
        first.on_completed(move |_| {
            let _ = target.stop();
        });

        rt.tick();
        assert!(second.is_stopped());
        assert_eq!(*second.last_result_as::<i32>().unwrap(), 1);
    }

    #[test]
    fn test_task_created_mid_tick_waits_for_next_tick() {
        let rt = Runtime::default();
        let child: Arc<OnceCell<Task>> = Arc::new(OnceCell::new());

        let handle = rt.clone();
        let slot = child.clone();
        rt.start(move || {
            let rt = handle.clone();
            let slot = slot.clone();
            let mut calls = 0;
            routine::from_fn(move || {
                calls += 1;
                if calls == 2 {
                    let spawned = rt.start(|| routine::values(0..5))?;
                    let _ = slot.set(spawned);
                }
                Ok((calls < 3).then(|| Step::value(calls)))
            })
        })
        .unwrap();

        let report = rt.tick();
        assert_eq!(report.advanced, 1);

        let child = child.get().unwrap();
        assert_eq!(*child.last_result_as::<i32>().unwrap(), 0);

        rt.tick();
        assert_eq!(*child.last_result_as::<i32>().unwrap(), 1);
        assert_eq!(rt.len(), 2);
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_name_prefix() {
        let rt = runtime_with(RuntimeConfig {
            name_prefix: "Job".to_string(),
            ..RuntimeConfig::default()
        });

        let first = rt.create(|| routine::values([1]));
        let named = rt.builder().name("loader").spawn(|| routine::values([1]));
        let third = rt.create(|| routine::values([1]));

        assert_eq!(first.name(), "Job(0)");
        assert_eq!(named.name(), "loader");
        assert_eq!(third.name(), "Job(2)");
    }

    #[test]
    fn test_default_auto_destroy() {
        let rt = runtime_with(RuntimeConfig {
            default_auto_destroy: true,
            ..RuntimeConfig::default()
        });

        let fleeting = rt.start(|| routine::values([1])).unwrap();
        let kept = rt
            .builder()
            .auto_destroy(false)
            .start(|| routine::values([1]))
            .unwrap();

        assert!(fleeting.auto_destroy());
        assert!(!kept.auto_destroy());

        rt.tick();
        assert!(fleeting.is_destroyed());
        assert!(kept.is_completed());
        assert_eq!(rt.tasks(crate::runtime::StateMask::ALL), vec![kept]);
    }

    #[test]
    fn test_trace_steps_with_subscriber() {
        let _ = logger::try_init_with_level(LogLevel::Debug);
        assert!(!logger::try_init_with_level(LogLevel::Debug));

        let rt = runtime_with(RuntimeConfig {
            trace_steps: true,
            ..RuntimeConfig::default()
        });
        let task = rt.start(|| routine::values([1, 2])).unwrap();
        rt.tick();
        rt.tick();
        assert!(task.is_completed());
    }

    #[test]
    fn test_global_runtime_is_shared() {
        assert!(std::ptr::eq(Runtime::global(), Runtime::global()));
        assert_eq!(Runtime::global().config(), &RuntimeConfig::default());
    }
}
