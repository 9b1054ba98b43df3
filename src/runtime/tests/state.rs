use crate::runtime::{ControlStatus, StateMask, TaskId, TaskIdGenerator, TaskState};

#[test]
fn test_task_id_display() {
    assert_eq!(TaskId(7).to_string(), "Task(7)");
    assert_eq!(usize::from(TaskId::from(3)), 3);
}

#[test]
fn test_id_generator_is_sequential() {
    let mut ids = TaskIdGenerator::new();
    assert_eq!(ids.next(), TaskId(0));
    assert_eq!(ids.next(), TaskId(1));
    assert_eq!(ids.next(), TaskId(2));
}

#[test]
fn test_mask_contains() {
    let mask = TaskState::Stopped | TaskState::Completed;
    assert!(mask.contains(TaskState::Stopped));
    assert!(mask.contains(TaskState::Completed));
    assert!(!mask.contains(TaskState::Running));
    assert!(!mask.contains(TaskState::Destroyed));
}

#[test]
fn test_mask_constants() {
    assert!(StateMask::NONE.is_empty());
    assert!(!StateMask::LIVE.contains(TaskState::Destroyed));
    assert_eq!(StateMask::ALL.states().count(), 5);
    assert_eq!(StateMask::LIVE | TaskState::Destroyed, StateMask::ALL);

    let mut mask = StateMask::RESET;
    mask |= StateMask::RUNNING;
    assert_eq!(
        mask.states().collect::<Vec<_>>(),
        vec![TaskState::Reset, TaskState::Running]
    );
}

#[test]
fn test_control_status_applied() {
    assert!(ControlStatus::Applied {
        from: TaskState::Reset,
        to: TaskState::Running,
    }
    .is_applied());
    assert!(!ControlStatus::AlreadyCompleted.is_applied());
    assert!(!ControlStatus::AlreadyInState(TaskState::Stopped).is_applied());
    assert!(!ControlStatus::Unchanged(TaskState::Reset).is_applied());
}
