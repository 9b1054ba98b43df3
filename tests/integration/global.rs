use steprun::routine;
use steprun::{OwnerId, Runtime, StateMask, TaskState};

// The global runtime is process-wide, so everything touching it lives in one
// test.
#[test]
fn test_global_runtime_lifecycle() {
    let global = Runtime::global();
    global.clear();

    let owner = OwnerId::new(1000);
    let bound = steprun::create(|| routine::values([1, 2, 3]));
    bound.set_owner(owner).unwrap();
    let free = steprun::start(|| routine::values([1])).unwrap();

    assert_eq!(global.len(), 2);
    assert!(bound.run().unwrap().is_applied());

    let report = steprun::tick();
    assert_eq!(report.completed, vec![free.id()]);

    assert_eq!(steprun::owner_deactivated(owner).unwrap(), vec![bound.id()]);
    assert_eq!(bound.state(), TaskState::Stopped);
    assert_eq!(steprun::owner_removed(owner).unwrap(), vec![bound.id()]);
    assert_eq!(global.unowned(StateMask::STOPPED), vec![bound.clone()]);

    assert_eq!(global.clear(), 2);
    assert!(global.is_empty());
    assert!(bound.is_destroyed());
    assert!(free.is_destroyed());
}
