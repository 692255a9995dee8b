//! Linked buffer trigger tests for quark-kernel

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;
use quark_core::{Error, Priority, TimeBase};
use quark_kernel::{EventInfo, LinkMode, Scheduler, Signals, TaskConfig, Trigger};

type Ring = Mutex<RefCell<Deque<u32, 4>>>;
type Sched<'a> = Scheduler<'a, u32, 4, 2>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Seen {
    trigger: Trigger,
    front: Option<u32>,
    count: Option<usize>,
}

std::thread_local! {
    static SEEN: RefCell<Vec<Seen>> = RefCell::new(Vec::new());
}

fn seen() -> Vec<Seen> {
    SEEN.with(|s| core::mem::take(&mut *s.borrow_mut()))
}

fn observe(_sched: &mut Sched<'_>, info: &EventInfo<'_, u32>) {
    let entry = Seen {
        trigger: info.trigger,
        front: info.event_data.value(),
        count: info.event_data.buffer().map(|buffer| buffer.count()),
    };
    SEEN.with(|s| s.borrow_mut().push(entry));
}

fn ring() -> Ring {
    Mutex::new(RefCell::new(Deque::new()))
}

fn push(ring: &Ring, value: u32) {
    critical_section::with(|cs| ring.borrow_ref_mut(cs).push_back(value).unwrap());
}

fn len(ring: &Ring) -> usize {
    critical_section::with(|cs| ring.borrow_ref(cs).len())
}

#[test]
fn test_auto_pop_delivers_then_pops_front() {
    let ring = ring();
    let signals = Signals::new();
    let mut sched: Sched<'_> = Scheduler::new(&signals, TimeBase::MILLIS, None);
    let id = sched.add_event_task(observe, Priority::new(1), None).unwrap();
    sched.link_buffer(id, &ring, LinkMode::AutoPop).unwrap();

    push(&ring, 7);
    push(&ring, 8);
    assert!(sched.cycle());
    assert_eq!(len(&ring), 1);
    assert!(sched.cycle());
    assert_eq!(len(&ring), 0);
    assert!(!sched.cycle());

    let seen = seen();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|s| s.trigger == Trigger::BufferPop && s.count.is_none()));
    assert_eq!(seen[0].front, Some(7));
    assert_eq!(seen[1].front, Some(8));
}

#[test]
fn test_buffer_modes_accumulate_in_fixed_order() {
    let ring = ring();
    let signals = Signals::new();
    let mut sched: Sched<'_> = Scheduler::new(&signals, TimeBase::MILLIS, None);
    let id = sched.add_event_task(observe, Priority::new(1), None).unwrap();

    assert_eq!(
        sched.link_buffer(id, &ring, LinkMode::Count(0)),
        Err(Error::InvalidArgument)
    );
    assert!(!sched.task(id).unwrap().has_buffer());

    sched.link_buffer(id, &ring, LinkMode::Count(2)).unwrap();
    sched.link_buffer(id, &ring, LinkMode::Empty).unwrap();
    assert!(sched.cycle());

    push(&ring, 1);
    assert!(!sched.cycle());
    push(&ring, 2);
    assert!(sched.cycle());

    sched.link_buffer(id, &ring, LinkMode::Full).unwrap();
    push(&ring, 3);
    push(&ring, 4);
    assert!(sched.cycle());

    let seen: Vec<(Trigger, Option<usize>)> = seen().iter().map(|s| (s.trigger, s.count)).collect();
    assert_eq!(
        seen,
        [
            (Trigger::BufferEmpty, Some(0)),
            (Trigger::BufferCount, Some(2)),
            (Trigger::BufferFull, Some(4)),
        ]
    );
    // Only auto-pop consumes elements.
    assert_eq!(len(&ring), 4);

    sched.unlink_buffer(id).unwrap();
    assert!(!sched.cycle());
}

#[test]
fn test_deadline_takes_precedence_over_buffer() {
    let ring = ring();
    let signals = Signals::new();
    let mut sched: Sched<'_> = Scheduler::new(&signals, TimeBase::MILLIS, None);
    let id = sched.add_task(observe, TaskConfig::new(Priority::new(1))).unwrap();
    sched.link_buffer(id, &ring, LinkMode::AutoPop).unwrap();

    push(&ring, 5);
    assert!(sched.cycle());
    sched.set_enabled(id, false).unwrap();
    assert!(sched.cycle());

    let seen: Vec<(Trigger, Option<u32>)> = seen().iter().map(|s| (s.trigger, s.front)).collect();
    assert_eq!(seen, [(Trigger::TimeElapsed, None), (Trigger::BufferPop, Some(5))]);
    assert_eq!(len(&ring), 0);
}
