//! Quark scheduler on a hosted target
//!
//! A background thread stands in for the 1 ms timer interrupt: it feeds the
//! tick counter and periodically signals an async event, exactly what an ISR
//! would do on a microcontroller. The main thread runs the cooperative
//! scheduler with:
//! - a periodic blink task that queues reports and finally releases the loop
//! - a burst task limited to a few iterations, re-armed by the blink task
//! - a traffic light driven by a state machine and software timers
//! - an event-only reporter fed by the ticker thread and the queue
//! - an idle callback that yields the CPU

use core::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::fmt;
use std::sync::OnceLock;
use std::thread;

use critical_section::Mutex;
use log::{info, warn};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

use quark_core::{duration, Clock, Duration, Error, Priority, SoftTimer, Tick, TimeBase};
use quark_fsm::{Hooks, StateMachine, Status};
use quark_kernel::{
    EventData, EventInfo, Interval, Iterations, Scheduler, Signals, TaskConfig, TaskId, TaskStateFn, Trigger,
};

const TASKS: usize = 8;
const QUEUE: usize = 8;

/// Blinks before the scheduler is released
const BLINKS: u32 = 20;

/// Ticks between two async events from the ticker thread
const REPORT_EVERY: u32 = 1_000;

type Sched = Scheduler<'static, u32, TASKS, QUEUE>;
type Info<'a> = EventInfo<'a, u32>;
type Light = StateMachine<Info<'static>>;

static SIGNALS: Signals<u32, TASKS, QUEUE> = Signals::new();
static TICKING: AtomicBool = AtomicBool::new(true);

static LED: Mutex<Cell<bool>> = Mutex::new(Cell::new(false));
static LIGHT_TIMER: Mutex<Cell<SoftTimer>> = Mutex::new(Cell::new(SoftTimer::new()));

static REPORTER: OnceLock<TaskId> = OnceLock::new();
static BURST: OnceLock<TaskId> = OnceLock::new();

/// Log timestamps in scheduler ticks
struct TickTime;

impl FormatTime for TickTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{:>6}", SIGNALS.now())
    }
}

/// Wall clock seen by software timers outside the scheduler
struct HostClock;

impl Clock for HostClock {
    fn now(&self) -> Tick {
        SIGNALS.now()
    }

    fn time_base(&self) -> TimeBase {
        TimeBase::MILLIS
    }
}

fn blink(sched: &mut Sched, info: &Info<'_>) {
    let on = critical_section::with(|cs| {
        let led = LED.borrow(cs);
        led.set(!led.get());
        led.get()
    });
    let Some(me) = sched.current_task() else {
        return;
    };
    let count = sched.cycles(me).unwrap_or(0) + 1;
    info!("blink {} led {}", count, if on { "on" } else { "off" });

    if count % 4 == 0 {
        if let Some(reporter) = REPORTER.get() {
            // Overflow is already reported by the scheduler.
            let _ = sched.queue_event(*reporter, count);
        }
    }

    if count == BLINKS / 2 {
        if let Some(burst) = BURST.get() {
            info!("re-arming burst");
            let _ = sched.set_iterations(*burst, Iterations::Times(3));
            let _ = sched.set_enabled(*burst, true);
        }
    }

    if count >= BLINKS && !info.first_call {
        sched.release();
    }
}

fn burst(_sched: &mut Sched, info: &Info<'_>) {
    info!(
        "burst first_iteration={} last_iteration={}",
        info.first_iteration, info.last_iteration
    );
}

fn report(_sched: &mut Sched, info: &Info<'_>) {
    match (info.trigger, info.event_data) {
        (Trigger::AsyncEvent, EventData::Payload(tick)) => info!("report: ticker at {}", tick),
        (Trigger::QueueExtraction, EventData::Payload(blinks)) => info!("report: {} blinks", blinks),
        (trigger, _) => warn!("report: unexpected trigger {}", trigger),
    }
}

fn phase(sm: &mut Light, name: &str, hold: Duration, next: TaskStateFn<'static, u32>) -> Status {
    if sm.is_first_entry() {
        info!("light {}", name);
    }
    let expired = critical_section::with(|cs| {
        let cell = LIGHT_TIMER.borrow(cs);
        let mut timer = cell.get();
        let expired = timer.free_run(&HostClock, hold);
        cell.set(timer);
        expired
    });
    if expired {
        sm.set_next_state(next);
    }
    Status::Success
}

fn red(sm: &mut Light) -> Status {
    phase(sm, "red", duration!(900 ms), green)
}

fn green(sm: &mut Light) -> Status {
    phase(sm, "green", duration!(700 ms), yellow)
}

fn yellow(sm: &mut Light) -> Status {
    phase(sm, "yellow", duration!(300 ms), red)
}

fn light_fault(sm: &mut Light) {
    warn!("traffic light stopped with {}", sm.previous_status());
}

fn idle(_sched: &mut Sched, info: &Info<'_>) {
    if info.first_call {
        info!("idle: nothing ready");
    }
    thread::sleep(std::time::Duration::from_micros(200));
}

fn released(sched: &mut Sched, info: &Info<'_>) {
    info!("scheduler released (first release: {})", info.first_call);
    for id in sched.chain() {
        if let Ok(task) = sched.task(id) {
            info!(
                "  task {} priority {} cycles {} state {:?}",
                id,
                task.priority(),
                task.cycles(),
                task.state()
            );
        }
    }
}

fn main() -> Result<(), Error> {
    // Records from the `log` facade are bridged into the subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_timer(TickTime)
        .with_target(false)
        .init();

    println!("Quark {} cooperative scheduler demo", quark_core::VERSION);

    let mut sched: Sched = Scheduler::new(&SIGNALS, TimeBase::MILLIS, Some(idle));
    sched.set_release_callback(Some(released));

    sched.add_task(
        blink,
        TaskConfig::new(Priority::new(2)).interval(Interval::Every(duration!(250 ms))),
    )?;
    let burst_id = sched.add_task(
        burst,
        TaskConfig::new(Priority::new(3))
            .interval(Interval::Every(duration!(100 ms)))
            .iterations(Iterations::Times(5)),
    )?;
    sched.add_state_machine_task(
        TaskConfig::new(Priority::new(1)).interval(Interval::Every(duration!(50 ms))),
        red,
        Hooks {
            on_failure: Some(light_fault),
            ..Hooks::none()
        },
    )?;
    let reporter = sched.add_event_task(report, Priority::new(4), None)?;

    let _ = BURST.set(burst_id);
    let _ = REPORTER.set(reporter);

    let ticker = thread::spawn(move || {
        while TICKING.load(Ordering::Relaxed) {
            thread::sleep(std::time::Duration::from_millis(1));
            SIGNALS.tick();
            let now = SIGNALS.now().raw();
            if now % REPORT_EVERY == 0 {
                let _ = SIGNALS.send_event(reporter, now);
            }
        }
    });

    sched.run();

    TICKING.store(false, Ordering::Relaxed);
    if ticker.join().is_err() {
        warn!("ticker thread panicked");
    }
    println!("done after {} ticks", SIGNALS.now());
    Ok(())
}
