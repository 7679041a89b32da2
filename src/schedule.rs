//! Repeat-with-delay scheduling.
//!
//! `Repeater` runs a cycle, sleeps a fixed interval, and repeats until a stop
//! flag is raised or an optional iteration limit is reached. Time comes from a
//! `Clock` so tests can run many cycles without sleeping.

use chrono::{DateTime, Local};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const SLEEP_SLICE: Duration = Duration::from_secs(1);

pub trait Clock {
    fn now(&self) -> DateTime<Local>;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `chrono::Local` and `std::thread::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when slept on.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<DateTime<Local>>,
    slept: Cell<Duration>,
}

impl ManualClock {
    pub fn starting_at(start: DateTime<Local>) -> Self {
        Self {
            now: Cell::new(start),
            slept: Cell::new(Duration::ZERO),
        }
    }

    /// Total time slept so far.
    pub fn slept(&self) -> Duration {
        self.slept.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        let step = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
        self.now.set(self.now.get() + step);
        self.slept.set(self.slept.get() + duration);
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Repeater {
    interval: Duration,
}

impl Repeater {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `cycle` until `stop` is set or `limit` iterations have run.
    ///
    /// The interval is slept between iterations, not after the last one of a
    /// bounded run. Sleep happens in short slices so a stop request is seen
    /// within about a second. Returns the number of iterations run.
    pub fn run<C, F>(&self, clock: &C, stop: &AtomicBool, limit: Option<u64>, mut cycle: F) -> u64
    where
        C: Clock + ?Sized,
        F: FnMut(),
    {
        let mut iterations = 0u64;
        loop {
            if stop.load(Ordering::SeqCst) {
                return iterations;
            }
            cycle();
            iterations += 1;

            if limit.is_some_and(|limit| iterations >= limit) {
                return iterations;
            }
            if !self.pause(clock, stop) {
                return iterations;
            }
        }
    }

    /// Sleep one interval. Returns false if interrupted by `stop`.
    fn pause<C: Clock + ?Sized>(&self, clock: &C, stop: &AtomicBool) -> bool {
        let mut remaining = self.interval;
        while !remaining.is_zero() {
            if stop.load(Ordering::SeqCst) {
                return false;
            }
            let step = remaining.min(SLEEP_SLICE);
            clock.sleep(step);
            remaining -= step;
        }
        !stop.load(Ordering::SeqCst)
    }
}
