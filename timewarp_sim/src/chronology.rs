//! Chronologies - the scripted passage of simulated time.
//!
//! A chronology is a pull-based stream of step lengths (seconds). The
//! virtual clock pulls a step whenever simulated time reaches the current
//! threshold, and pulling is where the simulated world gets to react: any
//! side effect performed while producing a step happens "at" the threshold
//! that was just crossed.

use std::collections::VecDeque;

/// Producer of the next simulated delay.
///
/// Every `Iterator<Item = f64>` is a chronology, so plain vectors,
/// `std::iter::repeat` and `std::iter::from_fn` closures all work.
pub trait Chronology {
    /// Produces the next step in seconds, or `None` once exhausted.
    fn next_step(&mut self) -> Option<f64>;
}

impl<I> Chronology for I
where
    I: Iterator<Item = f64>,
{
    fn next_step(&mut self) -> Option<f64> {
        self.next()
    }
}

type Setup = Box<dyn FnOnce() + Send>;
type Action = Box<dyn FnMut(f64) + Send>;

/// Scripted chronology: "wait `d` seconds, then do something".
///
/// The first pull runs the setup hook and yields the first wait. Each later
/// pull runs the action whose wait has just elapsed and yields the following
/// wait. Actions receive the simulated time they are scheduled for.
///
/// ```ignore
/// let timeline = Timeline::new()
///     .setup(move || world.reset())
///     .after(5.0, move |t| world.bring_up(t))
///     .then_idle(60.0);
/// ```
pub struct Timeline {
    /// Runs on the first pull
    setup: Option<Setup>,

    /// Remaining (wait, action) pairs
    events: VecDeque<(f64, Action)>,

    /// Action armed by the last yielded wait, with its scheduled time
    armed: Option<(f64, Action)>,

    /// Step repeated forever once the script runs out
    idle: Option<f64>,

    /// Sum of all waits yielded so far
    elapsed: f64,

    started: bool,
}

impl Timeline {
    /// Creates an empty timeline.
    pub fn new() -> Self {
        Self {
            setup: None,
            events: VecDeque::new(),
            armed: None,
            idle: None,
            elapsed: 0.0,
            started: false,
        }
    }

    /// Sets the hook run when the clock is constructed.
    pub fn setup<F>(mut self, setup: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.setup = Some(Box::new(setup));
        self
    }

    /// Appends an event that fires `wait` seconds after the previous one.
    pub fn after<F>(mut self, wait: f64, action: F) -> Self
    where
        F: FnMut(f64) + Send + 'static,
    {
        self.events.push_back((wait, Box::new(action)));
        self
    }

    /// Keeps yielding `step` after the last event instead of running dry.
    pub fn then_idle(mut self, step: f64) -> Self {
        self.idle = Some(step);
        self
    }

    /// Number of events not yet fired.
    pub fn pending(&self) -> usize {
        self.events.len() + usize::from(self.armed.is_some())
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Timeline {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if !self.started {
            self.started = true;
            if let Some(setup) = self.setup.take() {
                setup();
            }
        } else if let Some((at, mut action)) = self.armed.take() {
            action(at);
        }

        let step = match self.events.pop_front() {
            Some((wait, action)) => {
                self.armed = Some((self.elapsed + wait, action));
                wait
            }
            None => self.idle?,
        };
        self.elapsed += step;
        Some(step)
    }
}

/// Fixed-rate chronology, optionally notifying each completed tick.
///
/// Tick `k` (1-based) is reported when the clock crosses `k * step`.
pub struct Periodic {
    step: f64,
    ticks: u64,
    on_tick: Option<Box<dyn FnMut(u64) + Send>>,
}

impl Periodic {
    /// Creates a ticker with the given period in seconds.
    pub fn new(step: f64) -> Self {
        Self {
            step,
            ticks: 0,
            on_tick: None,
        }
    }

    /// Registers a callback fired for every completed tick.
    pub fn on_tick<F>(mut self, callback: F) -> Self
    where
        F: FnMut(u64) + Send + 'static,
    {
        self.on_tick = Some(Box::new(callback));
        self
    }

    /// Number of steps handed out so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Iterator for Periodic {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.ticks > 0 {
            if let Some(callback) = self.on_tick.as_mut() {
                callback(self.ticks);
            }
        }
        self.ticks += 1;
        Some(self.step)
    }
}
