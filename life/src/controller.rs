use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::canvas::Canvas;
use crate::config::{Config, MAX_INTERVAL_MS};
use crate::error::{LifeError, Result};
use crate::grid::Life;
use crate::input::{translate, Command, InputEvent, InputState};
use crate::seed::SeedSource;

pub const TITLE: &str = "Game of Life";
const FPS_WINDOW: Duration = Duration::from_secs(1);
/// Longest single sleep of [`tick_shared`] before it re-reads the interval.
const WAIT_SLICE: Duration = Duration::from_millis(10);

/// Receives the canvas whenever its content changed.
pub trait FrameSink {
    fn repaint(&mut self, canvas: &Canvas);
}

pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub stepped: bool,
    pub redrawn: bool,
    /// The displayed fps value changed this tick.
    pub fps_refreshed: bool,
}

/// First half of a tick, returned by [`Controller::begin_tick`] and consumed
/// by [`Controller::finish_tick`] once [`Controller::delay`] has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    /// Nothing stepped; wait one pause quantum.
    Paused,
    /// Stepped, but frame skip drops the wait and the redraw.
    Skipped,
    /// Stepped; redraw once the interval has passed.
    Frame,
}

/// Drives a [`Life`] grid: steps it on a timer, mirrors it into a [`Canvas`],
/// and applies pointer commands.
pub struct Controller<S, C = SystemClock> {
    life: Life,
    canvas: Canvas,
    sink: S,
    clock: C,
    input: InputState,
    paused: bool,
    interval_ms: u64,
    pause_quantum: Duration,
    skip_every: u32,
    ticks: u32,
    frames: u32,
    last_measure: Instant,
    fps: Option<u32>,
}

impl<S: FrameSink> Controller<S> {
    /// Random grid from `config`, driven by the wall clock.
    pub fn new(config: &Config, sink: S) -> Result<Self> {
        let seeds = match config.seed {
            Some(seed) => SeedSource::new(seed),
            None => SeedSource::from_entropy(),
        };
        log::info!(
            "starting {}x{} grid with seed {}",
            config.width,
            config.height,
            seeds.seed()
        );
        let life = Life::random(config.width, config.height, config.density, seeds)?;
        Self::from_parts(life, config, sink, SystemClock)
    }
}

impl<S: FrameSink, C: Clock> Controller<S, C> {
    /// Wrap an existing grid. Grid dimensions in `config` are ignored.
    pub fn from_parts(life: Life, config: &Config, sink: S, clock: C) -> Result<Self> {
        if config.skip_every == 1 {
            return Err(LifeError::SkipsEveryTick);
        }
        let canvas = Canvas::new(life.width(), life.height(), config.scale)?;
        let last_measure = clock.now();
        let mut controller = Self {
            life,
            canvas,
            sink,
            clock,
            input: InputState::default(),
            paused: config.start_paused,
            interval_ms: config.interval_ms.min(MAX_INTERVAL_MS),
            pause_quantum: config.pause_quantum,
            skip_every: config.skip_every,
            ticks: 0,
            frames: 0,
            last_measure,
            fps: None,
        };
        controller.redraw_all();
        controller.sink.repaint(&controller.canvas);
        Ok(controller)
    }

    pub fn life(&self) -> &Life {
        &self.life
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn fps(&self) -> Option<u32> {
        self.fps
    }

    pub fn redraw_all(&mut self) {
        for y in 0..self.life.height() {
            for x in 0..self.life.width() {
                self.canvas.paint_cell(x, y, self.life.get(x, y));
            }
        }
    }

    pub fn redraw_cell(&mut self, x: usize, y: usize) {
        self.canvas.paint_cell(x, y, self.life.get(x, y));
    }

    /// One iteration of the simulation loop, sleeping on this thread.
    ///
    /// Paused: sleeps for the pause quantum and leaves the grid alone.
    /// Running: steps, then (unless frame skip drops this tick) sleeps for the
    /// interval, repaints the canvas and hands it to the sink.
    pub fn tick(&mut self) -> TickOutcome {
        let pending = self.begin_tick();
        self.clock.sleep(self.delay(pending));
        self.finish_tick(pending)
    }

    /// Step the grid unless paused. The caller waits [`Self::delay`] and then
    /// calls [`Self::finish_tick`]; input may be handled in between.
    pub fn begin_tick(&mut self) -> Pending {
        if self.paused {
            return Pending::Paused;
        }

        self.life.step();
        self.ticks = self.ticks.wrapping_add(1);
        if self.skip_every > 1 && self.ticks % self.skip_every == 0 {
            Pending::Skipped
        } else {
            Pending::Frame
        }
    }

    /// How long `pending` still has to wait in total, measured against the
    /// current interval so scrolling during the wait takes effect.
    pub fn delay(&self, pending: Pending) -> Duration {
        match pending {
            Pending::Paused => self.pause_quantum,
            Pending::Skipped => Duration::ZERO,
            Pending::Frame if self.paused => Duration::ZERO,
            Pending::Frame => Duration::from_millis(self.interval_ms),
        }
    }

    pub fn finish_tick(&mut self, pending: Pending) -> TickOutcome {
        let redrawn = match pending {
            Pending::Paused => return TickOutcome::default(),
            Pending::Skipped => false,
            Pending::Frame => {
                self.redraw_all();
                self.sink.repaint(&self.canvas);
                true
            }
        };

        TickOutcome {
            stepped: true,
            redrawn,
            fps_refreshed: !self.paused && self.measure_fps(),
        }
    }

    fn measure_fps(&mut self) -> bool {
        self.frames += 1;
        let now = self.clock.now();
        let elapsed = now.duration_since(self.last_measure);
        if elapsed < FPS_WINDOW {
            return false;
        }

        let fps = (f64::from(self.frames) / elapsed.as_secs_f64()).round() as u32;
        log::trace!("{fps} fps at generation {}", self.life.generation());
        self.fps = Some(fps);
        self.frames = 0;
        self.last_measure = now;
        true
    }

    fn set_paused(&mut self, paused: bool) {
        if self.paused == paused {
            return;
        }
        self.paused = paused;
        self.frames = 0;
        self.last_measure = self.clock.now();
        if paused {
            self.fps = None;
        }
        log::debug!(
            "{} at generation {}",
            if paused { "paused" } else { "resumed" },
            self.life.generation()
        );
    }

    /// Flip the pause flag and return the new status label.
    pub fn toggle_pause(&mut self) -> String {
        self.set_paused(!self.paused);
        self.status_label()
    }

    /// Negate one cell. Only effective while paused and in range.
    pub fn toggle_cell(&mut self, x: usize, y: usize) -> bool {
        if !self.paused || !self.life.contains(x, y) {
            return false;
        }
        let alive = !self.life.get(x, y);
        self.life.set(x, y, alive);
        self.redraw_cell(x, y);
        self.sink.repaint(&self.canvas);
        true
    }

    /// Refill the grid, either replaying the last seed or drawing a new one.
    /// The pause state is left as is.
    pub fn reseed(&mut self, reuse_seed: bool) {
        if let Some(seeds) = self.life.seeds_mut() {
            if reuse_seed {
                seeds.reuse();
            } else {
                seeds.renew();
            }
            log::debug!("reseeding with seed {}", seeds.seed());
        }
        self.life.reinitialize();
        self.redraw_all();
        self.sink.repaint(&self.canvas);
    }

    /// Change the interval by `delta_ms`, staying within `0..=MAX_INTERVAL_MS`.
    pub fn adjust_interval(&mut self, delta_ms: i64) -> u64 {
        self.interval_ms = self.interval_ms.saturating_add_signed(delta_ms).min(MAX_INTERVAL_MS);
        self.interval_ms
    }

    /// Translate and apply one input event. Returns the new status label when
    /// the displayed status changed.
    pub fn handle(&mut self, event: InputEvent) -> Option<String> {
        let command = translate(&event, &self.input, self.paused, &self.canvas);
        self.input.observe(&event, self.paused, &self.canvas);
        command.and_then(|command| self.apply(command))
    }

    pub fn apply(&mut self, command: Command) -> Option<String> {
        match command {
            Command::ToggleCell { x, y } => {
                self.toggle_cell(x, y);
                None
            }
            Command::ForcePause => {
                if self.paused {
                    return None;
                }
                self.set_paused(true);
                Some(self.status_label())
            }
            Command::ReseedAndResume => {
                self.reseed(false);
                self.set_paused(false);
                Some(self.status_label())
            }
            Command::TogglePause => Some(self.toggle_pause()),
            Command::ReseedReusedAndTogglePause => {
                self.reseed(true);
                Some(self.toggle_pause())
            }
            Command::AdjustInterval(delta_ms) => {
                self.adjust_interval(delta_ms);
                Some(self.status_label())
            }
        }
    }

    pub fn status_label(&self) -> String {
        let state = match (self.paused, self.fps) {
            (true, _) => "paused".to_string(),
            (false, Some(fps)) => format!("{fps} fps"),
            (false, None) => "running".to_string(),
        };
        format!(
            "{TITLE} - {state} - {} ms - generation {} - population {}",
            self.interval_ms,
            self.life.generation(),
            self.life.population()
        )
    }
}

/// Lock a controller shared between threads. A panic on the other side
/// leaves the grid consistent between steps, so poisoning is ignored.
pub fn lock<S, C>(shared: &Mutex<Controller<S, C>>) -> MutexGuard<'_, Controller<S, C>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// [`Controller::tick`] for a controller shared with an input thread.
///
/// The lock is held for the step and for the redraw only. The wait in
/// between sleeps unlocked, in slices, re-reading the delay after each one.
pub fn tick_shared<S: FrameSink, C: Clock + Clone>(shared: &Mutex<Controller<S, C>>) -> TickOutcome {
    let (pending, clock) = {
        let mut controller = lock(shared);
        (controller.begin_tick(), controller.clock.clone())
    };
    let started = clock.now();
    loop {
        let remaining = lock(shared)
            .delay(pending)
            .saturating_sub(clock.now().duration_since(started));
        if remaining.is_zero() {
            break;
        }
        clock.sleep(remaining.min(WAIT_SLICE));
    }
    lock(shared).finish_tick(pending)
}
