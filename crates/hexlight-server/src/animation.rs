//! Light animation coordinator.
//!
//! Owns the light strip and arbitrates between the routines that paint it:
//!
//! - **Idle**: slow hue rotation across every unit while nothing else runs
//! - **Static paint**: one-shot write of each tile's resource color
//! - **Highlight**: matching units blink white after a roll
//! - **Alert**: every unit flashes red after the alert roll
//! - **Single flash**: one unit blinks white for a wiring test
//!
//! # Coordination
//!
//! Every frame write takes the strip lock, so at most one routine writes at
//! any instant. Admission is reject-when-busy: the alert flag refuses new
//! roll animations and single flashes, and the flashing set refuses a second
//! flash on the same unit. Both are released by a guard owned by the
//! background task, so an error or a panic inside the routine still frees
//! them.
//!
//! Routines restore units to their *resting* color, which is owned by the
//! strip and only changed by a static paint. A layout painted while a
//! highlight is running is therefore what the highlight restores to.

use crate::indicator::{IndicatorDriver, IndicatorError};
use dashmap::DashSet;
use hexlight_core::{hue_to_rgb, ColorPalette, Rgb, Tile};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Reasons a routine was not started
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnimationError {
    #[error("Alert animation in progress, please wait")]
    Busy,

    #[error("Unit {0} is already flashing")]
    AlreadyFlashing(usize),

    #[error("Tile {0} has no light (desert)")]
    NoIndicator(usize),

    #[error("Unit {unit} out of range (strip has {count} units)")]
    UnitOutOfRange { unit: usize, count: usize },
}

/// Frame timing for every routine
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTiming {
    /// Delay between idle frames
    pub idle_frame: Duration,
    /// Hue advance per idle frame (full wheel is 1.0)
    pub idle_hue_step: f32,
    /// How long a layout change waits for the idle task to exit
    pub idle_stop_grace: Duration,
    pub highlight_cycles: u32,
    pub highlight_on: Duration,
    pub highlight_off: Duration,
    pub alert_cycles: u32,
    pub alert_on: Duration,
    pub alert_off: Duration,
    pub flash_cycles: u32,
    pub flash_on: Duration,
    pub flash_off: Duration,
}

impl Default for AnimationTiming {
    fn default() -> Self {
        Self {
            idle_frame: Duration::from_millis(50),
            idle_hue_step: 0.01,
            idle_stop_grace: Duration::from_millis(100),
            highlight_cycles: 10,
            highlight_on: Duration::from_millis(300),
            highlight_off: Duration::from_millis(200),
            alert_cycles: 5,
            alert_on: Duration::from_millis(300),
            alert_off: Duration::from_millis(200),
            flash_cycles: 3,
            flash_on: Duration::from_millis(200),
            flash_off: Duration::from_millis(150),
        }
    }
}

impl AnimationTiming {
    pub fn highlight_duration(&self) -> Duration {
        (self.highlight_on + self.highlight_off) * self.highlight_cycles
    }

    pub fn alert_duration(&self) -> Duration {
        (self.alert_on + self.alert_off) * self.alert_cycles
    }

    pub fn flash_duration(&self) -> Duration {
        (self.flash_on + self.flash_off) * self.flash_cycles
    }
}

/// The strip and the color each unit returns to between animations
struct Strip {
    driver: Box<dyn IndicatorDriver>,
    resting: Vec<Rgb>,
}

impl Strip {
    fn unit_count(&self) -> usize {
        self.resting.len()
    }

    fn resting_color(&self, unit: usize) -> Rgb {
        self.resting.get(unit).copied().unwrap_or(Rgb::OFF)
    }

    /// Stage the given colors and latch them in one frame
    fn write<I>(&mut self, colors: I) -> Result<(), IndicatorError>
    where
        I: IntoIterator<Item = (usize, Rgb)>,
    {
        for (unit, color) in colors {
            self.driver.set_unit_color(unit, color)?;
        }
        self.driver.show()
    }

    /// Put the given units back to their resting colors
    fn restore(&mut self, units: &[usize]) -> Result<(), IndicatorError> {
        let colors: Vec<_> = units.iter().map(|&u| (u, self.resting_color(u))).collect();
        self.write(colors)
    }

    fn restore_all(&mut self) -> Result<(), IndicatorError> {
        let colors: Vec<_> = self.resting.iter().copied().enumerate().collect();
        self.write(colors)
    }
}

/// State shared with background routines
struct Shared {
    /// Single-writer token for the lights
    strip: Mutex<Strip>,
    alert_active: AtomicBool,
    flashing: DashSet<usize>,
    /// Highlight, alert and flash routines currently running
    active_routines: AtomicUsize,
    timing: AnimationTiming,
}

/// What a routine holds that must be given back when it ends
enum Claim {
    Alert,
    Flash(usize),
    Plain,
}

/// Marks a routine as running; releases its claim on drop, including
/// during a panic unwind.
struct RoutineGuard {
    shared: Arc<Shared>,
    claim: Claim,
}

impl RoutineGuard {
    fn enter(shared: &Arc<Shared>, claim: Claim) -> Self {
        shared.active_routines.fetch_add(1, Ordering::AcqRel);
        Self {
            shared: Arc::clone(shared),
            claim,
        }
    }
}

impl Drop for RoutineGuard {
    fn drop(&mut self) {
        match self.claim {
            Claim::Alert => self.shared.alert_active.store(false, Ordering::Release),
            Claim::Flash(unit) => {
                self.shared.flashing.remove(&unit);
            }
            Claim::Plain => {}
        }
        self.shared.active_routines.fetch_sub(1, Ordering::AcqRel);
    }
}

struct IdleTask {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Owner of the light strip.
///
/// Start methods for background routines return as soon as the routine is
/// admitted; they must be called from within a tokio runtime.
pub struct AnimationCoordinator {
    shared: Arc<Shared>,
    palette: ColorPalette,
    idle: Mutex<Option<IdleTask>>,
}

impl AnimationCoordinator {
    pub fn new(driver: Box<dyn IndicatorDriver>, timing: AnimationTiming) -> Self {
        let units = driver.unit_count();
        Self {
            shared: Arc::new(Shared {
                strip: Mutex::new(Strip {
                    driver,
                    resting: vec![Rgb::OFF; units],
                }),
                alert_active: AtomicBool::new(false),
                flashing: DashSet::new(),
                active_routines: AtomicUsize::new(0),
                timing,
            }),
            palette: ColorPalette::standard(),
            idle: Mutex::new(None),
        }
    }

    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    pub fn timing(&self) -> &AnimationTiming {
        &self.shared.timing
    }

    pub fn unit_count(&self) -> usize {
        self.shared.strip.lock().unit_count()
    }

    pub fn is_alert_active(&self) -> bool {
        self.shared.alert_active.load(Ordering::Acquire)
    }

    pub fn is_flashing(&self, unit: usize) -> bool {
        self.shared.flashing.contains(&unit)
    }

    pub fn is_idle_running(&self) -> bool {
        self.idle
            .lock()
            .as_ref()
            .is_some_and(|task| task.running.load(Ordering::Acquire) && !task.handle.is_finished())
    }

    /// Colors units return to after an animation
    pub fn resting_colors(&self) -> Vec<Rgb> {
        self.shared.strip.lock().resting.clone()
    }

    // ==================== Idle ====================

    /// Start the hue rotation. No-op if it is already running.
    pub fn start_idle(&self) {
        let mut idle = self.idle.lock();
        if let Some(task) = idle.as_ref() {
            if task.running.load(Ordering::Acquire) && !task.handle.is_finished() {
                return;
            }
        }

        let running = Arc::new(AtomicBool::new(true));
        let handle = tokio::spawn(run_idle(Arc::clone(&self.shared), Arc::clone(&running)));
        *idle = Some(IdleTask { running, handle });
        debug!("idle animation started");
    }

    /// Signal the idle loop to stop and wait up to the grace period for it to
    /// exit. No-op if it is not running.
    pub async fn stop_idle(&self) {
        let task = self.idle.lock().take();
        let Some(task) = task else {
            return;
        };
        task.running.store(false, Ordering::Release);

        let grace = self.shared.timing.idle_stop_grace;
        if tokio::time::timeout(grace, task.handle).await.is_err() {
            warn!(?grace, "idle animation did not stop within grace period");
        }
    }

    // ==================== Static paint ====================

    /// Make each tile's resource color the resting color of its unit and
    /// show it. Driver failures are logged, never returned.
    ///
    /// Any idle task is cancelled first, including one started while the
    /// caller was waiting in [`AnimationCoordinator::stop_idle`].
    pub fn paint_static(&self, tiles: &[Tile]) {
        if let Some(task) = self.idle.lock().take() {
            task.running.store(false, Ordering::Release);
            debug!("idle animation cancelled by static paint");
        }

        // Idle re-checks its flag under this lock, so nothing follows the paint
        let mut strip = self.shared.strip.lock();
        let count = strip.unit_count();

        for tile in tiles {
            let Some(unit) = tile.unit else { continue };
            match strip.resting.get_mut(unit) {
                Some(slot) => *slot = self.palette.color_or_off(tile.terrain),
                None => warn!(unit, count, "tile wired to a missing unit"),
            }
        }

        if let Err(e) = strip.restore_all() {
            warn!(error = %e, "static paint failed");
        }
    }

    // ==================== Roll animations ====================

    /// Blink the given units white, returning them to their resting colors
    /// between blinks and at the end.
    pub fn start_highlight(&self, units: Vec<usize>) -> Result<(), AnimationError> {
        if self.is_alert_active() {
            return Err(AnimationError::Busy);
        }
        self.check_units(&units)?;
        if units.is_empty() {
            debug!("highlight requested with no matching units");
            return Ok(());
        }

        let guard = RoutineGuard::enter(&self.shared, Claim::Plain);
        let shared = Arc::clone(&self.shared);
        debug!(?units, "highlight started");
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = run_highlight(&shared, &units).await {
                warn!(error = %e, "highlight aborted");
            }
        });
        Ok(())
    }

    /// Flash every unit red, then restore resting colors.
    pub fn start_alert(&self) -> Result<(), AnimationError> {
        self.shared
            .alert_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AnimationError::Busy)?;

        let guard = RoutineGuard::enter(&self.shared, Claim::Alert);
        let shared = Arc::clone(&self.shared);
        debug!("alert started");
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = run_alert(&shared).await {
                warn!(error = %e, "alert aborted");
            }
        });
        Ok(())
    }

    // ==================== Single flash ====================

    /// Blink one unit white for a wiring check.
    pub fn start_single_flash(&self, unit: usize) -> Result<(), AnimationError> {
        if self.is_alert_active() {
            return Err(AnimationError::Busy);
        }
        self.check_units(&[unit])?;
        if !self.shared.flashing.insert(unit) {
            return Err(AnimationError::AlreadyFlashing(unit));
        }

        let guard = RoutineGuard::enter(&self.shared, Claim::Flash(unit));
        let shared = Arc::clone(&self.shared);
        debug!(unit, "single flash started");
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = run_single_flash(&shared, unit).await {
                warn!(unit, error = %e, "single flash aborted");
            }
        });
        Ok(())
    }

    fn check_units(&self, units: &[usize]) -> Result<(), AnimationError> {
        let count = self.unit_count();
        match units.iter().find(|&&u| u >= count) {
            Some(&unit) => Err(AnimationError::UnitOutOfRange { unit, count }),
            None => Ok(()),
        }
    }
}

impl Drop for AnimationCoordinator {
    fn drop(&mut self) {
        if let Some(task) = self.idle.get_mut().take() {
            task.running.store(false, Ordering::Release);
        }
    }
}

async fn run_idle(shared: Arc<Shared>, running: Arc<AtomicBool>) {
    let timing = &shared.timing;
    let mut hue = 0.0_f32;

    loop {
        {
            // The stop flag is checked under the strip lock: once a painter
            // holds the lock after stop_idle, no idle frame can follow it.
            let mut strip = shared.strip.lock();
            if !running.load(Ordering::Acquire) {
                break;
            }
            if shared.active_routines.load(Ordering::Acquire) == 0 {
                let count = strip.unit_count();
                let frame: Vec<_> = (0..count)
                    .map(|u| (u, hue_to_rgb(hue + u as f32 / count as f32)))
                    .collect();
                if let Err(e) = strip.write(frame) {
                    warn!(error = %e, "idle animation stopped by driver error");
                    break;
                }
            }
        }

        hue = (hue + timing.idle_hue_step).rem_euclid(1.0);
        sleep(timing.idle_frame).await;
    }

    debug!("idle animation stopped");
}

async fn run_highlight(shared: &Shared, units: &[usize]) -> Result<(), IndicatorError> {
    let timing = &shared.timing;
    for _ in 0..timing.highlight_cycles {
        shared
            .strip
            .lock()
            .write(units.iter().map(|&u| (u, Rgb::WHITE)))?;
        sleep(timing.highlight_on).await;

        shared.strip.lock().restore(units)?;
        sleep(timing.highlight_off).await;
    }
    Ok(())
}

async fn run_alert(shared: &Shared) -> Result<(), IndicatorError> {
    let timing = &shared.timing;
    for _ in 0..timing.alert_cycles {
        {
            let mut strip = shared.strip.lock();
            let count = strip.unit_count();
            strip.write((0..count).map(|u| (u, Rgb::RED)))?;
        }
        sleep(timing.alert_on).await;

        {
            let mut strip = shared.strip.lock();
            let count = strip.unit_count();
            strip.write((0..count).map(|u| (u, Rgb::OFF)))?;
        }
        sleep(timing.alert_off).await;
    }

    shared.strip.lock().restore_all()
}

async fn run_single_flash(shared: &Shared, unit: usize) -> Result<(), IndicatorError> {
    let timing = &shared.timing;
    for _ in 0..timing.flash_cycles {
        shared.strip.lock().write([(unit, Rgb::WHITE)])?;
        sleep(timing.flash_on).await;

        shared.strip.lock().restore(&[unit])?;
        sleep(timing.flash_off).await;
    }
    Ok(())
}
