//! Frame-time and process-counter smoothing.
//!
//! Two independent inputs drive a [`MetricsAggregator`] while it is running:
//!
//! - [`MetricsAggregator::on_frame_time`] once per displayed frame, updating
//!   the EMA frame time, fps and hitch readouts.
//! - [`MetricsAggregator::tick`] once per second from an external scheduler,
//!   updating allocation rate, GC deltas, CPU, memory, threads and battery.
//!   It returns whether the scheduler should keep calling it.
//!
//! All "previous value" counters live on the instance and are reset by
//! [`MetricsAggregator::start`].

use super::sensors::{NullSensors, PowerSensor, ProcSelfSensors, ProcessSensors, SysfsBattery};
use crate::config::MetricsConfig;
use crate::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

/// Smallest frame delta accepted, guarding the fps division.
pub const MIN_FRAME_DELTA_MS: f64 = 0.1;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Which sensor-backed readouts hold real values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorAvailability {
    /// Allocation rate.
    pub alloc: bool,
    /// GC generation deltas.
    pub gc: bool,
    /// CPU percentage.
    pub cpu: bool,
    /// Working set.
    pub memory: bool,
    /// Thread count.
    pub threads: bool,
    /// Battery draw.
    pub battery: bool,
}

/// Smoothed readouts, safe to copy for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricSnapshot {
    /// EMA of the frame delta in milliseconds.
    pub ema_frame_time_ms: f64,
    /// EMA of instantaneous frames per second.
    pub ema_fps: f64,
    /// EMA of the hitch signal (frame delta when it is a hitch, else 0).
    pub ema_hitch_ms: f64,
    /// Last hitch EMA value at or above the hitch threshold.
    pub ema_last_hitch_ms: f64,
    /// Highest hitch EMA value seen this session.
    pub ema_highest_hitch_ms: f64,
    /// Allocation rate over the last tick.
    pub alloc_mb_per_sec: f64,
    /// Collections per generation since the previous tick.
    pub gc_delta: [u64; 3],
    /// Process CPU usage normalised by core count.
    pub cpu_percent: f64,
    /// Working set in MiB.
    pub memory_mb: f64,
    /// Live threads.
    pub thread_count: u32,
    /// Battery draw in milliwatts.
    pub battery_milliwatts: f64,
    /// Availability of the sensor-backed fields above.
    pub availability: SensorAvailability,
}

/// Running/stopped metrics state machine.
pub struct MetricsAggregator {
    frame_alpha: f64,
    hitch_alpha: f64,
    hitch_threshold_ms: f64,
    tick_interval: Duration,

    sensors: Box<dyn ProcessSensors>,
    power: Option<Box<dyn PowerSensor>>,

    running: bool,
    snapshot: MetricSnapshot,
    frame_seeded: bool,
    fps_history: RingBuffer<f64>,

    last_tick: Option<Instant>,
    last_allocated_bytes: Option<u64>,
    last_gc_counts: Option<[u64; 3]>,
    prev_cpu_time: Option<Duration>,
}

impl std::fmt::Debug for MetricsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsAggregator")
            .field("sensors", &self.sensors.id())
            .field("power", &self.power.as_ref().map(|p| p.id()))
            .field("running", &self.running)
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}

impl MetricsAggregator {
    /// Creates a stopped aggregator with no sensors attached.
    #[must_use]
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            frame_alpha: config.frame_alpha,
            hitch_alpha: config.hitch_alpha,
            hitch_threshold_ms: config.hitch_threshold_ms,
            tick_interval: Duration::from_millis(config.tick_ms),
            sensors: Box::new(NullSensors),
            power: None,
            running: false,
            snapshot: MetricSnapshot::default(),
            frame_seeded: false,
            fps_history: RingBuffer::new(config.history_size),
            last_tick: None,
            last_allocated_bytes: None,
            last_gc_counts: None,
            prev_cpu_time: None,
        }
    }

    /// Creates an aggregator reading `/proc/self` and sysfs batteries.
    #[must_use]
    pub fn for_current_process(config: &MetricsConfig) -> Self {
        Self::new(config)
            .with_sensors(ProcSelfSensors::new())
            .with_power(SysfsBattery::new())
    }

    /// Replaces the process sensor source.
    #[must_use]
    pub fn with_sensors(mut self, sensors: impl ProcessSensors + 'static) -> Self {
        self.sensors = Box::new(sensors);
        self
    }

    /// Attaches a battery sensor.
    #[must_use]
    pub fn with_power(mut self, power: impl PowerSensor + 'static) -> Self {
        self.power = Some(Box::new(power));
        self
    }

    /// Returns true between `start()` and `stop()`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Interval the external scheduler should tick at.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Current readouts.
    #[must_use]
    pub fn snapshot(&self) -> MetricSnapshot {
        self.snapshot
    }

    /// Per-tick fps readouts, oldest first.
    #[must_use]
    pub fn fps_history(&self) -> &RingBuffer<f64> {
        &self.fps_history
    }

    /// Starts a fresh session now.
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    /// Starts a fresh session at `now`, resetting every counter and priming
    /// the "previous" readings so the first tick reports a delta.
    pub fn start_at(&mut self, now: Instant) {
        self.snapshot = MetricSnapshot::default();
        self.frame_seeded = false;
        self.fps_history.clear();

        self.last_tick = Some(now);
        self.last_allocated_bytes = self.sensors.allocated_bytes();
        self.last_gc_counts = self.sensors.gc_counts();
        self.prev_cpu_time = self.sensors.cpu_time();

        self.running = true;
        tracing::info!(sensors = self.sensors.id(), "metrics aggregator started");
    }

    /// Stops the session; the scheduler sees `false` on its next tick.
    pub fn stop(&mut self) {
        if self.running {
            tracing::info!("metrics aggregator stopped");
        }
        self.running = false;
    }

    /// Feeds one frame delta. Ignored while stopped or when not finite.
    pub fn on_frame_time(&mut self, delta_ms: f64) {
        if !self.running {
            return;
        }
        if !delta_ms.is_finite() {
            tracing::debug!(delta_ms, "dropped non-finite frame delta");
            return;
        }

        let delta = delta_ms.max(MIN_FRAME_DELTA_MS);
        let fps = 1000.0 / delta;

        if self.frame_seeded {
            self.snapshot.ema_frame_time_ms =
                blend(self.frame_alpha, self.snapshot.ema_frame_time_ms, delta);
            self.snapshot.ema_fps = blend(self.frame_alpha, self.snapshot.ema_fps, fps);
        } else {
            self.snapshot.ema_frame_time_ms = delta;
            self.snapshot.ema_fps = fps;
            self.frame_seeded = true;
        }

        let hitch_value = if delta >= self.hitch_threshold_ms { delta } else { 0.0 };
        let hitch = blend(self.hitch_alpha, self.snapshot.ema_hitch_ms, hitch_value);
        self.snapshot.ema_hitch_ms = hitch;

        if hitch >= self.hitch_threshold_ms {
            self.snapshot.ema_last_hitch_ms = hitch;
        }
        if hitch > self.snapshot.ema_highest_hitch_ms {
            tracing::debug!(hitch_ms = hitch, "new highest hitch");
            self.snapshot.ema_highest_hitch_ms = hitch;
        }
    }

    /// Periodic update at the current instant. Returns false once stopped.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    /// Periodic update at `now`. Returns false once stopped.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        if !self.running {
            return false;
        }

        let elapsed =
            self.last_tick.map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        let mut elapsed_secs = elapsed.as_secs_f64();
        if elapsed_secs <= 0.0 {
            elapsed_secs = 1.0;
        }
        let wall_ms = elapsed_secs * 1000.0;

        let before = self.snapshot.availability;
        self.sample_allocations(elapsed_secs);
        self.sample_gc();
        self.sample_cpu(wall_ms);
        self.sample_process();
        self.sample_battery();
        self.log_lost_sensors(before);

        self.fps_history.push(self.snapshot.ema_fps);
        self.last_tick = Some(now);
        true
    }

    fn sample_allocations(&mut self, elapsed_secs: f64) {
        match self.sensors.allocated_bytes() {
            Some(current) => {
                let delta =
                    self.last_allocated_bytes.map_or(0, |last| current.saturating_sub(last));
                self.snapshot.alloc_mb_per_sec = delta as f64 / BYTES_PER_MB / elapsed_secs;
                self.snapshot.availability.alloc = true;
                self.last_allocated_bytes = Some(current);
            }
            None => {
                self.snapshot.alloc_mb_per_sec = 0.0;
                self.snapshot.availability.alloc = false;
            }
        }
    }

    fn sample_gc(&mut self) {
        match self.sensors.gc_counts() {
            Some(current) => {
                let last = self.last_gc_counts.unwrap_or(current);
                for (generation, delta) in self.snapshot.gc_delta.iter_mut().enumerate() {
                    *delta = current[generation].saturating_sub(last[generation]);
                }
                self.snapshot.availability.gc = true;
                self.last_gc_counts = Some(current);
            }
            None => {
                self.snapshot.gc_delta = [0; 3];
                self.snapshot.availability.gc = false;
            }
        }
    }

    fn sample_cpu(&mut self, wall_ms: f64) {
        match self.sensors.cpu_time() {
            Some(current) => {
                let delta = self
                    .prev_cpu_time
                    .map_or(Duration::ZERO, |prev| current.saturating_sub(prev));
                let cores = self.sensors.core_count().max(1) as f64;
                self.snapshot.cpu_percent = delta.as_secs_f64() * 1000.0 / wall_ms * 100.0 / cores;
                self.snapshot.availability.cpu = true;
                self.prev_cpu_time = Some(current);
            }
            None => {
                self.snapshot.cpu_percent = 0.0;
                self.snapshot.availability.cpu = false;
            }
        }
    }

    fn sample_process(&mut self) {
        let memory = self.sensors.working_set_bytes();
        self.snapshot.memory_mb = memory.map_or(0.0, |bytes| bytes as f64 / BYTES_PER_MB);
        self.snapshot.availability.memory = memory.is_some();

        let threads = self.sensors.thread_count();
        self.snapshot.thread_count = threads.unwrap_or(0);
        self.snapshot.availability.threads = threads.is_some();
    }

    fn sample_battery(&mut self) {
        let reading = self.power.as_mut().and_then(|power| power.power_milliwatts());
        self.snapshot.battery_milliwatts = reading.unwrap_or(0.0);
        self.snapshot.availability.battery = reading.is_some();
    }

    fn log_lost_sensors(&self, before: SensorAvailability) {
        let after = self.snapshot.availability;
        let lost = [
            ("alloc", before.alloc, after.alloc),
            ("gc", before.gc, after.gc),
            ("cpu", before.cpu, after.cpu),
            ("memory", before.memory, after.memory),
            ("threads", before.threads, after.threads),
            ("battery", before.battery, after.battery),
        ];
        for (sensor, was, is) in lost {
            if was && !is {
                tracing::warn!(sensor, "sensor reading became unavailable");
            }
        }
    }
}

/// `alpha * previous + (1 - alpha) * sample`.
fn blend(alpha: f64, previous: f64, sample: f64) -> f64 {
    alpha * previous + (1.0 - alpha) * sample
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Scripted counters shared with the test body.
    #[derive(Debug, Default, Clone)]
    struct Counters {
        allocated: Option<u64>,
        gc: Option<[u64; 3]>,
        cpu: Option<Duration>,
        rss: Option<u64>,
        threads: Option<u32>,
    }

    #[derive(Clone)]
    struct ScriptedSensors {
        counters: Arc<Mutex<Counters>>,
        cores: usize,
    }

    impl ProcessSensors for ScriptedSensors {
        fn id(&self) -> &'static str {
            "scripted"
        }
        fn is_available(&self) -> bool {
            true
        }
        fn allocated_bytes(&mut self) -> Option<u64> {
            self.counters.lock().allocated
        }
        fn gc_counts(&mut self) -> Option<[u64; 3]> {
            self.counters.lock().gc
        }
        fn cpu_time(&mut self) -> Option<Duration> {
            self.counters.lock().cpu
        }
        fn working_set_bytes(&mut self) -> Option<u64> {
            self.counters.lock().rss
        }
        fn thread_count(&mut self) -> Option<u32> {
            self.counters.lock().threads
        }
        fn core_count(&self) -> usize {
            self.cores
        }
    }

    struct FixedPower(Option<f64>);

    impl PowerSensor for FixedPower {
        fn id(&self) -> &'static str {
            "fixed"
        }
        fn power_milliwatts(&mut self) -> Option<f64> {
            self.0
        }
    }

    fn running() -> MetricsAggregator {
        let mut agg = MetricsAggregator::new(&MetricsConfig::default());
        agg.start();
        agg
    }

    fn scripted(cores: usize) -> (MetricsAggregator, Arc<Mutex<Counters>>, Instant) {
        let counters = Arc::new(Mutex::new(Counters::default()));
        let sensors = ScriptedSensors { counters: Arc::clone(&counters), cores };
        let agg = MetricsAggregator::new(&MetricsConfig::default()).with_sensors(sensors);
        (agg, counters, Instant::now())
    }

    #[test]
    fn test_first_frame_seeds_ema() {
        let mut agg = running();
        agg.on_frame_time(20.0);

        let snap = agg.snapshot();
        assert_relative_eq!(snap.ema_frame_time_ms, 20.0);
        assert_relative_eq!(snap.ema_fps, 50.0);
    }

    #[test]
    fn test_second_frame_blends() {
        let mut agg = running();
        agg.on_frame_time(20.0);
        agg.on_frame_time(10.0);

        let snap = agg.snapshot();
        assert_relative_eq!(snap.ema_frame_time_ms, 0.9 * 20.0 + 0.1 * 10.0, epsilon = 1e-9);
        assert_relative_eq!(snap.ema_fps, 0.9 * 50.0 + 0.1 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_steady_60hz_stays_below_60() {
        let mut agg = running();
        for _ in 0..3 {
            agg.on_frame_time(16.67);
        }
        let fps = agg.snapshot().ema_fps;
        assert!(fps < 60.0, "fps {fps} should not reach 60");
        assert!(fps > 59.9, "fps {fps} should approach 60");
    }

    #[test]
    fn test_zero_and_negative_deltas_clamped() {
        let mut agg = running();
        agg.on_frame_time(0.0);
        assert_relative_eq!(agg.snapshot().ema_fps, 10_000.0);

        let mut agg = running();
        agg.on_frame_time(-5.0);
        assert_relative_eq!(agg.snapshot().ema_frame_time_ms, MIN_FRAME_DELTA_MS);
        assert!(agg.snapshot().ema_fps.is_finite());
    }

    #[test]
    fn test_non_finite_deltas_dropped() {
        let mut agg = running();
        agg.on_frame_time(16.0);
        agg.on_frame_time(f64::INFINITY);
        agg.on_frame_time(f64::NAN);
        agg.on_frame_time(f64::NEG_INFINITY);
        let snapshot = agg.snapshot();
        assert_relative_eq!(snapshot.ema_frame_time_ms, 16.0);
        assert_relative_eq!(snapshot.ema_fps, 62.5);
        assert_relative_eq!(snapshot.ema_hitch_ms, 0.0);

        for _ in 0..100 {
            agg.on_frame_time(16.0);
        }
        let snapshot = agg.snapshot();
        assert!(snapshot.ema_frame_time_ms.is_finite());
        assert!(snapshot.ema_highest_hitch_ms.is_finite());
        assert_relative_eq!(snapshot.ema_last_hitch_ms, 0.0);
    }

    #[test]
    fn test_non_finite_first_delta_leaves_ema_unseeded() {
        let mut agg = running();
        agg.on_frame_time(f64::NAN);
        agg.on_frame_time(40.0);
        assert_relative_eq!(agg.snapshot().ema_frame_time_ms, 40.0);
    }

    #[test]
    fn test_frames_ignored_while_stopped() {
        let mut agg = MetricsAggregator::new(&MetricsConfig::default());
        agg.on_frame_time(16.0);
        assert_eq!(agg.snapshot(), MetricSnapshot::default());
    }

    #[test]
    fn test_hitch_tracking() {
        let mut agg = running();
        agg.on_frame_time(16.0);
        assert_relative_eq!(agg.snapshot().ema_hitch_ms, 0.0);

        agg.on_frame_time(1000.0);
        let snap = agg.snapshot();
        assert_relative_eq!(snap.ema_hitch_ms, 300.0, epsilon = 1e-9);
        assert_relative_eq!(snap.ema_last_hitch_ms, 300.0, epsilon = 1e-9);
        assert_relative_eq!(snap.ema_highest_hitch_ms, 300.0, epsilon = 1e-9);

        agg.on_frame_time(16.0);
        let snap = agg.snapshot();
        assert_relative_eq!(snap.ema_hitch_ms, 210.0, epsilon = 1e-9);
        assert_relative_eq!(snap.ema_last_hitch_ms, 210.0, epsilon = 1e-9);
        assert_relative_eq!(snap.ema_highest_hitch_ms, 300.0, epsilon = 1e-9);

        agg.on_frame_time(16.0);
        let snap = agg.snapshot();
        assert_relative_eq!(snap.ema_hitch_ms, 147.0, epsilon = 1e-9);
        // Below threshold: last hitch keeps its previous value.
        assert_relative_eq!(snap.ema_last_hitch_ms, 210.0, epsilon = 1e-9);
    }

    #[test]
    fn test_start_resets_session() {
        let mut agg = running();
        agg.on_frame_time(1000.0);
        agg.tick();
        agg.stop();
        agg.start();

        let snap = agg.snapshot();
        assert_relative_eq!(snap.ema_highest_hitch_ms, 0.0);
        assert!(agg.fps_history().is_empty());

        agg.on_frame_time(25.0);
        assert_relative_eq!(agg.snapshot().ema_frame_time_ms, 25.0);
    }

    #[test]
    fn test_tick_reports_keep_running() {
        let mut agg = MetricsAggregator::new(&MetricsConfig::default());
        assert!(!agg.tick());

        agg.start();
        assert!(agg.tick());

        agg.stop();
        assert!(!agg.tick());
        assert!(!agg.is_running());
    }

    #[test]
    fn test_tick_without_sensors_reports_unavailable() {
        let mut agg = running();
        agg.tick();

        let snap = agg.snapshot();
        assert_eq!(snap.availability, SensorAvailability::default());
        assert_relative_eq!(snap.cpu_percent, 0.0);
        assert_relative_eq!(snap.battery_milliwatts, 0.0);
    }

    #[test]
    fn test_tick_counter_deltas() {
        let (mut agg, counters, t0) = scripted(2);
        {
            let mut c = counters.lock();
            c.allocated = Some(0);
            c.gc = Some([10, 4, 1]);
            c.cpu = Some(Duration::from_millis(500));
            c.rss = Some(64 * 1024 * 1024);
            c.threads = Some(9);
        }
        agg.start_at(t0);
        {
            let mut c = counters.lock();
            c.allocated = Some(4 * 1024 * 1024);
            c.gc = Some([13, 4, 2]);
            c.cpu = Some(Duration::from_millis(1500));
        }
        assert!(agg.tick_at(t0 + Duration::from_secs(2)));

        let snap = agg.snapshot();
        assert_relative_eq!(snap.alloc_mb_per_sec, 2.0);
        assert_eq!(snap.gc_delta, [3, 0, 1]);
        // 1000 ms CPU over 2000 ms wall on 2 cores.
        assert_relative_eq!(snap.cpu_percent, 25.0);
        assert_relative_eq!(snap.memory_mb, 64.0);
        assert_eq!(snap.thread_count, 9);
        assert!(snap.availability.alloc && snap.availability.gc && snap.availability.cpu);
        assert!(snap.availability.memory && snap.availability.threads);
        assert!(!snap.availability.battery);
    }

    #[test]
    fn test_zero_elapsed_floors_to_one_second() {
        let (mut agg, counters, t0) = scripted(1);
        counters.lock().allocated = Some(0);
        agg.start_at(t0);
        counters.lock().allocated = Some(3 * 1024 * 1024);

        agg.tick_at(t0);
        assert_relative_eq!(agg.snapshot().alloc_mb_per_sec, 3.0);
    }

    #[test]
    fn test_counter_regression_yields_zero() {
        let (mut agg, counters, t0) = scripted(1);
        counters.lock().gc = Some([5, 5, 5]);
        agg.start_at(t0);
        counters.lock().gc = Some([1, 5, 6]);

        agg.tick_at(t0 + Duration::from_secs(1));
        assert_eq!(agg.snapshot().gc_delta, [0, 0, 1]);
    }

    #[test]
    fn test_sensor_loss_degrades_to_zero() {
        let (mut agg, counters, t0) = scripted(1);
        counters.lock().threads = Some(4);
        agg.start_at(t0);
        agg.tick_at(t0 + Duration::from_secs(1));
        assert!(agg.snapshot().availability.threads);

        counters.lock().threads = None;
        agg.tick_at(t0 + Duration::from_secs(2));
        let snap = agg.snapshot();
        assert_eq!(snap.thread_count, 0);
        assert!(!snap.availability.threads);
    }

    #[test]
    fn test_battery_reading() {
        let mut agg =
            MetricsAggregator::new(&MetricsConfig::default()).with_power(FixedPower(Some(4200.0)));
        agg.start();
        agg.tick();
        let snap = agg.snapshot();
        assert_relative_eq!(snap.battery_milliwatts, 4200.0);
        assert!(snap.availability.battery);

        let mut agg =
            MetricsAggregator::new(&MetricsConfig::default()).with_power(FixedPower(None));
        agg.start();
        agg.tick();
        assert!(!agg.snapshot().availability.battery);
    }

    #[test]
    fn test_fps_history_per_tick() {
        let mut agg = running();
        agg.on_frame_time(20.0);
        let t0 = Instant::now();
        agg.tick_at(t0);
        agg.tick_at(t0 + Duration::from_secs(1));

        assert_eq!(agg.fps_history().len(), 2);
        assert_eq!(agg.fps_history().latest(), Some(&50.0));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_highest_hitch_never_decreases(
            deltas in prop::collection::vec(-10.0f64..2000.0, 1..300)
        ) {
            let mut agg = MetricsAggregator::new(&MetricsConfig::default());
            agg.start();
            let mut previous = 0.0;
            for delta in deltas {
                agg.on_frame_time(delta);
                let highest = agg.snapshot().ema_highest_hitch_ms;
                prop_assert!(highest >= previous);
                previous = highest;
            }
        }

        #[test]
        fn prop_first_sample_seeds_exactly(delta in 0.1f64..5000.0) {
            let mut agg = MetricsAggregator::new(&MetricsConfig::default());
            agg.start();
            agg.on_frame_time(delta);
            let snap = agg.snapshot();
            prop_assert_eq!(snap.ema_frame_time_ms, delta);
            prop_assert_eq!(snap.ema_fps, 1000.0 / delta);
        }
    }
}
