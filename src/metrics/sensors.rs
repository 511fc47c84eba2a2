//! Sensor sources for the metrics aggregator.
//!
//! Every reading is optional. A `None` means the counter does not exist on
//! this platform or could not be read this tick; the aggregator reports it as
//! zero with its availability flag cleared.
//!
//! - [`ProcSelfSensors`]: CPU time, resident set and thread count from
//!   `/proc/self` on Linux.
//! - [`SysfsBattery`]: battery draw from `/sys/class/power_supply/` on Linux.
//! - [`NullSensors`] / [`NullPower`]: nothing available.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Process-level counters sampled once per tick.
///
/// Runtimes with a managed heap can supply allocation and collection counts;
/// the defaults report them as unavailable.
pub trait ProcessSensors: Send {
    /// Returns the unique identifier for this sensor source.
    fn id(&self) -> &'static str;

    /// Returns true if this source can produce readings on this system.
    fn is_available(&self) -> bool;

    /// Total bytes allocated since process start.
    fn allocated_bytes(&mut self) -> Option<u64> {
        None
    }

    /// Cumulative collection counts for generations 0, 1 and 2.
    fn gc_counts(&mut self) -> Option<[u64; 3]> {
        None
    }

    /// Total CPU time consumed by the process (user + system).
    fn cpu_time(&mut self) -> Option<Duration> {
        None
    }

    /// Resident working set in bytes.
    fn working_set_bytes(&mut self) -> Option<u64> {
        None
    }

    /// Number of live threads.
    fn thread_count(&mut self) -> Option<u32> {
        None
    }

    /// Logical cores used to normalise CPU percentage.
    fn core_count(&self) -> usize {
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    }
}

/// Battery draw source.
pub trait PowerSensor: Send {
    /// Returns the unique identifier for this sensor source.
    fn id(&self) -> &'static str;

    /// Current draw in milliwatts.
    fn power_milliwatts(&mut self) -> Option<f64>;
}

/// A process sensor source with nothing available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSensors;

impl ProcessSensors for NullSensors {
    fn id(&self) -> &'static str {
        "null"
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// A power sensor with nothing available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPower;

impl PowerSensor for NullPower {
    fn id(&self) -> &'static str {
        "null"
    }

    fn power_milliwatts(&mut self) -> Option<f64> {
        None
    }
}

/// Reads the current process's counters from procfs.
#[derive(Debug, Clone)]
pub struct ProcSelfSensors {
    /// Directory holding `stat` and `status` (normally `/proc/self`).
    root: PathBuf,
    /// Clock ticks per second for `utime`/`stime`.
    ticks_per_second: u64,
}

impl ProcSelfSensors {
    /// Creates a source reading `/proc/self`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root("/proc/self")
    }

    /// Creates a source reading `stat`/`status` files under `root`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), ticks_per_second: clock_ticks_per_second() }
    }

    /// Overrides the clock tick rate used to convert `utime`/`stime`.
    #[must_use]
    pub fn with_clock_ticks(mut self, ticks_per_second: u64) -> Self {
        self.ticks_per_second = ticks_per_second.max(1);
        self
    }

    /// Fields after the `(comm)` entry of `stat`; comm may contain spaces.
    fn stat_fields(&self) -> Option<Vec<String>> {
        let stat = std::fs::read_to_string(self.root.join("stat")).ok()?;
        let name_end = stat.rfind(')')?;
        let after_name = stat.get(name_end + 1..)?;
        Some(after_name.split_whitespace().map(str::to_string).collect())
    }

    fn status_value_kb(&self, key: &str) -> Option<u64> {
        let status = std::fs::read_to_string(self.root.join("status")).ok()?;
        status
            .lines()
            .find(|line| line.starts_with(key))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|v| v.parse::<u64>().ok())
    }
}

impl Default for ProcSelfSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSensors for ProcSelfSensors {
    fn id(&self) -> &'static str {
        "proc_self"
    }

    fn is_available(&self) -> bool {
        self.root.join("stat").exists()
    }

    fn cpu_time(&mut self) -> Option<Duration> {
        let fields = self.stat_fields()?;
        // Indices relative to the state field: utime is 11, stime is 12.
        let utime: u64 = fields.get(11)?.parse().ok()?;
        let stime: u64 = fields.get(12)?.parse().ok()?;
        let ticks = utime + stime;
        Some(Duration::from_secs_f64(ticks as f64 / self.ticks_per_second as f64))
    }

    fn working_set_bytes(&mut self) -> Option<u64> {
        self.status_value_kb("VmRSS:").map(|kb| kb * 1024)
    }

    fn thread_count(&mut self) -> Option<u32> {
        let fields = self.stat_fields()?;
        fields.get(17)?.parse().ok()
    }
}

#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
fn clock_ticks_per_second() -> u64 {
    // SAFETY: sysconf reads a configuration constant and has no pointer arguments.
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as u64
    } else {
        100
    }
}

#[cfg(not(target_os = "linux"))]
fn clock_ticks_per_second() -> u64 {
    100
}

/// Sums battery draw across `/sys/class/power_supply/*` batteries.
#[derive(Debug, Clone)]
pub struct SysfsBattery {
    power_supply_path: PathBuf,
}

impl SysfsBattery {
    /// Creates a reader for `/sys/class/power_supply`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_path("/sys/class/power_supply")
    }

    /// Creates a reader rooted at `path`.
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { power_supply_path: path.into() }
    }

    fn batteries(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.power_supply_path) else {
            return Vec::new();
        };
        entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                read_string(&path.join("type")).is_some_and(|t| t.eq_ignore_ascii_case("battery"))
            })
            .collect()
    }

    /// Draw of one battery in milliwatts.
    fn battery_milliwatts(base: &Path) -> Option<f64> {
        if let Some(microwatts) = read_u64(&base.join("power_now")) {
            return Some(microwatts as f64 / 1000.0);
        }
        // Some firmware only exposes current and voltage.
        let microamps = read_u64(&base.join("current_now"))?;
        let microvolts = read_u64(&base.join("voltage_now"))?;
        Some(microamps as f64 * microvolts as f64 / 1e9)
    }
}

impl Default for SysfsBattery {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerSensor for SysfsBattery {
    fn id(&self) -> &'static str {
        "sysfs_battery"
    }

    fn power_milliwatts(&mut self) -> Option<f64> {
        let readings: Vec<f64> =
            self.batteries().iter().filter_map(|b| Self::battery_milliwatts(b)).collect();
        if readings.is_empty() {
            None
        } else {
            Some(readings.iter().sum())
        }
    }
}

fn read_u64(path: &Path) -> Option<u64> {
    std::fs::read_to_string(path).ok().and_then(|s| s.trim().parse().ok())
}

fn read_string(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const STAT: &str =
        "4242 (my app) S 1 4242 4242 0 -1 4194304 500 0 0 0 250 50 0 0 20 0 7 0 100 0 0";

    fn proc_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stat"), STAT).unwrap();
        fs::write(dir.path().join("status"), "Name:\tmy app\nVmRSS:\t  2048 kB\nThreads:\t7\n")
            .unwrap();
        dir
    }

    #[test]
    fn test_proc_self_reads_cpu_time() {
        let dir = proc_dir();
        let mut sensors = ProcSelfSensors::with_root(dir.path()).with_clock_ticks(100);

        assert!(sensors.is_available());
        assert_eq!(sensors.cpu_time(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_proc_self_reads_memory_and_threads() {
        let dir = proc_dir();
        let mut sensors = ProcSelfSensors::with_root(dir.path());

        assert_eq!(sensors.working_set_bytes(), Some(2048 * 1024));
        assert_eq!(sensors.thread_count(), Some(7));
        assert_eq!(sensors.allocated_bytes(), None);
        assert_eq!(sensors.gc_counts(), None);
    }

    #[test]
    fn test_proc_self_missing_root() {
        let mut sensors = ProcSelfSensors::with_root("/nonexistent/proc/self");
        assert!(!sensors.is_available());
        assert_eq!(sensors.cpu_time(), None);
        assert_eq!(sensors.thread_count(), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_proc_self_live_process() {
        let mut sensors = ProcSelfSensors::new();
        assert!(sensors.is_available());
        assert!(sensors.thread_count().unwrap_or(0) >= 1);
        assert!(sensors.working_set_bytes().unwrap_or(0) > 0);
    }

    #[test]
    fn test_sysfs_battery_power_now() {
        let dir = tempfile::tempdir().unwrap();
        let bat = dir.path().join("BAT0");
        fs::create_dir(&bat).unwrap();
        fs::write(bat.join("type"), "Battery\n").unwrap();
        fs::write(bat.join("power_now"), "12500000\n").unwrap();
        let ac = dir.path().join("AC");
        fs::create_dir(&ac).unwrap();
        fs::write(ac.join("type"), "Mains\n").unwrap();

        let mut battery = SysfsBattery::with_path(dir.path());
        let mw = battery.power_milliwatts().unwrap();
        assert!((mw - 12_500.0).abs() < 1e-6);
    }

    #[test]
    fn test_sysfs_battery_current_voltage_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let bat = dir.path().join("BAT1");
        fs::create_dir(&bat).unwrap();
        fs::write(bat.join("type"), "Battery").unwrap();
        fs::write(bat.join("current_now"), "1000000").unwrap();
        fs::write(bat.join("voltage_now"), "12000000").unwrap();

        let mut battery = SysfsBattery::with_path(dir.path());
        let mw = battery.power_milliwatts().unwrap();
        assert!((mw - 12_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_sysfs_battery_absent() {
        let mut battery = SysfsBattery::with_path("/nonexistent/power_supply");
        assert_eq!(battery.power_milliwatts(), None);
    }

    #[test]
    fn test_null_sources() {
        let mut sensors = NullSensors;
        assert!(!sensors.is_available());
        assert_eq!(sensors.cpu_time(), None);
        assert!(sensors.core_count() >= 1);

        let mut power = NullPower;
        assert_eq!(power.power_milliwatts(), None);
    }
}
