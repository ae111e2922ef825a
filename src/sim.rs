//! Demo and benchmark runners on a synthetic clock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::TimeDelta;
use tracing::info;

use crate::clock::ManualClock;
use crate::engine::StageTable;
use crate::fleet::{Fleet, FleetSettings};
use crate::stats::FleetStats;
use crate::types::{MissionStage, RobotStatus};

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    use std::mem::MaybeUninit;

    use libc::{RUSAGE_SELF, getrusage, rusage};
    let mut usage = MaybeUninit::<rusage>::uninit();
    // SAFETY: getrusage fully initializes `usage` when it returns 0.
    let usage = unsafe {
        if getrusage(RUSAGE_SELF, usage.as_mut_ptr()) != 0 {
            return None;
        }
        usage.assume_init()
    };
    let seconds = |tv: libc::timeval| tv.tv_sec as f64 + tv.tv_usec as f64 / 1_000_000.0;
    Some((seconds(usage.ru_utime), seconds(usage.ru_stime)))
}

#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

fn step(clock: &ManualClock, by: Duration) {
    clock.advance(TimeDelta::milliseconds(by.as_millis() as i64));
}

/// Outcome of the scripted demo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DemoReport {
    /// Stages the first mission was observed in, one entry per change.
    pub stage_trace: Vec<MissionStage>,
    pub final_stage: Option<MissionStage>,
    pub final_robot_status: Option<RobotStatus>,
    pub final_robot_mission: Option<u64>,
    /// Stage of the second mission after cancelling mid-travel and ticking.
    pub cancel_race_stage: Option<MissionStage>,
    pub cancel_repeat: bool,
    pub stats: FleetStats,
    pub violations: usize,
}

/// Three robots, batch of one, one-second stages and ticks.
///
/// Runs one mission to completion, then cancels a second mission while it is
/// travelling and checks the next tick leaves it cancelled.
pub fn run_demo() -> DemoReport {
    let clock = Arc::new(ManualClock::default());
    let settings = FleetSettings {
        fleet_size: 3,
        batch_size: 1,
        stages: StageTable::uniform(Duration::from_secs(1)),
    };
    let tick = Duration::from_secs(1);
    let fleet = Fleet::new(settings, clock.clone());
    let mut violations = 0;

    let first = fleet.create_missions().remove(0);
    info!(mission = first.id, robot = first.assigned_robot_id, "demo mission created");
    let mut stage_trace = vec![first.current_stage];
    for _ in 0..4 {
        step(&clock, tick);
        fleet.advance();
        violations += fleet.audit().len();
        if let Some(stage) = fleet.mission(first.id).map(|m| m.current_stage) {
            if stage_trace.last() != Some(&stage) {
                stage_trace.push(stage);
            }
        }
    }
    let final_robot = fleet.robot(first.assigned_robot_id);

    let second = fleet.create_missions().remove(0);
    step(&clock, tick);
    fleet.advance();
    let cancelled = fleet.cancel(second.assigned_robot_id);
    step(&clock, tick);
    fleet.advance();
    violations += fleet.audit().len();
    let cancel_repeat = fleet.cancel(second.assigned_robot_id);

    DemoReport {
        stage_trace,
        final_stage: fleet.mission(first.id).map(|m| m.current_stage),
        final_robot_status: final_robot.as_ref().map(|r| r.status),
        final_robot_mission: final_robot.and_then(|r| r.current_mission_id),
        cancel_race_stage: if cancelled {
            fleet.mission(second.id).map(|m| m.current_stage)
        } else {
            None
        },
        cancel_repeat,
        stats: fleet.stats(),
        violations,
    }
}

/// Print the demo summary in `key=value` lines.
pub fn print_demo(report: &DemoReport) {
    let trace: Vec<&str> = report.stage_trace.iter().map(|s| s.as_str()).collect();
    let show = |value: Option<&str>| value.unwrap_or("none").to_string();
    println!("DEMO SUMMARY");
    println!("stage_trace={}", trace.join(","));
    println!("mission_stage={}", show(report.final_stage.map(|s| s.as_str())));
    println!("robot_status={}", show(report.final_robot_status.map(|s| s.as_str())));
    println!(
        "robot_mission={}",
        report
            .final_robot_mission
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!("cancel_race_stage={}", show(report.cancel_race_stage.map(|s| s.as_str())));
    println!("cancel_repeat={}", report.cancel_repeat);
    println!("completed_missions={}", report.stats.completed_missions);
    println!("cancelled_missions={}", report.stats.cancelled_missions);
    println!("invariant_violations={}", report.violations);
}

/// Parameters for an accelerated run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BenchParams {
    pub fleet: FleetSettings,
    /// Number of advancement ticks to run.
    pub ticks: usize,
    pub advance_interval: Duration,
    pub creation_interval: Duration,
    /// Audit invariants after every tick.
    pub validate: bool,
    /// Cancel the first busy robot every seventh tick.
    pub cancel: bool,
}

impl Default for BenchParams {
    fn default() -> Self {
        Self {
            fleet: FleetSettings::default(),
            ticks: 1_000,
            advance_interval: Duration::from_secs(10),
            creation_interval: Duration::from_secs(60),
            validate: false,
            cancel: false,
        }
    }
}

/// Aggregated metrics from a single benchmark run.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchResult {
    pub fleet_size: usize,
    pub batch_size: usize,
    pub ticks: usize,
    pub elapsed_ms: f64,
    pub ticks_per_s: f64,
    pub missions_created: usize,
    pub cancel_requests: usize,
    pub stats: FleetStats,
    pub violations: usize,
    pub cpu_user_s: Option<f64>,
    pub cpu_sys_s: Option<f64>,
}

/// Run `ticks` advancement ticks, firing a creation tick whenever the
/// simulated creation interval has passed.
pub fn benchmark_once(params: &BenchParams) -> BenchResult {
    let clock = Arc::new(ManualClock::default());
    let fleet = Fleet::new(params.fleet, clock.clone());
    let tick_ms = params.advance_interval.as_millis().max(1);
    let ticks_per_creation = (params.creation_interval.as_millis() / tick_ms).max(1) as usize;

    let cpu_start = cpu_times_seconds();
    let start = Instant::now();
    let mut missions_created = fleet.create_missions().len();
    let mut cancel_requests = 0usize;
    let mut violations = 0usize;

    for tick in 1..=params.ticks {
        step(&clock, params.advance_interval);
        if tick % ticks_per_creation == 0 {
            missions_created += fleet.create_missions().len();
        }
        if params.cancel && tick % 7 == 0 {
            if let Some(robot) = fleet.robots().into_iter().find(|r| !r.is_idle()) {
                cancel_requests += 1;
                fleet.cancel(robot.id);
            }
        }
        fleet.advance();
        if params.validate {
            violations += fleet.audit().len();
        }
    }

    let elapsed = start.elapsed();
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    let ticks_per_s = if elapsed_ms > 0.0 {
        params.ticks as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };
    let (cpu_user_s, cpu_sys_s) = match (cpu_start, cpu_times_seconds()) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
            (Some(user_end - user_start), Some(sys_end - sys_start))
        }
        _ => (None, None),
    };

    BenchResult {
        fleet_size: params.fleet.fleet_size,
        batch_size: params.fleet.batch_size,
        ticks: params.ticks,
        elapsed_ms,
        ticks_per_s,
        missions_created,
        cancel_requests,
        stats: fleet.stats(),
        violations,
        cpu_user_s,
        cpu_sys_s,
    }
}

pub const BENCH_CSV_HEADER: &str = "fleet_size,batch_size,ticks,elapsed_ms,ticks_per_s,missions_created,missions_completed,missions_cancelled,missions_active,cpu_user_s,cpu_sys_s,violations";

/// Run a benchmark and print it as one CSV row.
pub fn run_benchmark(params: &BenchParams) -> BenchResult {
    let result = benchmark_once(params);
    let cpu = |value: Option<f64>| {
        value
            .map(|v| format!("{v:.4}"))
            .unwrap_or_else(|| "NA".to_string())
    };
    println!("{BENCH_CSV_HEADER}");
    println!(
        "{},{},{},{:.2},{:.2},{},{},{},{},{},{},{}",
        result.fleet_size,
        result.batch_size,
        result.ticks,
        result.elapsed_ms,
        result.ticks_per_s,
        result.missions_created,
        result.stats.completed_missions,
        result.stats.cancelled_missions,
        result.stats.active_missions,
        cpu(result.cpu_user_s),
        cpu(result.cpu_sys_s),
        result.violations
    );
    if params.validate && result.violations > 0 {
        eprintln!("# violation,fleet_invariant,{}", result.violations);
    }
    result
}
