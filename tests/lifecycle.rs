//! Mission lifecycle properties over many ticks on a synthetic clock.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use fleet_sim::engine::StageTable;
use fleet_sim::{Clock, Fleet, FleetSettings, ManualClock, MissionId, MissionStage, RobotStatus};

fn build(fleet_size: usize, batch_size: usize, stages: StageTable) -> (Fleet, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let settings = FleetSettings {
        fleet_size,
        batch_size,
        stages,
    };
    (Fleet::new(settings, clock.clone()), clock)
}

fn assert_binding_invariant(fleet: &Fleet) {
    for robot in fleet.robots() {
        assert_eq!(
            robot.status == RobotStatus::Idle,
            robot.current_mission_id.is_none(),
            "robot {} is {} with mission {:?}",
            robot.id,
            robot.status,
            robot.current_mission_id
        );
    }
    assert!(fleet.audit().is_empty());
}

#[test]
fn end_to_end_single_mission() {
    let (fleet, clock) = build(3, 1, StageTable::uniform(Duration::from_secs(1)));

    let created = fleet.create_missions();
    assert_eq!(created.len(), 1);
    let mission = &created[0];
    assert_eq!(mission.current_stage, MissionStage::Preparation);
    let robot = fleet.robot(mission.assigned_robot_id).expect("robot exists");
    assert_eq!(robot.status, RobotStatus::Assigned);

    for _ in 0..4 {
        clock.advance(TimeDelta::seconds(1));
        fleet.advance();
        assert_binding_invariant(&fleet);
    }

    let stored = fleet.mission(mission.id).expect("mission retained");
    assert_eq!(stored.current_stage, MissionStage::Completed);
    let robot = fleet.robot(mission.assigned_robot_id).expect("robot exists");
    assert_eq!(robot.status, RobotStatus::Idle);
    assert_eq!(robot.current_mission_id, None);
    assert_eq!(fleet.stats().completed_missions, 1);
    assert_eq!(fleet.stats().active_missions, 0);
}

#[test]
fn creation_tick_batches_two_missions() {
    let (fleet, _) = build(10, 2, StageTable::default());
    let created = fleet.create_missions();
    assert_eq!(created.len(), 2);
    let ids: HashSet<MissionId> = created.iter().map(|m| m.id).collect();
    let robots: HashSet<_> = created.iter().map(|m| m.assigned_robot_id).collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(robots.len(), 2);
    assert_eq!(fleet.stats().idle_robots, 8);
}

#[test]
fn creation_tick_without_idle_robots_is_a_no_op() {
    let (fleet, _) = build(2, 2, StageTable::default());
    fleet.create_missions();
    let created = fleet.create_missions();
    assert!(created.is_empty());
    assert_eq!(fleet.stats().total_missions, 2);
}

#[test]
fn cancel_mid_travel_wins_over_next_tick() {
    let (fleet, clock) = build(3, 1, StageTable::uniform(Duration::from_secs(10)));
    let mission = fleet.create_missions().remove(0);
    clock.advance(TimeDelta::seconds(10));
    fleet.advance();
    assert_eq!(
        fleet.mission(mission.id).map(|m| m.current_stage),
        Some(MissionStage::Travel)
    );

    // Travel is already overdue when the cancel lands.
    clock.advance(TimeDelta::seconds(15));
    assert!(fleet.cancel(mission.assigned_robot_id));
    fleet.advance();

    let stored = fleet.mission(mission.id).expect("mission retained");
    assert_eq!(stored.current_stage, MissionStage::Cancelled);
    let robot = fleet.robot(mission.assigned_robot_id).expect("robot exists");
    assert_eq!(robot.status, RobotStatus::Idle);
    assert_eq!(robot.current_mission_id, None);
    assert!(!fleet.cancel(mission.assigned_robot_id));
    assert_eq!(fleet.stats().cancelled_missions, 1);
}

#[test]
fn cancelled_robot_can_take_a_new_mission() {
    let (fleet, _) = build(1, 1, StageTable::default());
    let first = fleet.create_missions().remove(0);
    assert!(fleet.cancel(first.assigned_robot_id));
    let second = fleet.create_missions().remove(0);
    assert_eq!(second.assigned_robot_id, first.assigned_robot_id);
    assert_ne!(second.id, first.id);
    assert_eq!(
        fleet.mission(first.id).map(|m| m.current_stage),
        Some(MissionStage::Cancelled)
    );
}

#[test]
fn observed_stage_time_is_bounded_by_one_tick() {
    let stages = StageTable::default();
    for tick_secs in [1i64, 3, 7, 10, 13] {
        for phase in 0..tick_secs {
            let (fleet, clock) = build(1, 1, stages);
            let start = clock.now();
            let mission = fleet.create_missions().remove(0);
            let mut entered = vec![(mission.current_stage, start)];
            let mut released_at = None;

            let mut tick = 0;
            while released_at.is_none() {
                tick += 1;
                assert!(tick < 1_000, "mission never finished");
                clock.set(start + TimeDelta::seconds(phase + tick * tick_secs));
                fleet.advance();
                let now = clock.now();
                let stage = fleet.mission(mission.id).map(|m| m.current_stage);
                if let Some(stage) = stage {
                    if entered.last().map(|(s, _)| *s) != Some(stage) {
                        entered.push((stage, now));
                    }
                }
                if fleet.robot(mission.assigned_robot_id).is_some_and(|r| r.is_idle()) {
                    released_at = Some(now);
                }
            }

            let mut ends: Vec<_> = entered.iter().skip(1).map(|(_, at)| *at).collect();
            ends.extend(released_at);
            let tick = TimeDelta::seconds(tick_secs);
            for ((stage, began), ended) in entered.iter().zip(ends) {
                let nominal = TimeDelta::from_std(stages.duration(*stage).expect("timed stage"))
                    .expect("duration in range");
                let observed = ended - *began;
                assert!(
                    observed >= nominal && observed < nominal + tick,
                    "{stage} took {observed} with tick {tick_secs}s phase {phase}s"
                );
            }
        }
    }
}

#[test]
fn long_run_keeps_invariants_and_stage_order() {
    let (fleet, clock) = build(12, 2, StageTable::default());
    let mut observed: BTreeMap<MissionId, Vec<MissionStage>> = BTreeMap::new();

    fleet.create_missions();
    for tick in 1..=400 {
        clock.advance(TimeDelta::seconds(10));
        if tick % 6 == 0 {
            fleet.create_missions();
        }
        if tick % 11 == 0 {
            if let Some(robot) = fleet.robots().into_iter().find(|r| !r.is_idle()) {
                assert!(fleet.cancel(robot.id));
            }
        }
        fleet.advance();
        assert_binding_invariant(&fleet);

        for mission in fleet.missions() {
            let trace = observed.entry(mission.id).or_default();
            if trace.last() != Some(&mission.current_stage) {
                trace.push(mission.current_stage);
            }
        }
    }

    let mut finished = 0;
    for (id, trace) in &observed {
        let timed: Vec<MissionStage> = trace
            .iter()
            .copied()
            .filter(|s| *s != MissionStage::Cancelled)
            .collect();
        assert_eq!(
            timed,
            MissionStage::TIMED[..timed.len()].to_vec(),
            "mission {id} skipped or repeated a stage: {trace:?}"
        );
        if trace.last() == Some(&MissionStage::Cancelled) {
            assert_eq!(trace.iter().filter(|s| **s == MissionStage::Cancelled).count(), 1);
        } else if trace.last() == Some(&MissionStage::Completed) {
            finished += 1;
        }
    }
    assert!(finished > 0);

    let stats = fleet.stats();
    assert_eq!(
        stats.active_missions + stats.completed_missions + stats.cancelled_missions,
        stats.total_missions
    );
}
