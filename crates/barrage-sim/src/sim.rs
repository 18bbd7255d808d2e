#![forbid(unsafe_code)]

//! Frame loop.
//!
//! Each frame, in order:
//!
//! 1. advance the clock and the renderer to the frame time;
//! 2. unmount finished items and report them through `Engine::on_exit`;
//! 3. offer every delivery that has come due;
//! 4. run the pending tick, if any, and mount what it admitted;
//! 5. check every lane for overlapping neighbours.
//!
//! The run ends once the stream is exhausted and the engine holds nothing,
//! or after `max_frames`.

use barrage_core::{BarrageConfig, Bounds, Millis};
use barrage_runtime::{Clock, Engine, EngineStats, ManualClock};
use serde::Serialize;

use crate::renderer::{KinematicRenderer, Overlap};
use crate::scenario::Scenario;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimOptions {
    pub container: Bounds,
    pub char_width: f64,
    pub frame_ms: Millis,
    pub max_frames: u64,
    /// Clock value of the first frame.
    pub start_at: Millis,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            container: Bounds::from_size(1_280.0, 720.0),
            char_width: 16.0,
            frame_ms: 16,
            max_frames: 1_000_000,
            start_at: 0,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimReport {
    pub frames: u64,
    pub ended_at: Millis,
    pub lanes: usize,
    pub delivered: usize,
    pub stats: EngineStats,
    /// Largest number of items waiting for a lane at once.
    pub max_pending: usize,
    /// Largest number of items on screen at once.
    pub max_on_screen: usize,
    pub mean_entry_delay_ms: f64,
    pub max_entry_delay_ms: Millis,
    /// First overlaps found, capped.
    pub overlaps: Vec<Overlap>,
    pub overlap_count: usize,
    /// Whether the run hit `max_frames` before draining.
    pub truncated: bool,
}

const MAX_REPORTED_OVERLAPS: usize = 32;

impl SimReport {
    /// Human-readable multi-line summary.
    #[must_use]
    pub fn render_text(&self) -> String {
        let s = &self.stats;
        let mut out = String::new();
        out.push_str(&format!(
            "frames: {} (ended at {} ms{})\n",
            self.frames,
            self.ended_at,
            if self.truncated { ", truncated" } else { "" }
        ));
        out.push_str(&format!("lanes: {}\n", self.lanes));
        out.push_str(&format!(
            "items: delivered {} / offered {} / duplicates {}\n",
            self.delivered, s.offered, s.duplicates
        ));
        out.push_str(&format!(
            "outcome: admitted {} / deserted {} / discarded {} / exited {} / withdrawn {}\n",
            s.admitted, s.deserted, s.discarded, s.exited, s.withdrawn
        ));
        out.push_str(&format!(
            "peaks: pending {} / on screen {}\n",
            self.max_pending, self.max_on_screen
        ));
        out.push_str(&format!(
            "entry delay: mean {:.1} ms / max {} ms\n",
            self.mean_entry_delay_ms, self.max_entry_delay_ms
        ));
        out.push_str(&format!("ticks: {}\n", s.ticks));
        out.push_str(&format!("overlaps: {}\n", self.overlap_count));
        for o in &self.overlaps {
            out.push_str(&format!(
                "  t={} lane={} {} -> {} depth={:.3}\n",
                o.at, o.lane, o.ahead, o.behind, o.depth
            ));
        }
        out
    }
}

/// Drive `scenario` through a fresh engine.
#[must_use]
pub fn run(config: BarrageConfig, scenario: &Scenario, options: &SimOptions) -> SimReport {
    let clock = ManualClock::new(options.start_at);
    let mut engine = Engine::new(config, options.container);
    let mut renderer = KinematicRenderer::new(options.container, options.char_width);
    let frame_ms = options.frame_ms.max(1);
    let deliveries = scenario.deliveries();

    let _span = tracing::info_span!(
        "barrage.sim",
        deliveries = deliveries.len(),
        lanes = engine.capacity(),
        frame_ms,
    )
    .entered();

    let mut next = 0;
    let mut frames = 0;
    let mut max_pending = 0;
    let mut max_on_screen = 0;
    let mut delay_sum = 0i128;
    let mut delay_count = 0u64;
    let mut max_delay = 0;
    let mut overlaps = Vec::new();
    let mut overlap_count = 0;
    let mut truncated = false;

    loop {
        let now = clock.now();
        renderer.set_now(now);

        for id in renderer.take_exited() {
            engine.on_exit(&id);
        }

        let due = deliveries[next..]
            .iter()
            .take_while(|d| d.at() <= now)
            .count();
        if due > 0 {
            engine.offer(deliveries[next..next + due].iter().map(|d| d.item.clone()));
            next += due;
        }

        if let Some(outcome) = engine.run_pending(&clock, &renderer) {
            for admitted in &outcome.admitted {
                renderer.mount(admitted, now);
                delay_sum += i128::from(admitted.entry_delay);
                delay_count += 1;
                max_delay = max_delay.max(admitted.entry_delay);
            }
        }

        let found = renderer.overlaps();
        if !found.is_empty() {
            tracing::error!(
                target: "barrage.sim",
                now,
                count = found.len(),
                "overlap detected"
            );
            overlap_count += found.len();
            let room = MAX_REPORTED_OVERLAPS.saturating_sub(overlaps.len());
            overlaps.extend(found.into_iter().take(room));
        }

        max_pending = max_pending.max(engine.pending().len());
        max_on_screen = max_on_screen.max(renderer.len());
        frames += 1;

        let drained =
            next == deliveries.len() && engine.pending().is_empty() && renderer.is_empty();
        if drained {
            break;
        }
        if frames >= options.max_frames {
            truncated = true;
            tracing::warn!(target: "barrage.sim", frames, "frame limit reached");
            break;
        }
        clock.advance(frame_ms);
    }

    let mean_entry_delay_ms = if delay_count == 0 {
        0.0
    } else {
        delay_sum as f64 / delay_count as f64
    };

    SimReport {
        frames,
        ended_at: clock.now(),
        lanes: engine.capacity(),
        delivered: next,
        stats: engine.stats(),
        max_pending,
        max_on_screen,
        mean_entry_delay_ms,
        max_entry_delay_ms: max_delay,
        overlaps,
        overlap_count,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{Delivery, StreamSpec};
    use barrage_core::{AllocationStrategy, Item};

    fn config(strategy: AllocationStrategy) -> BarrageConfig {
        BarrageConfig {
            strategy,
            seed: Some(11),
            ..BarrageConfig::default()
        }
    }

    #[test]
    fn empty_scenario_ends_immediately() {
        let report = run(
            config(AllocationStrategy::Sparse),
            &Scenario::default(),
            &SimOptions::default(),
        );
        assert_eq!(report.frames, 1);
        assert!(!report.truncated);
        assert_eq!(report.stats.admitted, 0);
    }

    #[test]
    fn every_item_is_accounted_for() {
        let scenario = Scenario::generate(&StreamSpec {
            rate: 30.0,
            duration_ms: 8_000,
            max_latency_ms: 400,
            seed: 5,
        })
        .unwrap();
        for strategy in [AllocationStrategy::Compact, AllocationStrategy::Sparse] {
            let report = run(config(strategy), &scenario, &SimOptions::default());
            let s = report.stats;
            assert!(!report.truncated);
            assert_eq!(report.delivered, scenario.len());
            assert_eq!(
                s.admitted + s.deserted + s.discarded,
                scenario.len() as u64,
                "{strategy:?}"
            );
            assert_eq!(s.exited, s.admitted);
            assert_eq!(report.overlap_count, 0, "{:?}", report.overlaps);
        }
    }

    #[test]
    fn single_lane_serialises_items() {
        let scenario = Scenario::new(
            (0..5)
                .map(|i| Delivery {
                    item: Item::new(format!("s{i}"), "hello world", 0),
                    deliver_at: None,
                })
                .collect(),
        );
        let options = SimOptions {
            container: Bounds::from_size(800.0, 24.0),
            ..SimOptions::default()
        };
        let cfg = BarrageConfig {
            area: 100.0,
            ..config(AllocationStrategy::Compact)
        };
        let report = run(cfg, &scenario, &options);
        assert_eq!(report.lanes, 1);
        assert!(report.stats.admitted >= 2);
        assert!(report.max_pending >= 3);
        assert_eq!(report.overlap_count, 0);
    }

    #[test]
    fn report_text_mentions_outcome() {
        let report = run(
            config(AllocationStrategy::Sparse),
            &Scenario::default(),
            &SimOptions::default(),
        );
        let text = report.render_text();
        assert!(text.contains("admitted 0"));
        assert!(text.contains("overlaps: 0"));
    }
}
