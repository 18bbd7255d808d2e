#![forbid(unsafe_code)]

//! Item streams fed to the simulator.
//!
//! A [`Scenario`] is a list of [`Delivery`] events sorted by delivery time.
//! It is either generated from a seeded arrival process or read from a
//! JSON-lines file with one item per line:
//!
//! ```text
//! {"id":"m1","content":"hello","scheduledTime":1200}
//! {"id":"m2","content":"late","scheduledTime":900,"deliverAt":1500}
//! ```
//!
//! `deliverAt` defaults to `scheduledTime`.

use std::io::BufRead;

use barrage_core::{Item, Millis};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// One item handed to the engine at `deliver_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    #[serde(flatten)]
    pub item: Item,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deliver_at: Option<Millis>,
}

impl Delivery {
    #[must_use]
    pub fn at(&self) -> Millis {
        self.deliver_at.unwrap_or(self.item.scheduled_time)
    }
}

/// Parameters of a generated stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamSpec {
    /// Mean arrivals per second.
    pub rate: f64,
    pub duration_ms: Millis,
    /// Upper bound of transport latency; each item arrives up to this late.
    pub max_latency_ms: Millis,
    pub seed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scenario {
    deliveries: Vec<Delivery>,
}

const WORDS: &[&str] = &[
    "nice", "lol", "again", "wow", "first", "so good", "哈哈哈", "弹幕", "前方高能", "gg",
    "what", "replay", "this part", "nooo", "clip it",
];

impl Scenario {
    /// Sort deliveries by time; ties keep input order.
    #[must_use]
    pub fn new(mut deliveries: Vec<Delivery>) -> Self {
        deliveries.sort_by_key(Delivery::at);
        Self { deliveries }
    }

    /// Exponential inter-arrival times at `rate` per second.
    pub fn generate(spec: &StreamSpec) -> Result<Self> {
        if !(spec.rate > 0.0) || !spec.rate.is_finite() {
            return Err(SimError::invalid(format!(
                "rate must be positive, got {}",
                spec.rate
            )));
        }
        if spec.duration_ms < 0 || spec.max_latency_ms < 0 {
            return Err(SimError::invalid("duration and latency must be >= 0"));
        }

        let mut rng = SmallRng::seed_from_u64(spec.seed);
        let mean_gap_ms = 1_000.0 / spec.rate;
        let mut deliveries = Vec::new();
        let mut t = 0.0f64;
        loop {
            let u: f64 = rng.random();
            t += -(1.0 - u).ln() * mean_gap_ms;
            let deliver_at = t as Millis;
            if deliver_at > spec.duration_ms {
                break;
            }
            let latency = rng.random_range(0..=spec.max_latency_ms);
            let words = rng.random_range(1..=3);
            let content = (0..words)
                .map(|_| WORDS[rng.random_range(0..WORDS.len())])
                .collect::<Vec<_>>()
                .join(" ");
            deliveries.push(Delivery {
                item: Item::new(
                    format!("gen-{}", deliveries.len()),
                    content,
                    deliver_at - latency,
                ),
                deliver_at: Some(deliver_at),
            });
        }
        Ok(Self::new(deliveries))
    }

    /// Read JSON lines. Blank lines are skipped.
    pub fn from_jsonl<R: BufRead>(reader: R) -> Result<Self> {
        let mut deliveries = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let delivery = serde_json::from_str(&line).map_err(|e| SimError::Input {
                line: index + 1,
                message: e.to_string(),
            })?;
            deliveries.push(delivery);
        }
        Ok(Self::new(deliveries))
    }

    #[must_use]
    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    /// Delivery time of the last item.
    #[must_use]
    pub fn last_delivery(&self) -> Millis {
        self.deliveries.last().map_or(0, Delivery::at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(seed: u64) -> StreamSpec {
        StreamSpec {
            rate: 20.0,
            duration_ms: 10_000,
            max_latency_ms: 300,
            seed,
        }
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let a = Scenario::generate(&spec(9)).unwrap();
        let b = Scenario::generate(&spec(9)).unwrap();
        let c = Scenario::generate(&spec(10)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn generated_stream_is_sorted_and_roughly_at_rate() {
        let s = Scenario::generate(&spec(1)).unwrap();
        assert!((100..=300).contains(&s.len()), "len={}", s.len());
        assert!(s.deliveries().windows(2).all(|w| w[0].at() <= w[1].at()));
        for d in s.deliveries() {
            let lag = d.at() - d.item.scheduled_time;
            assert!((0..=300).contains(&lag));
        }
    }

    #[test]
    fn rejects_non_positive_rate() {
        let err = Scenario::generate(&StreamSpec {
            rate: 0.0,
            ..spec(1)
        })
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn jsonl_defaults_delivery_to_schedule() {
        let input = "{\"id\":\"b\",\"content\":\"x\",\"scheduledTime\":500}\n\n\
                     {\"id\":\"a\",\"content\":\"y\",\"scheduledTime\":900,\"deliverAt\":100}\n";
        let s = Scenario::from_jsonl(input.as_bytes()).unwrap();
        let ids: Vec<_> = s.deliveries().iter().map(|d| d.item.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(s.last_delivery(), 500);
    }

    #[test]
    fn jsonl_reports_bad_line() {
        let input = "{\"id\":\"a\",\"content\":\"x\",\"scheduledTime\":1}\nnot json\n";
        match Scenario::from_jsonl(input.as_bytes()) {
            Err(SimError::Input { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected input error, got {other:?}"),
        }
    }
}
