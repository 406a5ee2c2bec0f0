#![forbid(unsafe_code)]

//! Deterministic session trace.
//!
//! A trace is a header, the startup effects, one record per handled event and
//! a summary. Each event record carries an FNV-1a checksum of the effect JSON
//! and a running chain over all checksums, so replaying the recorded events
//! through a fresh controller pinpoints the first divergence.
//!
//! The trace is bounded: past `capacity` event records the oldest are dropped
//! while the chain keeps running. A truncated trace still serializes but can
//! no longer be replayed.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::PageConfig;
use crate::controller::{PageController, PageEvent};
use crate::effect::Effect;
use crate::registry::ElementRegistry;

pub const SCHEMA_VERSION: &str = "fitfusion-trace-v1";

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv1a64_bytes(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn chain(prev: u64, next: u64) -> u64 {
    let hash = fnv1a64_bytes(FNV_OFFSET_BASIS, &prev.to_le_bytes());
    fnv1a64_bytes(hash, &next.to_le_bytes())
}

/// FNV-1a over the JSON encoding of `effects`, one newline per effect.
#[must_use]
pub fn checksum_effects(effects: &[Effect]) -> u64 {
    effects.iter().fold(FNV_OFFSET_BASIS, |hash, effect| {
        // Effects only hold ids, enums and strings; encoding cannot fail.
        let json = effect.to_json_string().unwrap_or_default();
        let hash = fnv1a64_bytes(hash, json.as_bytes());
        fnv1a64_bytes(hash, b"\n")
    })
}

#[derive(Debug, Clone)]
pub enum TraceError {
    Json(String),
    MissingHeader,
    SchemaMismatch(String),
    /// The first retained event is not sequence 1.
    Truncated { first_seq: u64 },
}

impl core::fmt::Display for TraceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "invalid trace record: {msg}"),
            Self::MissingHeader => f.write_str("trace does not start with a header"),
            Self::SchemaMismatch(found) => {
                write!(f, "unsupported trace schema {found} (expected {SCHEMA_VERSION})")
            }
            Self::Truncated { first_seq } => {
                write!(f, "trace is truncated (first event is #{first_seq})")
            }
        }
    }
}

impl std::error::Error for TraceError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum TraceRecord {
    Header {
        schema: String,
        armed: u8,
        elements: usize,
    },
    Start {
        effects: usize,
        checksum: u64,
    },
    Event {
        seq: u64,
        event: PageEvent,
        effects: usize,
        checksum: u64,
        chain: u64,
    },
    Summary {
        events: u64,
        dropped: u64,
        final_chain: u64,
    },
}

impl TraceRecord {
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Bounded recorder for one page session.
#[derive(Debug, Clone)]
pub struct SessionTrace {
    header: TraceRecord,
    start: Option<TraceRecord>,
    events: VecDeque<TraceRecord>,
    capacity: usize,
    seq: u64,
    dropped: u64,
    chain: u64,
}

impl SessionTrace {
    #[must_use]
    pub fn new(controller: &PageController, registry: &ElementRegistry, capacity: usize) -> Self {
        Self {
            header: TraceRecord::Header {
                schema: SCHEMA_VERSION.to_owned(),
                armed: controller.armed().bits(),
                elements: registry.element_count(),
            },
            start: None,
            events: VecDeque::new(),
            capacity: capacity.max(1),
            seq: 0,
            dropped: 0,
            chain: 0,
        }
    }

    pub fn record_start(&mut self, effects: &[Effect]) {
        self.start = Some(TraceRecord::Start {
            effects: effects.len(),
            checksum: checksum_effects(effects),
        });
    }

    pub fn record(&mut self, event: &PageEvent, effects: &[Effect]) {
        let checksum = checksum_effects(effects);
        self.seq += 1;
        self.chain = chain(self.chain, checksum);
        if self.events.len() >= self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(TraceRecord::Event {
            seq: self.seq,
            event: event.clone(),
            effects: effects.len(),
            checksum,
            chain: self.chain,
        });
    }

    /// Events recorded so far, including dropped ones.
    #[must_use]
    pub const fn event_count(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub const fn chain(&self) -> u64 {
        self.chain
    }

    /// Header, start, retained events and a summary, in order.
    #[must_use]
    pub fn records(&self) -> Vec<TraceRecord> {
        let mut out = Vec::with_capacity(self.events.len() + 3);
        out.push(self.header.clone());
        out.extend(self.start.clone());
        out.extend(self.events.iter().cloned());
        out.push(TraceRecord::Summary {
            events: self.seq,
            dropped: self.dropped,
            final_chain: self.chain,
        });
        out
    }

    /// One JSON object per line.
    pub fn to_jsonl(&self) -> Result<Vec<String>, serde_json::Error> {
        self.records()
            .iter()
            .map(TraceRecord::to_json_string)
            .collect()
    }
}

/// Parse JSONL lines back into records. Blank lines are skipped.
pub fn parse_jsonl<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Vec<TraceRecord>, TraceError> {
    lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(|e| TraceError::Json(e.to_string())))
        .collect()
}

/// Outcome of [`replay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    pub events: u64,
    pub start_matches: bool,
    /// Sequence number of the first event whose effects differ.
    pub first_mismatch: Option<u64>,
}

impl ReplayReport {
    #[must_use]
    pub const fn ok(&self) -> bool {
        self.start_matches && self.first_mismatch.is_none()
    }
}

/// Re-run the recorded events through a fresh controller built from
/// `registry` and `config`, comparing effect checksums.
pub fn replay(
    registry: &ElementRegistry,
    config: &PageConfig,
    records: &[TraceRecord],
) -> Result<ReplayReport, TraceError> {
    match records.first() {
        Some(TraceRecord::Header { schema, .. }) if schema == SCHEMA_VERSION => {}
        Some(TraceRecord::Header { schema, .. }) => {
            return Err(TraceError::SchemaMismatch(schema.clone()));
        }
        _ => return Err(TraceError::MissingHeader),
    }

    let mut controller = PageController::new(registry, config);
    let start_effects = controller.start();
    let mut report = ReplayReport {
        events: 0,
        start_matches: true,
        first_mismatch: None,
    };
    let mut expected_seq = 1;

    for record in &records[1..] {
        match record {
            TraceRecord::Start { checksum, .. } => {
                report.start_matches = *checksum == checksum_effects(&start_effects);
            }
            TraceRecord::Event {
                seq,
                event,
                checksum,
                ..
            } => {
                if *seq != expected_seq {
                    return Err(TraceError::Truncated { first_seq: *seq });
                }
                expected_seq += 1;
                report.events += 1;
                let effects = controller.handle(event);
                if report.first_mismatch.is_none() && checksum_effects(&effects) != *checksum {
                    tracing::warn!(seq, "replay diverged");
                    report.first_mismatch = Some(*seq);
                }
            }
            TraceRecord::Header { .. } | TraceRecord::Summary { .. } => {}
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ElementId;

    fn registry() -> ElementRegistry {
        ElementRegistry::default()
            .with_pricing_switch(ElementId::new(0), false)
            .with_prices([ElementId::new(1)], [ElementId::new(2)])
            .with_reveal_targets([ElementId::new(3)])
    }

    fn recorded(capacity: usize, clicks: usize) -> SessionTrace {
        let registry = registry();
        let mut controller = PageController::new(&registry, &PageConfig::default());
        let mut trace = SessionTrace::new(&controller, &registry, capacity);
        trace.record_start(&controller.start());
        for _ in 0..clicks {
            let event = PageEvent::PricingSwitchClick;
            let effects = controller.handle(&event);
            trace.record(&event, &effects);
        }
        trace
    }

    #[test]
    fn checksum_depends_on_order() {
        let a = Effect::PreventDefault;
        let b = Effect::Observe {
            target: ElementId::new(1),
        };
        assert_ne!(
            checksum_effects(&[a.clone(), b.clone()]),
            checksum_effects(&[b, a])
        );
        assert_eq!(checksum_effects(&[]), FNV_OFFSET_BASIS);
    }

    #[test]
    fn jsonl_round_trip_replays_cleanly() {
        let trace = recorded(16, 3);
        let lines = trace.to_jsonl().expect("encode");
        assert_eq!(lines.len(), 6);
        assert!(lines[0].contains(SCHEMA_VERSION));

        let records = parse_jsonl(lines.iter().map(String::as_str)).expect("decode");
        let report = replay(&registry(), &PageConfig::default(), &records).expect("replay");
        assert_eq!(report.events, 3);
        assert!(report.ok());
    }

    #[test]
    fn replay_against_different_page_reports_divergence() {
        let records = recorded(16, 2).records();
        let other = ElementRegistry::default()
            .with_pricing_switch(ElementId::new(0), false)
            .with_reveal_targets([ElementId::new(3)]);
        let report = replay(&other, &PageConfig::default(), &records).expect("replay");
        assert_eq!(report.first_mismatch, Some(1));
        assert!(!report.ok());
    }

    #[test]
    fn bounded_trace_drops_oldest_and_refuses_replay() {
        let trace = recorded(2, 5);
        let records = trace.records();
        assert_eq!(trace.event_count(), 5);
        assert!(matches!(
            records.last(),
            Some(TraceRecord::Summary {
                events: 5,
                dropped: 3,
                ..
            })
        ));
        assert!(matches!(
            replay(&registry(), &PageConfig::default(), &records),
            Err(TraceError::Truncated { first_seq: 4 })
        ));
    }

    #[test]
    fn replay_requires_header() {
        assert!(matches!(
            replay(&registry(), &PageConfig::default(), &[]),
            Err(TraceError::MissingHeader)
        ));
        let bad = [TraceRecord::Header {
            schema: "other".into(),
            armed: 0,
            elements: 0,
        }];
        assert!(matches!(
            replay(&registry(), &PageConfig::default(), &bad),
            Err(TraceError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn header_reflects_features_after_disarm() {
        let registry = registry();
        let mut controller = PageController::new(&registry, &PageConfig::default());
        controller.disarm(crate::controller::ArmedFeatures::REVEAL);
        let trace = SessionTrace::new(&controller, &registry, 8);
        match trace.records().first() {
            Some(TraceRecord::Header { armed, .. }) => {
                assert_eq!(*armed, crate::controller::ArmedFeatures::PRICING.bits());
            }
            other => panic!("expected header, got {other:?}"),
        }
    }
}
