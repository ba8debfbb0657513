use siphasher::sip::SipHasher13;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use tick_core::{DecisionRef, Side, Signal, StrategyDecision};

/// Resolved merge outcome before it is stamped into an `OrderIntent`.
#[derive(Clone, Debug, PartialEq)]
pub struct IntentSpec {
    pub side: Side,
    pub quantity: f64,
    pub reference_price: f64,
    pub decisions: Vec<DecisionRef>,
}

/// Deterministic precedence: explicit strategy priority first, then
/// triggering-tick recency, then strategy name as the stable tie-break.
fn precedence(a: &StrategyDecision, b: &StrategyDecision) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| {
            if a.trigger.is_newer_than(&b.trigger) {
                Ordering::Less
            } else if b.trigger.is_newer_than(&a.trigger) {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| a.strategy.cmp(&b.strategy))
}

fn signed_weight(decision: &StrategyDecision) -> f64 {
    match decision.signal {
        Signal::Buy => decision.strength * decision.qty_hint,
        Signal::Sell => -decision.strength * decision.qty_hint,
        Signal::Hold => 0.0,
    }
}

/// Reduce one instrument's retained decisions to at most one intent.
///
/// Pure: the same decision set in any order yields the same outcome.
/// Opposing weights cancel; a net of zero (all holds, or balanced
/// buy/sell) emits nothing.
pub fn resolve_intent(decisions: &[StrategyDecision]) -> Option<IntentSpec> {
    if decisions.is_empty() {
        return None;
    }

    let mut ranked: Vec<&StrategyDecision> = decisions.iter().collect();
    ranked.sort_by(|a, b| precedence(a, b));

    let net: f64 = ranked.iter().map(|d| signed_weight(d)).sum();
    if net.abs() < f64::EPSILON {
        return None;
    }

    let side = if net > 0.0 { Side::Buy } else { Side::Sell };
    let winning_signal = if net > 0.0 { Signal::Buy } else { Signal::Sell };

    // Reference price comes from the top-ranked decision on the winning side.
    let lead = ranked.iter().find(|d| d.signal == winning_signal)?;

    Some(IntentSpec {
        side,
        quantity: net.abs(),
        reference_price: lead.trigger.price,
        decisions: ranked
            .iter()
            .map(|d| DecisionRef { strategy: d.strategy.clone(), decision_key: d.natural_key() })
            .collect(),
    })
}

/// Stable fingerprint of a merged decision set. Used to suppress duplicate
/// intents when at-least-once delivery re-sends decisions the coordinator
/// has already acted on.
pub fn merge_fingerprint(decisions: &[StrategyDecision]) -> u64 {
    let mut keys: Vec<String> = decisions.iter().map(|d| d.natural_key()).collect();
    keys.sort();

    let mut hasher = SipHasher13::new();
    for key in keys {
        key.hash(&mut hasher);
    }
    hasher.finish()
}
