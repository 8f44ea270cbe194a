use crate::config::DisruptionConfig;
use crate::types::{ClassifiedRecord, DisruptionImpact};
use crate::util::{mean, round1, round1_opt};
use tracing::{info, warn};

/// Percent change from `base` to `value`; 0 when the base is missing or not
/// positive.
fn pct_change(base: Option<f64>, value: Option<f64>) -> f64 {
    match (base, value) {
        (Some(b), Some(v)) if b > 0.0 => (v - b) / b * 100.0,
        _ => 0.0,
    }
}

fn window_mean(
    data: &[ClassifiedRecord],
    in_window: impl Fn(&ClassifiedRecord) -> bool,
) -> Option<f64> {
    let values: Vec<f64> = data
        .iter()
        .filter(|r| in_window(r))
        .map(|r| r.punctuality_rate_mean)
        .collect();
    mean(&values)
}

/// Compare mean punctuality before, during and after the disruption period.
///
/// An empty window leaves its mean as `None`; percentages depending on it
/// fall back to 0 and `improved` is false.
pub fn disruption_impact(data: &[ClassifiedRecord], cfg: &DisruptionConfig) -> DisruptionImpact {
    let pre = window_mean(data, |r| r.date < cfg.pre_end);
    let during = window_mean(data, |r| r.date >= cfg.during_start && r.date < cfg.during_end);
    let post = window_mean(data, |r| r.date >= cfg.post_start);

    for (name, value) in [("pre", pre), ("during", during), ("post", post)] {
        if value.is_none() {
            warn!(window = name, "Disruption comparison window has no rows");
        }
    }

    let improved = match (pre, post) {
        (Some(p), Some(q)) => q > p * (1.0 + cfg.improvement_threshold),
        _ => false,
    };

    let impact = DisruptionImpact {
        pre_mean: round1_opt(pre),
        during_mean: round1_opt(during),
        post_mean: round1_opt(post),
        impact_pct: round1(pct_change(pre, during)),
        recovery_pct: round1(pct_change(during, post)),
        improved,
    };
    info!(
        impact_pct = impact.impact_pct,
        recovery_pct = impact.recovery_pct,
        improved,
        "Computed disruption impact"
    );
    impact
}
