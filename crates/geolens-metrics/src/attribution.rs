//! Weighted source attribution.
//!
//! Each decision vector's weight is split across the sources cited for it.
//! Scored sources split by confidence; bare domain lists split by harmonic
//! rank decay, so the first-listed source carries the most. Summed per
//! domain across vectors this gives the power ranking.

use geolens_core::keyindex::KeyIndex;
use geolens_core::model::{DetailMap, Source, WeightMap, UNKNOWN_DOMAIN};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainPower {
    pub domain: String,
    pub power_score: f64,
    pub citation_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributionShare {
    pub vector: String,
    pub source: String,
    pub impact_share: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Attribution {
    /// Ascending by `power_score`; the strongest domains are at the tail.
    pub power_ranking: Vec<DomainPower>,
    pub breakdown: Vec<AttributionShare>,
}

impl Attribution {
    /// The `n` strongest domains, strongest first.
    pub fn top(&self, n: usize) -> Vec<&DomainPower> {
        self.power_ranking.iter().rev().take(n).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.power_ranking.is_empty()
    }
}

/// Lower-cased, trimmed domain; blank becomes the unknown bucket.
pub fn normalize_domain(domain: &str) -> String {
    let d = domain.trim().to_lowercase();
    if d.is_empty() {
        UNKNOWN_DOMAIN.to_lowercase()
    } else {
        d
    }
}

/// Split `weight` across `sources`.
///
/// If any source carries a confidence score the whole list is split by
/// confidence, with bare entries counting as score 1. Otherwise the i-th
/// source gets `1/(i+1)` normalized over the list. Shares always sum to
/// `weight` unless every confidence is zero.
pub fn vector_shares(weight: f64, sources: &[Source]) -> Vec<(String, f64)> {
    if sources.is_empty() {
        return Vec::new();
    }

    let scored = sources.iter().any(|s| s.score().is_some());
    if scored {
        let confidences: Vec<f64> = sources
            .iter()
            .map(|s| s.score().unwrap_or(1.0))
            .collect();
        let mut total: f64 = confidences.iter().sum();
        if total == 0.0 {
            total = 1.0;
        }
        sources
            .iter()
            .zip(confidences)
            .map(|(s, c)| (normalize_domain(s.domain()), c / total * weight))
            .collect()
    } else {
        let harmonic: f64 = (1..=sources.len()).map(|i| 1.0 / i as f64).sum();
        sources
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let share = (1.0 / (i + 1) as f64) / harmonic;
                (normalize_domain(s.domain()), share * weight)
            })
            .collect()
    }
}

/// Attribute every nonzero-weight vector of one snapshot.
pub fn attribute(weights: &WeightMap, details: &DetailMap) -> Attribution {
    let details = KeyIndex::new(details);

    let mut power: HashMap<String, (f64, usize)> = HashMap::new();
    let mut breakdown = Vec::new();

    for (vector, &weight) in weights {
        if weight == 0.0 || !weight.is_finite() {
            continue;
        }
        let Some(detail) = details.get(vector) else {
            tracing::debug!(event = "geolens.attribution.no_details", vector = %vector);
            continue;
        };

        for (domain, share) in vector_shares(weight, &detail.key_sources) {
            let entry = power.entry(domain.clone()).or_insert((0.0, 0));
            entry.0 += share;
            entry.1 += 1;
            breakdown.push(AttributionShare {
                vector: vector.clone(),
                source: domain,
                impact_share: share,
            });
        }
    }

    let mut power_ranking: Vec<DomainPower> = power
        .into_iter()
        .map(|(domain, (power_score, citation_count))| DomainPower {
            domain,
            power_score,
            citation_count,
        })
        .collect();
    power_ranking.sort_by(|a, b| {
        a.power_score
            .total_cmp(&b.power_score)
            .then_with(|| b.domain.cmp(&a.domain))
    });

    Attribution {
        power_ranking,
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geolens_core::model::VectorDetail;

    const EPS: f64 = 1e-9;

    fn scored(domain: &str, score: f64) -> Source {
        Source::Scored {
            domain: domain.into(),
            score,
        }
    }

    fn domain(d: &str) -> Source {
        Source::Domain(d.into())
    }

    fn details(pairs: Vec<(&str, Vec<Source>)>) -> DetailMap {
        pairs
            .into_iter()
            .map(|(k, key_sources)| {
                (
                    k.to_string(),
                    VectorDetail {
                        key_sources,
                        ..Default::default()
                    },
                )
            })
            .collect()
    }

    fn weights(pairs: &[(&str, f64)]) -> WeightMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_confidence_split() {
        let shares = vector_shares(40.0, &[scored("a", 9.0), scored("b", 1.0)]);
        assert!((shares[0].1 - 36.0).abs() < EPS);
        assert!((shares[1].1 - 4.0).abs() < EPS);
    }

    #[test]
    fn test_decay_split_sums_to_weight() {
        let shares = vector_shares(30.0, &[domain("x"), domain("y"), domain("z")]);
        let sum: f64 = shares.iter().map(|s| s.1).sum();
        assert!((sum - 30.0).abs() < EPS);
        assert!(shares[0].1 > shares[1].1 && shares[1].1 > shares[2].1);
        // 1 : 1/2 : 1/3 over 11/6
        assert!((shares[0].1 - 30.0 * 6.0 / 11.0).abs() < EPS);
    }

    #[test]
    fn test_zero_confidence_floor() {
        let shares = vector_shares(50.0, &[scored("a", 0.0), scored("b", 0.0)]);
        assert!(shares.iter().all(|s| s.1 == 0.0));
    }

    #[test]
    fn test_mixed_list_uses_confidence() {
        let shares = vector_shares(10.0, &[domain("a"), scored("b", 4.0)]);
        assert!((shares[0].1 - 2.0).abs() < EPS);
        assert!((shares[1].1 - 8.0).abs() < EPS);
    }

    #[test]
    fn test_domains_are_case_normalized() {
        let w = weights(&[("Price", 60.0), ("Comfort", 40.0)]);
        let d = details(vec![
            ("Price", vec![scored("Amazon.com ", 1.0)]),
            ("Comfort", vec![domain("amazon.com")]),
        ]);
        let a = attribute(&w, &d);
        assert_eq!(a.power_ranking.len(), 1);
        assert_eq!(a.power_ranking[0].domain, "amazon.com");
        assert!((a.power_ranking[0].power_score - 100.0).abs() < EPS);
        assert_eq!(a.power_ranking[0].citation_count, 2);
        assert_eq!(a.breakdown.len(), 2);
    }

    #[test]
    fn test_case_insensitive_detail_lookup_and_zero_weights() {
        let w = weights(&[("price", 60.0), ("Durability", 0.0), ("Missing", 40.0)]);
        let d = details(vec![
            ("Price", vec![scored("a.com", 3.0), scored("b.com", 1.0)]),
            ("Durability", vec![domain("c.com")]),
        ]);
        let a = attribute(&w, &d);
        let domains: Vec<_> = a.power_ranking.iter().map(|p| p.domain.as_str()).collect();
        assert_eq!(domains, vec!["b.com", "a.com"], "ascending by score");
        assert_eq!(a.top(1)[0].domain, "a.com");
        assert!((a.top(1)[0].power_score - 45.0).abs() < EPS);
        assert!(a.breakdown.iter().all(|s| s.vector == "price"));
    }

    #[test]
    fn test_unknown_domain_bucket() {
        let shares = vector_shares(10.0, &[domain("  ")]);
        assert_eq!(shares[0].0, "unknown");
        assert!((shares[0].1 - 10.0).abs() < EPS);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(attribute(&WeightMap::new(), &DetailMap::new()).is_empty());
    }
}
