//! Heuristic distance functions for grid A*
//!
//! Every heuristic is a pure function of two grid cells. Edge costs in the
//! grid are scaled by 10 (straight 10, diagonal 14); only `Octile` uses the
//! same scale; the remaining distances count one unit per cell and are
//! therefore much looser estimates.
//!
//! | name | admissible | consistent |
//! |---|---|---|
//! | manhattan, euclidean, chebyshev, octile | yes | yes |
//! | minkowski(p) | yes for p >= 1 | yes for p >= 1 |
//! | weighted_euclidean(w) | treated as yes only for w <= 1 | same |
//! | hamming, canberra | no | no |

use std::collections::BTreeMap;
use std::str::FromStr;

use log::warn;

use crate::common::{GridNode, PathfindingError, PathfindingResult};

/// Weight of the registered `weighted_euclidean` entry
pub const DEFAULT_EUCLIDEAN_WEIGHT: f64 = 1.2;
/// Exponent of the registered `minkowski` entry
pub const DEFAULT_MINKOWSKI_P: f64 = 3.0;
/// Heuristic used when a name is not registered
pub const FALLBACK_HEURISTIC: &str = "euclidean";

/// Distance estimate strategies
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Heuristic {
    /// `dx + dy`
    Manhattan,
    /// `sqrt(dx^2 + dy^2)`
    Euclidean,
    /// `max(dx, dy)`
    Chebyshev,
    /// `14 * min(dx, dy) + 10 * (max - min)`, exact on an empty grid
    Octile,
    /// Number of axes on which the cells differ
    Hamming,
    /// `w * euclidean`
    WeightedEuclidean(f64),
    /// `sum |d_axis| / (|a_axis| + |b_axis|)`, skipping zero denominators
    Canberra,
    /// `(dx^p + dy^p)^(1/p)`, tends to chebyshev as `p` grows
    Minkowski(f64),
    /// Weighted A* decorator: `weight * base`
    Weighted { base: Box<Heuristic>, weight: f64 },
}

impl Heuristic {
    /// Wrap `base` for weighted A*. `weight > 1` trades optimality for
    /// fewer expansions.
    pub fn weighted(base: Heuristic, weight: f64) -> Self {
        Heuristic::Weighted {
            base: Box::new(base),
            weight,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Heuristic::Manhattan => "manhattan".to_string(),
            Heuristic::Euclidean => "euclidean".to_string(),
            Heuristic::Chebyshev => "chebyshev".to_string(),
            Heuristic::Octile => "octile".to_string(),
            Heuristic::Hamming => "hamming".to_string(),
            Heuristic::WeightedEuclidean(_) => "weighted_euclidean".to_string(),
            Heuristic::Canberra => "canberra".to_string(),
            Heuristic::Minkowski(_) => "minkowski".to_string(),
            Heuristic::Weighted { base, weight } => format!("weighted_{}_{}", base.name(), weight),
        }
    }

    /// Listed as never overestimating the remaining path cost
    pub fn is_admissible(&self) -> bool {
        match self {
            Heuristic::Manhattan
            | Heuristic::Euclidean
            | Heuristic::Chebyshev
            | Heuristic::Octile => true,
            Heuristic::Minkowski(p) => *p >= 1.0,
            Heuristic::WeightedEuclidean(w) => *w <= 1.0,
            Heuristic::Weighted { base, weight } => base.is_admissible() && *weight <= 1.0,
            Heuristic::Hamming | Heuristic::Canberra => false,
        }
    }

    /// Listed as satisfying `h(a) <= cost(a, b) + h(b)` for every move,
    /// so a cell is never closed before its cheapest path is known
    pub fn is_consistent(&self) -> bool {
        match self {
            Heuristic::Manhattan
            | Heuristic::Euclidean
            | Heuristic::Chebyshev
            | Heuristic::Octile => true,
            Heuristic::Minkowski(p) => *p >= 1.0,
            Heuristic::WeightedEuclidean(w) => *w <= 1.0,
            Heuristic::Weighted { base, weight } => base.is_consistent() && *weight <= 1.0,
            Heuristic::Hamming | Heuristic::Canberra => false,
        }
    }

    /// Estimate the cost from `a` to `b`.
    ///
    /// Fails with `HeuristicEvaluation` on invalid parameters or when the
    /// result is not a finite, non-negative number.
    pub fn evaluate(&self, a: GridNode, b: GridNode) -> PathfindingResult<f64> {
        self.check_parameters()?;
        let value = self.raw(a, b);
        if !value.is_finite() || value < 0.0 {
            return Err(self.failure(format!(
                "estimate between ({}, {}) and ({}, {}) is {}",
                a.x, a.y, b.x, b.y, value
            )));
        }
        Ok(value)
    }

    fn raw(&self, a: GridNode, b: GridNode) -> f64 {
        let (dx, dy) = a.deltas(&b);
        let (dx, dy) = (dx as f64, dy as f64);
        match self {
            Heuristic::Manhattan => dx + dy,
            Heuristic::Euclidean => dx.hypot(dy),
            Heuristic::Chebyshev => dx.max(dy),
            Heuristic::Octile => {
                let diagonal = dx.min(dy);
                14.0 * diagonal + 10.0 * (dx.max(dy) - diagonal)
            }
            Heuristic::Hamming => ((a.x != b.x) as u8 + (a.y != b.y) as u8) as f64,
            Heuristic::WeightedEuclidean(w) => w * dx.hypot(dy),
            Heuristic::Canberra => {
                let axis = |d: f64, p: i32, q: i32| {
                    let denominator = (p.abs() + q.abs()) as f64;
                    if denominator == 0.0 {
                        0.0
                    } else {
                        d / denominator
                    }
                };
                axis(dx, a.x, b.x) + axis(dy, a.y, b.y)
            }
            Heuristic::Minkowski(p) => {
                // factor out the larger delta so dx^p cannot overflow
                let m = dx.max(dy);
                if m == 0.0 {
                    0.0
                } else {
                    m * ((dx / m).powf(*p) + (dy / m).powf(*p)).powf(1.0 / p)
                }
            }
            Heuristic::Weighted { base, weight } => weight * base.raw(a, b),
        }
    }

    fn check_parameters(&self) -> PathfindingResult<()> {
        match self {
            Heuristic::WeightedEuclidean(w) if !w.is_finite() || *w < 0.0 => {
                Err(self.failure(format!("weight must be finite and >= 0, got {}", w)))
            }
            Heuristic::Minkowski(p) if !p.is_finite() || *p <= 0.0 => {
                Err(self.failure(format!("exponent must be finite and > 0, got {}", p)))
            }
            Heuristic::Weighted { weight, .. } if !weight.is_finite() || *weight < 0.0 => {
                Err(self.failure(format!("weight must be finite and >= 0, got {}", weight)))
            }
            Heuristic::Weighted { base, .. } => base.check_parameters(),
            _ => Ok(()),
        }
    }

    fn failure(&self, reason: String) -> PathfindingError {
        PathfindingError::HeuristicEvaluation {
            heuristic: self.name(),
            reason,
        }
    }
}

impl Default for Heuristic {
    fn default() -> Self {
        Heuristic::Euclidean
    }
}

impl FromStr for Heuristic {
    type Err = PathfindingError;

    /// Parse a registered name, with the registry's default parameters
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HeuristicRegistry::default()
            .get(s)
            .cloned()
            .ok_or_else(|| PathfindingError::InvalidParameter(format!("unknown heuristic '{}'", s)))
    }
}

/// Named heuristics, in registration order
#[derive(Debug, Clone)]
pub struct HeuristicRegistry {
    entries: Vec<(String, Heuristic)>,
}

impl HeuristicRegistry {
    /// Registry without any entries
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Add or replace a named heuristic
    pub fn register(&mut self, name: impl Into<String>, heuristic: Heuristic) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = heuristic,
            None => self.entries.push((name, heuristic)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Heuristic> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, h)| h)
    }

    /// Look up `name`, falling back to euclidean for unknown names
    pub fn resolve(&self, name: &str) -> Heuristic {
        match self.get(name) {
            Some(heuristic) => heuristic.clone(),
            None => {
                warn!(
                    "unknown heuristic '{}', falling back to {}",
                    name, FALLBACK_HEURISTIC
                );
                self.get(FALLBACK_HEURISTIC).cloned().unwrap_or(Heuristic::Euclidean)
            }
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evaluate every registered heuristic for one pair of cells.
    /// A heuristic that fails to evaluate reports positive infinity.
    pub fn compare(&self, a: GridNode, b: GridNode) -> BTreeMap<String, f64> {
        self.entries
            .iter()
            .map(|(name, heuristic)| {
                let value = heuristic.evaluate(a, b).unwrap_or(f64::INFINITY);
                (name.clone(), value)
            })
            .collect()
    }
}

impl Default for HeuristicRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("manhattan", Heuristic::Manhattan);
        registry.register("euclidean", Heuristic::Euclidean);
        registry.register("chebyshev", Heuristic::Chebyshev);
        registry.register("octile", Heuristic::Octile);
        registry.register("hamming", Heuristic::Hamming);
        registry.register(
            "weighted_euclidean",
            Heuristic::WeightedEuclidean(DEFAULT_EUCLIDEAN_WEIGHT),
        );
        registry.register("canberra", Heuristic::Canberra);
        registry.register("minkowski", Heuristic::Minkowski(DEFAULT_MINKOWSKI_P));
        registry
    }
}
