use std::{fmt::Display, str::FromStr};

use crate::Error;

/// Monotone test deciding whether a database vector may contain a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Containment, // every feature of the query is present in the database graph
    Dominance,   // componentwise q[i] <= d[i]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Longest enumerated path, in edges.
    pub max_path_len: usize,
    pub min_support_ratio: f64,
    pub max_support_ratio: f64,
    /// Number of features kept after ranking.
    pub top_k: usize,
    /// Maximum number of search steps the cycle enumeration may spend on a
    /// single graph before its rings are dropped.
    pub cycle_budget: usize,
    pub predicate: Predicate,
}

impl Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for Predicate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "containment" | "CONTAINMENT" | "bool" => Ok(Predicate::Containment),
            "dominance" | "DOMINANCE" | "count" => Ok(Predicate::Dominance),
            _ => Err(Error::InvalidConfig(format!("unsupported predicate {}", s))),
        }
    }
}

impl Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "len={}/support=[{}, {}]/k={}/{}",
            self.max_path_len,
            self.min_support_ratio,
            self.max_support_ratio,
            self.top_k,
            self.predicate
        )
    }
}

impl Config {
    pub fn new(
        max_path_len: usize,
        min_support_ratio: f64,
        max_support_ratio: f64,
        top_k: usize,
    ) -> Self {
        Config {
            max_path_len,
            min_support_ratio,
            max_support_ratio,
            top_k,
            ..Config::default()
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let in_range = |ratio: f64| (0.0..=1.0).contains(&ratio);

        if !in_range(self.min_support_ratio) || !in_range(self.max_support_ratio) {
            return Err(Error::InvalidConfig(format!(
                "support ratios must lie in [0, 1], got [{}, {}]",
                self.min_support_ratio, self.max_support_ratio
            )));
        }
        if self.min_support_ratio > self.max_support_ratio {
            return Err(Error::InvalidConfig(format!(
                "min support ratio {} exceeds max support ratio {}",
                self.min_support_ratio, self.max_support_ratio
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_path_len: 6,
            min_support_ratio: 0.01,
            max_support_ratio: 0.60,
            top_k: 50,
            cycle_budget: 1_000_000,
            predicate: Predicate::Containment,
        }
    }
}

impl From<Predicate> for Config {
    fn from(predicate: Predicate) -> Self {
        Config {
            predicate,
            ..Config::default()
        }
    }
}
