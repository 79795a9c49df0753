//! Level thresholds and the pure level calculator.
//!
//! RULE: A level is derived from total points only. Nothing stores a
//! level that the table could not have produced.

use crate::{
    error::{LedgerError, LedgerResult},
    types::Points,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelThreshold {
    pub level:      u32,
    pub min_points: Points,
    pub title:      String,
}

/// An ascending, validated threshold table. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LevelTable {
    thresholds: Vec<LevelThreshold>,
}

/// Level state for display: where the user is and how far to the next tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub level:            u32,
    pub title:            String,
    pub min_points:       Points,
    pub next_level:       Option<u32>,
    pub next_title:       Option<String>,
    pub next_min_points:  Option<Points>,
    pub points_to_next:   Option<Points>,
    pub progress_percent: f64,
}

impl LevelTable {
    pub fn new(thresholds: Vec<LevelThreshold>) -> LedgerResult<Self> {
        let first = thresholds
            .first()
            .ok_or_else(|| LedgerError::config("level table is empty"))?;
        if first.min_points != 0 {
            return Err(LedgerError::config(format!(
                "first level must start at 0 points, got {}",
                first.min_points
            )));
        }
        for pair in thresholds.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.min_points <= prev.min_points {
                return Err(LedgerError::config(format!(
                    "level {} min_points {} is not above level {} min_points {}",
                    next.level, next.min_points, prev.level, prev.min_points
                )));
            }
            if prev.level.checked_add(1) != Some(next.level) {
                return Err(LedgerError::config(format!(
                    "level numbers must be consecutive: {} follows {}",
                    next.level, prev.level
                )));
            }
        }
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &[LevelThreshold] {
        &self.thresholds
    }

    /// The entry tier every new account starts on.
    pub fn base(&self) -> &LevelThreshold {
        &self.thresholds[0]
    }

    /// Highest threshold whose `min_points <= total_points`.
    pub fn level_of(&self, total_points: Points) -> &LevelThreshold {
        self.thresholds
            .iter()
            .take_while(|t| t.min_points <= total_points)
            .last()
            .unwrap_or_else(|| self.base())
    }

    /// The tier after `level`, or `None` at the top.
    pub fn next_level(&self, level: u32) -> Option<&LevelThreshold> {
        self.thresholds.iter().find(|t| t.level > level)
    }

    /// Progress through the current tier, clamped to [0, 100]. 100 at max level.
    pub fn progress_percent(&self, total_points: Points) -> f64 {
        let current = self.level_of(total_points);
        match self.next_level(current.level) {
            None => 100.0,
            Some(next) => {
                let span = (next.min_points - current.min_points) as f64;
                let into = (total_points - current.min_points) as f64;
                (into / span * 100.0).clamp(0.0, 100.0)
            }
        }
    }

    pub fn info(&self, total_points: Points) -> LevelInfo {
        let current = self.level_of(total_points);
        let next = self.next_level(current.level);
        LevelInfo {
            level:            current.level,
            title:            current.title.clone(),
            min_points:       current.min_points,
            next_level:       next.map(|n| n.level),
            next_title:       next.map(|n| n.title.clone()),
            next_min_points:  next.map(|n| n.min_points),
            points_to_next:   next.map(|n| (n.min_points - total_points).max(0)),
            progress_percent: self.progress_percent(total_points),
        }
    }
}

impl<'de> Deserialize<'de> for LevelTable {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let thresholds = Vec::<LevelThreshold>::deserialize(d)?;
        LevelTable::new(thresholds).map_err(serde::de::Error::custom)
    }
}
