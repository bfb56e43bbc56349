//! Match filtering
//!
//! Removes rows that should never reach feature derivation: nil-all draws
//! (assumed to be unplayed or invalid results) and excluded competitions.

use polars::prelude::*;
use std::collections::HashSet;

use crate::data::{require_column, text_values};
use crate::{Result, TeamSlot};

/// Drops matches where both teams' scores are zero
#[derive(Debug, Clone)]
pub struct ResultFilter {
    score_a: String,
    score_b: String,
}

impl Default for ResultFilter {
    fn default() -> Self {
        Self::for_attribute("score")
    }
}

impl ResultFilter {
    pub fn new(score_a: impl Into<String>, score_b: impl Into<String>) -> Self {
        ResultFilter {
            score_a: score_a.into(),
            score_b: score_b.into(),
        }
    }

    /// Filter on `team_1_<attribute>` and `team_2_<attribute>`
    pub fn for_attribute(attribute: &str) -> Self {
        Self::new(
            TeamSlot::First.column(attribute),
            TeamSlot::Second.column(attribute),
        )
    }

    /// Both score columns are resolved before any row is looked at, so a
    /// wrong name fails instead of letting every row through.
    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame> {
        require_column(df, &self.score_a)?;
        require_column(df, &self.score_b)?;

        let filtered = df.clone().lazy().filter(self.nil_all().not()).collect()?;

        let removed = df.height() - filtered.height();
        if removed > 0 {
            log::info!("Dropped {} nil-all results", removed);
        }
        Ok(filtered)
    }

    /// Number of rows `apply` would remove
    pub fn count_invalid(&self, df: &DataFrame) -> Result<usize> {
        require_column(df, &self.score_a)?;
        require_column(df, &self.score_b)?;
        let invalid = df.clone().lazy().filter(self.nil_all()).collect()?;
        Ok(invalid.height())
    }

    /// Both scores zero; a missing score is not zero
    fn nil_all(&self) -> Expr {
        col(self.score_a.as_str())
            .eq(lit(0))
            .and(col(self.score_b.as_str()).eq(lit(0)))
            .fill_null(lit(false))
    }
}

/// Drops matches from competitions on an exclusion list
#[derive(Debug, Clone)]
pub struct CompetitionFilter {
    column: String,
    excluded: HashSet<String>,
}

impl CompetitionFilter {
    pub fn new<S: AsRef<str>>(column: impl Into<String>, excluded: &[S]) -> Self {
        CompetitionFilter {
            column: column.into(),
            excluded: excluded.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    pub fn is_excluded(&self, competition: Option<&str>) -> bool {
        competition.map_or(false, |name| self.excluded.contains(name))
    }

    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame> {
        let keep: BooleanChunked = text_values(df, &self.column)?
            .iter()
            .map(|name| !self.is_excluded(name.as_deref()))
            .collect();
        let filtered = df.filter(&keep)?;

        let removed = df.height() - filtered.height();
        if removed > 0 {
            log::info!("Dropped {} matches from excluded competitions", removed);
        }
        Ok(filtered)
    }
}
