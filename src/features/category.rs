//! Competition categories
//!
//! Maps free-text competition names onto international / club / unknown
//! flags using explicit name lists.

use polars::prelude::*;
use std::collections::HashSet;

use crate::data::{require_absent, text_values};
use crate::{CompetitionConfig, Result};

pub const INTERNATIONAL_COLUMN: &str = "international_competition";
pub const CLUB_COLUMN: &str = "club_competition";
pub const UNKNOWN_COLUMN: &str = "unknown_competition";

/// Flag columns in the order they are appended
pub const CATEGORY_COLUMNS: [&str; 3] = [INTERNATIONAL_COLUMN, CLUB_COLUMN, UNKNOWN_COLUMN];

/// Category flags for one competition name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryFlags {
    pub international: bool,
    pub club: bool,
    pub unknown: bool,
}

impl CategoryFlags {
    fn to_array(self) -> [bool; 3] {
        [self.international, self.club, self.unknown]
    }
}

/// Membership lists for international and club competitions
#[derive(Debug, Clone, Default)]
pub struct CompetitionCategories {
    international: HashSet<String>,
    club: HashSet<String>,
}

impl CompetitionCategories {
    pub fn new<S: AsRef<str>>(international: &[S], club: &[S]) -> Self {
        let set = |names: &[S]| -> HashSet<String> {
            names.iter().map(|s| s.as_ref().to_string()).collect()
        };
        CompetitionCategories {
            international: set(international),
            club: set(club),
        }
    }

    pub fn from_config(config: &CompetitionConfig) -> Self {
        Self::new(&config.international, &config.club)
    }

    /// A name on both lists gets both flags; a missing name is unknown.
    pub fn flags(&self, competition: Option<&str>) -> CategoryFlags {
        let Some(name) = competition else {
            return CategoryFlags {
                unknown: true,
                ..Default::default()
            };
        };
        let international = self.international.contains(name);
        let club = self.club.contains(name);
        CategoryFlags {
            international,
            club,
            unknown: !international && !club,
        }
    }

    /// Append the three flag columns, optionally dropping the source column
    pub fn classify(&self, df: &DataFrame, column: &str, drop_original: bool) -> Result<DataFrame> {
        let flags: Vec<CategoryFlags> = text_values(df, column)?
            .iter()
            .map(|name| self.flags(name.as_deref()))
            .collect();
        for name in CATEGORY_COLUMNS {
            require_absent(df, name)?;
        }

        let flag_columns: Vec<Column> = CATEGORY_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let values: Vec<i64> = flags.iter().map(|f| f.to_array()[i] as i64).collect();
                Column::new((*name).into(), values)
            })
            .collect();

        let mut output = df.hstack(&flag_columns)?;
        if drop_original {
            output = output.drop(column)?;
        }

        let unknown = flags.iter().filter(|f| f.unknown).count();
        if unknown > 0 {
            log::debug!("{} rows have an unmapped competition", unknown);
        }
        Ok(output)
    }
}
