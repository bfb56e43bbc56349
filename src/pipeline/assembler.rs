//! Feature assembly
//!
//! Runs every stage in a fixed order over a raw match table:
//! competition exclusion, nil-all filtering, reshaping to team rows,
//! competition categories, then one rolling feature per tracked attribute.
//! The grouping and sorting keys come from one place so every rolling
//! feature is computed over the same ordering.

use polars::prelude::*;
use std::collections::HashSet;

use crate::data::{require_absent, require_columns, text_values};
use crate::features::attributes::add_result_labels;
use crate::features::category::CATEGORY_COLUMNS;
use crate::features::lag::rolling_column_name;
use crate::features::{
    CompetitionCategories, CompetitionFilter, EntityReshaper, LagWindowEngine, ResultFilter,
};
use crate::{Config, Result, TeamSlot};

/// Features and target, row-aligned
#[derive(Debug, Clone)]
pub struct ModelingTable {
    pub features: DataFrame,
    pub target: DataFrame,
}

impl ModelingTable {
    pub fn len(&self) -> usize {
        self.features.height()
    }

    pub fn is_empty(&self) -> bool {
        self.features.height() == 0
    }

    /// Features with the target as the last column
    pub fn to_table(&self) -> Result<DataFrame> {
        for column in self.target.get_column_names() {
            require_absent(&self.features, column)?;
        }
        Ok(self.features.hstack(self.target.get_columns())?)
    }
}

/// Overview of a raw match table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSummary {
    pub matches: usize,
    pub teams: usize,
    pub excluded: usize,
    pub nil_draws: usize,
    pub international: usize,
    pub club: usize,
    pub unknown: usize,
}

/// Project a frame onto its feature columns and its target column
pub fn split<S: AsRef<str>>(
    df: &DataFrame,
    feature_columns: &[S],
    target_column: &str,
) -> Result<(DataFrame, DataFrame)> {
    require_columns(df, feature_columns)?;
    require_columns(df, &[target_column])?;
    let features = df.select(feature_columns.iter().map(|c| c.as_ref()))?;
    let target = df.select([target_column])?;
    Ok((features, target))
}

/// Builds the modeling table from raw match rows
pub struct FeatureAssembler {
    config: Config,
    competition_filter: CompetitionFilter,
    result_filter: ResultFilter,
    reshaper: EntityReshaper,
    categories: CompetitionCategories,
    lag: LagWindowEngine,
}

impl FeatureAssembler {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(FeatureAssembler {
            competition_filter: CompetitionFilter::new(
                config.columns.competition.clone(),
                &config.competitions.excluded,
            ),
            result_filter: ResultFilter::for_attribute(&config.columns.score),
            reshaper: EntityReshaper::from_config(&config.columns),
            categories: CompetitionCategories::from_config(&config.competitions),
            lag: LagWindowEngine::from_config(&config.rolling)?,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Names of the rolling features, one per tracked attribute
    pub fn rolling_columns(&self) -> Vec<String> {
        self.config
            .rolling
            .attributes
            .iter()
            .map(|a| rolling_column_name(self.lag.window(), a))
            .collect()
    }

    /// Context features, then category flags, then rolling features
    pub fn feature_columns(&self) -> Vec<String> {
        let mut columns = self.config.model.features.clone();
        columns.extend(CATEGORY_COLUMNS.iter().map(|c| c.to_string()));
        columns.extend(self.rolling_columns());
        columns
    }

    /// Every stage up to and including the rolling features
    pub fn team_table(&self, matches: &DataFrame) -> Result<DataFrame> {
        let columns = &self.config.columns;

        let mut df = self.competition_filter.apply(matches)?;
        df = self.with_result_labels(df)?;
        df = self.result_filter.apply(&df)?;
        let valid_matches = df.height();

        df = self.reshaper.reshape(&df)?;
        df = self.categories.classify(
            &df,
            &columns.competition,
            self.config.competitions.drop_original,
        )?;

        for attribute in &self.config.rolling.attributes {
            df = self
                .lag
                .compute(&df, attribute, &self.config.rolling.grouping_key)?;
        }

        log::info!(
            "Built {} team rows from {} valid matches ({} input rows)",
            df.height(),
            valid_matches,
            matches.height()
        );
        Ok(df)
    }

    /// Full pipeline, ending in the feature/target split
    pub fn assemble(&self, matches: &DataFrame) -> Result<ModelingTable> {
        let df = self.team_table(matches)?;
        let (features, target) = split(&df, &self.feature_columns(), &self.config.model.target)?;
        Ok(ModelingTable { features, target })
    }

    /// Derive result labels from scores when the input carries none
    fn with_result_labels(&self, df: DataFrame) -> Result<DataFrame> {
        let columns = &self.config.columns;
        if !columns.team_attributes.contains(&columns.result)
            || df
                .get_column_index(&TeamSlot::First.column(&columns.result))
                .is_some()
        {
            return Ok(df);
        }

        log::info!("No {} column in input, deriving it from scores", columns.result);
        let mut df = df;
        for slot in TeamSlot::ALL {
            df = add_result_labels(&df, slot, &columns.score, &columns.result)?;
        }
        Ok(df)
    }

    /// Counts describing a raw match table, without transforming it
    pub fn inspect(&self, matches: &DataFrame) -> Result<InputSummary> {
        let competitions = text_values(matches, &self.config.columns.competition)?;

        let mut teams = HashSet::new();
        for slot in TeamSlot::ALL {
            let ids = text_values(matches, &slot.column(&self.config.rolling.grouping_key))?;
            teams.extend(ids.into_iter().flatten());
        }

        let mut summary = InputSummary {
            matches: matches.height(),
            teams: teams.len(),
            nil_draws: self.result_filter.count_invalid(matches)?,
            ..Default::default()
        };

        for name in &competitions {
            let name = name.as_deref();
            if self.competition_filter.is_excluded(name) {
                summary.excluded += 1;
            }
            let flags = self.categories.flags(name);
            summary.international += flags.international as usize;
            summary.club += flags.club as usize;
            summary.unknown += flags.unknown as usize;
        }

        Ok(summary)
    }
}
