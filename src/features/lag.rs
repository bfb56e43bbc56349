//! Lagged rolling averages
//!
//! For a value column and a grouping key (usually team identity), computes
//! each row's previous value within its group in chronological order, then
//! the mean of the last `window` previous values. A row's own value never
//! feeds into its own feature, so the result is safe to train on.

use polars::prelude::*;

use crate::data::{require_absent, require_column};
use crate::{FeatureError, Result, RollingConfig};

const ROW_INDEX: &str = "__row";
const PREVIOUS: &str = "__previous";
const ROLLING: &str = "__rolling";

/// Name of the rolling average column, e.g. `rolling_5_score`
pub fn rolling_column_name(window: usize, value_column: &str) -> String {
    format!("rolling_{}_{}", window, value_column)
}

/// Per-row lag results, in sorted order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaggedFeature {
    /// Index of the row in the input frame
    pub row: usize,
    pub previous_value: Option<f64>,
    pub rolling_average: Option<f64>,
}

/// Computes lagged rolling averages per group
#[derive(Debug, Clone)]
pub struct LagWindowEngine {
    window: usize,
    sorting_key: String,
    impute: bool,
}

impl Default for LagWindowEngine {
    fn default() -> Self {
        LagWindowEngine {
            window: 5,
            sorting_key: "match_date".to_string(),
            impute: true,
        }
    }
}

impl LagWindowEngine {
    pub fn new(window: usize, sorting_key: impl Into<String>, impute: bool) -> Result<Self> {
        if window == 0 {
            return Err(FeatureError::Config(
                "rolling window must be at least 1".to_string(),
            ));
        }
        Ok(LagWindowEngine {
            window,
            sorting_key: sorting_key.into(),
            impute,
        })
    }

    pub fn from_config(config: &RollingConfig) -> Result<Self> {
        Self::new(config.window, config.sorting_key.clone(), config.impute)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Previous value and rolling average for every row, in stable
    /// chronological order.
    pub fn lagged(
        &self,
        df: &DataFrame,
        value_column: &str,
        grouping_key: &str,
    ) -> Result<Vec<LaggedFeature>> {
        self.check_columns(df, value_column, grouping_key)?;

        let lagged = self
            .sorted(df.clone().lazy().with_row_index(ROW_INDEX, None))
            .select([
                col(ROW_INDEX),
                self.previous(value_column, grouping_key).alias(PREVIOUS),
                self.rolling(value_column, grouping_key).alias(ROLLING),
            ])
            .collect()?;

        let rows = lagged.column(ROW_INDEX)?.as_materialized_series().idx()?;
        let previous = lagged.column(PREVIOUS)?.as_materialized_series().f64()?;
        let rolling = lagged.column(ROLLING)?.as_materialized_series().f64()?;

        Ok(rows
            .into_iter()
            .zip(previous)
            .zip(rolling)
            .map(|((row, previous_value), rolling_average)| LaggedFeature {
                row: row.unwrap_or_default() as usize,
                previous_value,
                rolling_average,
            })
            .collect())
    }

    /// Frame sorted by the sorting key with `rolling_{window}_{value_column}`
    /// appended. Undefined averages take the median of the whole value
    /// column when imputation is on.
    pub fn compute(
        &self,
        df: &DataFrame,
        value_column: &str,
        grouping_key: &str,
    ) -> Result<DataFrame> {
        self.check_columns(df, value_column, grouping_key)?;
        let name = rolling_column_name(self.window, value_column);
        require_absent(df, &name)?;

        let mut rolling = self.rolling(value_column, grouping_key);
        if self.impute {
            rolling = rolling.fill_null(col(value_column).cast(DataType::Float64).median());
        }

        let output = self
            .sorted(df.clone().lazy())
            .with_column(rolling.alias(name.as_str()))
            .collect()?;

        log::debug!(
            "Computed {} over {} rows ({} undefined)",
            name,
            output.height(),
            output.column(&name)?.null_count()
        );
        Ok(output)
    }

    /// Stable ascending sort; ties keep input order, missing keys go last
    fn sorted(&self, frame: LazyFrame) -> LazyFrame {
        frame.sort(
            [self.sorting_key.as_str()],
            SortMultipleOptions::new()
                .with_maintain_order(true)
                .with_nulls_last(true),
        )
    }

    fn previous(&self, value_column: &str, grouping_key: &str) -> Expr {
        let lag = col(value_column)
            .cast(DataType::Float64)
            .shift(lit(1))
            .over([col(grouping_key)]);
        without_group_nulls(lag, grouping_key)
    }

    /// Full windows only: a window holding a missing value is undefined
    fn rolling(&self, value_column: &str, grouping_key: &str) -> Expr {
        let average = col(value_column)
            .cast(DataType::Float64)
            .shift(lit(1))
            .rolling_mean(RollingOptionsFixedWindow {
                window_size: self.window,
                min_periods: self.window,
                weights: None,
                center: false,
                fn_params: None,
            })
            .over([col(grouping_key)]);
        without_group_nulls(average, grouping_key)
    }

    fn check_columns(&self, df: &DataFrame, value_column: &str, grouping_key: &str) -> Result<()> {
        require_column(df, value_column)?;
        require_column(df, &self.sorting_key)?;

        let Ok(group) = df.column(grouping_key) else {
            return Err(FeatureError::InvalidGroupingKey(grouping_key.to_string()));
        };
        if df.height() > 0 && group.null_count() == df.height() {
            return Err(FeatureError::InvalidGroupingKey(grouping_key.to_string()));
        }

        check_numeric(df.column(value_column)?, value_column)
    }
}

/// Rows whose grouping key is null belong to no group
fn without_group_nulls(expr: Expr, grouping_key: &str) -> Expr {
    when(col(grouping_key).is_not_null())
        .then(expr)
        .otherwise(lit(NULL).cast(DataType::Float64))
}

/// Numbers or nothing; text in a value column is an error
fn check_numeric(column: &Column, name: &str) -> Result<()> {
    match column.dtype() {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64
        | DataType::Null => Ok(()),
        _ if column.null_count() == column.len() => Ok(()),
        other => Err(FeatureError::Parse(format!(
            "column {} is not numeric: {}",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// (team, date, score) rows
    fn make_frame(rows: &[(&str, &str, Option<i64>)]) -> DataFrame {
        let teams: Vec<&str> = rows.iter().map(|r| r.0).collect();
        let dates: Vec<&str> = rows.iter().map(|r| r.1).collect();
        let scores: Vec<Option<i64>> = rows.iter().map(|r| r.2).collect();
        df!(
            "id" => teams,
            "match_date" => dates,
            "score" => scores,
        )
        .unwrap()
    }

    fn floats(df: &DataFrame, column: &str) -> Vec<Option<f64>> {
        df.column(column)
            .unwrap()
            .cast(&DataType::Float64)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_previous_and_rolling_values() {
        let df = make_frame(&[
            ("Crusaders", "2024-03-01", Some(10)),
            ("Crusaders", "2024-03-02", Some(20)),
            ("Crusaders", "2024-03-03", Some(30)),
            ("Crusaders", "2024-03-04", Some(40)),
            ("Crusaders", "2024-03-05", Some(50)),
            ("Crusaders", "2024-03-06", Some(60)),
        ]);
        let engine = LagWindowEngine::new(5, "match_date", false).unwrap();
        let lagged = engine.lagged(&df, "score", "id").unwrap();

        let previous: Vec<Option<f64>> = lagged.iter().map(|f| f.previous_value).collect();
        assert_eq!(
            previous,
            vec![None, Some(10.0), Some(20.0), Some(30.0), Some(40.0), Some(50.0)]
        );

        let rolling: Vec<Option<f64>> = lagged.iter().map(|f| f.rolling_average).collect();
        assert_eq!(rolling, vec![None, None, None, None, None, Some(30.0)]);
    }

    #[test]
    fn test_imputes_global_median() {
        let df = make_frame(&[
            ("Crusaders", "2024-03-01", Some(10)),
            ("Crusaders", "2024-03-02", Some(20)),
            ("Crusaders", "2024-03-03", Some(30)),
            ("Crusaders", "2024-03-04", Some(40)),
            ("Crusaders", "2024-03-05", Some(50)),
            ("Crusaders", "2024-03-06", Some(60)),
            ("Blues", "2024-03-02", Some(3)),
        ]);
        let engine = LagWindowEngine::new(5, "match_date", true).unwrap();
        let output = engine.compute(&df, "score", "id").unwrap();

        // median of 3, 10, 20, 30, 40, 50, 60
        let rolling = floats(&output, "rolling_5_score");
        assert!(rolling.iter().all(|v| *v == Some(30.0)));
        assert_eq!(output.height(), df.height());
    }

    #[test]
    fn test_imputation_keeps_defined_averages() {
        let df = make_frame(&[
            ("Crusaders", "2024-03-01", Some(10)),
            ("Crusaders", "2024-03-02", Some(20)),
            ("Crusaders", "2024-03-03", Some(30)),
            ("Blues", "2024-03-01", Some(100)),
            ("Blues", "2024-03-02", Some(200)),
        ]);
        let engine = LagWindowEngine::new(2, "match_date", true).unwrap();
        let output = engine.compute(&df, "score", "id").unwrap();

        let teams: Vec<Option<String>> = crate::data::text_values(&output, "id").unwrap();
        let scores = floats(&output, "score");
        let rolling = floats(&output, "rolling_2_score");
        for ((team, score), value) in teams.iter().zip(scores).zip(rolling) {
            if team.as_deref() == Some("Crusaders") && score == Some(30.0) {
                // (10 + 20) / 2, not the median of 30
                assert_eq!(value, Some(15.0));
            } else {
                assert_eq!(value, Some(30.0));
            }
        }
    }

    #[test]
    fn test_imputation_uses_whole_table_not_group() {
        let df = make_frame(&[
            ("Crusaders", "2024-03-01", Some(10)),
            ("Crusaders", "2024-03-02", Some(12)),
            ("Blues", "2024-03-01", Some(40)),
            ("Blues", "2024-03-02", Some(44)),
        ]);
        let engine = LagWindowEngine::new(3, "match_date", true).unwrap();
        let output = engine.compute(&df, "score", "id").unwrap();
        for value in floats(&output, "rolling_3_score") {
            assert_eq!(value, Some(26.0));
        }
    }

    #[test]
    fn test_two_match_scenario() {
        // A vs B on day 1 (10-5), B vs C on day 2 (20-15), team-level rows
        let df = make_frame(&[
            ("A", "2024-03-01", Some(10)),
            ("B", "2024-03-01", Some(5)),
            ("B", "2024-03-02", Some(20)),
            ("C", "2024-03-02", Some(15)),
        ]);
        let engine = LagWindowEngine::new(1, "match_date", false).unwrap();

        let lagged = engine.lagged(&df, "score", "id").unwrap();
        let b_day_two = lagged.iter().find(|f| f.row == 2).unwrap();
        assert_eq!(b_day_two.previous_value, Some(5.0));
        assert_eq!(b_day_two.rolling_average, Some(5.0));

        let output = engine.compute(&df, "score", "id").unwrap();
        let teams = crate::data::text_values(&output, "id").unwrap();
        let rolling = floats(&output, "rolling_1_score");
        for (team, value) in teams.iter().zip(rolling) {
            match team.as_deref() {
                Some("B") if value.is_some() => assert_eq!(value, Some(5.0)),
                Some("B") => {}
                _ => assert_eq!(value, None),
            }
        }
    }

    #[test]
    fn test_sorts_chronologically_with_stable_ties() {
        let df = make_frame(&[
            ("Blues", "2024-03-03", Some(30)),
            ("Blues", "2024-03-01", Some(10)),
            ("Chiefs", "2024-03-01", Some(7)),
            ("Blues", "2024-03-02", Some(20)),
        ]);
        let engine = LagWindowEngine::new(1, "match_date", false).unwrap();
        let output = engine.compute(&df, "score", "id").unwrap();

        assert_eq!(
            floats(&output, "score"),
            vec![Some(10.0), Some(7.0), Some(20.0), Some(30.0)]
        );
        assert_eq!(
            floats(&output, "rolling_1_score"),
            vec![None, None, Some(10.0), Some(20.0)]
        );
    }

    #[test]
    fn test_kickoff_time_orders_same_day_matches() {
        // listed out of order: the evening match comes first in the input
        let df = make_frame(&[
            ("Blues", "2022-11-05 18:00:00", Some(40)),
            ("Blues", "2022-11-05 10:00:00", Some(7)),
        ]);
        let engine = LagWindowEngine::new(1, "match_date", false).unwrap();
        let output = engine.compute(&df, "score", "id").unwrap();

        assert_eq!(floats(&output, "score"), vec![Some(7.0), Some(40.0)]);
        assert_eq!(floats(&output, "rolling_1_score"), vec![None, Some(7.0)]);
        assert_eq!(
            output.column("match_date").unwrap().get(1).unwrap(),
            AnyValue::String("2022-11-05 18:00:00")
        );
    }

    #[test]
    fn test_missing_value_breaks_window() {
        let df = make_frame(&[
            ("Blues", "2024-03-01", Some(10)),
            ("Blues", "2024-03-02", None),
            ("Blues", "2024-03-03", Some(30)),
            ("Blues", "2024-03-04", Some(40)),
            ("Blues", "2024-03-05", Some(50)),
        ]);
        let engine = LagWindowEngine::new(2, "match_date", false).unwrap();
        let lagged = engine.lagged(&df, "score", "id").unwrap();
        let rolling: Vec<Option<f64>> = lagged.iter().map(|f| f.rolling_average).collect();
        // previous: [-, 10, -, 30, 40]
        assert_eq!(rolling, vec![None, None, None, None, Some(35.0)]);
    }

    #[test]
    fn test_null_group_rows_have_no_history() {
        let df = df!(
            "id" => &[None, None, Some("Reds")],
            "match_date" => &["2024-03-01", "2024-03-02", "2024-03-03"],
            "score" => &[10i64, 20, 30],
        )
        .unwrap();
        let engine = LagWindowEngine::new(1, "match_date", false).unwrap();
        let lagged = engine.lagged(&df, "score", "id").unwrap();
        assert!(lagged.iter().all(|f| f.previous_value.is_none()));
    }

    #[test]
    fn test_grouping_key_errors() {
        let df = make_frame(&[("Blues", "2024-03-01", Some(10))]);
        let engine = LagWindowEngine::default();

        match engine.compute(&df, "score", "team") {
            Err(FeatureError::InvalidGroupingKey(name)) => assert_eq!(name, "team"),
            other => panic!("expected InvalidGroupingKey, got {:?}", other),
        }

        let all_null = df!(
            "id" => &[None::<&str>],
            "match_date" => &["2024-03-01"],
            "score" => &[10i64],
        )
        .unwrap();
        assert!(matches!(
            engine.compute(&all_null, "score", "id"),
            Err(FeatureError::InvalidGroupingKey(_))
        ));
    }

    #[test]
    fn test_missing_value_and_sort_columns() {
        let df = make_frame(&[("Blues", "2024-03-01", Some(10))]);
        let engine = LagWindowEngine::default();
        assert!(matches!(
            engine.compute(&df, "tries", "id"),
            Err(FeatureError::MissingColumn(ref c)) if c == "tries"
        ));

        let engine = LagWindowEngine::new(5, "kickoff", true).unwrap();
        assert!(matches!(
            engine.compute(&df, "score", "id"),
            Err(FeatureError::MissingColumn(ref c)) if c == "kickoff"
        ));
    }

    #[test]
    fn test_non_numeric_values_rejected() {
        let df = df!(
            "id" => &["Blues"],
            "match_date" => &["2024-03-01"],
            "score" => &["twenty"],
        )
        .unwrap();
        let engine = LagWindowEngine::default();
        assert!(matches!(
            engine.compute(&df, "score", "id"),
            Err(FeatureError::Parse(_))
        ));
    }

    #[test]
    fn test_rolling_column_already_present() {
        let df = make_frame(&[("Blues", "2024-03-01", Some(10))]);
        let engine = LagWindowEngine::new(1, "match_date", true).unwrap();
        let once = engine.compute(&df, "score", "id").unwrap();
        assert!(matches!(
            engine.compute(&once, "score", "id"),
            Err(FeatureError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(LagWindowEngine::new(0, "match_date", true).is_err());
    }
}
