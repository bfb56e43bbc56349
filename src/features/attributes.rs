//! Derived per-slot attributes on match rows

use polars::prelude::*;

use crate::data::{require_absent, require_column};
use crate::{Result, TeamSlot};

/// Append `{slot}_against`: the points the slot's team conceded
pub fn add_points_against(
    df: &DataFrame,
    slot: TeamSlot,
    score_attribute: &str,
) -> Result<DataFrame> {
    let opposition = slot.opposing().column(score_attribute);
    let name = slot.column("against");
    require_column(df, &opposition)?;
    require_absent(df, &name)?;

    Ok(df
        .clone()
        .lazy()
        .with_column(col(opposition.as_str()).alias(name.as_str()))
        .collect()?)
}

/// win / draw / loss from the first score's point of view; null when
/// either score is missing
pub fn result_label(own: Expr, other: Expr) -> Expr {
    when(own.clone().gt(other.clone()))
        .then(lit("win"))
        .when(own.clone().lt(other.clone()))
        .then(lit("loss"))
        .when(own.eq(other))
        .then(lit("draw"))
        .otherwise(lit(NULL).cast(DataType::String))
}

/// Append `{slot}_{attribute}` holding win / draw / loss for the slot's team
pub fn add_result_labels(
    df: &DataFrame,
    slot: TeamSlot,
    score_attribute: &str,
    attribute: &str,
) -> Result<DataFrame> {
    let own = slot.column(score_attribute);
    let other = slot.opposing().column(score_attribute);
    let name = slot.column(attribute);
    require_column(df, &own)?;
    require_column(df, &other)?;
    require_absent(df, &name)?;

    Ok(df
        .clone()
        .lazy()
        .with_column(result_label(col(own.as_str()), col(other.as_str())).alias(name.as_str()))
        .collect()?)
}
