//! Match-to-team reshaping
//!
//! Each match row carries two team slots (`team_1_*`, `team_2_*`). The
//! reshaper turns it into two rows, one per team, where each row holds the
//! team's own attributes plus the other team's attributes under an
//! `_opposition` suffix.

use polars::prelude::*;

use crate::data::{cell_text, require_column, require_columns};
use crate::{ColumnConfig, FeatureError, Result, TeamSlot};

/// Suffix for the mirrored attributes of the other team
pub const OPPOSITION_SUFFIX: &str = "_opposition";

const MATCH_ORDER: &str = "__match";
const SLOT_ORDER: &str = "__slot";
const KEY_COUNT: &str = "__count";

/// Name of the opposition column for a team attribute
pub fn opposition_column(attribute: &str) -> String {
    format!("{}{}", attribute, OPPOSITION_SUFFIX)
}

/// Converts match rows into team rows
#[derive(Debug, Clone)]
pub struct EntityReshaper {
    team_attributes: Vec<String>,
    core_columns: Vec<String>,
    join_keys: Vec<String>,
}

impl EntityReshaper {
    pub fn new<S: AsRef<str>>(team_attributes: &[S], core_columns: &[S], join_keys: &[S]) -> Self {
        let owned = |names: &[S]| -> Vec<String> {
            names.iter().map(|s| s.as_ref().to_string()).collect()
        };
        EntityReshaper {
            team_attributes: owned(team_attributes),
            core_columns: owned(core_columns),
            join_keys: owned(join_keys),
        }
    }

    pub fn from_config(columns: &ColumnConfig) -> Self {
        Self::new(&columns.team_attributes, &columns.core, &columns.join_keys)
    }

    /// Column layout of the reshaped frame
    pub fn output_columns(&self) -> Vec<String> {
        let mut columns = self.context_columns();
        columns.extend(self.team_attributes.iter().cloned());
        columns.extend(self.team_attributes.iter().map(|a| opposition_column(a)));
        columns
    }

    /// Produce two team rows per match: for every match, the first slot's
    /// view followed by the second slot's.
    pub fn reshape(&self, df: &DataFrame) -> Result<DataFrame> {
        require_columns(df, &self.core_columns)?;
        require_columns(df, &self.join_keys)?;
        for slot in TeamSlot::ALL {
            for attribute in &self.team_attributes {
                require_column(df, &slot.column(attribute))?;
            }
        }
        self.check_unique_keys(df)?;

        let matches = df.clone().lazy().with_row_index(MATCH_ORDER, None);
        let keys: Vec<Expr> = self.join_keys.iter().map(|k| col(k.as_str())).collect();

        // Each slot joined against the other slot on the match key
        let perspectives: Vec<LazyFrame> = TeamSlot::ALL
            .iter()
            .enumerate()
            .map(|(order, &slot)| {
                self.own_view(matches.clone(), slot, order).join(
                    self.opposition_view(matches.clone(), slot.opposing()),
                    keys.clone(),
                    keys.clone(),
                    JoinArgs::new(JoinType::Inner),
                )
            })
            .collect();

        let output: Vec<Expr> = self
            .output_columns()
            .iter()
            .map(|c| col(c.as_str()))
            .collect();
        let teams = concat(
            perspectives,
            UnionArgs {
                to_supertypes: true,
                ..Default::default()
            },
        )?
        .sort([MATCH_ORDER, SLOT_ORDER], SortMultipleOptions::default())
        .select(output)
        .collect()?;

        log::debug!(
            "Reshaped {} matches into {} team rows",
            df.height(),
            teams.height()
        );
        Ok(teams)
    }

    /// Core columns, then any join key not already among them
    fn context_columns(&self) -> Vec<String> {
        let mut columns = self.core_columns.clone();
        for key in &self.join_keys {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        columns
    }

    /// Match context plus one slot's attributes under their plain names
    fn own_view(&self, matches: LazyFrame, slot: TeamSlot, order: usize) -> LazyFrame {
        let mut columns: Vec<Expr> = self
            .context_columns()
            .iter()
            .map(|c| col(c.as_str()))
            .collect();
        columns.extend(
            self.team_attributes
                .iter()
                .map(|a| col(slot.column(a).as_str()).alias(a.as_str())),
        );
        columns.push(col(MATCH_ORDER));
        columns.push(lit(order as u32).alias(SLOT_ORDER));
        matches.select(columns)
    }

    /// Join keys plus one slot's attributes under `_opposition` names
    fn opposition_view(&self, matches: LazyFrame, slot: TeamSlot) -> LazyFrame {
        let mut columns: Vec<Expr> = self.join_keys.iter().map(|k| col(k.as_str())).collect();
        columns.extend(self.team_attributes.iter().map(|a| {
            col(slot.column(a).as_str()).alias(opposition_column(a).as_str())
        }));
        matches.select(columns)
    }

    /// A join key seen more than once would multiply rows in the joins
    fn check_unique_keys(&self, df: &DataFrame) -> Result<()> {
        let keys: Vec<Expr> = self.join_keys.iter().map(|k| col(k.as_str())).collect();
        let repeated = df
            .clone()
            .lazy()
            .group_by_stable(keys)
            .agg([len().alias(KEY_COUNT)])
            .filter(col(KEY_COUNT).gt(lit(1)))
            .collect()?;

        if repeated.height() == 0 {
            return Ok(());
        }

        let described = self
            .join_keys
            .iter()
            .map(|name| -> Result<String> {
                let value = repeated.column(name)?.get(0)?;
                Ok(format!("{}={}", name, cell_text(&value)))
            })
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        let count = repeated
            .column(KEY_COUNT)?
            .get(0)?
            .extract::<usize>()
            .unwrap_or_default();

        Err(FeatureError::AmbiguousJoinKey {
            key: described,
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{column_names, text_values};

    const TEAM: [&str; 3] = ["id", "home_away", "score"];
    const CORE: [&str; 3] = ["unique_id", "match_date", "competition"];

    /// (unique_id, date, home, away, home score, away score)
    fn make_matches(matches: &[(i64, &str, &str, &str, i64, i64)]) -> DataFrame {
        let n = matches.len();
        df!(
            "unique_id" => matches.iter().map(|m| m.0).collect::<Vec<_>>(),
            "match_date" => matches.iter().map(|m| m.1).collect::<Vec<_>>(),
            "competition" => vec!["Super Rugby Pacific"; n],
            "team_1_id" => matches.iter().map(|m| m.2).collect::<Vec<_>>(),
            "team_1_home_away" => vec!["home"; n],
            "team_1_score" => matches.iter().map(|m| m.4).collect::<Vec<_>>(),
            "team_2_id" => matches.iter().map(|m| m.3).collect::<Vec<_>>(),
            "team_2_home_away" => vec!["away"; n],
            "team_2_score" => matches.iter().map(|m| m.5).collect::<Vec<_>>(),
        )
        .unwrap()
    }

    fn reshaper() -> EntityReshaper {
        EntityReshaper::new(&TEAM, &CORE, &["unique_id"])
    }

    fn texts(df: &DataFrame, column: &str) -> Vec<String> {
        text_values(df, column)
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_two_rows_per_match() {
        let matches = make_matches(&[
            (101, "2023-03-01", "Crusaders", "Blues", 31, 24),
            (102, "2023-03-02", "Chiefs", "Brumbies", 19, 19),
            (103, "2023-03-03", "Reds", "Hurricanes", 10, 40),
        ]);
        let teams = reshaper().reshape(&matches).unwrap();

        assert_eq!(teams.height(), 2 * matches.height());
        assert_eq!(
            column_names(&teams),
            vec![
                "unique_id",
                "match_date",
                "competition",
                "id",
                "home_away",
                "score",
                "id_opposition",
                "home_away_opposition",
                "score_opposition",
            ]
        );
    }

    #[test]
    fn test_opposition_mirrors_paired_row() {
        let matches = make_matches(&[
            (101, "2023-03-01", "Crusaders", "Blues", 31, 24),
            (102, "2023-03-02", "Chiefs", "Brumbies", 19, 17),
        ]);
        let teams = reshaper().reshape(&matches).unwrap();

        let uid = texts(&teams, "unique_id");
        let own: Vec<Vec<String>> = TEAM.iter().map(|a| texts(&teams, a)).collect();
        let mirrored: Vec<Vec<String>> = TEAM
            .iter()
            .map(|a| texts(&teams, &opposition_column(a)))
            .collect();

        for row in 0..teams.height() {
            let partner = (0..teams.height())
                .find(|&other| uid[other] == uid[row] && own[0][other] != own[0][row])
                .unwrap();
            for attribute in 0..TEAM.len() {
                assert_eq!(mirrored[attribute][row], own[attribute][partner]);
            }
        }
    }

    #[test]
    fn test_row_order_follows_matches() {
        let matches = make_matches(&[
            (7, "2023-03-01", "Crusaders", "Blues", 31, 24),
            (3, "2023-03-02", "Chiefs", "Brumbies", 19, 17),
        ]);
        let teams = reshaper().reshape(&matches).unwrap();
        assert_eq!(
            texts(&teams, "id"),
            vec!["Crusaders", "Blues", "Chiefs", "Brumbies"]
        );
        assert_eq!(texts(&teams, "unique_id"), vec!["7", "7", "3", "3"]);
    }

    #[test]
    fn test_duplicate_join_key_rejected() {
        let matches = make_matches(&[
            (101, "2023-03-01", "Crusaders", "Blues", 31, 24),
            (101, "2023-03-08", "Chiefs", "Brumbies", 19, 17),
        ]);
        match reshaper().reshape(&matches) {
            Err(FeatureError::AmbiguousJoinKey { key, count }) => {
                assert_eq!(key, "unique_id=101");
                assert_eq!(count, 2);
            }
            other => panic!("expected AmbiguousJoinKey, got {:?}", other),
        }
    }

    #[test]
    fn test_join_key_outside_core_is_kept() {
        let matches = make_matches(&[(101, "2023-03-01", "Crusaders", "Blues", 31, 24)]);
        let reshaper = EntityReshaper::new(&TEAM, &["match_date", "competition"], &["unique_id"]);
        let teams = reshaper.reshape(&matches).unwrap();
        assert_eq!(column_names(&teams)[2], "unique_id");
        assert_eq!(teams.height(), 2);
    }

    #[test]
    fn test_missing_slot_column() {
        let matches = make_matches(&[(101, "2023-03-01", "Crusaders", "Blues", 31, 24)]);
        let reshaper = EntityReshaper::new(&["id", "winner"], &CORE, &["unique_id"]);
        match reshaper.reshape(&matches) {
            Err(FeatureError::MissingColumn(name)) => assert_eq!(name, "team_1_winner"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_source_frame_untouched() {
        let matches = make_matches(&[(101, "2023-03-01", "Crusaders", "Blues", 31, 24)]);
        let before = matches.clone();
        reshaper().reshape(&matches).unwrap();
        assert!(matches.equals_missing(&before));
    }
}
