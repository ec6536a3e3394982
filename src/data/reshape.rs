use std::collections::{BTreeSet, HashSet};

use crate::{
    data::load::WideTable,
    foundation::error::{RaceError, RaceResult},
};

/// One `(entity, year, value)` data point.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub entity: String,
    pub year: i32,
    pub value: f64,
}

/// Pivot the wide table into long-form observations for the entities of interest.
///
/// Columns whose header is not an integer year are dropped, as are empty or non-numeric cells.
/// Output is column-major: grouped by year column, then in input row order.
pub fn reshape(
    table: &WideTable,
    entity_column: &str,
    interest: &[String],
) -> RaceResult<Vec<Observation>> {
    let entity_idx = table.column_index(entity_column).ok_or_else(|| {
        RaceError::input(format!("header has no entity column '{entity_column}'"))
    })?;

    let wanted: HashSet<&str> = interest.iter().map(String::as_str).collect();
    let rows: Vec<&Vec<String>> = table
        .rows
        .iter()
        .filter(|row| wanted.contains(row[entity_idx].trim()))
        .collect();

    let mut out = Vec::new();
    for (col, header) in table.headers.iter().enumerate() {
        if col == entity_idx {
            continue;
        }
        let Some(year) = parse_year(header) else {
            tracing::debug!(column = %header, "dropping non-year column");
            continue;
        };

        for row in &rows {
            let Some(value) = parse_value(&row[col]) else {
                continue;
            };
            out.push(Observation {
                entity: row[entity_idx].trim().to_string(),
                year,
                value,
            });
        }
    }

    tracing::info!(
        entities = rows.len(),
        observations = out.len(),
        "reshaped table to long form"
    );
    Ok(out)
}

/// Ascending distinct years present in `observations`.
pub fn distinct_years(observations: &[Observation]) -> Vec<i32> {
    observations
        .iter()
        .map(|o| o.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Entities present in `observations`, in first-seen order.
pub fn distinct_entities(observations: &[Observation]) -> Vec<&str> {
    let mut seen = HashSet::new();
    observations
        .iter()
        .map(|o| o.entity.as_str())
        .filter(|e| seen.insert(*e))
        .collect()
}

/// `"2000"` and `"2000.0"` are years; `"Indicator Code"` and `"2000.5"` are not.
fn parse_year(label: &str) -> Option<i32> {
    let label = label.trim();
    if let Ok(y) = label.parse::<i32>() {
        return Some(y);
    }
    let f = label.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f >= f64::from(i32::MIN) && f <= f64::from(i32::MAX)
    {
        Some(f as i32)
    } else {
        None
    }
}

fn parse_value(cell: &str) -> Option<f64> {
    let v = cell.trim().parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}
