//! Choropleth Table Builder
//! Computes the Choice A share per region and attaches it to region boundaries.

use crate::data::schema::{ABSTENTIONS, CHOICE_A, CODE, CODE_REG, EXPRESSED, NULL, RATIO, REGISTERED};
use crate::geo::{Bounds, RegionShape};
use polars::prelude::*;
use thiserror::Error;
use tracing::warn;

const GEO_INDEX: &str = "__geo";

#[derive(Error, Debug)]
pub enum ChoroplethError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Joined table has {rows} rows for {shapes} region shapes")]
    ShapeMismatch { rows: usize, shapes: usize },
}

/// Region results joined onto region boundaries.
///
/// `table` has one row per entry of `shapes`, in the same order.
#[derive(Debug, Clone)]
pub struct ChoroplethMap {
    pub table: DataFrame,
    pub shapes: Vec<RegionShape>,
}

impl ChoroplethMap {
    /// Ratio per shape. `None` when the region has no results.
    pub fn ratios(&self) -> Result<Vec<Option<f64>>, ChoroplethError> {
        Ok(self.table.column(RATIO)?.f64()?.into_iter().collect())
    }

    /// Smallest and largest finite ratio.
    pub fn ratio_range(&self) -> Result<Option<(f64, f64)>, ChoroplethError> {
        let range = self
            .ratios()?
            .into_iter()
            .flatten()
            .filter(|r| r.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, r| match acc {
                Some((lo, hi)) => Some((lo.min(r), hi.max(r))),
                None => Some((r, r)),
            });
        Ok(range)
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.shapes
            .iter()
            .filter_map(RegionShape::bounds)
            .reduce(Bounds::union)
    }
}

/// Return a copy of `results` with `expressed` and `ratio` columns.
///
/// `ratio = Choice A / (Registered - Abstentions - Null)`, NaN when nothing
/// was expressed. A negative `expressed` is kept as computed.
pub fn with_ratio(results: &DataFrame) -> Result<DataFrame, ChoroplethError> {
    let expressed = col(REGISTERED) - col(ABSTENTIONS) - col(NULL);
    let ratio = when(col(EXPRESSED).eq(lit(0)))
        .then(lit(f64::NAN))
        .otherwise(col(CHOICE_A).cast(DataType::Float64) / col(EXPRESSED).cast(DataType::Float64));

    let table = results
        .clone()
        .lazy()
        .with_column(expressed.alias(EXPRESSED))
        .with_column(ratio.alias(RATIO))
        .collect()?;

    let negative = table
        .column(EXPRESSED)?
        .i64()?
        .into_iter()
        .flatten()
        .filter(|&e| e < 0)
        .count();
    if negative > 0 {
        warn!(
            regions = negative,
            "Abstentions and null ballots exceed registered voters"
        );
    }
    Ok(table)
}

/// Left-join region shapes onto the per-region results.
///
/// Every shape appears exactly once, in input order. Shapes without a
/// matching `code_reg` get null result columns.
pub fn build_choropleth(
    results: &DataFrame,
    shapes: Vec<RegionShape>,
) -> Result<ChoroplethMap, ChoroplethError> {
    let results = with_ratio(results)?;

    let codes: Vec<&str> = shapes.iter().map(|s| s.code.as_str()).collect();
    let order: Vec<u32> = (0..shapes.len() as u32).collect();
    let geo = DataFrame::new(vec![
        Column::new(CODE.into(), codes),
        Column::new(GEO_INDEX.into(), order),
    ])?;

    let table = geo
        .lazy()
        .join(
            results.lazy(),
            [col(CODE)],
            [col(CODE_REG)],
            JoinArgs::new(JoinType::Left),
        )
        .sort_by_exprs([col(GEO_INDEX)], SortMultipleOptions::default())
        .collect()?
        .drop(GEO_INDEX)?;

    // Duplicate codes in the results would fan out the join
    if table.height() != shapes.len() {
        return Err(ChoroplethError::ShapeMismatch {
            rows: table.height(),
            shapes: shapes.len(),
        });
    }

    Ok(ChoroplethMap { table, shapes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{CHOICE_B, NAME_REG};
    use crate::geo::Polygon;

    fn results() -> DataFrame {
        df!(
            CODE_REG => ["11", "84", "93"],
            NAME_REG => ["Île-de-France", "Auvergne-Rhône-Alpes", "Provence-Alpes-Côte d'Azur"],
            REGISTERED => [100i64, 100, 10],
            ABSTENTIONS => [20i64, 20, 6],
            NULL => [5i64, 5, 4],
            CHOICE_A => [40i64, 30, 0],
            CHOICE_B => [35i64, 45, 0]
        )
        .unwrap()
    }

    fn square(code: &str, x: f64) -> RegionShape {
        RegionShape {
            code: code.to_string(),
            name: None,
            polygons: vec![Polygon {
                exterior: vec![(x, 0.0), (x + 1.0, 0.0), (x + 1.0, 1.0), (x, 1.0), (x, 0.0)],
                holes: Vec::new(),
            }],
        }
    }

    #[test]
    fn test_with_ratio_formula() {
        let table = with_ratio(&results()).unwrap();
        let ratio = table.column(RATIO).unwrap().f64().unwrap();
        let expressed = table.column(EXPRESSED).unwrap().i64().unwrap();

        assert_eq!(expressed.get(0), Some(75));
        assert!((ratio.get(0).unwrap() - 40.0 / 75.0).abs() < 1e-12);
        assert!((ratio.get(1).unwrap() - 30.0 / 75.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_expressed_gives_nan() {
        let table = with_ratio(&results()).unwrap();
        let ratio = table.column(RATIO).unwrap().f64().unwrap();
        assert!(ratio.get(2).unwrap().is_nan());
    }

    #[test]
    fn test_zero_expressed_with_choice_a_votes_gives_nan() {
        // Inconsistent counts: 3 votes for A but nothing expressed
        let results = df!(
            CODE_REG => ["24"],
            NAME_REG => ["Centre-Val de Loire"],
            REGISTERED => [10i64],
            ABSTENTIONS => [7i64],
            NULL => [3i64],
            CHOICE_A => [3i64],
            CHOICE_B => [0i64]
        )
        .unwrap();

        let table = with_ratio(&results).unwrap();
        let expressed = table.column(EXPRESSED).unwrap().i64().unwrap();
        let ratio = table.column(RATIO).unwrap().f64().unwrap();
        assert_eq!(expressed.get(0), Some(0));
        assert!(ratio.get(0).unwrap().is_nan());
    }

    #[test]
    fn test_negative_expressed_keeps_computed_ratio() {
        let results = df!(
            CODE_REG => ["27"],
            NAME_REG => ["Bourgogne-Franche-Comté"],
            REGISTERED => [10i64],
            ABSTENTIONS => [9i64],
            NULL => [6i64],
            CHOICE_A => [2i64],
            CHOICE_B => [0i64]
        )
        .unwrap();

        let table = with_ratio(&results).unwrap();
        let expressed = table.column(EXPRESSED).unwrap().i64().unwrap();
        let ratio = table.column(RATIO).unwrap().f64().unwrap();
        assert_eq!(expressed.get(0), Some(-5));
        assert!((ratio.get(0).unwrap() - (-0.4)).abs() < 1e-12);
    }

    #[test]
    fn test_with_ratio_leaves_input_untouched() {
        let results = results();
        let before = results.width();
        with_ratio(&results).unwrap();
        assert_eq!(results.width(), before);
        assert!(results.column(RATIO).is_err());
    }

    #[test]
    fn test_build_choropleth_left_join() {
        let shapes = vec![square("84", 0.0), square("28", 1.0), square("11", 2.0)];
        let map = build_choropleth(&results(), shapes).unwrap();

        assert_eq!(map.table.height(), 3);
        let codes: Vec<Option<&str>> = map.table.column(CODE).unwrap().str().unwrap().into_iter().collect();
        assert_eq!(codes, vec![Some("84"), Some("28"), Some("11")]);

        let ratios = map.ratios().unwrap();
        assert!((ratios[0].unwrap() - 0.4).abs() < 1e-12);
        assert_eq!(ratios[1], None);
        assert!((ratios[2].unwrap() - 40.0 / 75.0).abs() < 1e-12);

        let names = map.table.column(NAME_REG).unwrap().str().unwrap();
        assert_eq!(names.get(1), None);
    }

    #[test]
    fn test_ratio_range_skips_missing_and_nan() {
        let shapes = vec![square("84", 0.0), square("28", 1.0), square("93", 2.0), square("11", 3.0)];
        let map = build_choropleth(&results(), shapes).unwrap();

        let (lo, hi) = map.ratio_range().unwrap().unwrap();
        assert!((lo - 0.4).abs() < 1e-12);
        assert!((hi - 40.0 / 75.0).abs() < 1e-12);

        let bounds = map.bounds().unwrap();
        assert_eq!(bounds.min_x, 0.0);
        assert_eq!(bounds.max_x, 4.0);
    }
}
