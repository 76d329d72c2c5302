//! Data Processor Module
//! Joins referendum ballots with regions/departments and aggregates by region.

use crate::data::schema::{
    CODE, CODE_DEP, CODE_REG, DEPARTMENT_CODE, DEPARTMENT_CODE_WIDTH, NAME, NAME_DEP, NAME_REG,
    REGION_CODE, VOTE_COLUMNS,
};
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

/// Temporary columns, never visible in returned tables.
const ROW_INDEX: &str = "__row";
const JOIN_KEY: &str = "__join_key";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Region code '{code}' has conflicting names: '{}' and '{}'", .names[0], .names[1])]
    AmbiguousRegionName { code: String, names: [String; 2] },
}

/// Handles the relational steps of the pipeline.
pub struct DataProcessor;

impl DataProcessor {
    /// Build the department to region lookup.
    ///
    /// Inner join of `departments.region_code` on `regions.code`. Output
    /// columns: [code_reg, name_reg, code_dep, name_dep]. Unmatched rows on
    /// either side are dropped and duplicated codes fan out.
    pub fn merge_regions_and_departments(
        regions: &DataFrame,
        departments: &DataFrame,
    ) -> Result<DataFrame, ProcessorError> {
        let regions = regions
            .clone()
            .lazy()
            .select([col(CODE).alias(CODE_REG), col(NAME).alias(NAME_REG)]);
        let departments = departments.clone().lazy().select([
            col(REGION_CODE),
            col(CODE).alias(CODE_DEP),
            col(NAME).alias(NAME_DEP),
        ]);

        let merged = regions
            .join(
                departments,
                [col(CODE_REG)],
                [col(REGION_CODE)],
                JoinArgs::new(JoinType::Inner),
            )
            .select([col(CODE_REG), col(NAME_REG), col(CODE_DEP), col(NAME_DEP)])
            .sort_by_exprs([col(CODE_REG), col(CODE_DEP)], SortMultipleOptions::default())
            .collect()?;

        debug!(rows = merged.height(), "Merged regions and departments");
        Ok(merged)
    }

    /// Attach region/department information to every ballot row.
    ///
    /// Department codes are zero-padded first, then ballots whose code has
    /// no match in `areas` are excluded before the join. Ballot order is
    /// preserved.
    pub fn merge_referendum_and_areas(
        referendum: &DataFrame,
        areas: &DataFrame,
    ) -> Result<DataFrame, ProcessorError> {
        let normalized = Self::normalize_department_codes(referendum)?;
        let resolvable = Self::exclude_unresolved_departments(&normalized, areas)?;

        // Join on a copy of code_dep so the lookup column survives coalescing
        let areas = areas
            .clone()
            .lazy()
            .with_column(col(CODE_DEP).alias(JOIN_KEY));

        let merged = resolvable
            .lazy()
            .with_row_index(ROW_INDEX, None)
            .join(
                areas,
                [col(DEPARTMENT_CODE)],
                [col(JOIN_KEY)],
                JoinArgs::new(JoinType::Inner),
            )
            .sort_by_exprs([col(ROW_INDEX)], SortMultipleOptions::default())
            .collect()?
            .drop(ROW_INDEX)?;

        debug!(rows = merged.height(), "Merged referendum and areas");
        Ok(merged)
    }

    /// Left-pad a department code with zeros (`"1"` becomes `"01"`).
    pub fn pad_department_code(code: &str) -> String {
        format!("{code:0>width$}", width = DEPARTMENT_CODE_WIDTH)
    }

    /// Return a copy of `referendum` with its department codes zero-padded.
    pub fn normalize_department_codes(referendum: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let padded: Vec<Option<String>> = referendum
            .column(DEPARTMENT_CODE)?
            .str()?
            .into_iter()
            .map(|code| code.map(Self::pad_department_code))
            .collect();

        let mut normalized = referendum.clone();
        normalized.with_column(Column::new(DEPARTMENT_CODE.into(), padded))?;
        Ok(normalized)
    }

    /// Exclude ballots with unresolvable department code.
    ///
    /// Overseas territories and ballots cast abroad have no department in the
    /// lookup; they are dropped here rather than by the join.
    pub fn exclude_unresolved_departments(
        referendum: &DataFrame,
        areas: &DataFrame,
    ) -> Result<DataFrame, ProcessorError> {
        let known: HashSet<&str> = areas.column(CODE_DEP)?.str()?.into_iter().flatten().collect();

        let mask: Vec<bool> = referendum
            .column(DEPARTMENT_CODE)?
            .str()?
            .into_iter()
            .map(|code| code.is_some_and(|code| known.contains(code)))
            .collect();
        let kept = referendum.filter(&BooleanChunked::from_slice("resolvable".into(), &mask))?;

        let excluded = referendum.height() - kept.height();
        if excluded > 0 {
            info!(excluded, kept = kept.height(), "Excluded ballots with unresolvable department code");
        }
        Ok(kept)
    }

    /// Fail if one region code is paired with more than one region name.
    pub fn check_region_names(referendum_and_areas: &DataFrame) -> Result<(), ProcessorError> {
        let codes = referendum_and_areas.column(CODE_REG)?.str()?;
        let names = referendum_and_areas.column(NAME_REG)?.str()?;

        let mut seen: HashMap<&str, &str> = HashMap::new();
        for (code, name) in codes.into_iter().zip(names.into_iter()) {
            let (Some(code), Some(name)) = (code, name) else {
                continue;
            };
            match seen.get(code) {
                Some(&existing) if existing != name => {
                    return Err(ProcessorError::AmbiguousRegionName {
                        code: code.to_string(),
                        names: [existing.to_string(), name.to_string()],
                    });
                }
                Some(_) => {}
                None => {
                    seen.insert(code, name);
                }
            }
        }
        Ok(())
    }

    /// Sum vote counts per region.
    ///
    /// Output columns: [code_reg, name_reg, Registered, Abstentions, Null,
    /// Choice A, Choice B], one row per region code, sorted by code_reg.
    pub fn compute_results_by_region(
        referendum_and_areas: &DataFrame,
    ) -> Result<DataFrame, ProcessorError> {
        Self::check_region_names(referendum_and_areas)?;

        let sums: Vec<Expr> = VOTE_COLUMNS.iter().map(|name| col(*name).sum()).collect();
        let results = referendum_and_areas
            .clone()
            .lazy()
            .group_by([col(CODE_REG), col(NAME_REG)])
            .agg(sums)
            .sort_by_exprs([col(CODE_REG)], SortMultipleOptions::default())
            .collect()?;

        info!(regions = results.height(), "Computed results by region");
        Ok(results)
    }
}
