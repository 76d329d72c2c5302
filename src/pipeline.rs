//! Pipeline orchestration: load, merge, aggregate, map.

use crate::charts::{build_choropleth, ChoroplethMap};
use crate::config::MapConfig;
use crate::data::{DataLoader, DataProcessor, InputTables};
use crate::geo::load_region_shapes;
use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use tracing::info;

/// Every intermediate table of one run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub inputs: InputTables,
    pub regions_and_departments: DataFrame,
    pub referendum_and_areas: DataFrame,
    pub results_by_region: DataFrame,
}

/// Load the inputs and compute the per-region results.
pub fn run(loader: &DataLoader) -> Result<PipelineOutput> {
    info!("Loading data from {}", loader.data_dir().display());
    let inputs = loader.load_all().context("Failed to load input tables")?;

    let regions_and_departments =
        DataProcessor::merge_regions_and_departments(&inputs.regions, &inputs.departments)
            .context("Failed to merge regions and departments")?;
    let referendum_and_areas =
        DataProcessor::merge_referendum_and_areas(&inputs.referendum, &regions_and_departments)
            .context("Failed to merge referendum and areas")?;
    let results_by_region = DataProcessor::compute_results_by_region(&referendum_and_areas)
        .context("Failed to compute results by region")?;

    Ok(PipelineOutput {
        inputs,
        regions_and_departments,
        referendum_and_areas,
        results_by_region,
    })
}

/// Read region boundaries and attach the results to them.
pub fn build_map(config: &MapConfig, results_by_region: &DataFrame) -> Result<ChoroplethMap> {
    let path = config.geojson_path();
    let shapes = load_region_shapes(&path)
        .with_context(|| format!("Failed to load region boundaries from {}", path.display()))?;
    build_choropleth(results_by_region, shapes).context("Failed to build choropleth table")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{
        ABSTENTIONS, CHOICE_A, CHOICE_B, CODE, CODE_DEP, CODE_REG, NAME_DEP, NAME_REG, NULL, RATIO,
        REGISTERED,
    };
    use std::fs;
    use tempfile::TempDir;

    const REFERENDUM: &str = "\
Department code;Department name;Town code;Town name;Registered;Abstentions;Null;Choice A;Choice B
1;AIN;1;L'Abergement-Clémenciat;100;20;5;40;35
75;PARIS;56;Paris;1000;300;50;300;350
ZA;GUADELOUPE;1;Les Abymes;500;250;10;100;140
ZZ;FRANCAIS DE L'ETRANGER;1;Europe;700;400;20;150;130
";

    const REGIONS: &str = "\
id,code,name,slug
1,01,Guadeloupe,guadeloupe
8,11,Île-de-France,ile-de-france
12,84,Auvergne-Rhône-Alpes,auvergne-rhone-alpes
17,COM,Collectivités d'Outre-Mer,collectivites-doutre-mer
";

    const DEPARTMENTS: &str = "\
id,region_code,code,name,slug
1,01,971,Guadeloupe,guadeloupe
7,84,01,Ain,ain
82,11,75,Paris,paris
";

    const GEOJSON: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"code": "84", "nom": "Auvergne-Rhône-Alpes"},
         "geometry": {"type": "Polygon", "coordinates": [[[3.0, 45.0], [6.0, 45.0], [6.0, 46.0], [3.0, 45.0]]]}},
        {"type": "Feature", "properties": {"code": "11", "nom": "Île-de-France"},
         "geometry": {"type": "Polygon", "coordinates": [[[2.0, 48.5], [3.0, 48.5], [3.0, 49.0], [2.0, 48.5]]]}},
        {"type": "Feature", "properties": {"code": "53", "nom": "Bretagne"},
         "geometry": {"type": "Polygon", "coordinates": [[[-4.0, 48.0], [-2.0, 48.0], [-2.0, 48.5], [-4.0, 48.0]]]}}
    ]}"#;

    fn data_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("referendum.csv"), REFERENDUM).unwrap();
        fs::write(dir.path().join("regions.csv"), REGIONS).unwrap();
        fs::write(dir.path().join("departments.csv"), DEPARTMENTS).unwrap();
        fs::write(dir.path().join("regions.geojson"), GEOJSON).unwrap();
        dir
    }

    fn config(dir: &TempDir) -> MapConfig {
        MapConfig {
            data_dir: dir.path().to_path_buf(),
            ..MapConfig::default()
        }
    }

    fn row_of(df: &DataFrame, code: &str) -> usize {
        df.column(CODE_REG)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .position(|c| c == Some(code))
            .unwrap()
    }

    fn int_at(df: &DataFrame, column: &str, row: usize) -> i64 {
        df.column(column).unwrap().i64().unwrap().get(row).unwrap()
    }

    #[test]
    fn test_region_84_scenario() {
        let dir = data_dir();
        let output = run(&config(&dir).loader()).unwrap();
        let results = &output.results_by_region;

        assert_eq!(output.inputs.referendum.height(), 4);
        assert_eq!(output.inputs.regions.height(), 4);
        assert_eq!(output.inputs.departments.height(), 3);

        // Region COM has no department
        let areas = &output.regions_and_departments;
        let columns: Vec<String> = areas
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(columns, vec![CODE_REG, NAME_REG, CODE_DEP, NAME_DEP]);
        assert_eq!(areas.height(), 3);

        // Ain (84), Paris (11); Guadeloupe's ZA code and ballots abroad are excluded
        assert_eq!(output.referendum_and_areas.height(), 2);
        assert_eq!(results.height(), 2);

        let row = row_of(results, "84");
        let name = results.column(NAME_REG).unwrap().str().unwrap().get(row);
        assert_eq!(name, Some("Auvergne-Rhône-Alpes"));
        assert_eq!(int_at(results, REGISTERED, row), 100);
        assert_eq!(int_at(results, ABSTENTIONS, row), 20);
        assert_eq!(int_at(results, NULL, row), 5);
        assert_eq!(int_at(results, CHOICE_A, row), 40);
        assert_eq!(int_at(results, CHOICE_B, row), 35);

        let map = build_map(&config(&dir), results).unwrap();
        let ratios = map.ratios().unwrap();
        let codes: Vec<Option<&str>> = map.table.column(CODE).unwrap().str().unwrap().into_iter().collect();
        assert_eq!(codes, vec![Some("84"), Some("11"), Some("53")]);
        assert!((ratios[0].unwrap() - 40.0 / 75.0).abs() < 1e-12);
        assert!((ratios[1].unwrap() - 300.0 / 650.0).abs() < 1e-12);
        assert_eq!(ratios[2], None);
        assert!(map.table.column(RATIO).is_ok());
    }

    #[test]
    fn test_map_does_not_modify_results() {
        let dir = data_dir();
        let output = run(&config(&dir).loader()).unwrap();
        let before = output.results_by_region.clone();

        build_map(&config(&dir), &output.results_by_region).unwrap();
        assert!(output.results_by_region.equals_missing(&before));
    }

    #[test]
    fn test_runs_are_deterministic() {
        let dir = data_dir();
        let first = run(&config(&dir).loader()).unwrap();
        let second = run(&config(&dir).loader()).unwrap();

        assert!(first.results_by_region.equals_missing(&second.results_by_region));
        assert!(first
            .referendum_and_areas
            .equals_missing(&second.referendum_and_areas));
    }

    #[test]
    fn test_missing_input_fails_whole_run() {
        let dir = data_dir();
        fs::remove_file(dir.path().join("departments.csv")).unwrap();

        let err = run(&config(&dir).loader()).unwrap_err();
        assert!(format!("{err:#}").contains("departments.csv"));
    }

    #[test]
    fn test_missing_geojson_fails() {
        let dir = data_dir();
        let output = run(&config(&dir).loader()).unwrap();
        fs::remove_file(dir.path().join("regions.geojson")).unwrap();

        assert!(build_map(&config(&dir), &output.results_by_region).is_err());
    }
}
