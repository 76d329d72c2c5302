//! CSV Data Loader Module
//! Reads the referendum, regions and departments tables using Polars.

use crate::data::schema::{self, TableSchema};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Input file not found: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("Failed to load CSV {}: {source}", path.display())]
    CsvError {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
    #[error("{table}: missing required column '{column}'")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
    #[error("{table}: column '{column}' must hold integers: {source}")]
    InvalidInteger {
        table: &'static str,
        column: &'static str,
        #[source]
        source: PolarsError,
    },
}

/// The three raw input tables, as read from disk.
#[derive(Debug, Clone)]
pub struct InputTables {
    pub referendum: DataFrame,
    pub regions: DataFrame,
    pub departments: DataFrame,
}

/// Loads the input CSV files from a data directory.
pub struct DataLoader {
    data_dir: PathBuf,
    referendum_file: String,
    regions_file: String,
    departments_file: String,
}

impl DataLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            referendum_file: "referendum.csv".to_string(),
            regions_file: "regions.csv".to_string(),
            departments_file: "departments.csv".to_string(),
        }
    }

    /// Override the file names looked up inside the data directory.
    pub fn with_file_names(
        mut self,
        referendum: impl Into<String>,
        regions: impl Into<String>,
        departments: impl Into<String>,
    ) -> Self {
        self.referendum_file = referendum.into();
        self.regions_file = regions.into();
        self.departments_file = departments.into();
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load all three tables. Any failure aborts the whole load.
    pub fn load_all(&self) -> Result<InputTables, LoaderError> {
        Ok(InputTables {
            referendum: self.load_referendum()?,
            regions: self.load_regions()?,
            departments: self.load_departments()?,
        })
    }

    pub fn load_referendum(&self) -> Result<DataFrame, LoaderError> {
        load_table(&self.data_dir.join(&self.referendum_file), &schema::REFERENDUM)
    }

    pub fn load_regions(&self) -> Result<DataFrame, LoaderError> {
        load_table(&self.data_dir.join(&self.regions_file), &schema::REGIONS)
    }

    pub fn load_departments(&self) -> Result<DataFrame, LoaderError> {
        load_table(&self.data_dir.join(&self.departments_file), &schema::DEPARTMENTS)
    }
}

/// Read a delimited file and check it against `table`.
///
/// Every field is read as text so codes like `"01"` or `"2A"` survive as
/// written; integer columns are then cast strictly.
pub fn load_table(path: &Path, table: &TableSchema) -> Result<DataFrame, LoaderError> {
    if !path.is_file() {
        return Err(LoaderError::MissingFile(path.to_path_buf()));
    }

    let csv_error = |source| LoaderError::CsvError {
        path: path.to_path_buf(),
        source,
    };

    // Schema length 0 reads every column as String
    let df = LazyCsvReader::new(path)
        .with_separator(table.separator)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()
        .map_err(csv_error)?
        .collect()
        .map_err(csv_error)?;

    let df = apply_schema(df, table)?;
    info!(
        table = table.name,
        rows = df.height(),
        columns = df.width(),
        "Loaded {}",
        path.display()
    );
    Ok(df)
}

/// Check required columns are present and cast the integer ones.
pub fn apply_schema(mut df: DataFrame, table: &TableSchema) -> Result<DataFrame, LoaderError> {
    for &column in table.text_columns.iter().chain(table.integer_columns) {
        if df.column(column).is_err() {
            return Err(LoaderError::MissingColumn {
                table: table.name,
                column,
            });
        }
    }

    for &column in table.integer_columns {
        let invalid = |source| LoaderError::InvalidInteger {
            table: table.name,
            column,
            source,
        };
        let typed = df
            .column(column)
            .map_err(invalid)?
            .as_materialized_series()
            .strict_cast(&DataType::Int64)
            .map_err(invalid)?;
        df.with_column(typed).map_err(invalid)?;
        debug!(table = table.name, column, "Cast column to Int64");
    }

    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) {
        fs::write(dir.path().join(name), content).unwrap();
    }

    fn write_valid_inputs(dir: &TempDir) {
        write(
            dir,
            "referendum.csv",
            "Department code;Department name;Town code;Town name;Registered;Abstentions;Null;Choice A;Choice B\n\
             1;Ain;1;L'Abergement;100;20;5;40;35\n\
             ZA;Guadeloupe;1;Les Abymes;50;10;0;20;20\n",
        );
        write(
            dir,
            "regions.csv",
            "id,code,name,slug\n1,01,Guadeloupe,guadeloupe\n2,84,Auvergne-Rhône-Alpes,auvergne-rhone-alpes\n",
        );
        write(
            dir,
            "departments.csv",
            "id,region_code,code,name,slug\n1,84,01,Ain,ain\n2,01,971,Guadeloupe,guadeloupe\n",
        );
    }

    #[test]
    fn test_load_all_keeps_codes_as_text() {
        let dir = TempDir::new().unwrap();
        write_valid_inputs(&dir);

        let tables = DataLoader::new(dir.path()).load_all().unwrap();

        assert_eq!(tables.referendum.height(), 2);
        assert_eq!(tables.regions.height(), 2);
        assert_eq!(tables.departments.height(), 2);

        let codes = tables.regions.column(schema::CODE).unwrap().str().unwrap();
        assert_eq!(codes.get(0), Some("01"));
        let dep_codes = tables.departments.column(schema::CODE).unwrap().str().unwrap();
        assert_eq!(dep_codes.get(0), Some("01"));
        let ref_codes = tables
            .referendum
            .column(schema::DEPARTMENT_CODE)
            .unwrap()
            .str()
            .unwrap();
        assert_eq!(ref_codes.get(0), Some("1"));
    }

    #[test]
    fn test_vote_columns_are_integers() {
        let dir = TempDir::new().unwrap();
        write_valid_inputs(&dir);

        let referendum = DataLoader::new(dir.path()).load_referendum().unwrap();
        for column in schema::VOTE_COLUMNS {
            assert_eq!(referendum.column(column).unwrap().dtype(), &DataType::Int64);
        }
        let registered = referendum.column(schema::REGISTERED).unwrap().i64().unwrap();
        assert_eq!(registered.get(0), Some(100));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = DataLoader::new(dir.path()).load_regions().unwrap_err();
        assert!(matches!(err, LoaderError::MissingFile(_)));
    }

    #[test]
    fn test_missing_required_column() {
        let dir = TempDir::new().unwrap();
        write(&dir, "departments.csv", "id,code,name\n1,01,Ain\n");

        let err = DataLoader::new(dir.path()).load_departments().unwrap_err();
        assert!(matches!(
            err,
            LoaderError::MissingColumn {
                table: "departments",
                column: schema::REGION_CODE
            }
        ));
    }

    #[test]
    fn test_non_integer_vote_count() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "referendum.csv",
            "Department code;Registered;Abstentions;Null;Choice A;Choice B\n1;many;20;5;40;35\n",
        );

        let err = DataLoader::new(dir.path()).load_referendum().unwrap_err();
        assert!(matches!(
            err,
            LoaderError::InvalidInteger {
                column: schema::REGISTERED,
                ..
            }
        ));
    }

    #[test]
    fn test_custom_file_names() {
        let dir = TempDir::new().unwrap();
        write(&dir, "reg.csv", "code,name\n84,Auvergne-Rhône-Alpes\n");

        let loader = DataLoader::new(dir.path()).with_file_names("a.csv", "reg.csv", "b.csv");
        assert_eq!(loader.load_regions().unwrap().height(), 1);
    }
}
