//! Column names shared by every stage of the pipeline.

/// `referendum.csv`
pub const DEPARTMENT_CODE: &str = "Department code";
pub const REGISTERED: &str = "Registered";
pub const ABSTENTIONS: &str = "Abstentions";
pub const NULL: &str = "Null";
pub const CHOICE_A: &str = "Choice A";
pub const CHOICE_B: &str = "Choice B";

/// `regions.csv` and `departments.csv`
pub const CODE: &str = "code";
pub const NAME: &str = "name";
pub const REGION_CODE: &str = "region_code";

/// Region-department lookup
pub const CODE_REG: &str = "code_reg";
pub const NAME_REG: &str = "name_reg";
pub const CODE_DEP: &str = "code_dep";
pub const NAME_DEP: &str = "name_dep";

/// Derived map columns
pub const EXPRESSED: &str = "expressed";
pub const RATIO: &str = "ratio";

/// Vote count columns, summed per region.
pub const VOTE_COLUMNS: [&str; 5] = [REGISTERED, ABSTENTIONS, NULL, CHOICE_A, CHOICE_B];

/// Width department codes are zero-padded to before joining.
pub const DEPARTMENT_CODE_WIDTH: usize = 2;

/// Expected layout of one input table.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub name: &'static str,
    pub separator: u8,
    /// Columns that must be present, read as text.
    pub text_columns: &'static [&'static str],
    /// Columns that must be present and hold integers.
    pub integer_columns: &'static [&'static str],
}

pub const REFERENDUM: TableSchema = TableSchema {
    name: "referendum",
    separator: b';',
    text_columns: &[DEPARTMENT_CODE],
    integer_columns: &VOTE_COLUMNS,
};

pub const REGIONS: TableSchema = TableSchema {
    name: "regions",
    separator: b',',
    text_columns: &[CODE, NAME],
    integer_columns: &[],
};

pub const DEPARTMENTS: TableSchema = TableSchema {
    name: "departments",
    separator: b',',
    text_columns: &[CODE, NAME, REGION_CODE],
    integer_columns: &[],
};
