//! Fixed names and bounds shared across the pipeline stages and the data checks.

use crate::dataset::ColumnType;

// Stage names (used in config `main.steps` and on the CLI)
pub const DOWNLOAD_STEP: &str = "download";
pub const BASIC_CLEANING_STEP: &str = "basic_cleaning";
pub const DATA_CHECK_STEP: &str = "data_check";
pub const DATA_SPLIT_STEP: &str = "data_split";
pub const TRAIN_RANDOM_FOREST_STEP: &str = "train_random_forest";
pub const TEST_REGRESSION_MODEL_STEP: &str = "test_regression_model";

// Artifact names produced and consumed between stages
pub const RAW_SAMPLE_ARTIFACT: &str = "sample.csv";
pub const CLEAN_SAMPLE_ARTIFACT: &str = "clean_sample.csv";
pub const TRAINVAL_ARTIFACT: &str = "trainval_data.csv";
pub const TEST_ARTIFACT: &str = "test_data.csv";
pub const MODEL_EXPORT_ARTIFACT: &str = "random_forest_export";

// Artifact aliases
pub const LATEST_ALIAS: &str = "latest";
pub const REFERENCE_ALIAS: &str = "reference";
pub const PROD_ALIAS: &str = "prod";

// Column names the checks and the cleaning stage address directly
pub const ID_COLUMN: &str = "id";
pub const NAME_COLUMN: &str = "name";
pub const HOST_NAME_COLUMN: &str = "host_name";
pub const BOROUGH_COLUMN: &str = "neighbourhood_group";
pub const LATITUDE_COLUMN: &str = "latitude";
pub const LONGITUDE_COLUMN: &str = "longitude";
pub const PRICE_COLUMN: &str = "price";
pub const LAST_REVIEW_COLUMN: &str = "last_review";

/// Placeholder written into missing listing and host names during cleaning
pub const MISSING_NAME_PLACEHOLDER: &str = "dummy";

/// The 16 listing columns, in the order downstream consumers index them.
pub const LISTING_SCHEMA: [(&str, ColumnType); 16] = [
    ("id", ColumnType::Int),
    ("name", ColumnType::Str),
    ("host_id", ColumnType::Int),
    ("host_name", ColumnType::Str),
    ("neighbourhood_group", ColumnType::Str),
    ("neighbourhood", ColumnType::Str),
    ("latitude", ColumnType::Float),
    ("longitude", ColumnType::Float),
    ("room_type", ColumnType::Str),
    ("price", ColumnType::Float),
    ("minimum_nights", ColumnType::Int),
    ("number_of_reviews", ColumnType::Int),
    ("last_review", ColumnType::Date),
    ("reviews_per_month", ColumnType::Float),
    ("calculated_host_listings_count", ColumnType::Int),
    ("availability_365", ColumnType::Int),
];

/// The five NYC boroughs a listing may belong to
pub const KNOWN_BOROUGHS: [&str; 5] = ["Bronx", "Brooklyn", "Manhattan", "Queens", "Staten Island"];

// Geographic bounding box around NYC (closed intervals)
pub const MIN_LONGITUDE: f64 = -74.25;
pub const MAX_LONGITUDE: f64 = -73.50;
pub const MIN_LATITUDE: f64 = 40.5;
pub const MAX_LATITUDE: f64 = 41.2;

// Plausible row counts (both bounds exclusive)
pub const MIN_ROWS_EXCLUSIVE: usize = 15_000;
pub const MAX_ROWS_EXCLUSIVE: usize = 1_000_000;

/// Expected column names in schema order
pub fn expected_columns() -> Vec<&'static str> {
    LISTING_SCHEMA.iter().map(|(name, _)| *name).collect()
}

/// Declared type of a listing column, if it belongs to the schema
pub fn declared_type(column: &str) -> Option<ColumnType> {
    LISTING_SCHEMA
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, ty)| *ty)
}

/// Get all stage names in execution order
pub fn get_all_steps() -> Vec<&'static str> {
    vec![
        DOWNLOAD_STEP,
        BASIC_CLEANING_STEP,
        DATA_CHECK_STEP,
        DATA_SPLIT_STEP,
        TRAIN_RANDOM_FOREST_STEP,
        TEST_REGRESSION_MODEL_STEP,
    ]
}
