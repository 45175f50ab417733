#![allow(dead_code)]

use std::fmt::Write;
use std::path::Path;

pub const HEADER: &str = "id,name,host_id,host_name,neighbourhood_group,neighbourhood,latitude,longitude,room_type,price,minimum_nights,number_of_reviews,last_review,reviews_per_month,calculated_host_listings_count,availability_365";

pub const BOROUGHS: [&str; 5] = ["Bronx", "Brooklyn", "Manhattan", "Queens", "Staten Island"];

/// A listings CSV with `rows` records cycling through the boroughs.
///
/// `price_of` picks each row's price so callers can plant outliers.
pub fn listings_csv(rows: usize, price_of: impl Fn(usize) -> f64) -> String {
    let mut csv = String::from(HEADER);
    csv.push('\n');
    for i in 0..rows {
        let borough = BOROUGHS[i % BOROUGHS.len()];
        let name = if i % 97 == 0 { "" } else { "Sunny room" };
        let review = if i % 2 == 0 { "2019-06-23" } else { "" };
        writeln!(
            csv,
            "{},{},{},Host,{},Area {},40.7{},-73.9{},Private room,{},1,3,{},0.4,1,120",
            1000 + i,
            name,
            50 + i % 13,
            borough,
            i % 7,
            i % 10,
            i % 10,
            price_of(i),
            review
        )
        .unwrap();
    }
    csv
}

pub fn write(path: &Path, contents: &str) {
    std::fs::write(path, contents).unwrap();
}

pub const CONFIG: &str = r#"
[main]
project_name = "nyc_airbnb"
experiment_name = "integration"
steps = "all"
components_repository = "components"

[etl]
sample = "sample1.csv"
min_price = 10
max_price = 350

[data_check]
kl_threshold = 0.2

[modeling]
test_size = 0.2
val_size = 0.2
random_seed = 42
stratify_by = "neighbourhood_group"

[modeling.random_forest]
n_estimators = 10
max_depth = 5
"#;
