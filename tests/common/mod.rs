#![allow(dead_code)]

use chrono::NaiveDate;
use std::fs;
use tempfile::TempDir;

use flight_delay_web::{assets::Assets, config::Config, types::FlightInput};

pub const COLUMNS: [&str; 18] = [
    "Airline", "Dep_Airport", "Arr_Airport", "Dep_Delay", "Flight_Duration", "Day_Of_Week",
    "Dep_CityName", "DepTime_label", "Arr_CityName", "Distance_type", "Manufacturer", "Model",
    "Aicraft_age", "origin_temp", "origin_prcp", "dest_temp", "dest_prcp", "Holiday_Flag",
];

// Deliberately not in column order; column order decides the list pairing.
pub const CATEGORICAL: [&str; 9] = [
    "Model", "Manufacturer", "Airline", "Dep_Airport", "Arr_Airport", "Dep_CityName",
    "DepTime_label", "Arr_CityName", "Distance_type",
];

pub const WEATHER_CSV: &str = "airport_id,merge_key_date,temp,prcp
ATL,2023-01-15,10,0.2
ATL,2023-01-16 00:00:00,12,
ORD,2023-01-15,-3.5,1.1
ORD,2023-01-15,99,99
DEN,2023-01-15,sensor fault,0
";

const PANDAS_CATEGORICAL: &str = r#"[["Delta Air Lines Inc.", "Endeavor Air", "Frontier Airlines Inc.", "JetBlue Airways", "Republic Airways", "Southwest Airlines Co."], ["ATL", "DEN", "DFW", "LAX", "LGA", "ORD"], ["ATL", "BGM", "CVG", "FAY", "MSP", "ORD"], ["Atlanta, GA", "Unknown"], ["Afternoon", "Evening", "Morning", "Night", "Unknown"], ["Chicago, IL", "Unknown"], ["Long", "Medium", "Short", "Unknown"], ["AIRBUS", "BOEING", "EMBRAER"], ["A320", "B737", "E175", "Unknown"]]"#;

/// Three trees:
/// 0: Dep_Delay <= 15 -> -1.5, else origin_temp <= 0.5 (NaN left) -> 0.9 / 1.6
/// 1: Airline in {Delta, JetBlue} -> 0.4, else -0.2
/// 2: constant 0
pub fn model_text() -> String {
    format!(
        "tree
version=v4
num_class=1
num_tree_per_iteration=1
label_index=0
max_feature_idx=17
objective=binary sigmoid:1
feature_names={names}
feature_infos=none
tree_sizes=1 1 1

Tree=0
num_leaves=3
num_cat=0
split_feature=3 13
split_gain=10 4
threshold=15.000000000000002 0.50000000000000011
decision_type=2 10
left_child=-1 -2
right_child=1 -3
leaf_value=-1.5 0.90000000000000002 1.6000000000000001
leaf_weight=1 1 1
leaf_count=10 5 5
internal_value=0 0
internal_weight=0 0
internal_count=20 10
is_linear=0
shrinkage=1


Tree=1
num_leaves=2
num_cat=1
split_feature=0
split_gain=3
threshold=0
decision_type=1
left_child=-1
right_child=-2
leaf_value=0.40000000000000002 -0.20000000000000001
leaf_weight=1 1
leaf_count=10 10
internal_value=0
internal_weight=0
internal_count=20
cat_boundaries=0 1
cat_threshold=9
is_linear=0
shrinkage=0.1


Tree=2
num_leaves=1
num_cat=0
split_feature=
split_gain=
threshold=
decision_type=
left_child=
right_child=
leaf_value=0
leaf_weight=
leaf_count=
internal_value=
internal_weight=
internal_count=
is_linear=0
shrinkage=1


end of trees

feature_importances:
Dep_Delay=1
origin_temp=1
Airline=1

parameters:
[boosting: gbdt]
[objective: binary]
end of parameters

pandas_categorical:{cats}
",
        names = COLUMNS.join(" "),
        cats = PANDAS_CATEGORICAL
    )
}

pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
}

impl Fixture {
    pub fn write(file: &str, contents: &str) -> Self {
        let f = Self::new();
        fs::write(f.dir.path().join(file), contents).unwrap();
        f
    }

    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path();
        fs::write(p.join("model.txt"), model_text()).unwrap();
        fs::write(p.join("weather.csv"), WEATHER_CSV).unwrap();
        fs::write(p.join("columns.json"), serde_json::to_string(&COLUMNS).unwrap()).unwrap();
        fs::write(p.join("categorical.json"), serde_json::to_string(&CATEGORICAL).unwrap()).unwrap();
        let config = Config {
            model_path: p.join("model.txt"),
            weather_path: p.join("weather.csv"),
            columns_path: p.join("columns.json"),
            categorical_path: p.join("categorical.json"),
            port: 0,
            log_pred: false,
        };
        Self { dir, config }
    }

    pub fn load(&self) -> anyhow::Result<Assets> {
        Assets::load(&self.config)
    }
}

pub fn assets() -> Assets {
    Fixture::new().load().unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn flight(day: NaiveDate, airline: &str, origin: &str, dest: &str, delay: i32) -> FlightInput {
    FlightInput {
        flight_date: day,
        airline: airline.to_string(),
        origin: origin.to_string(),
        destination: dest.to_string(),
        dep_delay_min: delay,
        duration_min: 120,
    }
}
