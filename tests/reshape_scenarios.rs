use gdp_race::{
    Frame, RaceConfig,
    data::{
        load::parse_table,
        reshape::{distinct_years, reshape},
    },
};

const CSV: &str = "\
Country Name,Indicator Code,2000,2001
Germany,NY.GDP,1000000000,2000000000
Unknown Country,NY.GDP,7,8
Japan,NY.GDP,3000000000,1500000000
";

fn interest() -> Vec<String> {
    vec!["Germany".to_string(), "Japan".to_string()]
}

#[test]
fn germany_japan_scenario() {
    let table = parse_table(CSV.as_bytes()).unwrap();
    let obs = reshape(&table, "Country Name", &interest()).unwrap();

    assert_eq!(obs.len(), 4);
    assert!(obs.iter().all(|o| o.entity != "Unknown Country"));
    assert_eq!(distinct_years(&obs), vec![2000, 2001]);

    let frame = Frame::select(2001, &obs).unwrap();
    let order: Vec<_> = frame
        .rows
        .iter()
        .map(|o| (o.entity.as_str(), o.value))
        .collect();
    assert_eq!(order, vec![("Japan", 1.5e9), ("Germany", 2e9)]);
    assert!((frame.axis_bound() - 2.2e9).abs() < 1.0);
}

#[test]
fn default_interest_list_matches_the_ten_countries() {
    let cfg = RaceConfig::default();
    assert_eq!(cfg.countries.len(), 10);
    assert_eq!(cfg.entity_column, "Country Name");

    let csv = "Country Name,1960,1961\nGermany,1,2\nPeru,3,4\nUnited States,5,\n";
    let table = parse_table(csv.as_bytes()).unwrap();
    let obs = reshape(&table, &cfg.entity_column, &cfg.countries).unwrap();

    let entities: Vec<_> = obs.iter().map(|o| o.entity.as_str()).collect();
    assert!(!entities.contains(&"Peru"));
    // United States has no 1961 value.
    assert_eq!(obs.len(), 3);
}

#[test]
fn bad_rows_are_skipped_but_the_file_loads() {
    let csv = "\
Country Name,2000,2001
Germany,1,2
Japan,1,2,3,4
Italy,5
";
    let table = parse_table(csv.as_bytes()).unwrap();
    assert_eq!(table.skipped_rows, 1);
    let obs = reshape(
        &table,
        "Country Name",
        &["Germany".to_string(), "Japan".to_string(), "Italy".to_string()],
    )
    .unwrap();
    let japan = obs.iter().filter(|o| o.entity == "Japan").count();
    assert_eq!(japan, 0);
    assert_eq!(obs.iter().filter(|o| o.entity == "Italy").count(), 1);
}
