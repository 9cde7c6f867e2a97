use std::fmt::Write as _;
use std::path::Path;

/// Write a headerless `cal_housing.data` with `rows` deterministic records.
pub fn write_raw_housing(path: &Path, rows: usize) {
    let mut text = String::new();
    for i in 0..rows {
        let t = i as f64;
        let longitude = -124.0 + (t * 0.37) % 10.0;
        let latitude = 32.5 + (t * 0.53) % 9.0;
        let age = 1.0 + (i % 52) as f64;
        let households = 100.0 + (i % 400) as f64;
        let rooms = households * (3.0 + (t * 0.11) % 4.0);
        let bedrooms = rooms * 0.2;
        let population = households * (2.0 + (t * 0.07) % 2.0);
        let income = 0.5 + (t * 0.173) % 14.0;
        let value = (15_000.0 + income * 33_000.0 + (t * 977.0) % 20_000.0).min(500_001.0);
        writeln!(
            text,
            "{longitude:.6},{latitude:.6},{age:.6},{rooms:.6},{bedrooms:.6},{population:.6},{households:.6},{income:.6},{value:.6}"
        )
        .unwrap();
    }
    std::fs::write(path, text).unwrap();
}
