pub mod pbf;
pub mod units;
