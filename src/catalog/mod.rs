//! Racer catalog.
//!
//! Loads the "Racers" table into validated, immutable [`Racer`] records
//! grouped by class and group. Validation runs once, at load, against an
//! explicit [`RacerSchema`]:
//!
//! - every required column is present and non-blank
//! - the car number parses as an integer
//! - no car number repeats

mod registry;
mod types;

pub use registry::Catalog;
pub use types::{
    sanitize_table_title, CarId, Division, Field, Racer, RacerRecord, RacerSchema, DEFAULT_GROUP,
};
