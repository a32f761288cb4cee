//! Validated racer catalog.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::types::{CarId, Division, Field, Racer, RacerRecord, RacerSchema, DEFAULT_GROUP};
use crate::error::{NotFoundError, ValidationError};

/// Racers grouped by class and group, keyed by car id.
///
/// Built once by [`Catalog::load`]; never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    racers: Vec<Racer>,
    index: HashMap<CarId, usize>,
}

impl Catalog {
    /// Validates racer rows against the default schema.
    pub fn load<I>(records: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = RacerRecord>,
    {
        Self::load_with_schema(records, &RacerSchema::default())
    }

    /// Validates racer rows against an explicit schema.
    ///
    /// Rows are numbered from 1. The first failing row aborts the load.
    pub fn load_with_schema<I>(records: I, schema: &RacerSchema) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = RacerRecord>,
    {
        let mut racers = Vec::new();
        let mut index: HashMap<CarId, usize> = HashMap::new();

        for (i, record) in records.into_iter().enumerate() {
            let row = i + 1;
            for &field in schema.required() {
                if record.field(field).is_none() {
                    return Err(ValidationError::MissingField {
                        row,
                        field: field.column(),
                    });
                }
            }

            // Car is always needed to key the catalog, whatever the schema says.
            let raw_car = record.field(Field::Car).ok_or(ValidationError::MissingField {
                row,
                field: Field::Car.column(),
            })?;
            let car: CarId = raw_car.parse().map_err(|_| ValidationError::InvalidField {
                row,
                field: Field::Car.column(),
                value: raw_car.to_string(),
            })?;

            if let Some(&first) = index.get(&car) {
                return Err(ValidationError::DuplicateCar {
                    car,
                    first_row: first + 1,
                    row,
                });
            }

            let racer = Racer {
                car,
                name: record.field(Field::Name).unwrap_or_default().to_string(),
                class: record.field(Field::Class).unwrap_or_default().to_string(),
                group: record
                    .field(Field::Group)
                    .unwrap_or(DEFAULT_GROUP)
                    .to_string(),
                description: record.field(Field::Description).map(str::to_string),
            };
            index.insert(car, racers.len());
            racers.push(racer);
        }

        debug!(racers = racers.len(), "racer catalog loaded");
        Ok(Self { racers, index })
    }

    /// Finds a racer by car id.
    pub fn lookup(&self, car: CarId) -> Result<&Racer, NotFoundError> {
        self.index
            .get(&car)
            .map(|&i| &self.racers[i])
            .ok_or(NotFoundError { car })
    }

    /// Groups present in a class. Empty for an unknown class.
    pub fn groups_of(&self, class: &str) -> BTreeSet<String> {
        self.racers
            .iter()
            .filter(|r| r.class == class)
            .map(|r| r.group.clone())
            .collect()
    }

    /// Distinct classes, sorted.
    pub fn classes(&self) -> BTreeSet<String> {
        self.racers.iter().map(|r| r.class.clone()).collect()
    }

    /// Every (class, group) pair, in order of first appearance.
    pub fn divisions(&self) -> Vec<Division> {
        let mut seen = BTreeSet::new();
        self.racers
            .iter()
            .map(Racer::division)
            .filter(|d| seen.insert(d.clone()))
            .collect()
    }

    /// Racers of one division, in load order.
    pub fn racers_in(&self, division: &Division) -> Vec<&Racer> {
        self.racers
            .iter()
            .filter(|r| r.class == division.class && r.group == division.group)
            .collect()
    }

    /// Car ids of one division, in load order.
    pub fn cars_in(&self, division: &Division) -> Vec<CarId> {
        self.racers_in(division).into_iter().map(|r| r.car).collect()
    }

    /// All racers in load order.
    pub fn racers(&self) -> &[Racer] {
        &self.racers
    }

    pub fn len(&self) -> usize {
        self.racers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.racers.is_empty()
    }
}
