use std::collections::HashMap;

use thiserror::Error;

use crate::topics::slugify;
use crate::types::{HomeTopology, RoomReading, TemperatureRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("room {room_id} has a temperature reading but no name in home {home_id}")]
    UnknownRoom { home_id: String, room_id: String },
}

/// Collapses repeated room ids to one reading each.
///
/// The last temperature for a room wins; rooms keep the position of their
/// first appearance.
pub fn latest_readings<'a>(
    readings: impl IntoIterator<Item = &'a RoomReading>,
) -> Vec<RoomReading> {
    let mut merged: Vec<RoomReading> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();

    for reading in readings {
        match slots.get(reading.room_id.as_str()) {
            Some(&slot) => merged[slot].temperature = reading.temperature,
            None => {
                slots.insert(reading.room_id.as_str(), merged.len());
                merged.push(reading.clone());
            }
        }
    }
    merged
}

/// Pairs every room's reading with its room name, keeping reading order.
///
/// Produces one record per distinct room id (see [`latest_readings`]). Fails
/// on the first reading whose room is missing from the topology, so a partial
/// set of records is never returned.
pub fn join_rooms(
    topology: &HomeTopology,
    readings: &[RoomReading],
) -> Result<Vec<TemperatureRecord>, JoinError> {
    latest_readings(readings)
        .into_iter()
        .map(|reading| {
            let name = topology.room_names.get(&reading.room_id).ok_or_else(|| {
                JoinError::UnknownRoom {
                    home_id: topology.home_id.clone(),
                    room_id: reading.room_id.clone(),
                }
            })?;

            Ok(TemperatureRecord {
                room_id: reading.room_id,
                slug: slugify(name),
                room_name: name.clone(),
                temperature: reading.temperature,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use pretty_assertions::assert_eq;

    fn topology(rooms: &[(&str, &str)]) -> HomeTopology {
        HomeTopology {
            home_id: "H1".to_string(),
            room_names: rooms
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn reading(room_id: &str, temperature: f64) -> RoomReading {
        RoomReading {
            room_id: room_id.to_string(),
            temperature,
        }
    }

    #[test]
    fn one_record_per_reading_in_reading_order() {
        let topology = topology(&[
            ("R1", "Living Room"),
            ("R2", "Kitchen"),
            ("R3", "Attic"),
        ]);
        let readings = vec![reading("R2", 19.0), reading("R1", 21.5)];

        let records = join_rooms(&topology, &readings).unwrap();

        assert_eq!(records.len(), readings.len());
        assert_eq!(
            records,
            vec![
                TemperatureRecord {
                    room_id: "R2".to_string(),
                    slug: "kitchen".to_string(),
                    room_name: "Kitchen".to_string(),
                    temperature: 19.0,
                },
                TemperatureRecord {
                    room_id: "R1".to_string(),
                    slug: "living-room".to_string(),
                    room_name: "Living Room".to_string(),
                    temperature: 21.5,
                },
            ]
        );
    }

    #[test]
    fn records_carry_topology_names_and_reading_values() {
        let topology = topology(&[("a", "Guest Room"), ("b", "Office"), ("c", "Hall")]);
        let readings = vec![reading("c", 17.25), reading("a", 20.0), reading("b", 22.5)];

        let records = join_rooms(&topology, &readings).unwrap();

        for (record, reading) in records.iter().zip(&readings) {
            assert_eq!(record.room_id, reading.room_id);
            assert_eq!(record.room_name, topology.room_names[&reading.room_id]);
            assert_eq!(record.temperature, reading.temperature);
        }
    }

    #[test]
    fn empty_readings_yield_no_records() {
        let records = join_rooms(&topology(&[("R1", "Living Room")]), &[]).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn repeated_room_is_joined_once_with_last_value() {
        let topology = topology(&[("R1", "Living Room"), ("R2", "Kitchen")]);
        let readings = vec![reading("R1", 20.0), reading("R2", 19.0), reading("R1", 21.5)];

        let records = join_rooms(&topology, &readings).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].room_id, "R1");
        assert_eq!(records[0].temperature, 21.5);
        assert_eq!(records[1].room_id, "R2");
    }

    #[test]
    fn latest_readings_keeps_first_seen_order() {
        let merged = latest_readings(&[
            reading("b", 1.0),
            reading("a", 2.0),
            reading("b", 3.0),
            reading("c", 4.0),
            reading("a", 5.0),
        ]);

        assert_eq!(
            merged,
            vec![reading("b", 3.0), reading("a", 5.0), reading("c", 4.0)]
        );
    }

    #[test]
    fn unknown_room_aborts_the_join() {
        let topology = topology(&[("R1", "Living Room")]);
        let readings = vec![reading("R1", 21.5), reading("R9", 18.0)];

        let err = join_rooms(&topology, &readings).unwrap_err();

        assert_eq!(
            err,
            JoinError::UnknownRoom {
                home_id: "H1".to_string(),
                room_id: "R9".to_string(),
            }
        );
    }
}
