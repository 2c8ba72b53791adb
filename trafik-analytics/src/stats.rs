//! Aggregate traffic statistics over stored vehicle records.
//!
//! These run on the read side against whatever the sink currently
//! retains, so every figure is scoped to the retention horizon.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use trafik_core::routes::RouteTable;
use trafik_core::snapshot::VehicleRecord;
use trafik_core::vehicle::{VehicleId, VehicleKind};

/// Aggregate figures over one set of speed observations, m/s.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SpeedSummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl SpeedSummary {
    fn from_speeds(speeds: &[f64]) -> Self {
        if speeds.is_empty() {
            return Self::default();
        }
        let count = speeds.len();
        let mean = speeds.iter().sum::<f64>() / count as f64;
        let std_dev = if count > 1 {
            let var = speeds.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            var.sqrt()
        } else {
            0.0
        };
        let min = speeds.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = speeds.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Self {
            count,
            mean,
            std_dev,
            min,
            max,
        }
    }
}

/// Overall and per-class speed statistics.
#[derive(Clone, Debug, Serialize)]
pub struct SpeedStats {
    pub overall: SpeedSummary,
    /// Classes with at least one observation, in class order.
    pub by_kind: Vec<(VehicleKind, SpeedSummary)>,
}

/// Per-route aggregate over stored records. Routes with no records get
/// zeroed figures, so reports always cover the whole table.
#[derive(Clone, Debug, Serialize)]
pub struct RouteStats {
    pub route_id: String,
    pub name: String,
    pub length: f64,
    pub speed_limit: f64,
    pub record_count: usize,
    pub distinct_vehicles: usize,
    pub mean_speed: f64,
    pub min_speed: f64,
    pub max_speed: f64,
}

/// Estimated full-route travel times from per-vehicle mean speeds.
#[derive(Clone, Debug, Serialize)]
pub struct TravelTimeStats {
    pub route_id: String,
    pub name: String,
    pub length: f64,
    pub vehicles: usize,
    pub mean_secs: f64,
    pub fastest_secs: f64,
    pub slowest_secs: f64,
}

pub fn speed_stats(records: &[VehicleRecord]) -> SpeedStats {
    let all: Vec<f64> = records.iter().map(|r| r.speed).collect();
    let by_kind = VehicleKind::ALL
        .iter()
        .filter_map(|kind| {
            let speeds: Vec<f64> = records
                .iter()
                .filter(|r| r.kind == *kind)
                .map(|r| r.speed)
                .collect();
            if speeds.is_empty() {
                None
            } else {
                Some((*kind, SpeedSummary::from_speeds(&speeds)))
            }
        })
        .collect();

    SpeedStats {
        overall: SpeedSummary::from_speeds(&all),
        by_kind,
    }
}

pub fn route_stats(routes: &RouteTable, records: &[VehicleRecord]) -> Vec<RouteStats> {
    let mut per_route: BTreeMap<&str, (Vec<f64>, BTreeSet<VehicleId>)> = BTreeMap::new();
    for record in records {
        let entry = per_route.entry(record.route_id.as_str()).or_default();
        entry.0.push(record.speed);
        entry.1.insert(record.id);
    }

    routes
        .all()
        .iter()
        .map(|route| {
            let (speeds, ids) = per_route
                .get(route.id.as_str())
                .map(|(s, i)| (s.as_slice(), i.len()))
                .unwrap_or((&[], 0));
            let summary = SpeedSummary::from_speeds(speeds);
            RouteStats {
                route_id: route.id.clone(),
                name: route.name.clone(),
                length: route.length(),
                speed_limit: route.speed_limit,
                record_count: speeds.len(),
                distinct_vehicles: ids,
                mean_speed: summary.mean,
                min_speed: if speeds.is_empty() { 0.0 } else { summary.min },
                max_speed: if speeds.is_empty() { 0.0 } else { summary.max },
            }
        })
        .collect()
}

pub fn travel_times(routes: &RouteTable, records: &[VehicleRecord]) -> Vec<TravelTimeStats> {
    let mut per_vehicle: BTreeMap<&str, BTreeMap<VehicleId, (f64, usize)>> = BTreeMap::new();
    for record in records {
        let entry = per_vehicle
            .entry(record.route_id.as_str())
            .or_default()
            .entry(record.id)
            .or_insert((0.0, 0));
        entry.0 += record.speed;
        entry.1 += 1;
    }

    routes
        .all()
        .iter()
        .filter_map(|route| {
            let vehicles = per_vehicle.get(route.id.as_str())?;
            let times: Vec<f64> = vehicles
                .values()
                .filter_map(|(sum, n)| {
                    let mean = sum / *n as f64;
                    // stationary vehicles never finish the route
                    (mean > 0.0).then(|| route.length() / mean)
                })
                .collect();
            if times.is_empty() {
                return None;
            }
            let mean_secs = times.iter().sum::<f64>() / times.len() as f64;
            Some(TravelTimeStats {
                route_id: route.id.clone(),
                name: route.name.clone(),
                length: route.length(),
                vehicles: times.len(),
                mean_secs,
                fastest_secs: times.iter().cloned().fold(f64::INFINITY, f64::min),
                slowest_secs: times.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trafik_core::routes::{Point, RouteSpec};

    fn record(id: u64, kind: VehicleKind, route_id: &str, speed: f64) -> VehicleRecord {
        VehicleRecord {
            id: VehicleId(id),
            kind,
            route_id: route_id.into(),
            progress: 0.0,
            x: 0.0,
            y: 0.0,
            speed,
            timestamp_ns: id * 1_000,
        }
    }

    fn two_route_table() -> RouteTable {
        RouteTable::from_specs(&[
            RouteSpec {
                id: "route_01".into(),
                name: "Main Street".into(),
                waypoints: vec![Point { x: 0.0, y: 0.0 }, Point { x: 100.0, y: 0.0 }],
                speed_limit: 22.0,
            },
            RouteSpec {
                id: "route_02".into(),
                name: "Broadway".into(),
                waypoints: vec![Point { x: 0.0, y: 0.0 }, Point { x: 0.0, y: 50.0 }],
                speed_limit: 14.0,
            },
        ])
        .unwrap()
    }

    #[test]
    fn summarizes_overall_and_per_kind() {
        let records = vec![
            record(1, VehicleKind::Car, "route_01", 10.0),
            record(2, VehicleKind::Car, "route_01", 20.0),
            record(3, VehicleKind::Truck, "route_01", 30.0),
        ];

        let stats = speed_stats(&records);
        assert_eq!(stats.overall.count, 3);
        assert_eq!(stats.overall.mean, 20.0);
        assert_eq!(stats.overall.min, 10.0);
        assert_eq!(stats.overall.max, 30.0);

        assert_eq!(stats.by_kind.len(), 2);
        let (kind, cars) = &stats.by_kind[0];
        assert_eq!(*kind, VehicleKind::Car);
        assert_eq!(cars.count, 2);
        assert_eq!(cars.mean, 15.0);
        assert!((cars.std_dev - 50.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn empty_records_yield_zeroed_summary() {
        let stats = speed_stats(&[]);
        assert_eq!(stats.overall.count, 0);
        assert_eq!(stats.overall.mean, 0.0);
        assert!(stats.by_kind.is_empty());
    }

    #[test]
    fn route_stats_cover_routes_without_records() {
        let table = two_route_table();
        let records = vec![
            record(1, VehicleKind::Car, "route_01", 10.0),
            record(1, VehicleKind::Car, "route_01", 14.0),
        ];

        let stats = route_stats(&table, &records);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].record_count, 2);
        assert_eq!(stats[0].distinct_vehicles, 1);
        assert_eq!(stats[0].mean_speed, 12.0);
        assert_eq!(stats[1].record_count, 0);
        assert_eq!(stats[1].mean_speed, 0.0);
        assert_eq!(stats[1].speed_limit, 14.0);
    }

    #[test]
    fn travel_time_uses_per_vehicle_mean_speed() {
        let table = two_route_table();
        let records = vec![
            record(1, VehicleKind::Car, "route_01", 10.0),
            record(1, VehicleKind::Car, "route_01", 30.0),
        ];

        let times = travel_times(&table, &records);
        assert_eq!(times.len(), 1);
        assert_eq!(times[0].vehicles, 1);
        // 100 m at a 20 m/s mean
        assert_eq!(times[0].mean_secs, 5.0);
        assert_eq!(times[0].fastest_secs, times[0].slowest_secs);
    }

    #[test]
    fn stationary_vehicles_are_excluded_from_travel_times() {
        let table = two_route_table();
        let records = vec![record(1, VehicleKind::Bus, "route_02", 0.0)];
        assert!(travel_times(&table, &records).is_empty());
    }
}
