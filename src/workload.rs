// src/workload.rs
use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::directory::{Course, TeamMember};
use crate::team_assignment::Assignment;

// Utilization thresholds for the workload partition.
const HIGH_UTILIZATION: Decimal = dec!(0.8);
const LOW_UTILIZATION: Decimal = dec!(0.3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkloadBand {
    High,
    Balanced,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberWorkload {
    pub member_id: String,
    pub name: String,
    pub position: String,
    pub month_count: u32,
    pub ratio: Decimal,
    pub band: WorkloadBand,
}

/// A staff member or vehicle booked onto two assignments dated the same
/// day. Advisory only; the store never blocks the booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScheduleConflict {
    #[serde(rename_all = "camelCase")]
    MemberDoubleBooked {
        date: NaiveDate,
        member_id: String,
        assignment_ids: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    VehicleDoubleBooked {
        date: NaiveDate,
        vehicle_id: String,
        assignment_ids: Vec<String>,
    },
}

fn in_month(date: NaiveDate, year: i32, month: u32) -> bool {
    date.year() == year && date.month() == month
}

/// Number of assignments in the given month whose staff set contains the
/// member.
pub fn monthly_workload(
    assignments: &[Assignment],
    member_id: &str,
    year: i32,
    month: u32,
) -> u32 {
    assignments
        .iter()
        .filter(|a| in_month(a.date, year, month))
        .filter(|a| a.member_ids.iter().any(|m| m == member_id))
        .count() as u32
}

/// Dates with at least one course occurrence and zero assignments. This is
/// the coarse date-level check: one assignment anywhere on the date counts
/// the whole date as covered, even if other courses that day have none.
pub fn understaffed_dates(courses: &[Course], assignments: &[Assignment]) -> Vec<NaiveDate> {
    let covered: BTreeSet<NaiveDate> = assignments.iter().map(|a| a.date).collect();
    let course_dates: BTreeSet<NaiveDate> = courses.iter().map(|c| c.date).collect();
    course_dates
        .into_iter()
        .filter(|d| !covered.contains(d))
        .collect()
}

pub fn classify(month_count: u32, monthly_capacity: u32) -> (Decimal, WorkloadBand) {
    let ratio = Decimal::from(month_count) / Decimal::from(monthly_capacity.max(1));
    let band = if ratio > HIGH_UTILIZATION {
        WorkloadBand::High
    } else if ratio < LOW_UTILIZATION {
        WorkloadBand::Low
    } else {
        WorkloadBand::Balanced
    };
    (ratio, band)
}

/// Per-member workload for one month, partitioned into bands against the
/// assumed monthly capacity.
pub fn workload_report(
    members: &[TeamMember],
    assignments: &[Assignment],
    year: i32,
    month: u32,
    monthly_capacity: u32,
) -> Vec<MemberWorkload> {
    members
        .iter()
        .map(|member| {
            let month_count = monthly_workload(assignments, &member.id, year, month);
            let (ratio, band) = classify(month_count, monthly_capacity);
            MemberWorkload {
                member_id: member.id.clone(),
                name: member.name.clone(),
                position: member.position.clone(),
                month_count,
                ratio,
                band,
            }
        })
        .collect()
}

/// Members and vehicles appearing on more than one assignment dated `date`.
pub fn conflicts_for_date(assignments: &[Assignment], date: NaiveDate) -> Vec<ScheduleConflict> {
    let on_date: Vec<&Assignment> = assignments.iter().filter(|a| a.date == date).collect();

    let mut member_uses: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    let mut vehicle_uses: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for assignment in &on_date {
        for member in &assignment.member_ids {
            member_uses
                .entry(member.as_str())
                .or_default()
                .push(assignment.id.clone());
        }
        if let Some(vehicle) = &assignment.vehicle_id {
            vehicle_uses
                .entry(vehicle.as_str())
                .or_default()
                .push(assignment.id.clone());
        }
    }

    let mut conflicts = Vec::new();
    for (member_id, assignment_ids) in member_uses {
        if assignment_ids.len() > 1 {
            conflicts.push(ScheduleConflict::MemberDoubleBooked {
                date,
                member_id: member_id.to_string(),
                assignment_ids,
            });
        }
    }
    for (vehicle_id, assignment_ids) in vehicle_uses {
        if assignment_ids.len() > 1 {
            conflicts.push(ScheduleConflict::VehicleDoubleBooked {
                date,
                vehicle_id: vehicle_id.to_string(),
                assignment_ids,
            });
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(id: &str, date: &str, members: &[&str], vehicle: Option<&str>) -> Assignment {
        Assignment {
            id: id.to_string(),
            course_id: "C-1".to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            member_ids: members.iter().map(|m| m.to_string()).collect(),
            vehicle_id: vehicle.map(String::from),
            notes: None,
        }
    }

    #[test]
    fn classify_partitions_against_capacity_of_eight() {
        assert_eq!(classify(7, 8).1, WorkloadBand::High); // 0.875
        assert_eq!(classify(4, 8).1, WorkloadBand::Balanced); // 0.5
        assert_eq!(classify(2, 8).1, WorkloadBand::Low); // 0.25
    }

    #[test]
    fn classify_thresholds_are_exclusive() {
        // Exactly 80% is not "high" and exactly 30% is not "low".
        assert_eq!(classify(8, 10).1, WorkloadBand::Balanced);
        assert_eq!(classify(3, 10).1, WorkloadBand::Balanced);
    }

    #[test]
    fn double_booked_member_is_reported_once_per_date() {
        let assignments = vec![
            assignment("TA-1", "2025-06-15", &["M-01", "M-02"], None),
            assignment("TA-2", "2025-06-15", &["M-01"], None),
            assignment("TA-3", "2025-06-16", &["M-01"], None),
        ];
        let conflicts =
            conflicts_for_date(&assignments, NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());
        assert_eq!(
            conflicts,
            vec![ScheduleConflict::MemberDoubleBooked {
                date: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
                member_id: "M-01".to_string(),
                assignment_ids: vec!["TA-1".to_string(), "TA-2".to_string()],
            }]
        );
    }

    #[test]
    fn shared_vehicle_on_one_date_conflicts() {
        let assignments = vec![
            assignment("TA-1", "2025-06-15", &[], Some("V-01")),
            assignment("TA-2", "2025-06-15", &[], Some("V-01")),
            assignment("TA-3", "2025-06-18", &[], Some("V-01")),
        ];
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let conflicts = conflicts_for_date(&assignments, date);
        assert_eq!(conflicts.len(), 1);
        assert!(matches!(
            &conflicts[0],
            ScheduleConflict::VehicleDoubleBooked { vehicle_id, .. } if vehicle_id == "V-01"
        ));
        // Different dates never conflict with each other.
        let other = conflicts_for_date(&assignments, NaiveDate::from_ymd_opt(2025, 6, 18).unwrap());
        assert!(other.is_empty());
    }
}
