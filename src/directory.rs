// src/directory.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub type CourseId = String;
pub type MemberId = String;
pub type VehicleId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VehicleStatus {
    Active,
    Maintenance,
    OutOfService,
}

/// A scheduled training course occurrence. Reference data: there is no
/// create/edit flow for courses, they are seeded at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub category: String,
    pub date: NaiveDate,
    pub capacity: u32,
    pub registered: u32,
    pub duration_hours: Decimal,
    pub location: String,
    pub company: Option<String>,
    pub instructor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: MemberId,
    pub name: String,
    pub position: String,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub kind: String,
    pub seats: u32,
    pub status: VehicleStatus,
}

/// Read-only access to the reference collections. The assignment store and
/// the workload views only ever see this trait, so the seeded in-memory
/// data can later be swapped for a database-backed source.
pub trait ReferenceDirectory: Send + Sync {
    fn courses(&self) -> &[Course];
    fn members(&self) -> &[TeamMember];
    fn vehicles(&self) -> &[Vehicle];

    fn course(&self, id: &str) -> Option<&Course> {
        self.courses().iter().find(|c| c.id == id)
    }

    fn member(&self, id: &str) -> Option<&TeamMember> {
        self.members().iter().find(|m| m.id == id)
    }

    fn vehicle(&self, id: &str) -> Option<&Vehicle> {
        self.vehicles().iter().find(|v| v.id == id)
    }
}

/// In-memory directory holding the fixed demo dataset.
pub struct SeededDirectory {
    courses: Vec<Course>,
    members: Vec<TeamMember>,
    vehicles: Vec<Vehicle>,
}

impl SeededDirectory {
    pub fn new() -> Self {
        let directory = Self::with_data(seed_courses(), seed_members(), seed_vehicles());
        debug!(
            "Seeded directory: {} courses, {} members, {} vehicles",
            directory.courses.len(),
            directory.members.len(),
            directory.vehicles.len()
        );
        directory
    }

    /// Build a directory from explicit collections. Used by tests to pin
    /// fixtures and by anything that loads reference data from elsewhere.
    pub fn with_data(
        courses: Vec<Course>,
        members: Vec<TeamMember>,
        vehicles: Vec<Vehicle>,
    ) -> Self {
        Self {
            courses,
            members,
            vehicles,
        }
    }
}

impl Default for SeededDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceDirectory for SeededDirectory {
    fn courses(&self) -> &[Course] {
        &self.courses
    }

    fn members(&self) -> &[TeamMember] {
        &self.members
    }

    fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    // Seed literals only; every (y, m, d) triple below is a valid date.
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seed_courses() -> Vec<Course> {
    vec![
        Course {
            id: "C-101".into(),
            name: "Forklift Certification A".into(),
            category: "Certification".into(),
            date: date(2025, 6, 15),
            capacity: 12,
            registered: 9,
            duration_hours: dec!(8.0),
            location: "Training Hall 1".into(),
            company: Some("Nordfrakt AB".into()),
            instructor: Some("Karin Lund".into()),
        },
        Course {
            id: "C-102".into(),
            name: "ADR Refresher".into(),
            category: "Safety".into(),
            date: date(2025, 6, 18),
            capacity: 16,
            registered: 14,
            duration_hours: dec!(6.5),
            location: "Training Hall 2".into(),
            company: None,
            instructor: Some("Mats Berg".into()),
        },
        Course {
            id: "C-103".into(),
            name: "Crane Operations Basics".into(),
            category: "Certification".into(),
            date: date(2025, 6, 24),
            capacity: 8,
            registered: 8,
            duration_hours: dec!(8.0),
            location: "Yard B".into(),
            company: Some("Hamnlogistik".into()),
            instructor: None,
        },
        // The refresher runs twice; same course id on two dates.
        Course {
            id: "C-102".into(),
            name: "ADR Refresher".into(),
            category: "Safety".into(),
            date: date(2025, 7, 2),
            capacity: 16,
            registered: 6,
            duration_hours: dec!(6.5),
            location: "Training Hall 2".into(),
            company: None,
            instructor: Some("Mats Berg".into()),
        },
        Course {
            id: "C-104".into(),
            name: "First Aid & CPR".into(),
            category: "Safety".into(),
            date: date(2025, 7, 9),
            capacity: 20,
            registered: 11,
            duration_hours: dec!(4.0),
            location: "Training Hall 1".into(),
            company: None,
            instructor: Some("Sara Ek".into()),
        },
    ]
}

fn seed_members() -> Vec<TeamMember> {
    vec![
        TeamMember {
            id: "M-01".into(),
            name: "Karin Lund".into(),
            position: "Lead Instructor".into(),
            skills: vec!["forklift".into(), "crane".into()],
        },
        TeamMember {
            id: "M-02".into(),
            name: "Mats Berg".into(),
            position: "Instructor".into(),
            skills: vec!["adr".into(), "first-aid".into()],
        },
        TeamMember {
            id: "M-03".into(),
            name: "Sara Ek".into(),
            position: "Instructor".into(),
            skills: vec!["first-aid".into()],
        },
        TeamMember {
            id: "M-04".into(),
            name: "Jonas Wik".into(),
            position: "Assistant".into(),
            skills: vec!["logistics".into()],
        },
        TeamMember {
            id: "M-05".into(),
            name: "Elin Dahl".into(),
            position: "Driver".into(),
            skills: vec!["minibus".into(), "truck".into()],
        },
    ]
}

fn seed_vehicles() -> Vec<Vehicle> {
    vec![
        Vehicle {
            id: "V-01".into(),
            name: "Minibus 1".into(),
            kind: "Minibus".into(),
            seats: 9,
            status: VehicleStatus::Active,
        },
        Vehicle {
            id: "V-02".into(),
            name: "Minibus 2".into(),
            kind: "Minibus".into(),
            seats: 9,
            status: VehicleStatus::Maintenance,
        },
        Vehicle {
            id: "V-03".into(),
            name: "Crew Truck".into(),
            kind: "Truck".into(),
            seats: 3,
            status: VehicleStatus::Active,
        },
    ]
}
