// src/team_assignment.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::{has_role, Employee, Role};
use crate::directory::{Course, CourseId, MemberId, ReferenceDirectory, VehicleId};
use crate::workload::{self, MemberWorkload, ScheduleConflict};

/// Links one course occurrence (course id + date) to the staff working it,
/// an optional vehicle and a free-text note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub course_id: CourseId,
    pub date: NaiveDate,
    pub member_ids: Vec<MemberId>,
    pub vehicle_id: Option<VehicleId>,
    pub notes: Option<String>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("operation requires the {required:?} role")]
    Forbidden { required: Role },
}

/// The authoritative in-memory collection of assignment records, plus the
/// read-only reference collections behind [`ReferenceDirectory`].
///
/// Mutations check the caller's role here, at the store boundary, so no
/// caller can bypass the gate. Reads need `User`, mutations `Manager`.
/// Apart from that one rejection, operations keep their no-op contract:
/// acting on an id that does not exist changes nothing and is not an
/// error; the `bool` results report whether anything changed.
pub struct TeamAssignmentService {
    directory: Arc<dyn ReferenceDirectory>,
    assignments: Mutex<Vec<Assignment>>,
    next_id: AtomicU64,
    monthly_capacity: u32,
}

impl TeamAssignmentService {
    pub fn new(directory: Arc<dyn ReferenceDirectory>, monthly_capacity: u32) -> Self {
        Self {
            directory,
            assignments: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            monthly_capacity: monthly_capacity.max(1),
        }
    }

    fn authorize(&self, actor: &Employee, required: Role) -> Result<(), ScheduleError> {
        if has_role(actor.role, required) {
            Ok(())
        } else {
            warn!(
                "{} ({:?}) denied access to a {:?} operation",
                actor.username, actor.role, required
            );
            Err(ScheduleError::Forbidden { required })
        }
    }

    // --- Mutations (Manager) ---

    /// Creates the assignment for `(course_id, date)` with no staff and no
    /// vehicle, or returns the existing one: an occurrence maps to at most
    /// one assignment, so calling this twice yields the same id.
    pub fn create_assignment(
        &self,
        actor: &Employee,
        course_id: &str,
        date: NaiveDate,
    ) -> Result<String, ScheduleError> {
        self.authorize(actor, Role::Manager)?;
        let mut assignments = self.assignments.lock().unwrap();
        if let Some(existing) = assignments
            .iter()
            .find(|a| a.course_id == course_id && a.date == date)
        {
            debug!(
                "Assignment {} already covers course {} on {}",
                existing.id, course_id, date
            );
            return Ok(existing.id.clone());
        }
        let id = format!("TA-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        info!("Creating assignment {} for course {} on {}", id, course_id, date);
        assignments.push(Assignment {
            id: id.clone(),
            course_id: course_id.to_string(),
            date,
            member_ids: Vec::new(),
            vehicle_id: None,
            notes: None,
        });
        Ok(id)
    }

    pub fn remove_assignment(
        &self,
        actor: &Employee,
        assignment_id: &str,
    ) -> Result<bool, ScheduleError> {
        self.authorize(actor, Role::Manager)?;
        let mut assignments = self.assignments.lock().unwrap();
        let before = assignments.len();
        assignments.retain(|a| a.id != assignment_id);
        let removed = assignments.len() < before;
        if removed {
            info!("Removed assignment {}", assignment_id);
        } else {
            debug!("Remove ignored; no assignment {}", assignment_id);
        }
        Ok(removed)
    }

    /// Adds the member to the assignment's staff set. Idempotent: a member
    /// already present is left alone and the call reports no change.
    pub fn assign_member(
        &self,
        actor: &Employee,
        assignment_id: &str,
        member_id: &str,
    ) -> Result<bool, ScheduleError> {
        self.authorize(actor, Role::Manager)?;
        let mut assignments = self.assignments.lock().unwrap();
        let Some(assignment) = assignments.iter_mut().find(|a| a.id == assignment_id) else {
            debug!("Assign ignored; no assignment {}", assignment_id);
            return Ok(false);
        };
        if assignment.member_ids.iter().any(|m| m == member_id) {
            debug!(
                "Member {} already on assignment {}",
                member_id, assignment_id
            );
            return Ok(false);
        }
        assignment.member_ids.push(member_id.to_string());
        info!("Assigned member {} to {}", member_id, assignment_id);
        Ok(true)
    }

    pub fn remove_member(
        &self,
        actor: &Employee,
        assignment_id: &str,
        member_id: &str,
    ) -> Result<bool, ScheduleError> {
        self.authorize(actor, Role::Manager)?;
        let mut assignments = self.assignments.lock().unwrap();
        let Some(assignment) = assignments.iter_mut().find(|a| a.id == assignment_id) else {
            return Ok(false);
        };
        let before = assignment.member_ids.len();
        assignment.member_ids.retain(|m| m != member_id);
        let removed = assignment.member_ids.len() < before;
        if removed {
            info!("Removed member {} from {}", member_id, assignment_id);
        }
        Ok(removed)
    }

    /// Sets or clears the vehicle reference. Availability against other
    /// assignments is not enforced here; double bookings surface through
    /// the conflict view instead.
    pub fn assign_vehicle(
        &self,
        actor: &Employee,
        assignment_id: &str,
        vehicle_id: Option<&str>,
    ) -> Result<bool, ScheduleError> {
        self.authorize(actor, Role::Manager)?;
        let mut assignments = self.assignments.lock().unwrap();
        let Some(assignment) = assignments.iter_mut().find(|a| a.id == assignment_id) else {
            return Ok(false);
        };
        let new_value = vehicle_id.map(String::from);
        if assignment.vehicle_id == new_value {
            return Ok(false);
        }
        info!(
            "Vehicle for {} set to {:?}",
            assignment_id,
            vehicle_id.unwrap_or("none")
        );
        assignment.vehicle_id = new_value;
        Ok(true)
    }

    /// Overwrites the note text.
    pub fn set_notes(
        &self,
        actor: &Employee,
        assignment_id: &str,
        notes: &str,
    ) -> Result<bool, ScheduleError> {
        self.authorize(actor, Role::Manager)?;
        let mut assignments = self.assignments.lock().unwrap();
        let Some(assignment) = assignments.iter_mut().find(|a| a.id == assignment_id) else {
            return Ok(false);
        };
        assignment.notes = Some(notes.to_string());
        Ok(true)
    }

    // --- Reads (User) ---

    pub fn assignments(&self, actor: &Employee) -> Result<Vec<Assignment>, ScheduleError> {
        self.authorize(actor, Role::User)?;
        Ok(self.assignments.lock().unwrap().clone())
    }

    pub fn assignment(
        &self,
        actor: &Employee,
        assignment_id: &str,
    ) -> Result<Option<Assignment>, ScheduleError> {
        self.authorize(actor, Role::User)?;
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == assignment_id)
            .cloned())
    }

    /// First assignment matching the occurrence, or none.
    pub fn assignment_for_occurrence(
        &self,
        actor: &Employee,
        course_id: &str,
        date: NaiveDate,
    ) -> Result<Option<Assignment>, ScheduleError> {
        self.authorize(actor, Role::User)?;
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.course_id == course_id && a.date == date)
            .cloned())
    }

    pub fn courses_for_date(
        &self,
        actor: &Employee,
        date: NaiveDate,
    ) -> Result<Vec<Course>, ScheduleError> {
        self.authorize(actor, Role::User)?;
        Ok(self
            .directory
            .courses()
            .iter()
            .filter(|c| c.date == date)
            .cloned()
            .collect())
    }

    pub fn assignments_for_date(
        &self,
        actor: &Employee,
        date: NaiveDate,
    ) -> Result<Vec<Assignment>, ScheduleError> {
        self.authorize(actor, Role::User)?;
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.date == date)
            .cloned()
            .collect())
    }

    // --- Derived views (User) ---

    pub fn member_monthly_workload(
        &self,
        actor: &Employee,
        member_id: &str,
        year: i32,
        month: u32,
    ) -> Result<u32, ScheduleError> {
        self.authorize(actor, Role::User)?;
        let assignments = self.assignments.lock().unwrap();
        Ok(workload::monthly_workload(
            &assignments,
            member_id,
            year,
            month,
        ))
    }

    /// Dates where at least one course runs but no assignment exists.
    pub fn understaffed_dates(&self, actor: &Employee) -> Result<Vec<NaiveDate>, ScheduleError> {
        self.authorize(actor, Role::User)?;
        let assignments = self.assignments.lock().unwrap();
        Ok(workload::understaffed_dates(
            self.directory.courses(),
            &assignments,
        ))
    }

    pub fn workload_report(
        &self,
        actor: &Employee,
        year: i32,
        month: u32,
    ) -> Result<Vec<MemberWorkload>, ScheduleError> {
        self.authorize(actor, Role::User)?;
        let assignments = self.assignments.lock().unwrap();
        Ok(workload::workload_report(
            self.directory.members(),
            &assignments,
            year,
            month,
            self.monthly_capacity,
        ))
    }

    pub fn conflicts_for_date(
        &self,
        actor: &Employee,
        date: NaiveDate,
    ) -> Result<Vec<ScheduleConflict>, ScheduleError> {
        self.authorize(actor, Role::User)?;
        let assignments = self.assignments.lock().unwrap();
        Ok(workload::conflicts_for_date(&assignments, date))
    }

    pub fn monthly_capacity(&self) -> u32 {
        self.monthly_capacity
    }
}
