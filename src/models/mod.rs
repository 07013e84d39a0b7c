//! Rostering domain models.
//!
//! Provides the read-only description of a planning run (workers, days,
//! shift types, staffing rules) and the schedule produced for it.
//!
//! # Domain Mappings
//!
//! | u-roster | Hospital ward | Call center | Security |
//! |----------|---------------|-------------|----------|
//! | Worker | Nurse | Agent | Guard |
//! | ShiftType | Early/Night duty | Queue slot | Watch |
//! | Quotas | Minimum staffing | Service level | Posts |
//! | Schedule | Duty roster | Agent rota | Watch bill |

mod calendar;
mod roster;
mod schedule;
mod shift;
mod worker;

pub use calendar::{Day, Horizon};
pub use roster::{Quotas, Roster, StaffingRules};
pub use schedule::{Schedule, ShiftAssignment, Violation, ViolationType, WorkerShifts};
pub use shift::{ShiftCatalog, ShiftSpec, ShiftType, UnknownShiftType};
pub use worker::Worker;
