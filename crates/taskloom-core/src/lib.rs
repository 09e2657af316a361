//! Domain model, calendar arithmetic, and cross-cutting diagnostics shared
//! by the taskloom parser, solver, and CLI crates.

pub mod calendar;
pub mod error;
pub mod model;
pub mod notification;
pub mod persistence;
pub mod response;

pub use error::TaskloomError;
pub use model::{
    Decoration, Edge, InputTask, Metadata, Person, SchedulerAssignment, SchedulerFields, Status,
    Team, SOON_THRESHOLD,
};
pub use notification::{Notification, Severity};
pub use persistence::{CalendarTask, SchedulePersistence, TaskCalendar};
pub use response::{ErrorResponse, ScheduleResponse};
