//! Data models for rows served by the school backend.
//!
//! This module contains the structures used to represent the backend's
//! collections:
//!
//! - `Student`: children linked to a parent account
//! - `AttendanceRecord`, `FeeRecord`: per-student daily and billing rows
//! - `Assignment`, `AssignmentSubmission`: coursework with joined submissions
//! - `SchoolEvent`, `Message`, `Notification`: calendar and inbox rows
//! - `Profile`, `ProfileUpdate`: the signed-in user's own profile

pub mod assignment;
pub mod attendance;
pub mod event;
pub mod fee;
pub mod message;
pub mod profile;
pub mod student;

pub use assignment::{Assignment, AssignmentSubmission};
pub use attendance::{AttendanceRecord, AttendanceStatus};
pub use event::SchoolEvent;
pub use fee::{FeeRecord, FeeStatus};
pub use message::{Message, Notification, Readable};
pub use profile::{Profile, ProfileUpdate, Role};
pub use student::Student;
