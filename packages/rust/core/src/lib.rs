//! Core scheduling and progress logic for studyplan.
//!
//! Everything in this crate is pure: no I/O, no clock reads. Callers pass in
//! the topics, the progress document and "today".

pub mod pomodoro;
pub mod progress;
pub mod schedule;
pub mod seed;
pub mod view;
