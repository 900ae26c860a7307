//! Integration test modules.

mod checkpoint_test;
mod common;
mod detected_climb_test;
mod end_to_end_test;
mod route_session_test;
mod runner_test;
