pub mod generation;
pub mod identity;
pub mod planner;
pub mod session;
pub mod trip_repository;
