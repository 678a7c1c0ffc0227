// hullwatch library: shared by the server binary and the integration tests

pub mod aggregation;
pub mod classifier;
pub mod config;
pub mod maintenance_worker;
pub mod models;
pub mod routes;
pub mod ship_repo;
