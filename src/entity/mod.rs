//! SeaORM entity definitions for PostgreSQL database.

pub mod test_case_run;
pub mod test_run;
pub mod test_status;
pub mod test_subscription;
