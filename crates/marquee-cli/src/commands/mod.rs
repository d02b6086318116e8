pub mod config;
pub mod init;
pub mod query;
pub mod run;
pub mod status;

pub use init::run_init;
pub use query::run_query;
pub use run::run_etl;
pub use status::show_status;
