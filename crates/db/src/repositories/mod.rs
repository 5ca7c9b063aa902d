pub mod catalog_repo;
pub mod import_run_repo;
pub mod import_schedule_repo;

pub use catalog_repo::CatalogRepo;
pub use import_run_repo::ImportRunRepo;
pub use import_schedule_repo::ImportScheduleRepo;
