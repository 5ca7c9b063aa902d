pub mod catalog;
pub mod import_run;
pub mod import_schedule;
