//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod job_repo;
pub mod printer_repo;
pub mod template_repo;

pub use job_repo::JobRepo;
pub use printer_repo::PrinterRepo;
pub use template_repo::TemplateRepo;
