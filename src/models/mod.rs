pub mod student;

pub use student::{ClassifiedFileSet, FileRole, StudentUnit, GRADING_REPORT_FILE};
