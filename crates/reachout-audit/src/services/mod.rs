mod audit;
mod system_log;

pub use audit::{AuditService, RecordAudit};
pub use system_log::SystemLogService;
