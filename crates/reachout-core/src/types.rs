//! Custom types for common data structures

use chrono::{DateTime as ChronoDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard UTC DateTime type used across all Reachout crates
///
/// This is the canonical datetime type for database TIMESTAMPTZ columns
/// and API responses (serializes as ISO 8601 with 'Z' suffix).
pub type UtcDateTime = ChronoDateTime<Utc>;

/// Database DateTime type used across all Reachout crates
pub type DBDateTime = ChronoDateTime<Utc>;

/// Common pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: Some(1),
            page_size: Some(20),
        }
    }
}

impl PaginationParams {
    pub fn normalize(self) -> (u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self.page_size.unwrap_or(20).clamp(1, 100);
        (page, page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_normalizes_out_of_range_values() {
        let (page, size) = PaginationParams {
            page: Some(0),
            page_size: Some(5000),
        }
        .normalize();
        assert_eq!(page, 1);
        assert_eq!(size, 100);

        let (page, size) = PaginationParams::default().normalize();
        assert_eq!(page, 1);
        assert_eq!(size, 20);
    }
}
