//! Result records produced by threaded checks.

use std::panic::Location;

use hipcts_runtime::Status;

/// Where a check was written, and the text of the checked expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSite {
    pub file: &'static str,
    pub line: u32,
    pub expr: &'static str,
}

impl SourceSite {
    pub const fn new(file: &'static str, line: u32, expr: &'static str) -> Self {
        Self { file, line, expr }
    }

    /// Site of the caller, through any chain of `#[track_caller]` functions.
    #[track_caller]
    pub fn caller(expr: &'static str) -> Self {
        let location = Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
            expr,
        }
    }
}

/// One captured outcome of a threaded check. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRecord {
    site: SourceSite,
    status: Status,
    condition: Option<bool>,
    detail: Option<String>,
}

impl ResultRecord {
    /// Outcome of a runtime call.
    pub fn from_status(site: SourceSite, status: Status) -> Self {
        Self {
            site,
            status,
            condition: None,
            detail: None,
        }
    }

    /// Outcome of a plain boolean condition.
    pub fn from_condition(site: SourceSite, outcome: bool) -> Self {
        Self {
            site,
            status: Status::Success,
            condition: Some(outcome),
            detail: None,
        }
    }

    /// Attach free-form context to the record.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn site(&self) -> SourceSite {
        self.site
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn condition(&self) -> Option<bool> {
        self.condition
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// A record fails when its status is not `Success` or its condition is false.
    pub fn is_failure(&self) -> bool {
        !self.status.is_success() || self.condition == Some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: SourceSite = SourceSite::new("worker.rs", 7, "queue.synchronize()");

    #[test]
    fn status_records() {
        assert!(!ResultRecord::from_status(SITE, Status::Success).is_failure());
        assert!(ResultRecord::from_status(SITE, Status::ErrorInvalidValue).is_failure());
        // Peer-access-already-enabled is tolerated on the main thread only
        assert!(ResultRecord::from_status(SITE, Status::ErrorPeerAccessAlreadyEnabled).is_failure());
    }

    #[test]
    fn condition_records() {
        let passed = ResultRecord::from_condition(SITE, true);
        assert!(!passed.is_failure());
        assert_eq!(passed.status(), Status::Success);

        let failed = ResultRecord::from_condition(SITE, false);
        assert!(failed.is_failure());
        assert_eq!(failed.condition(), Some(false));
    }

    #[test]
    fn caller_site_points_here() {
        let site = SourceSite::caller("x");
        assert!(site.file.ends_with("record.rs"));
        assert_eq!(site.line, line!() - 2);
    }
}
