use serde::Serialize;
use std::fmt;

use crate::impl_case_insensitive_deserialize;

/// Runtime status of an app as last observed by the lifecycle controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
    Restarting,
    Rebuilding,
    Destroying,
}

impl_case_insensitive_deserialize!(
    AppStatus,
    Stopped => "stopped",
    Starting => "starting",
    Running => "running",
    Stopping => "stopping",
    Restarting => "restarting",
    Rebuilding => "rebuilding",
    Destroying => "destroying"
);

impl AppStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppStatus::Stopped => "stopped",
            AppStatus::Starting => "starting",
            AppStatus::Running => "running",
            AppStatus::Stopping => "stopping",
            AppStatus::Restarting => "restarting",
            AppStatus::Rebuilding => "rebuilding",
            AppStatus::Destroying => "destroying",
        }
    }

    /// A lifecycle operation is in flight while the app sits in one of these.
    pub fn is_transient(&self) -> bool {
        !matches!(self, AppStatus::Stopped | AppStatus::Running)
    }

    /// Status entered when `operation` is issued from `self`, if legal.
    pub fn begin(self, operation: LifecycleOperation) -> Option<AppStatus> {
        TRANSITIONS
            .iter()
            .find(|t| t.from == self && t.operation == operation)
            .map(|t| t.via)
    }

    /// Status reached when `operation` completes successfully from `self`.
    ///
    /// Only defined when `self` is the transient status of `operation`.
    pub fn complete(self, operation: LifecycleOperation) -> Option<AppStatus> {
        TRANSITIONS
            .iter()
            .find(|t| t.via == self && t.operation == operation)
            .map(|t| t.to)
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-app operations delegated to the lando CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleOperation {
    Start,
    Stop,
    Restart,
    Rebuild,
    Destroy,
}

impl_case_insensitive_deserialize!(
    LifecycleOperation,
    Start => "start",
    Stop => "stop",
    Restart => "restart",
    Rebuild => "rebuild",
    Destroy => "destroy"
);

impl LifecycleOperation {
    pub const ALL: [LifecycleOperation; 5] = [
        LifecycleOperation::Start,
        LifecycleOperation::Stop,
        LifecycleOperation::Restart,
        LifecycleOperation::Rebuild,
        LifecycleOperation::Destroy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleOperation::Start => "start",
            LifecycleOperation::Stop => "stop",
            LifecycleOperation::Restart => "restart",
            LifecycleOperation::Rebuild => "rebuild",
            LifecycleOperation::Destroy => "destroy",
        }
    }

    /// Arguments passed to the lando binary. Destructive operations skip
    /// lando's own prompt since the caller already asked.
    pub fn cli_args(&self) -> Vec<String> {
        match self {
            LifecycleOperation::Rebuild | LifecycleOperation::Destroy => {
                vec![self.as_str().to_string(), "-y".to_string()]
            }
            _ => vec![self.as_str().to_string()],
        }
    }
}

impl fmt::Display for LifecycleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Transition {
    from: AppStatus,
    operation: LifecycleOperation,
    via: AppStatus,
    to: AppStatus,
}

const fn t(
    from: AppStatus,
    operation: LifecycleOperation,
    via: AppStatus,
    to: AppStatus,
) -> Transition {
    Transition {
        from,
        operation,
        via,
        to,
    }
}

// Rebuild and destroy are accepted from either settled state; the transient
// states are excluded up front by the in-flight guard.
const TRANSITIONS: &[Transition] = &[
    t(AppStatus::Stopped, LifecycleOperation::Start, AppStatus::Starting, AppStatus::Running),
    t(AppStatus::Running, LifecycleOperation::Stop, AppStatus::Stopping, AppStatus::Stopped),
    t(AppStatus::Running, LifecycleOperation::Restart, AppStatus::Restarting, AppStatus::Running),
    t(AppStatus::Stopped, LifecycleOperation::Rebuild, AppStatus::Rebuilding, AppStatus::Running),
    t(AppStatus::Running, LifecycleOperation::Rebuild, AppStatus::Rebuilding, AppStatus::Running),
    t(AppStatus::Stopped, LifecycleOperation::Destroy, AppStatus::Destroying, AppStatus::Stopped),
    t(AppStatus::Running, LifecycleOperation::Destroy, AppStatus::Destroying, AppStatus::Stopped),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_cycle() {
        let starting = AppStatus::Stopped.begin(LifecycleOperation::Start).unwrap();
        assert_eq!(starting, AppStatus::Starting);
        assert_eq!(
            starting.complete(LifecycleOperation::Start),
            Some(AppStatus::Running)
        );
    }

    #[test]
    fn test_illegal_transitions_are_rejected() {
        assert_eq!(AppStatus::Stopped.begin(LifecycleOperation::Stop), None);
        assert_eq!(AppStatus::Stopped.begin(LifecycleOperation::Restart), None);
        assert_eq!(AppStatus::Running.begin(LifecycleOperation::Start), None);
        // completing an operation that never began is not a transition
        assert_eq!(AppStatus::Running.complete(LifecycleOperation::Start), None);
    }

    #[test]
    fn test_transient_states_accept_nothing() {
        for status in [
            AppStatus::Starting,
            AppStatus::Stopping,
            AppStatus::Restarting,
            AppStatus::Rebuilding,
            AppStatus::Destroying,
        ] {
            assert!(status.is_transient());
            for op in LifecycleOperation::ALL {
                assert_eq!(status.begin(op), None, "{status} accepted {op}");
            }
        }
    }

    #[test]
    fn test_rebuild_and_destroy_settle() {
        for from in [AppStatus::Stopped, AppStatus::Running] {
            let via = from.begin(LifecycleOperation::Rebuild).unwrap();
            assert_eq!(via.complete(LifecycleOperation::Rebuild), Some(AppStatus::Running));
            let via = from.begin(LifecycleOperation::Destroy).unwrap();
            assert_eq!(via.complete(LifecycleOperation::Destroy), Some(AppStatus::Stopped));
        }
    }

    #[test]
    fn test_status_deserializes_case_insensitively() {
        let status: AppStatus = serde_json::from_str(r#""Running""#).unwrap();
        assert_eq!(status, AppStatus::Running);
        assert_eq!(serde_json::to_string(&AppStatus::Rebuilding).unwrap(), r#""rebuilding""#);
    }
}
