use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckOutcome {
    Success,
    Failed,
    Skipped,
}

impl CheckOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            CheckOutcome::Success => "SUCCESS",
            CheckOutcome::Failed => "FAILED",
            CheckOutcome::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check stages, declared in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Structural,
    Dependency,
    Import,
    Functional,
    Integration,
    LaunchSurface,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Structural,
        Category::Dependency,
        Category::Import,
        Category::Functional,
        Category::Integration,
        Category::LaunchSurface,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Structural => "structural",
            Category::Dependency => "dependency",
            Category::Import => "import",
            Category::Functional => "functional",
            Category::Integration => "integration",
            Category::LaunchSurface => "launch_surface",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Category::Structural => "Package structure",
            Category::Dependency => "Dependencies",
            Category::Import => "Module imports",
            Category::Functional => "Core functionality",
            Category::Integration => "Module integration",
            Category::LaunchSurface => "Launch methods",
        }
    }

    /// Advice emitted once per run when this stage has at least one failure.
    pub const fn remediation(self) -> &'static str {
        match self {
            Category::Structural => {
                "Check file permissions and directory structure, and run from the directory that contains the target package"
            }
            Category::Dependency => {
                "Install missing dependencies (for example from the project's requirements file)"
            }
            Category::Import => {
                "Verify all modules are present in the package directory and free of syntax errors"
            }
            Category::Functional => {
                "Inspect the constructor failures above; the modules load but cannot be built with benign inputs"
            }
            Category::Integration => {
                "Check the wiring between components; a lower-level component is likely failing"
            }
            Category::LaunchSurface => {
                "Restore the documented entry points (launcher script or package main)"
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase().replace('-', "_");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown category: {s} (structural|dependency|import|functional|integration|launch_surface)"
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingResource,
    UnresolvedDependency,
    ConstructionFailure,
    Timeout,
}

impl FailureKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            FailureKind::MissingResource => "missing_resource",
            FailureKind::UnresolvedDependency => "unresolved_dependency",
            FailureKind::ConstructionFailure => "construction_failure",
            FailureKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
