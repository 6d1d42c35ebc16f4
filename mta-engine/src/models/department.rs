//! Department classification

use serde::{Deserialize, Serialize};
use std::fmt;

/// Department an action item is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Department {
    Design,
    Procurement,
    Production,
}

impl Department {
    /// All departments, in tie-break order
    pub const ALL: [Department; 3] = [Department::Design, Department::Procurement, Department::Production];

    /// Category assigned when a collaborator answers with an unknown department
    pub const DEFAULT: Department = Department::Production;

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Design => "Design",
            Department::Procurement => "Procurement",
            Department::Production => "Production",
        }
    }

    /// Exact (case-sensitive) match against the enumerated names
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }

    /// Tracker priority for tasks in this department
    pub fn priority(&self) -> &'static str {
        match self {
            Department::Design | Department::Production => "High",
            Department::Procurement => "Medium",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
