use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{StudentId, TeacherId};

/// Which dashboard a signed-in user belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError(String);

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(ParseRoleError(other.to_owned())),
        }
    }
}

/// The signed-in user, as remembered by the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    /// The student id to use for test fetch and submission, if this is a student.
    #[must_use]
    pub fn student_id(&self) -> Option<StudentId> {
        match self.role {
            Role::Student => Some(StudentId::new(self.user_id.clone())),
            Role::Teacher => None,
        }
    }

    /// The teacher id used for authoring and reviewing, if this is a teacher.
    #[must_use]
    pub fn teacher_id(&self) -> Option<TeacherId> {
        match self.role {
            Role::Teacher => Some(TeacherId::new(self.user_id.clone())),
            Role::Student => None,
        }
    }
}
