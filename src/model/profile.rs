use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{aura::{aura_score, tenure_badge, ActivityStats, TenureBadge}, display};

pub const BRANCHES: [&str; 8] = [
    "Computer Science Engineering",
    "Mechanical Engineering",
    "Electrical Engineering",
    "Civil Engineering",
    "Electronics & Communication",
    "Information Technology",
    "Chemical Engineering",
    "Biotechnology",
];

pub const AVATARS: [&str; 12] = [
    "👨‍💼", "👩‍💼", "👨‍🎓", "👩‍🎓", "👨‍💻", "👩‍💻",
    "👨‍🔬", "👩‍🔬", "👨‍🎨", "👩‍🎨", "🧑‍💼", "🧑‍🎓",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub company: String,
    pub role_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlumniDetails {
    pub year_of_passing: u16,
    pub placement: Option<Placement>,
}

/// Fixed at signup. Alumni-only attributes exist only inside the `Alumni` arm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    Student,
    Alumni(AlumniDetails),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Student,
    Alumni,
}

impl RoleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::Student => "student",
            RoleKind::Alumni => "alumni",
        }
    }

    pub fn parse(s: &str) -> Option<RoleKind> {
        match s {
            "student" => Some(RoleKind::Student),
            "alumni" => Some(RoleKind::Alumni),
            _ => None,
        }
    }
}

impl Role {
    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Student => RoleKind::Student,
            Role::Alumni(_) => RoleKind::Alumni,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Alumni(_) => "Alumni",
        }
    }

    pub fn alumni(&self) -> Option<&AlumniDetails> {
        match self {
            Role::Alumni(details) => Some(details),
            Role::Student => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(flatten)]
    pub role: Role,
    pub college: String,
    pub branch: String,
    pub avatar: Option<String>,
    #[serde(default)]
    pub stats: ActivityStats,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Profile {
    pub fn initials(&self) -> String {
        display::initials(&self.full_name)
    }

    pub fn aura(&self) -> u64 {
        aura_score(&self.stats)
    }

    pub fn badge(&self, now: OffsetDateTime) -> TenureBadge {
        tenure_badge(self.created_at, now)
    }

    pub fn company(&self) -> Option<&str> {
        self.role
            .alumni()
            .and_then(|details| details.placement.as_ref())
            .map(|placement| placement.company.as_str())
    }

    /// "Computer Science Engineering • Class of 2019 • Google"
    pub fn affiliation(&self) -> String {
        let mut line = self.branch.clone();
        if let Some(details) = self.role.alumni() {
            line += &format!(" • Class of {}", details.year_of_passing);
        }
        if let Some(company) = self.company() {
            line += &format!(" • {company}");
        }
        line
    }
}
