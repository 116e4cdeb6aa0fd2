//! Integer code tables for enum-valued columns.
//!
//! The profile database stores several choice fields as small integers.
//! Each field gets an enum here with a fixed code-to-label mapping, and
//! [`CodeKind::decode`] turns a raw cell into its label. A code outside
//! the table is rejected instead of being passed through as null.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeOfLearning {
    Online,
    Classroom,
    Blended,
    Default,
}

impl ModeOfLearning {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Online),
            2 => Some(Self::Classroom),
            3 => Some(Self::Blended),
            4 => Some(Self::Default),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::Classroom => "CLASSROOM",
            Self::Blended => "BLENDED",
            Self::Default => "DEFAULT",
        }
    }
}

/// Progress of a qualification or certification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    InProgress,
    Completed,
    Suspended,
}

impl CompletionStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::InProgress),
            2 => Some(Self::Completed),
            3 => Some(Self::Suspended),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Suspended => "SUSPENDED",
        }
    }
}

/// Spoken language proficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proficiency {
    Elementary,
    LimitedWorking,
    ProfessionalWorking,
    FullProfessional,
    Native,
}

impl Proficiency {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Elementary),
            2 => Some(Self::LimitedWorking),
            3 => Some(Self::ProfessionalWorking),
            4 => Some(Self::FullProfessional),
            5 => Some(Self::Native),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elementary => "ELEMENTARY",
            Self::LimitedWorking => "LIMITED_WORKING",
            Self::ProfessionalWorking => "PROFESSIONAL_WORKING",
            Self::FullProfessional => "FULL_PROFESSIONAL",
            Self::Native => "NATIVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    PreferNotToSay,
}

impl Gender {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Male),
            2 => Some(Self::Female),
            3 => Some(Self::PreferNotToSay),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "MALE",
            Self::Female => "FEMALE",
            Self::PreferNotToSay => "PREFER_NOT_TO_SAY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Fresher,
    Intern,
    Freelance,
    SelfEmployed,
}

impl EmploymentType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::FullTime),
            2 => Some(Self::PartTime),
            3 => Some(Self::Fresher),
            4 => Some(Self::Intern),
            5 => Some(Self::Freelance),
            6 => Some(Self::SelfEmployed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullTime => "FULL_TIME",
            Self::PartTime => "PART_TIME",
            Self::Fresher => "FRESHER",
            Self::Intern => "INTERN",
            Self::Freelance => "FREELANCE",
            Self::SelfEmployed => "SELF_EMPLOYED",
        }
    }
}

/// Kind of employer on a work experience entry.
///
/// A missing code is meaningful here: it stands for [`Others`](Self::Others).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganisationType {
    School,
    CollegeOrUniversity,
    Tutoring,
    Others,
}

impl OrganisationType {
    pub fn from_code(code: Option<i64>) -> Option<Self> {
        match code {
            Some(1) => Some(Self::School),
            Some(2) => Some(Self::CollegeOrUniversity),
            Some(3) => Some(Self::Tutoring),
            None => Some(Self::Others),
            Some(_) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::School => "SCHOOL",
            Self::CollegeOrUniversity => "COLLEGE_OR_UNIVERSITY",
            Self::Tutoring => "TUTORING",
            Self::Others => "OTHERS",
        }
    }
}

/// Which code table a column is decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    ModeOfLearning,
    CompletionStatus,
    Proficiency,
    Gender,
    EmploymentType,
    OrganisationType,
}

impl CodeKind {
    /// Human-readable table name, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            CodeKind::ModeOfLearning => "mode of learning",
            CodeKind::CompletionStatus => "status",
            CodeKind::Proficiency => "proficiency",
            CodeKind::Gender => "gender",
            CodeKind::EmploymentType => "employment type",
            CodeKind::OrganisationType => "organisation type",
        }
    }

    fn label(&self, code: Option<i64>) -> Option<&'static str> {
        match (self, code) {
            (CodeKind::OrganisationType, code) => {
                OrganisationType::from_code(code).map(|t| t.as_str())
            }
            (_, None) => None,
            (CodeKind::ModeOfLearning, Some(c)) => ModeOfLearning::from_code(c).map(|m| m.as_str()),
            (CodeKind::CompletionStatus, Some(c)) => {
                CompletionStatus::from_code(c).map(|s| s.as_str())
            }
            (CodeKind::Proficiency, Some(c)) => Proficiency::from_code(c).map(|p| p.as_str()),
            (CodeKind::Gender, Some(c)) => Gender::from_code(c).map(|g| g.as_str()),
            (CodeKind::EmploymentType, Some(c)) => EmploymentType::from_code(c).map(|e| e.as_str()),
        }
    }

    /// Decode a raw cell into its label.
    ///
    /// Returns `None` when the cell holds a code outside the table, or
    /// is not an integer at all. A null cell decodes to null, except for
    /// [`CodeKind::OrganisationType`] where it decodes to `"OTHERS"`.
    pub fn decode(&self, cell: &Value) -> Option<Value> {
        let code = match cell {
            Value::Null => None,
            Value::Number(n) => Some(n.as_i64()?),
            _ => return None,
        };
        match self.label(code) {
            Some(label) => Some(Value::String(label.to_string())),
            None if code.is_none() => Some(Value::Null),
            None => None,
        }
    }
}
