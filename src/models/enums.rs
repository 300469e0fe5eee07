use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Review cycle categories. The lifecycle engine only creates DataAccess
/// and RP elections; TranslateDUL and DataSet rows also live in the store
/// and administrative operations must handle them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElectionType {
    DataAccess,
    #[serde(rename = "RP")]
    Rp,
    #[serde(rename = "TranslateDUL")]
    TranslateDul,
    DataSet,
}

impl ElectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElectionType::DataAccess => "DataAccess",
            ElectionType::Rp => "RP",
            ElectionType::TranslateDul => "TranslateDUL",
            ElectionType::DataSet => "DataSet",
        }
    }
}

impl fmt::Display for ElectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dataaccess" => Ok(ElectionType::DataAccess),
            "rp" => Ok(ElectionType::Rp),
            "translatedul" => Ok(ElectionType::TranslateDul),
            "dataset" => Ok(ElectionType::DataSet),
            _ => Err(format!("unknown election type: {s}")),
        }
    }
}

/// Election lifecycle states. Open elections accept votes; Closed is
/// terminal; Canceled elections must be archived before the same
/// (reference, type) key can get a replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElectionStatus {
    Open,
    Closed,
    Canceled,
}

impl ElectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElectionStatus::Open => "Open",
            ElectionStatus::Closed => "Closed",
            ElectionStatus::Canceled => "Canceled",
        }
    }
}

impl fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(ElectionStatus::Open),
            "closed" => Ok(ElectionStatus::Closed),
            "canceled" => Ok(ElectionStatus::Canceled),
            _ => Err(format!("unknown election status: {s}")),
        }
    }
}

/// Ballot categories within an election. FINAL is the only type whose
/// casting changes election state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteType {
    Chairperson,
    #[serde(rename = "DAC")]
    Dac,
    #[serde(rename = "FINAL")]
    Final,
    #[serde(rename = "AGREEMENT")]
    Agreement,
    #[serde(rename = "RP")]
    Rp,
    #[serde(rename = "DATA_OWNER")]
    DataOwner,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Chairperson => "Chairperson",
            VoteType::Dac => "DAC",
            VoteType::Final => "FINAL",
            VoteType::Agreement => "AGREEMENT",
            VoteType::Rp => "RP",
            VoteType::DataOwner => "DATA_OWNER",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chairperson" => Ok(VoteType::Chairperson),
            "dac" => Ok(VoteType::Dac),
            "final" => Ok(VoteType::Final),
            "agreement" => Ok(VoteType::Agreement),
            "rp" => Ok(VoteType::Rp),
            "data_owner" => Ok(VoteType::DataOwner),
            _ => Err(format!("unknown vote type: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleName {
    Admin,
    Chairperson,
    Member,
    Alumni,
    Researcher,
    DataOwner,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => "Admin",
            RoleName::Chairperson => "Chairperson",
            RoleName::Member => "Member",
            RoleName::Alumni => "Alumni",
            RoleName::Researcher => "Researcher",
            RoleName::DataOwner => "DataOwner",
        }
    }

    /// Committee roles are scoped to a DAC; everything else is global.
    pub fn is_committee(&self) -> bool {
        matches!(self, RoleName::Chairperson | RoleName::Member)
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(RoleName::Admin),
            "chairperson" => Ok(RoleName::Chairperson),
            "member" => Ok(RoleName::Member),
            "alumni" => Ok(RoleName::Alumni),
            "researcher" => Ok(RoleName::Researcher),
            "dataowner" => Ok(RoleName::DataOwner),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}
