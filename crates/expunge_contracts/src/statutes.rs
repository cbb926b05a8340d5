#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::validate_label;
use crate::{ContractViolation, SchemaVersion, Validate};

pub const STATUTES_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

const MAX_LIST_ENTRIES: usize = 4096;

/// The four named statute reference lists consulted by the resolvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatuteListId {
    /// Felonies reclassified as misdemeanors for expungement purposes.
    Reclassified,
    /// Violent felonies under the Section 571 equivalent.
    ViolentSection571,
    /// Non-expungeable felonies under the Section 13 equivalent.
    Section13,
    /// Sex-offender-registry offenses (SORA equivalent).
    SexOffenderRegistry,
}

impl StatuteListId {
    pub const ALL: [StatuteListId; 4] = [
        StatuteListId::Reclassified,
        StatuteListId::ViolentSection571,
        StatuteListId::Section13,
        StatuteListId::SexOffenderRegistry,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatuteListId::Reclassified => "reclassified",
            StatuteListId::ViolentSection571 => "section571",
            StatuteListId::Section13 => "section13",
            StatuteListId::SexOffenderRegistry => "sora",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "reclassified" => Some(StatuteListId::Reclassified),
            "section571" => Some(StatuteListId::ViolentSection571),
            "section13" => Some(StatuteListId::Section13),
            "sora" => Some(StatuteListId::SexOffenderRegistry),
            _ => None,
        }
    }
}

/// A named statute list with its charge-description entries, used to seed
/// statute matchers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatuteList {
    pub schema_version: SchemaVersion,
    pub id: StatuteListId,
    pub entries: Vec<String>,
}

impl StatuteList {
    pub fn v1(id: StatuteListId, entries: Vec<String>) -> Result<Self, ContractViolation> {
        let list = Self {
            schema_version: STATUTES_CONTRACT_VERSION,
            id,
            entries,
        };
        list.validate()?;
        Ok(list)
    }
}

impl Validate for StatuteList {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != STATUTES_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "statute_list.schema_version",
                reason: "must match STATUTES_CONTRACT_VERSION",
            });
        }
        if self.entries.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "statute_list.entries",
                reason: "must not be empty",
            });
        }
        if self.entries.len() > MAX_LIST_ENTRIES {
            return Err(ContractViolation::InvalidValue {
                field: "statute_list.entries",
                reason: "exceeds max entries",
            });
        }
        for entry in &self.entries {
            validate_label("statute_list.entries", entry, 200)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statutes_contract_01_round_trip_list_names() {
        for id in StatuteListId::ALL {
            assert_eq!(StatuteListId::parse(id.as_str()), Some(id));
        }
        assert_eq!(StatuteListId::parse("unknown"), None);
    }

    #[test]
    fn statutes_contract_02_empty_list_rejected() {
        assert!(StatuteList::v1(StatuteListId::Section13, Vec::new()).is_err());
    }
}
