use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The three order-fulfillment workflows. Each one owns an identically shaped table set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Workflow {
    #[strum(serialize = "PR")]
    #[serde(rename = "PR")]
    Production,
    #[strum(serialize = "SH")]
    #[serde(rename = "SH")]
    Shipping,
    #[strum(serialize = "SIT")]
    #[serde(rename = "SIT")]
    Subcontracting,
}

impl Workflow {
    /// Short code used as table prefix and in log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Production => "PR",
            Self::Shipping => "SH",
            Self::Subcontracting => "SIT",
        }
    }

    /// Subcontracting transfers reject a scan whose serial was already posted for the same
    /// stock and configuration on the order.
    pub fn guards_duplicate_serials(&self) -> bool {
        matches!(self, Self::Subcontracting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_codes_in_either_case() {
        assert_eq!(Workflow::from_str("PR").unwrap(), Workflow::Production);
        assert_eq!(Workflow::from_str("sit").unwrap(), Workflow::Subcontracting);
        assert!(Workflow::from_str("gr").is_err());
    }

    #[test]
    fn display_uses_the_table_code() {
        assert_eq!(Workflow::Shipping.to_string(), "SH");
        assert_eq!(Workflow::Shipping.code(), "SH");
    }

    #[test]
    fn only_subcontracting_guards_serials() {
        assert!(!Workflow::Production.guards_duplicate_serials());
        assert!(!Workflow::Shipping.guards_duplicate_serials());
        assert!(Workflow::Subcontracting.guards_duplicate_serials());
    }
}
