use std::fmt;

use crate::model::{PaymentRecord, PolicyRecord};

/// Grouping identity shared by policies and payments.
///
/// The policy identifier when present, otherwise the (insured, insurer) pair.
/// Both record types derive it through [`Keyed`] so the rule cannot drift
/// between the two sides of the join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReconciliationKey {
    Policy(String),
    Party { insured: String, insurer: String },
}

impl ReconciliationKey {
    pub fn derive(policy_id: &str, insured: &str, insurer: &str) -> Self {
        let policy_id = policy_id.trim();
        if policy_id.is_empty() {
            Self::Party {
                insured: insured.trim().to_string(),
                insurer: insurer.trim().to_string(),
            }
        } else {
            Self::Policy(policy_id.to_string())
        }
    }
}

impl fmt::Display for ReconciliationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Policy(id) => write!(f, "{id}"),
            Self::Party { insured, insurer } => write!(f, "{insured}_{insurer}"),
        }
    }
}

/// Records that take part in the policy/payment join.
pub trait Keyed {
    fn policy_id(&self) -> &str;
    fn insured(&self) -> &str;
    fn insurer(&self) -> &str;

    fn reconciliation_key(&self) -> ReconciliationKey {
        ReconciliationKey::derive(self.policy_id(), self.insured(), self.insurer())
    }
}

impl Keyed for PolicyRecord {
    fn policy_id(&self) -> &str {
        &self.policy_id
    }

    fn insured(&self) -> &str {
        &self.insured
    }

    fn insurer(&self) -> &str {
        &self.insurer
    }
}

impl Keyed for PaymentRecord {
    fn policy_id(&self) -> &str {
        &self.policy_id
    }

    fn insured(&self) -> &str {
        &self.insured
    }

    fn insurer(&self) -> &str {
        &self.insurer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_id_wins_when_present() {
        let key = ReconciliationKey::derive("225802", "A", "BRADESCO");
        assert_eq!(key, ReconciliationKey::Policy("225802".into()));
    }

    #[test]
    fn blank_policy_id_falls_back_to_party() {
        let key = ReconciliationKey::derive("  ", " V ", "TOKIO MARINE");
        assert_eq!(
            key,
            ReconciliationKey::Party {
                insured: "V".into(),
                insurer: "TOKIO MARINE".into(),
            }
        );
    }

    #[test]
    fn policy_and_payment_derive_the_same_key() {
        let policy = PolicyRecord {
            insured: "VINICIUS RODRIGUES LAGRIMANTE".into(),
            insurer: "TOKIO MARINE".into(),
            ..Default::default()
        };
        let payment = PaymentRecord {
            insured: "VINICIUS RODRIGUES LAGRIMANTE ".into(),
            insurer: "TOKIO MARINE".into(),
            ..Default::default()
        };
        assert_eq!(policy.reconciliation_key(), payment.reconciliation_key());
    }

    #[test]
    fn party_key_never_collides_with_policy_id() {
        let party = ReconciliationKey::derive("", "A", "B");
        let policy = ReconciliationKey::derive("A_B", "X", "Y");
        assert_ne!(party, policy);
        assert_eq!(party.to_string(), policy.to_string());
    }
}
