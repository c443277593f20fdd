//! Resource kinds, ledgers and construction costs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Resource amounts are whole units.
pub type Amount = i64;

/// Every resource an island can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Wood,
    Iron,
    Gold,
    Grain,
    Rum,
    Sugar,
    Tobacco,
    Cotton,
    Coffee,
    Silver,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 10] = [
        Self::Wood,
        Self::Iron,
        Self::Gold,
        Self::Grain,
        Self::Rum,
        Self::Sugar,
        Self::Tobacco,
        Self::Cotton,
        Self::Coffee,
        Self::Silver,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Wood => "wood",
            Self::Iron => "iron",
            Self::Gold => "gold",
            Self::Grain => "grain",
            Self::Rum => "rum",
            Self::Sugar => "sugar",
            Self::Tobacco => "tobacco",
            Self::Cotton => "cotton",
            Self::Coffee => "coffee",
            Self::Silver => "silver",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named counters for each resource kind. Used both as an island's ledger and
/// as a delta credited to one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceBundle {
    pub wood: Amount,
    pub iron: Amount,
    pub gold: Amount,
    pub grain: Amount,
    pub rum: Amount,
    pub sugar: Amount,
    pub tobacco: Amount,
    pub cotton: Amount,
    pub coffee: Amount,
    pub silver: Amount,
}

impl ResourceBundle {
    pub fn get(&self, kind: ResourceKind) -> Amount {
        match kind {
            ResourceKind::Wood => self.wood,
            ResourceKind::Iron => self.iron,
            ResourceKind::Gold => self.gold,
            ResourceKind::Grain => self.grain,
            ResourceKind::Rum => self.rum,
            ResourceKind::Sugar => self.sugar,
            ResourceKind::Tobacco => self.tobacco,
            ResourceKind::Cotton => self.cotton,
            ResourceKind::Coffee => self.coffee,
            ResourceKind::Silver => self.silver,
        }
    }

    fn slot(&mut self, kind: ResourceKind) -> &mut Amount {
        match kind {
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Iron => &mut self.iron,
            ResourceKind::Gold => &mut self.gold,
            ResourceKind::Grain => &mut self.grain,
            ResourceKind::Rum => &mut self.rum,
            ResourceKind::Sugar => &mut self.sugar,
            ResourceKind::Tobacco => &mut self.tobacco,
            ResourceKind::Cotton => &mut self.cotton,
            ResourceKind::Coffee => &mut self.coffee,
            ResourceKind::Silver => &mut self.silver,
        }
    }

    pub fn add(&mut self, kind: ResourceKind, amount: Amount) {
        let slot = self.slot(kind);
        *slot = slot.saturating_add(amount);
    }

    /// Add every counter of `other` into `self`.
    pub fn merge(&mut self, other: &ResourceBundle) {
        for kind in ResourceKind::ALL {
            self.add(kind, other.get(kind));
        }
    }

    pub fn is_empty(&self) -> bool {
        ResourceKind::ALL.iter().all(|kind| self.get(*kind) == 0)
    }

    /// Non-zero counters, in catalog order.
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (ResourceKind, Amount)> + '_ {
        ResourceKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
            .filter(|(_, amount)| *amount != 0)
    }
}

impl fmt::Display for ResourceBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (kind, amount) in self.iter_nonzero() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{kind}={amount}")?;
            first = false;
        }
        if first {
            f.write_str("nothing")?;
        }
        Ok(())
    }
}

/// The gated part of a building's price. Other resources are never charged
/// for construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstructionCost {
    pub wood: Amount,
    pub iron: Amount,
    pub gold: Amount,
}

impl ConstructionCost {
    pub fn new(wood: Amount, iron: Amount, gold: Amount) -> Self {
        Self { wood, iron, gold }
    }

    /// Cost multiplied by `factor` (upgrade pricing).
    pub fn scaled(&self, factor: Amount) -> Self {
        Self {
            wood: self.wood.saturating_mul(factor),
            iron: self.iron.saturating_mul(factor),
            gold: self.gold.saturating_mul(factor),
        }
    }

    pub fn is_negative(&self) -> bool {
        self.wood < 0 || self.iron < 0 || self.gold < 0
    }

    /// Which of the gated counters in `ledger` can cover this cost.
    pub fn availability(&self, ledger: &ResourceBundle) -> ResourceAvailability {
        ResourceAvailability {
            wood: ledger.wood >= self.wood,
            iron: ledger.iron >= self.iron,
            gold: ledger.gold >= self.gold,
        }
    }
}

impl From<ConstructionCost> for ResourceBundle {
    fn from(cost: ConstructionCost) -> Self {
        ResourceBundle {
            wood: cost.wood,
            iron: cost.iron,
            gold: cost.gold,
            ..Default::default()
        }
    }
}

/// Per-resource answer to "can the island pay this?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAvailability {
    pub wood: bool,
    pub iron: bool,
    pub gold: bool,
}

impl ResourceAvailability {
    pub fn is_sufficient(&self) -> bool {
        self.wood && self.iron && self.gold
    }

    pub fn missing(&self) -> Vec<ResourceKind> {
        [
            (ResourceKind::Wood, self.wood),
            (ResourceKind::Iron, self.iron),
            (ResourceKind::Gold, self.gold),
        ]
        .into_iter()
        .filter(|(_, ok)| !ok)
        .map(|(kind, _)| kind)
        .collect()
    }

    /// Comma separated names of the missing resources.
    pub fn describe_missing(&self) -> String {
        self.missing()
            .iter()
            .map(|kind| kind.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_merge_and_display() {
        let mut ledger = ResourceBundle {
            wood: 10,
            ..Default::default()
        };
        let mut delta = ResourceBundle::default();
        delta.add(ResourceKind::Wood, 5);
        delta.add(ResourceKind::Rum, 2);
        ledger.merge(&delta);

        assert_eq!(ledger.wood, 15);
        assert_eq!(ledger.rum, 2);
        assert_eq!(ledger.to_string(), "wood=15, rum=2");
        assert_eq!(ResourceBundle::default().to_string(), "nothing");
        assert!(ResourceBundle::default().is_empty());
    }

    #[test]
    fn availability_reports_each_gated_resource() {
        let ledger = ResourceBundle {
            wood: 100,
            iron: 5,
            gold: 50,
            ..Default::default()
        };
        let cost = ConstructionCost::new(50, 10, 50);
        let availability = cost.availability(&ledger);

        assert!(!availability.is_sufficient());
        assert_eq!(availability.missing(), vec![ResourceKind::Iron]);
        assert_eq!(availability.describe_missing(), "iron");
    }

    #[test]
    fn upgrade_cost_scales_linearly() {
        let base = ConstructionCost::new(50, 10, 20);
        assert_eq!(base.scaled(3), ConstructionCost::new(150, 30, 60));
    }
}
