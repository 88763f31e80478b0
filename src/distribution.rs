use crate::error::{EntityKind, Error, Result};
use crate::models::{DistributedRelation, Distribution};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Distributions keyed by id plus the relation-name ownership index.
/// Synchronization lives in the store façade; this struct only maintains the
/// exclusive-ownership invariant between the two maps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct DistributionRegistry {
    distributions: HashMap<String, Distribution>,
    /// relation name -> owning distribution id
    relation_owners: HashMap<String, String>,
}

impl DistributionRegistry {
    pub fn create(&mut self, mut distribution: Distribution) -> Result<()> {
        if self.distributions.contains_key(&distribution.id) {
            return Err(Error::already_exists(
                EntityKind::Distribution,
                &distribution.id,
            ));
        }
        // Relations arriving with the new distribution go through the same
        // ownership transfer as attach, stealing them from any current owner.
        let relations: Vec<DistributedRelation> =
            distribution.relations.drain().map(|(_, rel)| rel).collect();
        let id = distribution.id.clone();
        self.distributions.insert(id.clone(), distribution);
        self.attach(&id, relations)
    }

    /// Resolves either a distribution id or a relation name, the id taking
    /// precedence.
    pub fn get(&self, id_or_relation: &str) -> Result<&Distribution> {
        if let Some(distribution) = self.distributions.get(id_or_relation) {
            return Ok(distribution);
        }
        if let Some(owner) = self.relation_owners.get(id_or_relation) {
            if let Some(distribution) = self.distributions.get(owner) {
                return Ok(distribution);
            }
        }
        Err(Error::not_found(EntityKind::Distribution, id_or_relation))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.distributions.contains_key(id)
    }

    pub fn list(&self) -> Vec<Distribution> {
        let mut all: Vec<Distribution> = self.distributions.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn drop(&mut self, id: &str) -> Result<()> {
        let distribution = self
            .distributions
            .remove(id)
            .ok_or_else(|| Error::not_found(EntityKind::Distribution, id))?;
        for name in distribution.relations.keys() {
            self.relation_owners.remove(name);
        }
        Ok(())
    }

    /// Moves each relation into the target distribution, removing it from
    /// whatever distribution currently owns it. The caller holds the write
    /// guard for the whole call, so no observer sees a relation owned by
    /// zero or two distributions.
    pub fn attach(&mut self, id: &str, relations: Vec<DistributedRelation>) -> Result<()> {
        if !self.distributions.contains_key(id) {
            return Err(Error::not_found(EntityKind::Distribution, id));
        }
        for relation in relations {
            if let Some(owner) = self.relation_owners.get(&relation.name).cloned() {
                if let Some(previous) = self.distributions.get_mut(&owner) {
                    previous.relations.remove(&relation.name);
                }
            }
            self.relation_owners
                .insert(relation.name.clone(), id.to_string());
            if let Some(target) = self.distributions.get_mut(id) {
                target.relations.insert(relation.name.clone(), relation);
            }
        }
        Ok(())
    }

    pub fn detach(&mut self, id: &str, relation: &str) -> Result<()> {
        let distribution = self
            .distributions
            .get_mut(id)
            .ok_or_else(|| Error::not_found(EntityKind::Distribution, id))?;
        distribution
            .relations
            .remove(relation)
            .ok_or_else(|| Error::not_found(EntityKind::Relation, relation))?;
        self.relation_owners.remove(relation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(name: &str) -> DistributedRelation {
        DistributedRelation::new(name, vec!["c1".into()])
    }

    #[test]
    fn create_rejects_duplicate_id() {
        let mut reg = DistributionRegistry::default();
        reg.create(Distribution::new("ds1", vec![])).unwrap();
        assert!(matches!(
            reg.create(Distribution::new("ds1", vec![])),
            Err(Error::AlreadyExists { .. })
        ));
    }

    #[test]
    fn attach_moves_ownership() {
        let mut reg = DistributionRegistry::default();
        reg.create(Distribution::new("ds1", vec![])).unwrap();
        reg.create(Distribution::new("ds2", vec![])).unwrap();

        reg.attach("ds1", vec![rel("r1")]).unwrap();
        assert_eq!(reg.get("r1").unwrap().id, "ds1");

        reg.attach("ds2", vec![rel("r1")]).unwrap();
        assert_eq!(reg.get("r1").unwrap().id, "ds2");
        assert!(!reg.get("ds1").unwrap().relations.contains_key("r1"));
    }

    #[test]
    fn create_with_relations_steals_ownership() {
        let mut reg = DistributionRegistry::default();
        reg.create(Distribution::new("ds1", vec![])).unwrap();
        reg.attach("ds1", vec![rel("r1")]).unwrap();

        let mut ds2 = Distribution::new("ds2", vec![]);
        ds2.relations.insert("r1".into(), rel("r1"));
        reg.create(ds2).unwrap();

        assert_eq!(reg.get("r1").unwrap().id, "ds2");
        assert!(!reg.get("ds1").unwrap().relations.contains_key("r1"));
    }

    #[test]
    fn drop_clears_owned_relations() {
        let mut reg = DistributionRegistry::default();
        reg.create(Distribution::new("ds1", vec![])).unwrap();
        reg.attach("ds1", vec![rel("r1")]).unwrap();
        reg.drop("ds1").unwrap();
        assert!(matches!(reg.get("r1"), Err(Error::NotFound { .. })));
        assert!(matches!(reg.drop("ds1"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn detach_requires_existing_relation() {
        let mut reg = DistributionRegistry::default();
        reg.create(Distribution::new("ds1", vec![])).unwrap();
        assert!(matches!(
            reg.detach("ds1", "r1"),
            Err(Error::NotFound { .. })
        ));
        reg.attach("ds1", vec![rel("r1")]).unwrap();
        reg.detach("ds1", "r1").unwrap();
        assert!(matches!(reg.get("r1"), Err(Error::NotFound { .. })));
    }
}
