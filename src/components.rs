//! Connected-component membership, repaired lazily.
//!
//! Edits strip the touched atoms from their components and the assignment
//! pass gathers every unassigned atom into a fresh component, absorbing any
//! component it runs into. Splits caused by removing a cut bond are only
//! realized by a forced refresh, which rebuilds membership from scratch.

use std::collections::{BTreeSet, VecDeque};

use crate::diagram::Diagram;
use crate::error::{Result, SketchError};
use crate::mol::AtomId;

pub type ComponentId = usize;

impl Diagram {
    pub(crate) fn component_add(&mut self, atoms: BTreeSet<AtomId>) -> ComponentId {
        let members: Vec<AtomId> = atoms.iter().copied().collect();
        let cid = self.components.add(atoms);
        for aid in members {
            if let Some(topo) = self.atoms.get_mut(&aid) {
                topo.component = Some(cid);
            }
        }
        cid
    }

    /// Take an atom out of its component; empty components are dropped.
    pub(crate) fn component_strip(&mut self, aid: AtomId) -> Result<()> {
        let Some(cid) = self.topo_mut(aid)?.component.take() else {
            return Ok(());
        };
        if let Some(members) = self.components.get_mut(cid) {
            members.remove(&aid);
            if members.is_empty() {
                self.components.remove(cid);
            }
        }
        Ok(())
    }

    pub(crate) fn components_clear(&mut self) {
        self.components.clear();
        for topo in self.atoms.values_mut() {
            topo.component = None;
        }
    }

    /// Breadth-first search from an unassigned atom. Assigned atoms are
    /// collected but not expanded; their components land in `adjacent`.
    fn connected_atoms(
        &self,
        start: AtomId,
        adjacent: &mut BTreeSet<ComponentId>,
    ) -> Result<BTreeSet<AtomId>> {
        let mut found = BTreeSet::new();
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(aid) = queue.pop_front() {
            found.insert(aid);
            let topo = self.topo(aid)?;
            if let Some(cid) = topo.component {
                adjacent.insert(cid);
                continue;
            }
            for &id in &topo.neighbors {
                let end = self.half_bond(id)?.end;
                if seen.insert(end) {
                    queue.push_back(end);
                }
            }
        }
        Ok(found)
    }

    fn component_merge_in(&mut self, into: ComponentId, from: ComponentId) -> Result<()> {
        let Some(absorbed) = self.components.remove(from) else {
            return Ok(());
        };
        for &aid in &absorbed {
            self.topo_mut(aid)?.component = Some(into);
        }
        self.components
            .get_mut(into)
            .ok_or(SketchError::not_found("component", into))?
            .extend(absorbed);
        Ok(())
    }

    pub(crate) fn assign_connected_components(&mut self) -> Result<()> {
        let ids: Vec<AtomId> = self.atoms.keys().copied().collect();
        for aid in ids {
            if self.topo(aid)?.component.is_some() {
                continue;
            }
            let mut adjacent = BTreeSet::new();
            let found = self.connected_atoms(aid, &mut adjacent)?;
            let cid = self.component_add(found);
            for other in adjacent {
                if other != cid {
                    self.component_merge_in(cid, other)?;
                }
            }
        }
        Ok(())
    }

    /// Atoms reachable from `start`, in breadth-first order.
    pub fn reachable_atoms(&self, start: AtomId) -> Result<Vec<AtomId>> {
        self.topo(start)?;
        let mut order = Vec::new();
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(aid) = queue.pop_front() {
            order.push(aid);
            for &id in &self.topo(aid)?.neighbors {
                let end = self.half_bond(id)?.end;
                if seen.insert(end) {
                    queue.push_back(end);
                }
            }
        }
        Ok(order)
    }
}
