use std::collections::{BTreeMap, BTreeSet};

use nalgebra::Vector2;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableUnGraph;
use petgraph::visit::EdgeRef;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::bond::Bond;
use crate::error::{Result, SketchError};
use crate::pool::Pool;

/// Stable atom id. Equal to the atom's slot index; freed slots are reused.
pub type AtomId = NodeIndex;
/// Stable bond id. Equal to the bond's slot index; freed slots are reused.
pub type BondId = EdgeIndex;
pub type SGroupId = usize;

/// Substructure group: an opaque set of member atoms plus the bonds that
/// cross its boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SGroup {
    pub atoms: Vec<AtomId>,
    /// Bonds with exactly one end inside the group.
    pub cross_bonds: Vec<BondId>,
    /// Outside atoms reached by `cross_bonds`.
    pub neighbor_atoms: Vec<AtomId>,
}

/// Flat persistence view of a [`Mol`]: atoms in id order and bonds whose
/// endpoints index into `atoms`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MolLists {
    pub atoms: Vec<Atom>,
    pub bonds: Vec<Bond>,
}

/// Molecule graph: atoms and bonds with stable ids.
///
/// Atom and bond identity and lifetime belong here alone. Half-bonds, loops
/// and connected components are derived elsewhere and can always be rebuilt
/// from a `Mol`.
#[derive(Debug, Clone, Default)]
pub struct Mol {
    graph: StableUnGraph<Atom, Bond>,
    sgroups: Pool<SGroup>,
    pub is_chiral: bool,
}

impl Mol {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atom(&self, id: AtomId) -> Result<&Atom> {
        self.graph
            .node_weight(id)
            .ok_or(SketchError::not_found("atom", id.index()))
    }

    pub fn atom_mut(&mut self, id: AtomId) -> Result<&mut Atom> {
        self.graph
            .node_weight_mut(id)
            .ok_or(SketchError::not_found("atom", id.index()))
    }

    pub fn bond(&self, id: BondId) -> Result<&Bond> {
        self.graph
            .edge_weight(id)
            .ok_or(SketchError::not_found("bond", id.index()))
    }

    pub fn bond_mut(&mut self, id: BondId) -> Result<&mut Bond> {
        self.graph
            .edge_weight_mut(id)
            .ok_or(SketchError::not_found("bond", id.index()))
    }

    pub fn contains_atom(&self, id: AtomId) -> bool {
        self.graph.contains_node(id)
    }

    pub fn contains_bond(&self, id: BondId) -> bool {
        self.graph.edge_weight(id).is_some()
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn atoms(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.graph.node_indices()
    }

    pub fn bonds(&self) -> impl Iterator<Item = BondId> + '_ {
        self.graph.edge_indices()
    }

    /// Snapshot of the atom ids, for loops that mutate the molecule.
    pub fn atom_ids(&self) -> Vec<AtomId> {
        self.atoms().collect()
    }

    pub fn bond_ids(&self) -> Vec<BondId> {
        self.bonds().collect()
    }

    /// Bonds incident to `id`, in no particular order.
    pub fn bonds_of(&self, id: AtomId) -> Vec<BondId> {
        self.graph.edges(id).map(|e| e.id()).collect()
    }

    pub fn neighbors(&self, id: AtomId) -> impl Iterator<Item = AtomId> + '_ {
        self.graph.neighbors(id)
    }

    pub fn bond_endpoints(&self, id: BondId) -> Result<(AtomId, AtomId)> {
        let bond = self.bond(id)?;
        Ok((bond.begin, bond.end))
    }

    pub fn add_atom(&mut self, atom: Atom) -> AtomId {
        self.graph.add_node(atom)
    }

    /// Insert `bond` between its `begin` and `end` atoms.
    ///
    /// Fails with `InvalidArgument` when both ends are the same atom and with
    /// `NotFound` when either end is missing. A second bond between an
    /// already bonded pair is accepted; see [`Mol::check_bond_exists`].
    pub fn add_bond(&mut self, bond: Bond) -> Result<BondId> {
        if bond.begin == bond.end {
            return Err(SketchError::invalid_argument("distinct atoms expected"));
        }
        self.atom(bond.begin)?;
        self.atom(bond.end)?;
        Ok(self.graph.add_edge(bond.begin, bond.end, bond))
    }

    /// Remove an atom together with its bonds and group memberships.
    pub fn remove_atom(&mut self, id: AtomId) -> Result<Atom> {
        let groups: Vec<SGroupId> = self.atom(id)?.sgroups.iter().copied().collect();
        for sgid in groups {
            if let Some(sg) = self.sgroups.get_mut(sgid) {
                sg.atoms.retain(|&a| a != id);
            }
        }
        self.graph
            .remove_node(id)
            .ok_or(SketchError::not_found("atom", id.index()))
    }

    pub fn remove_bond(&mut self, id: BondId) -> Result<Bond> {
        self.graph
            .remove_edge(id)
            .ok_or(SketchError::not_found("bond", id.index()))
    }

    /// Undirected bond lookup.
    pub fn find_bond(&self, a: AtomId, b: AtomId) -> Option<BondId> {
        self.graph.find_edge(a, b)
    }

    pub fn check_bond_exists(&self, a: AtomId, b: AtomId) -> bool {
        self.find_bond(a, b).is_some()
    }

    /// Set the working position and mirror it into the model position.
    pub fn set_atom_pos(&mut self, id: AtomId, pp: Vector2<f64>) -> Result<()> {
        let atom = self.atom_mut(id)?;
        atom.pp = pp;
        atom.pos = Vector2::new(pp.x, -pp.y);
        Ok(())
    }

    /// Append copies of `other`'s atoms and bonds under fresh ids.
    ///
    /// Returns the map from `other`'s atom ids to the new ones. Group
    /// memberships are not carried over.
    pub fn merge(&mut self, other: &Mol) -> Result<BTreeMap<AtomId, AtomId>> {
        let mut atom_map = BTreeMap::new();
        for aid in other.atoms() {
            let mut atom = other.atom(aid)?.clone();
            atom.sgroups.clear();
            atom_map.insert(aid, self.add_atom(atom));
        }
        for bid in other.bonds() {
            let mut bond = other.bond(bid)?.clone();
            bond.begin = remap(&atom_map, bond.begin)?;
            bond.end = remap(&atom_map, bond.end)?;
            self.add_bond(bond)?;
        }
        Ok(atom_map)
    }

    pub fn to_lists(&self) -> MolLists {
        let mut index = BTreeMap::new();
        let mut atoms = Vec::with_capacity(self.atom_count());
        for aid in self.graph.node_indices() {
            let Some(atom) = self.graph.node_weight(aid) else {
                continue;
            };
            index.insert(aid, AtomId::new(atoms.len()));
            let mut atom = atom.clone();
            atom.sgroups.clear();
            atoms.push(atom);
        }
        let bonds = self
            .graph
            .edge_indices()
            .filter_map(|bid| self.graph.edge_weight(bid))
            .filter_map(|bond| {
                Some(Bond {
                    begin: *index.get(&bond.begin)?,
                    end: *index.get(&bond.end)?,
                    ..bond.clone()
                })
            })
            .collect();
        MolLists { atoms, bonds }
    }

    pub fn from_lists(lists: &MolLists) -> Result<Self> {
        let mut mol = Mol::new();
        for atom in &lists.atoms {
            mol.add_atom(atom.clone());
        }
        for bond in &lists.bonds {
            mol.add_bond(bond.clone())?;
        }
        Ok(mol)
    }

    pub fn sgroup(&self, id: SGroupId) -> Result<&SGroup> {
        self.sgroups
            .get(id)
            .ok_or(SketchError::not_found("sgroup", id))
    }

    pub fn sgroups(&self) -> impl Iterator<Item = (SGroupId, &SGroup)> + '_ {
        self.sgroups.iter()
    }

    pub fn add_sgroup(&mut self, atoms: Vec<AtomId>) -> Result<SGroupId> {
        for &aid in &atoms {
            self.atom(aid)?;
        }
        let id = self.sgroups.add(SGroup {
            atoms: atoms.clone(),
            ..SGroup::default()
        });
        for aid in atoms {
            self.atom_mut(aid)?.sgroups.insert(id);
        }
        Ok(id)
    }

    /// Dissolve a group, returning its former members.
    pub fn sgroup_delete(&mut self, id: SGroupId) -> Result<Vec<AtomId>> {
        let sg = self
            .sgroups
            .remove(id)
            .ok_or(SketchError::not_found("sgroup", id))?;
        for &aid in &sg.atoms {
            if let Some(atom) = self.graph.node_weight_mut(aid) {
                atom.sgroups.remove(&id);
            }
        }
        Ok(sg.atoms)
    }

    pub fn sgroups_recalc_cross_bonds(&mut self) {
        for sgid in self.sgroups.ids() {
            if let Some(sg) = self.sgroups.get_mut(sgid) {
                sg.cross_bonds.clear();
                sg.neighbor_atoms.clear();
            }
        }
        for bid in self.graph.edge_indices() {
            let Some(bond) = self.graph.edge_weight(bid) else {
                continue;
            };
            let (Some(a1), Some(a2)) = (
                self.graph.node_weight(bond.begin),
                self.graph.node_weight(bond.end),
            ) else {
                continue;
            };
            let crossing: Vec<(SGroupId, AtomId)> = a1
                .sgroups
                .difference(&a2.sgroups)
                .map(|&sg| (sg, bond.end))
                .chain(a2.sgroups.difference(&a1.sgroups).map(|&sg| (sg, bond.begin)))
                .collect();
            for (sgid, outside) in crossing {
                if let Some(sg) = self.sgroups.get_mut(sgid) {
                    sg.cross_bonds.push(bid);
                    if !sg.neighbor_atoms.contains(&outside) {
                        sg.neighbor_atoms.push(outside);
                    }
                }
            }
        }
    }

    pub fn sgroup_members(&self, id: SGroupId) -> Result<BTreeSet<AtomId>> {
        Ok(self.sgroup(id)?.atoms.iter().copied().collect())
    }
}

pub(crate) fn remap(map: &BTreeMap<AtomId, AtomId>, aid: AtomId) -> Result<AtomId> {
    map.get(&aid)
        .copied()
        .ok_or_else(|| SketchError::invariant(format!("bond refers to unknown atom {}", aid.index())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::{BondOrder, BondParams};
    use crate::element::Element;

    fn bond(a: AtomId, b: AtomId) -> Bond {
        Bond::new(BondParams {
            begin: Some(a),
            end: Some(b),
            ..BondParams::with_order(BondOrder::Single)
        })
        .unwrap()
    }

    fn chain(n: usize) -> (Mol, Vec<AtomId>) {
        let mut mol = Mol::new();
        let atoms: Vec<_> = (0..n)
            .map(|_| mol.add_atom(Atom::element(Element::C)))
            .collect();
        for w in atoms.windows(2) {
            mol.add_bond(bond(w[0], w[1])).unwrap();
        }
        (mol, atoms)
    }

    #[test]
    fn bond_to_self_rejected() {
        let (mut mol, atoms) = chain(1);
        let err = mol.add_bond(bond(atoms[0], atoms[0])).unwrap_err();
        assert!(matches!(err, SketchError::InvalidArgument(_)));
    }

    #[test]
    fn bond_to_missing_atom() {
        let (mut mol, atoms) = chain(1);
        let err = mol.add_bond(bond(atoms[0], AtomId::new(9))).unwrap_err();
        assert_eq!(err, SketchError::not_found("atom", 9));
    }

    #[test]
    fn unknown_ids() {
        let (mol, _) = chain(2);
        assert_eq!(
            mol.atom(AtomId::new(5)).unwrap_err(),
            SketchError::not_found("atom", 5)
        );
        assert!(mol.bond(BondId::new(3)).is_err());
    }

    #[test]
    fn find_bond_is_undirected() {
        let (mol, atoms) = chain(3);
        let b = mol.find_bond(atoms[0], atoms[1]).unwrap();
        assert_eq!(mol.find_bond(atoms[1], atoms[0]), Some(b));
        assert!(mol.check_bond_exists(atoms[2], atoms[1]));
        assert!(!mol.check_bond_exists(atoms[0], atoms[2]));
    }

    #[test]
    fn removed_ids_are_reused() {
        let (mut mol, atoms) = chain(3);
        let b = mol.find_bond(atoms[0], atoms[1]).unwrap();
        mol.remove_bond(b).unwrap();
        assert!(!mol.contains_bond(b));
        let again = mol.add_bond(bond(atoms[0], atoms[2])).unwrap();
        assert_eq!(again, b);

        mol.remove_atom(atoms[1]).unwrap();
        assert_eq!(mol.bond_count(), 1);
        let reused = mol.add_atom(Atom::element(Element::N));
        assert_eq!(reused, atoms[1]);
    }

    #[test]
    fn merge_remaps_ids() {
        let (mut target, _) = chain(2);
        let (other, other_atoms) = chain(3);
        let map = target.merge(&other).unwrap();
        assert_eq!(target.atom_count(), 5);
        assert_eq!(target.bond_count(), 3);
        assert!(target.check_bond_exists(map[&other_atoms[0]], map[&other_atoms[1]]));
        assert!(target.check_bond_exists(map[&other_atoms[1]], map[&other_atoms[2]]));
        assert!(!target.check_bond_exists(map[&other_atoms[0]], map[&other_atoms[2]]));
    }

    #[test]
    fn clone_is_independent_and_keeps_groups() {
        let (mut mol, atoms) = chain(3);
        let sg = mol.add_sgroup(vec![atoms[0], atoms[1]]).unwrap();
        let mut copy = mol.clone();
        copy.remove_atom(atoms[2]).unwrap();
        assert_eq!(mol.atom_count(), 3);
        assert_eq!(copy.atom_count(), 2);
        assert!(copy.atom(atoms[0]).unwrap().sgroups.contains(&sg));
        assert_eq!(
            copy.sgroup_members(sg).unwrap(),
            [atoms[0], atoms[1]].into_iter().collect()
        );
    }

    #[test]
    fn cross_bonds() {
        let (mut mol, atoms) = chain(4);
        let sg = mol.add_sgroup(vec![atoms[1], atoms[2]]).unwrap();
        mol.sgroups_recalc_cross_bonds();
        let group = mol.sgroup(sg).unwrap();
        assert_eq!(group.cross_bonds.len(), 2);
        assert_eq!(group.neighbor_atoms, vec![atoms[0], atoms[3]]);
    }

    #[test]
    fn group_delete_and_atom_removal() {
        let (mut mol, atoms) = chain(3);
        let sg = mol.add_sgroup(vec![atoms[0], atoms[1]]).unwrap();
        mol.remove_atom(atoms[0]).unwrap();
        assert_eq!(mol.sgroup(sg).unwrap().atoms, vec![atoms[1]]);
        assert_eq!(mol.sgroup_delete(sg).unwrap(), vec![atoms[1]]);
        assert!(mol.atom(atoms[1]).unwrap().sgroups.is_empty());
        assert!(mol.sgroup(sg).is_err());
    }

    #[test]
    fn lists_are_compact() {
        let (mut mol, atoms) = chain(4);
        mol.remove_atom(atoms[0]).unwrap();
        let lists = mol.to_lists();
        assert_eq!(lists.atoms.len(), 3);
        assert_eq!(lists.bonds.len(), 2);
        for b in &lists.bonds {
            assert!(b.begin.index() < 3 && b.end.index() < 3);
        }
        let rebuilt = Mol::from_lists(&lists).unwrap();
        assert_eq!(rebuilt.atom_count(), 3);
        assert!(rebuilt.check_bond_exists(AtomId::new(0), AtomId::new(1)));
        assert!(rebuilt.check_bond_exists(AtomId::new(1), AtomId::new(2)));
    }

    #[test]
    fn atom_position_mirrors() {
        let (mut mol, atoms) = chain(1);
        mol.set_atom_pos(atoms[0], Vector2::new(2.0, 3.0)).unwrap();
        let atom = mol.atom(atoms[0]).unwrap();
        assert_eq!(atom.pp, Vector2::new(2.0, 3.0));
        assert_eq!(atom.pos, Vector2::new(2.0, -3.0));
    }
}
