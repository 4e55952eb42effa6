//! Editing and refresh facade over a [`Mol`].
//!
//! A [`Diagram`] owns the molecule plus everything derived from it: the
//! half-bond table, each atom's sorted neighbors, loops and connected
//! components. Edits patch the rotation system and component membership
//! immediately and record dirty marks; [`Diagram::update`] then refreshes
//! geometry and faces for the marked entities only.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::Vector2;
use tracing::{debug, error};

use crate::atom::{Atom, AtomParams};
use crate::bond::{Bond, BondOrder, BondParams};
use crate::components::ComponentId;
use crate::error::{Result, SketchError};
use crate::geometry;
use crate::half_bond::{HalfBond, HalfBondId};
use crate::loops::{Loop, LoopId};
use crate::mol::{remap, AtomId, BondId, Mol};
use crate::pool::Pool;
use crate::settings::Settings;

/// How much an entity changed since the last refresh. Marks only grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Change {
    #[default]
    Unchanged,
    /// Position changed; geometry and faces need recomputing.
    Moved,
    /// Adjacency changed.
    Topology,
}

/// Derived per-atom state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomTopology {
    /// Outgoing half-bonds sorted by `(angle, id)`.
    pub neighbors: Vec<HalfBondId>,
    pub component: Option<ComponentId>,
}

#[derive(Debug, Clone, Default)]
pub struct Diagram {
    pub(crate) mol: Mol,
    pub(crate) settings: Settings,
    pub(crate) atoms: BTreeMap<AtomId, AtomTopology>,
    pub(crate) half_bonds: BTreeMap<HalfBondId, HalfBond>,
    pub(crate) loops: Pool<Loop>,
    pub(crate) components: Pool<BTreeSet<AtomId>>,
    pub(crate) atoms_changed: BTreeMap<AtomId, Change>,
    pub(crate) bonds_changed: BTreeMap<BondId, Change>,
    refreshed_bonds: BTreeSet<BondId>,
    initialized: bool,
}

impl Diagram {
    /// Take ownership of `mol`, normalize its coordinates when the settings
    /// ask for it, and build all derived state.
    pub fn new(mut mol: Mol, settings: Settings) -> Result<Self> {
        if settings.normalize_coordinates {
            geometry::normalize_coordinates(&mut mol, settings.min_scale_length)?;
        }
        let mut diagram = Self {
            mol,
            settings,
            ..Self::default()
        };
        diagram.update(true)?;
        Ok(diagram)
    }

    /// An empty diagram, already refreshed.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            initialized: true,
            ..Self::default()
        }
    }

    pub(crate) fn contract_failure(reason: String) -> SketchError {
        error!(%reason, "topology invariant violated");
        SketchError::invariant(reason)
    }

    pub(crate) fn topo(&self, aid: AtomId) -> Result<&AtomTopology> {
        self.atoms
            .get(&aid)
            .ok_or(SketchError::not_found("atom", aid.index()))
    }

    pub(crate) fn topo_mut(&mut self, aid: AtomId) -> Result<&mut AtomTopology> {
        self.atoms
            .get_mut(&aid)
            .ok_or(SketchError::not_found("atom", aid.index()))
    }

    pub(crate) fn mark_atom(&mut self, aid: AtomId, change: Change) {
        if change == Change::Unchanged {
            return;
        }
        let mark = self.atoms_changed.entry(aid).or_default();
        *mark = (*mark).max(change);
    }

    pub(crate) fn mark_bond(&mut self, bid: BondId, change: Change) {
        if change == Change::Unchanged {
            return;
        }
        let mark = self.bonds_changed.entry(bid).or_default();
        *mark = (*mark).max(change);
    }

    /// Mark both ends of `bid` and every bond around them.
    fn mark_bond_topology(&mut self, bid: BondId) -> Result<()> {
        let (begin, end) = self.mol.bond_endpoints(bid)?;
        self.mark_bond(bid, Change::Topology);
        for aid in [begin, end] {
            self.mark_atom(aid, Change::Topology);
            let around: Vec<BondId> = self.topo(aid)?.neighbors.iter().map(|h| h.bond()).collect();
            for other in around {
                self.mark_bond(other, Change::Topology);
            }
        }
        Ok(())
    }

    // queries

    pub fn mol(&self) -> &Mol {
        &self.mol
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn atom(&self, aid: AtomId) -> Result<&Atom> {
        self.mol.atom(aid)
    }

    pub fn bond(&self, bid: BondId) -> Result<&Bond> {
        self.mol.bond(bid)
    }

    pub fn half_bond(&self, id: HalfBondId) -> Result<&HalfBond> {
        self.half_bonds
            .get(&id)
            .ok_or(SketchError::not_found("half-bond", id.0))
    }

    pub fn get_loop(&self, id: LoopId) -> Result<&Loop> {
        self.loops.get(id).ok_or(SketchError::not_found("loop", id))
    }

    pub fn loops(&self) -> impl Iterator<Item = (LoopId, &Loop)> + '_ {
        self.loops.iter()
    }

    pub fn component(&self, id: ComponentId) -> Result<&BTreeSet<AtomId>> {
        self.components
            .get(id)
            .ok_or(SketchError::not_found("component", id))
    }

    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &BTreeSet<AtomId>)> + '_ {
        self.components.iter()
    }

    pub fn atom_component(&self, aid: AtomId) -> Result<Option<ComponentId>> {
        Ok(self.topo(aid)?.component)
    }

    /// Members of the component holding `aid`.
    pub fn component_of(&self, aid: AtomId) -> Result<&BTreeSet<AtomId>> {
        let cid = self
            .topo(aid)?
            .component
            .ok_or(SketchError::not_found("component", aid.index()))?;
        self.component(cid)
    }

    /// Outgoing half-bonds of `aid` in rotation order.
    pub fn atom_neighbors(&self, aid: AtomId) -> Result<&[HalfBondId]> {
        Ok(&self.topo(aid)?.neighbors)
    }

    pub fn bond_half_bonds(&self, bid: BondId) -> Result<(HalfBondId, HalfBondId)> {
        self.mol.bond(bid)?;
        Ok(HalfBondId::of_bond(bid))
    }

    /// The half-bond after `id` around their shared origin atom.
    pub fn rotation_successor(&self, id: HalfBondId) -> Result<HalfBondId> {
        self.half_bond(id)?;
        Ok(self.half_bond(id.contra())?.next)
    }

    /// Working position in renderer units.
    pub fn scaled_position(&self, aid: AtomId) -> Result<Vector2<f64>> {
        Ok(self.mol.atom(aid)?.pp * self.settings.scale_factor)
    }

    /// Bonds whose geometry or face the last refresh touched.
    pub fn refreshed_bonds(&self) -> &BTreeSet<BondId> {
        &self.refreshed_bonds
    }

    pub fn atom_ids(&self) -> Vec<AtomId> {
        self.atoms.keys().copied().collect()
    }

    pub fn bond_ids(&self) -> Vec<BondId> {
        self.mol.bond_ids()
    }

    pub fn half_bond_ids(&self) -> Vec<HalfBondId> {
        self.half_bonds.keys().copied().collect()
    }

    pub fn loop_ids(&self) -> Vec<LoopId> {
        self.loops.ids()
    }

    pub fn component_ids(&self) -> Vec<ComponentId> {
        self.components.ids()
    }

    // mutations

    /// Add an atom at working position `pp`. A missing label falls back to
    /// the configured default; `params.pos` is ignored.
    pub fn add_atom(&mut self, pp: Vector2<f64>, params: AtomParams) -> Result<AtomId> {
        let label = params
            .label
            .clone()
            .unwrap_or_else(|| self.settings.default_label.into());
        let atom = Atom::new(AtomParams {
            label: Some(label),
            ..params
        })?;
        let aid = self.insert_atom(atom);
        self.mol.set_atom_pos(aid, pp)?;
        Ok(aid)
    }

    fn insert_atom(&mut self, atom: Atom) -> AtomId {
        let aid = self.mol.add_atom(atom);
        self.atoms.insert(aid, AtomTopology::default());
        self.component_add(BTreeSet::from([aid]));
        self.mark_atom(aid, Change::Topology);
        aid
    }

    /// Bond `begin` to `end`. The order defaults to single.
    pub fn add_bond(&mut self, begin: AtomId, end: AtomId, params: BondParams) -> Result<BondId> {
        let bond = Bond::new(BondParams {
            begin: Some(begin),
            end: Some(end),
            order: Some(params.order.unwrap_or(BondOrder::Single)),
            ..params
        })?;
        self.insert_bond(bond)
    }

    fn insert_bond(&mut self, bond: Bond) -> Result<BondId> {
        let (begin, end) = (bond.begin, bond.end);
        if self.settings.reject_duplicate_bonds && self.mol.check_bond_exists(begin, end) {
            return Err(SketchError::invalid_argument(format!(
                "atoms {} and {} are already bonded",
                begin.index(),
                end.index()
            )));
        }
        let bid = self.mol.add_bond(bond)?;
        self.bond_init_half_bonds(bid)?;
        let (h1, h2) = HalfBondId::of_bond(bid);
        self.atom_add_neighbor(h1)?;
        self.atom_add_neighbor(h2)?;
        self.mark_bond_topology(bid)?;
        self.component_strip(begin)?;
        self.assign_connected_components()?;
        Ok(bid)
    }

    /// Detach a bond from every derived index and the molecule. Component
    /// membership of its ends is left for the caller to reassign.
    fn unlink_bond(&mut self, bid: BondId) -> Result<Bond> {
        let (begin, end) = self.mol.bond_endpoints(bid)?;
        self.mark_bond_topology(bid)?;
        let (h1, h2) = HalfBondId::of_bond(bid);
        self.half_bond_unref(h1)?;
        self.half_bond_unref(h2)?;
        self.half_bonds.remove(&h1);
        self.half_bonds.remove(&h2);
        let bond = self.mol.remove_bond(bid)?;
        self.component_strip(begin)?;
        self.component_strip(end)?;
        Ok(bond)
    }

    pub fn remove_bond(&mut self, bid: BondId) -> Result<Bond> {
        let bond = self.unlink_bond(bid)?;
        self.assign_connected_components()?;
        Ok(bond)
    }

    /// Remove an atom with all of its bonds.
    pub fn remove_atom(&mut self, aid: AtomId) -> Result<Atom> {
        let bonds: Vec<BondId> = self.topo(aid)?.neighbors.iter().map(|h| h.bond()).collect();
        for bid in bonds {
            self.unlink_bond(bid)?;
        }
        self.component_strip(aid)?;
        self.atoms.remove(&aid);
        self.atoms_changed.remove(&aid);
        let atom = self.mol.remove_atom(aid)?;
        self.assign_connected_components()?;
        Ok(atom)
    }

    /// Re-add a bond with its ends swapped and every other field kept.
    pub fn flip_bond(&mut self, bid: BondId) -> Result<BondId> {
        let flipped = self.mol.bond(bid)?.flipped();
        self.remove_bond(bid)?;
        self.insert_bond(flipped)
    }

    pub fn move_atom(&mut self, aid: AtomId, pp: Vector2<f64>) -> Result<()> {
        self.mol.set_atom_pos(aid, pp)?;
        self.mark_atom(aid, Change::Moved);
        let around = self.topo(aid)?.neighbors.clone();
        for id in around {
            let (end, bond) = {
                let hb = self.half_bond(id)?;
                (hb.end, hb.bond)
            };
            self.mark_atom(end, Change::Moved);
            self.mark_bond(bond, Change::Moved);
            let further: Vec<BondId> = self.topo(end)?.neighbors.iter().map(|h| h.bond()).collect();
            for other in further {
                self.mark_bond(other, Change::Moved);
            }
        }
        Ok(())
    }

    pub fn set_bond_order(&mut self, bid: BondId, order: BondOrder) -> Result<()> {
        self.mol.bond_mut(bid)?.order = order;
        self.mark_bond(bid, Change::Moved);
        Ok(())
    }

    /// Append copies of `other`'s atoms and bonds, returning the atom id map.
    pub fn merge(&mut self, other: &Mol) -> Result<BTreeMap<AtomId, AtomId>> {
        let mut atom_map = BTreeMap::new();
        for aid in other.atoms() {
            let mut atom = other.atom(aid)?.clone();
            atom.sgroups.clear();
            atom_map.insert(aid, self.insert_atom(atom));
        }
        for bid in other.bonds() {
            let bond = other.bond(bid)?;
            self.insert_bond(Bond {
                begin: remap(&atom_map, bond.begin)?,
                end: remap(&atom_map, bond.end)?,
                ..bond.clone()
            })?;
        }
        Ok(atom_map)
    }

    /// Refresh derived state. Everything is rebuilt when `force` is set or
    /// the diagram was never refreshed; otherwise only marked entities are
    /// revisited. Returns whether anything was marked.
    pub fn update(&mut self, force: bool) -> Result<bool> {
        let force = force || !self.initialized;
        // removed entities keep their marks until here
        let mol = &self.mol;
        self.atoms_changed.retain(|&aid, _| mol.contains_atom(aid));
        self.bonds_changed.retain(|&bid, _| mol.contains_bond(bid));
        if force {
            for aid in self.mol.atom_ids() {
                self.mark_atom(aid, Change::Topology);
            }
            for bid in self.mol.bond_ids() {
                self.mark_bond(bid, Change::Topology);
            }
        }

        let changed = force || !self.atoms_changed.is_empty() || !self.bonds_changed.is_empty();
        let struct_changed = force
            || self.atoms_changed.values().any(|&c| c > Change::Unchanged)
            || self.bonds_changed.values().any(|&c| c > Change::Unchanged);

        if force {
            self.atoms = self
                .mol
                .atoms()
                .map(|aid| (aid, AtomTopology::default()))
                .collect();
            self.components.clear();
            self.loops.clear();
            self.init_half_bonds()?;
            self.init_neighbors()?;
        }

        let moved: Vec<AtomId> = self
            .atoms_changed
            .iter()
            .filter(|&(_, &c)| c >= Change::Moved)
            .map(|(&aid, _)| aid)
            .collect();
        self.update_half_bonds(&moved)?;
        self.sort_neighbors(&moved)?;

        self.assign_connected_components()?;
        if struct_changed {
            self.update_loops()?;
        }

        self.refreshed_bonds = self.bonds_changed.keys().copied().collect();
        debug!(
            forced = force,
            atoms = moved.len(),
            bonds = self.refreshed_bonds.len(),
            loops = self.loops.len(),
            components = self.components.len(),
            "diagram refreshed"
        );
        self.atoms_changed.clear();
        self.bonds_changed.clear();
        self.initialized = true;
        Ok(changed)
    }
}
