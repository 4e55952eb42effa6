//! Directed halves of bonds and the per-atom rotation system.
//!
//! Every bond `b` owns the half-bonds `2·b` (begin → end) and `2·b + 1`
//! (end → begin). Around each atom the outgoing half-bonds are kept sorted by
//! `(angle, id)`. The `next` link of a half-bond `h` arriving at atom `a` is
//! the outgoing half-bond of `a` that follows `contra(h)` in that order, so
//! repeatedly following `next` traces the boundary of one face.

use std::cmp::Ordering;
use std::f64::consts::PI;
use std::fmt;

use nalgebra::Vector2;

use crate::diagram::Diagram;
use crate::error::{Result, SketchError};
use crate::geometry::{cross, ox_angle, turn_left, unit_or_zero};
use crate::loops::LoopId;
use crate::mol::{AtomId, BondId};

/// Id of a half-bond, derived from its bond id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HalfBondId(pub usize);

impl HalfBondId {
    /// The half-bond running from the bond's `begin` to its `end`.
    pub fn first(bond: BondId) -> Self {
        Self(2 * bond.index())
    }

    pub fn second(bond: BondId) -> Self {
        Self(2 * bond.index() + 1)
    }

    pub fn of_bond(bond: BondId) -> (Self, Self) {
        (Self::first(bond), Self::second(bond))
    }

    pub fn bond(self) -> BondId {
        BondId::new(self.0 / 2)
    }

    /// The opposite half of the same bond.
    pub fn contra(self) -> Self {
        Self(self.0 ^ 1)
    }
}

impl fmt::Display for HalfBondId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Face lying to the left of a half-bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Face {
    #[default]
    Unclassified,
    /// The unbounded face of a connected piece; never materialized.
    Outer,
    Inner(LoopId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HalfBond {
    pub begin: AtomId,
    pub end: AtomId,
    pub bond: BondId,
    pub contra: HalfBondId,
    pub next: HalfBondId,
    /// Unit direction from `begin` to `end`, zero for coincident atoms.
    pub dir: Vector2<f64>,
    pub norm: Vector2<f64>,
    pub angle: f64,
    pub face: Face,
    // Corner to the angularly previous half-bond around `begin`.
    pub left_sin: f64,
    pub left_cos: f64,
    pub left_neighbor: HalfBondId,
    // Corner to the angularly following half-bond around `begin`.
    pub right_sin: f64,
    pub right_cos: f64,
    pub right_neighbor: HalfBondId,
}

impl HalfBond {
    fn new(id: HalfBondId, begin: AtomId, end: AtomId) -> Self {
        Self {
            begin,
            end,
            bond: id.bond(),
            contra: id.contra(),
            next: id,
            dir: Vector2::zeros(),
            norm: Vector2::zeros(),
            angle: 0.0,
            face: Face::Unclassified,
            left_sin: 0.0,
            left_cos: 0.0,
            left_neighbor: id,
            right_sin: 0.0,
            right_cos: 0.0,
            right_neighbor: id,
        }
    }
}

/// Polar angle normalized to `(-π, π]`, with `0` for the zero vector.
fn polar_angle(dir: &Vector2<f64>) -> f64 {
    if *dir == Vector2::zeros() {
        return 0.0;
    }
    let angle = ox_angle(dir);
    if angle <= -PI {
        PI
    } else {
        angle
    }
}

fn cmp_keys(a: &(f64, HalfBondId), b: &(f64, HalfBondId)) -> Ordering {
    a.0.partial_cmp(&b.0)
        .unwrap_or(Ordering::Equal)
        .then(a.1.cmp(&b.1))
}

impl Diagram {
    pub(crate) fn hb_mut(&mut self, id: HalfBondId) -> Result<&mut HalfBond> {
        self.half_bonds
            .get_mut(&id)
            .ok_or(SketchError::not_found("half-bond", id.0))
    }

    /// Create both halves of `bid` with fresh geometry. They are not yet
    /// linked into any neighbor list.
    pub(crate) fn bond_init_half_bonds(&mut self, bid: BondId) -> Result<()> {
        let (begin, end) = self.mol.bond_endpoints(bid)?;
        let (h1, h2) = HalfBondId::of_bond(bid);
        self.half_bonds.insert(h1, HalfBond::new(h1, begin, end));
        self.half_bonds.insert(h2, HalfBond::new(h2, end, begin));
        self.half_bond_update(h1)?;
        self.half_bond_update(h2)
    }

    pub(crate) fn init_half_bonds(&mut self) -> Result<()> {
        self.half_bonds.clear();
        for bid in self.mol.bond_ids() {
            self.bond_init_half_bonds(bid)?;
        }
        Ok(())
    }

    /// Fill every neighbor list in half-bond id order; callers sort afterwards.
    pub(crate) fn init_neighbors(&mut self) -> Result<()> {
        for topo in self.atoms.values_mut() {
            topo.neighbors.clear();
        }
        let outgoing: Vec<(AtomId, HalfBondId)> = self
            .half_bonds
            .iter()
            .map(|(&id, hb)| (hb.begin, id))
            .collect();
        for (aid, id) in outgoing {
            self.topo_mut(aid)?.neighbors.push(id);
        }
        Ok(())
    }

    pub(crate) fn half_bond_update(&mut self, id: HalfBondId) -> Result<()> {
        let (begin, end) = {
            let hb = self.half_bond(id)?;
            (hb.begin, hb.end)
        };
        let dir = unit_or_zero(&(self.mol.atom(end)?.pp - self.mol.atom(begin)?.pp));
        let hb = self.hb_mut(id)?;
        hb.dir = dir;
        hb.norm = turn_left(&dir);
        hb.angle = polar_angle(&dir);
        Ok(())
    }

    /// Make `next` the successor of the half-bond arriving along `contra(id)`.
    pub(crate) fn set_hb_next(&mut self, id: HalfBondId, next: HalfBondId) -> Result<()> {
        self.hb_mut(id.contra())?.next = next;
        Ok(())
    }

    /// Cache the corner between `left` and its angular successor `id`.
    pub(crate) fn half_bond_set_angle(&mut self, id: HalfBondId, left: HalfBondId) -> Result<()> {
        let dir = self.half_bond(id)?.dir;
        let left_dir = self.half_bond(left)?.dir;
        let cos = left_dir.dot(&dir);
        let sin = cross(&left_dir, &dir);

        let l = self.hb_mut(left)?;
        l.right_cos = cos;
        l.right_sin = sin;
        l.right_neighbor = id;

        let h = self.hb_mut(id)?;
        h.left_cos = cos;
        h.left_sin = sin;
        h.left_neighbor = left;
        Ok(())
    }

    fn neighbor_key(&self, id: HalfBondId) -> Result<(f64, HalfBondId)> {
        Ok((self.half_bond(id)?.angle, id))
    }

    /// Insert `id` into its origin's sorted neighbor list and patch the two
    /// rotation links and corner caches around it.
    pub(crate) fn atom_add_neighbor(&mut self, id: HalfBondId) -> Result<()> {
        let aid = self.half_bond(id)?.begin;
        let key = self.neighbor_key(id)?;
        let keys = self
            .topo(aid)?
            .neighbors
            .iter()
            .map(|&n| self.neighbor_key(n))
            .collect::<Result<Vec<_>>>()?;
        let i = keys
            .iter()
            .position(|k| cmp_keys(k, &key) == Ordering::Greater)
            .unwrap_or(keys.len());

        let neighbors = &mut self.topo_mut(aid)?.neighbors;
        neighbors.insert(i, id);
        let n = neighbors.len();
        let (il, ir) = (neighbors[(i + n - 1) % n], neighbors[(i + 1) % n]);

        self.set_hb_next(il, id)?;
        self.set_hb_next(id, ir)?;
        self.half_bond_set_angle(id, il)?;
        self.half_bond_set_angle(ir, id)
    }

    /// Re-sort an atom's neighbors and rebuild all of its rotation links.
    pub(crate) fn atom_sort_neighbors(&mut self, aid: AtomId) -> Result<()> {
        let mut keyed = self
            .topo(aid)?
            .neighbors
            .iter()
            .map(|&n| self.neighbor_key(n))
            .collect::<Result<Vec<_>>>()?;
        keyed.sort_by(cmp_keys);
        let sorted: Vec<HalfBondId> = keyed.into_iter().map(|(_, id)| id).collect();

        let n = sorted.len();
        for i in 0..n {
            let (id, following) = (sorted[i], sorted[(i + 1) % n]);
            self.set_hb_next(id, following)?;
            self.half_bond_set_angle(following, id)?;
        }
        self.topo_mut(aid)?.neighbors = sorted;
        Ok(())
    }

    /// Recompute direction and angle of every half-bond touching `atoms`.
    pub(crate) fn update_half_bonds(&mut self, atoms: &[AtomId]) -> Result<()> {
        for &aid in atoms {
            let neighbors = self.topo(aid)?.neighbors.clone();
            for id in neighbors {
                self.half_bond_update(id)?;
                self.half_bond_update(id.contra())?;
            }
        }
        Ok(())
    }

    pub(crate) fn sort_neighbors(&mut self, atoms: &[AtomId]) -> Result<()> {
        for &aid in atoms {
            self.atom_sort_neighbors(aid)?;
        }
        Ok(())
    }

    /// Detach `id` from its origin's rotation, dropping the loop it bounds.
    pub(crate) fn half_bond_unref(&mut self, id: HalfBondId) -> Result<()> {
        let (aid, face) = {
            let hb = self.half_bond(id)?;
            (hb.begin, hb.face)
        };
        if let Face::Inner(lid) = face {
            self.loop_remove(lid);
        }

        let (pos, prev, next) = {
            let neighbors = &self.topo(aid)?.neighbors;
            let Some(pos) = neighbors.iter().position(|&n| n == id) else {
                return Err(Self::contract_failure(format!(
                    "half-bond {id} missing from neighbors of atom {}",
                    aid.index()
                )));
            };
            let n = neighbors.len();
            (pos, neighbors[(pos + n - 1) % n], neighbors[(pos + 1) % n])
        };
        if prev != id {
            self.set_hb_next(prev, next)?;
            self.half_bond_set_angle(next, prev)?;
        }
        self.topo_mut(aid)?.neighbors.remove(pos);
        Ok(())
    }
}
