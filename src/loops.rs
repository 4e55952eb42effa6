//! Face recovery over the rotation system.
//!
//! Following `next` from any half-bond traces one closed face boundary. A
//! walk is an interior face when its total turning, seeded with 2π, stays
//! below π in magnitude; interior faces become [`Loop`] records and the
//! remaining walks are marked [`Face::Outer`].

use std::f64::consts::PI;

use tracing::trace;

use crate::bond::BondOrder;
use crate::diagram::{Change, Diagram};
use crate::error::Result;
use crate::geometry::turn_angle;
use crate::half_bond::{Face, HalfBondId};
use crate::mol::{BondId, Mol};

pub type LoopId = usize;

/// A bounded face of the drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    /// Boundary half-bonds in walk order.
    pub hbs: Vec<HalfBondId>,
    pub dbl_bonds: usize,
    /// Every boundary bond is aromatic.
    pub aromatic: bool,
    /// No turn along the boundary bends the wrong way.
    pub convex: bool,
}

impl Loop {
    fn new(hbs: Vec<HalfBondId>, mol: &Mol, convex: bool) -> Result<Self> {
        let mut dbl_bonds = 0;
        let mut aromatic = true;
        for &id in &hbs {
            match mol.bond(id.bond())?.order {
                BondOrder::Aromatic => {}
                BondOrder::Double => {
                    dbl_bonds += 1;
                    aromatic = false;
                }
                _ => aromatic = false,
            }
        }
        Ok(Self {
            hbs,
            dbl_bonds,
            aromatic,
            convex,
        })
    }

    pub fn len(&self) -> usize {
        self.hbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hbs.is_empty()
    }

    pub fn bonds(&self) -> impl Iterator<Item = BondId> + '_ {
        self.hbs.iter().map(|id| id.bond())
    }
}

impl Diagram {
    /// Drop a loop and release its half-bonds for reclassification.
    pub(crate) fn loop_remove(&mut self, id: LoopId) {
        let Some(lp) = self.loops.remove(id) else {
            return;
        };
        for hb in lp.hbs {
            if let Some(hb) = self.half_bonds.get_mut(&hb) {
                hb.face = Face::Unclassified;
            }
        }
    }

    fn walk(&self, start: HalfBondId, bound: usize) -> Result<Vec<HalfBondId>> {
        let mut hbs = vec![start];
        let mut cur = self.half_bond(start)?.next;
        while cur != start {
            if hbs.len() >= bound {
                return Err(Self::contract_failure(format!(
                    "face walk from half-bond {start} does not close within {bound} steps"
                )));
            }
            hbs.push(cur);
            cur = self.half_bond(cur)?.next;
        }
        Ok(hbs)
    }

    /// Total turning of a closed walk seeded with 2π, and whether it is convex.
    fn turning(&self, hbs: &[HalfBondId]) -> Result<(f64, bool)> {
        let mut total = 2.0 * PI;
        let mut convex = true;
        for (k, &a) in hbs.iter().enumerate() {
            let b = hbs[(k + 1) % hbs.len()];
            let (ha, hb) = (self.half_bond(a)?, self.half_bond(b)?);
            let angle = turn_angle(&ha.dir, &hb.dir);
            if angle > 0.0 {
                convex = false;
            }
            // fold-back around a pendant atom
            total += if hb.contra == a { PI } else { angle };
        }
        Ok((total, convex))
    }

    /// Classify every half-bond that has no face yet.
    pub(crate) fn find_loops(&mut self) -> Result<()> {
        let bound = self.half_bonds.len();
        let ids: Vec<HalfBondId> = self.half_bonds.keys().copied().collect();
        for start in ids {
            if self.half_bond(start)?.face != Face::Unclassified {
                continue;
            }
            let hbs = self.walk(start, bound)?;
            let (total, convex) = self.turning(&hbs)?;
            let face = if total.abs() < PI {
                let lp = Loop::new(hbs.clone(), &self.mol, convex)?;
                Face::Inner(self.loops.add(lp))
            } else {
                Face::Outer
            };
            trace!(start = start.0, len = hbs.len(), total, ?face, "face walk");
            for id in hbs {
                let hb = self.hb_mut(id)?;
                hb.face = face;
                let bond = hb.bond;
                self.mark_bond(bond, Change::Moved);
            }
        }
        Ok(())
    }

    /// Release the faces of every bond marked as moved or changed, then
    /// reclassify.
    pub(crate) fn update_loops(&mut self) -> Result<()> {
        let dirty: Vec<BondId> = self
            .bonds_changed
            .iter()
            .filter(|&(_, &change)| change >= Change::Moved)
            .map(|(&bid, _)| bid)
            .collect();
        for bid in dirty {
            if !self.mol.contains_bond(bid) {
                continue;
            }
            let (h1, h2) = HalfBondId::of_bond(bid);
            for id in [h1, h2] {
                match self.half_bond(id)?.face {
                    Face::Inner(lid) => self.loop_remove(lid),
                    Face::Outer => self.hb_mut(id)?.face = Face::Unclassified,
                    Face::Unclassified => {}
                }
            }
        }
        self.find_loops()
    }
}
