//! Coordinate helpers over a [`Mol`].
//!
//! Diagrams are stored with the y axis pointing down (`Atom::pp`) while the
//! model keeps y up (`Atom::pos`). The functions here estimate a drawing scale
//! and move a freshly loaded molecule into the working frame.

use nalgebra::Vector2;

use crate::error::Result;
use crate::mol::Mol;

/// Polar angle of `v` measured from the +x axis, in `(-π, π]`.
pub fn ox_angle(v: &Vector2<f64>) -> f64 {
    v.y.atan2(v.x)
}

/// `v` rotated by +90°.
pub fn turn_left(v: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(-v.y, v.x)
}

/// z component of the 3D cross product of two planar vectors.
pub fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Unit vector along `v`, or the zero vector when `v` has no length.
pub fn unit_or_zero(v: &Vector2<f64>) -> Vector2<f64> {
    v.try_normalize(f64::EPSILON).unwrap_or_else(Vector2::zeros)
}

/// Signed turn from direction `a` to direction `b`, in `(-π, π]`.
pub fn turn_angle(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    cross(a, b).atan2(a.dot(b))
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min: Vector2<f64>,
    pub max: Vector2<f64>,
}

impl BBox {
    fn unit() -> Self {
        Self {
            min: Vector2::zeros(),
            max: Vector2::new(1.0, 1.0),
        }
    }

    fn of_points(mut points: impl Iterator<Item = Vector2<f64>>) -> Self {
        let Some(first) = points.next() else {
            return Self::unit();
        };
        points.fold(Self { min: first, max: first }, |bb, p| Self {
            min: bb.min.inf(&p),
            max: bb.max.sup(&p),
        })
    }

    pub fn size(&self) -> Vector2<f64> {
        self.max - self.min
    }
}

/// Bounding box of the working positions. The unit box for an empty molecule.
pub fn coord_bounding_box(mol: &Mol) -> BBox {
    BBox::of_points(mol.atoms().filter_map(|aid| mol.atom(aid).ok().map(|a| a.pp)))
}

/// Bounding box of the model positions. The unit box for an empty molecule.
pub fn object_bounding_box(mol: &Mol) -> BBox {
    BBox::of_points(mol.atoms().filter_map(|aid| mol.atom(aid).ok().map(|a| a.pos)))
}

/// Mean bond length over working positions, or `-1.0` when there are no bonds.
pub fn avg_bond_length(mol: &Mol) -> Result<f64> {
    let mut total = 0.0;
    let mut count = 0usize;
    for bid in mol.bonds() {
        let bond = mol.bond(bid)?;
        total += (mol.atom(bond.end)?.pp - mol.atom(bond.begin)?.pp).norm();
        count += 1;
    }
    Ok(if count > 0 { total / count as f64 } else { -1.0 })
}

/// Mean distance from each atom to its nearest other atom, or `-1.0` when
/// the molecule is empty. A lone atom contributes `-1.0`.
pub fn avg_closest_atom_distance(mol: &Mol) -> Result<f64> {
    let points = mol
        .atoms()
        .map(|aid| mol.atom(aid).map(|a| a.pp))
        .collect::<Result<Vec<_>>>()?;
    if points.is_empty() {
        return Ok(-1.0);
    }
    let total: f64 = points
        .iter()
        .enumerate()
        .map(|(k, p)| {
            points
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != k)
                .map(|(_, q)| (q - p).norm())
                .reduce(f64::min)
                .unwrap_or(-1.0)
        })
        .sum();
    Ok(total / points.len() as f64)
}

/// Copy model positions into the working positions unchanged.
pub fn coord_project(mol: &mut Mol) -> Result<()> {
    for aid in mol.atom_ids() {
        let atom = mol.atom_mut(aid)?;
        atom.pp = atom.pos;
    }
    Ok(())
}

/// Translate working positions by `-min`, flip them vertically and scale by
/// `scale`; model positions follow as the y mirror.
pub fn coord_shift_flip_scale(mol: &mut Mol, min: Vector2<f64>, scale: f64) -> Result<()> {
    for aid in mol.atom_ids() {
        let p = mol.atom(aid)?.pp - min;
        mol.set_atom_pos(aid, Vector2::new(p.x, -p.y) * scale)?;
    }
    Ok(())
}

/// Scale estimate used to bring a molecule to unit bond length: average bond
/// length, else average nearest-atom distance, else 1 when the estimate is
/// below `min_length`.
pub fn typical_length(mol: &Mol, min_length: f64) -> Result<f64> {
    let mut avg = avg_bond_length(mol)?;
    if avg < 0.0 {
        avg = avg_closest_atom_distance(mol)?;
    }
    Ok(if avg < min_length { 1.0 } else { avg })
}

/// Move a freshly loaded molecule into the working frame: origin at the
/// bounding box corner, y axis down, typical length 1.
pub fn normalize_coordinates(mol: &mut Mol, min_length: f64) -> Result<()> {
    coord_project(mol)?;
    let bb = coord_bounding_box(mol);
    let scale = 1.0 / typical_length(mol, min_length)?;
    coord_shift_flip_scale(mol, bb.min, scale)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use approx::assert_relative_eq;

    use super::*;
    use crate::atom::{Atom, AtomParams};
    use crate::bond::{Bond, BondOrder, BondParams};
    use crate::element::Element;
    use crate::mol::AtomId;

    fn mol_at(points: &[(f64, f64)]) -> (Mol, Vec<AtomId>) {
        let mut mol = Mol::new();
        let ids = points
            .iter()
            .map(|&(x, y)| {
                mol.add_atom(
                    Atom::new(AtomParams {
                        pos: Some(Vector2::new(x, y)),
                        ..AtomParams::with_label(Element::C)
                    })
                    .unwrap(),
                )
            })
            .collect();
        (mol, ids)
    }

    fn link(mol: &mut Mol, a: AtomId, b: AtomId) {
        mol.add_bond(
            Bond::new(BondParams {
                begin: Some(a),
                end: Some(b),
                ..BondParams::with_order(BondOrder::Single)
            })
            .unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn vector_helpers() {
        assert_relative_eq!(ox_angle(&Vector2::new(0.0, 1.0)), FRAC_PI_2);
        assert_relative_eq!(ox_angle(&Vector2::new(-1.0, 0.0)), PI);
        assert_eq!(turn_left(&Vector2::new(1.0, 0.0)), Vector2::new(0.0, 1.0));
        assert_relative_eq!(cross(&Vector2::new(1.0, 0.0), &Vector2::new(0.0, 1.0)), 1.0);
        assert_eq!(unit_or_zero(&Vector2::zeros()), Vector2::zeros());
        assert_relative_eq!(unit_or_zero(&Vector2::new(3.0, 4.0)).norm(), 1.0);
        assert_relative_eq!(
            turn_angle(&Vector2::new(1.0, 0.0), &Vector2::new(0.0, -1.0)),
            -FRAC_PI_2
        );
    }

    #[test]
    fn empty_molecule_defaults() {
        let mol = Mol::new();
        let bb = coord_bounding_box(&mol);
        assert_eq!(bb.min, Vector2::zeros());
        assert_eq!(bb.max, Vector2::new(1.0, 1.0));
        assert_eq!(avg_bond_length(&mol).unwrap(), -1.0);
        assert_eq!(avg_closest_atom_distance(&mol).unwrap(), -1.0);
    }

    #[test]
    fn bond_free_graph_has_sentinel_length() {
        let (mol, _) = mol_at(&[(0.0, 0.0), (3.0, 0.0)]);
        assert_eq!(avg_bond_length(&mol).unwrap(), -1.0);
    }

    #[test]
    fn average_lengths() {
        let (mut mol, ids) = mol_at(&[(0.0, 0.0), (2.0, 0.0), (2.0, 4.0)]);
        link(&mut mol, ids[0], ids[1]);
        link(&mut mol, ids[1], ids[2]);
        assert_relative_eq!(avg_bond_length(&mol).unwrap(), 3.0);
        // nearest: 2, 2, 4
        assert_relative_eq!(avg_closest_atom_distance(&mol).unwrap(), 8.0 / 3.0);
    }

    #[test]
    fn bounding_boxes() {
        let (mol, _) = mol_at(&[(1.0, 2.0), (-1.0, 5.0), (0.5, -3.0)]);
        let obj = object_bounding_box(&mol);
        assert_eq!(obj.min, Vector2::new(-1.0, -3.0));
        assert_eq!(obj.max, Vector2::new(1.0, 5.0));
        let coord = coord_bounding_box(&mol);
        assert_eq!(coord.min, Vector2::new(-1.0, -5.0));
        assert_eq!(coord.size(), Vector2::new(2.0, 8.0));
    }

    #[test]
    fn normalization_scales_to_unit_bonds() {
        let (mut mol, ids) = mol_at(&[(10.0, 10.0), (12.0, 10.0), (12.0, 12.0)]);
        link(&mut mol, ids[0], ids[1]);
        link(&mut mol, ids[1], ids[2]);
        normalize_coordinates(&mut mol, 1e-3).unwrap();

        assert_relative_eq!(avg_bond_length(&mol).unwrap(), 1.0);
        let a = mol.atom(ids[0]).unwrap();
        assert_relative_eq!(a.pp.x, 0.0);
        assert_relative_eq!(a.pp.y, 0.0);
        // y points down in the working frame
        let c = mol.atom(ids[2]).unwrap();
        assert_relative_eq!(c.pp.y, -1.0);
        assert_relative_eq!(c.pos.y, 1.0);
    }

    #[test]
    fn degenerate_scale_falls_back_to_one() {
        let (mut mol, ids) = mol_at(&[(5.0, 5.0), (5.0, 5.0)]);
        link(&mut mol, ids[0], ids[1]);
        assert_eq!(typical_length(&mol, 1e-3).unwrap(), 1.0);
        normalize_coordinates(&mut mol, 1e-3).unwrap();
        assert_eq!(mol.atom(ids[1]).unwrap().pp, Vector2::zeros());
    }

    #[test]
    fn nearest_distance_used_without_bonds() {
        let (mol, _) = mol_at(&[(0.0, 0.0), (0.5, 0.0)]);
        assert_relative_eq!(typical_length(&mol, 1e-3).unwrap(), 0.5);
    }
}
