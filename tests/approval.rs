use serde::Deserialize;

use chemsketch::{
    Atom, AtomParams, Bond, BondOrder, BondParams, Diagram, Element, Mol, MolLists, Settings,
};
use nalgebra::Vector2;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct FaceEntry {
    name: String,
    atoms: Vec<(f64, f64)>,
    bonds: Vec<(usize, usize, u8)>,
    loops: Vec<LoopEntry>,
    components: usize,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct LoopEntry {
    size: usize,
    dbl_bonds: usize,
    aromatic: bool,
    convex: bool,
}

fn load() -> Vec<FaceEntry> {
    serde_json::from_str(include_str!("approval_data/faces.json")).unwrap()
}

fn lists(entry: &FaceEntry) -> MolLists {
    let atoms = entry
        .atoms
        .iter()
        .map(|&(x, y)| Atom {
            pos: Vector2::new(x, y),
            ..Atom::element(Element::C)
        })
        .collect();
    let bonds = entry
        .bonds
        .iter()
        .map(|&(i, j, order)| {
            Bond::new(BondParams {
                begin: Some(chemsketch::AtomId::new(i)),
                end: Some(chemsketch::AtomId::new(j)),
                ..BondParams::with_order(BondOrder::try_from(order).unwrap())
            })
            .unwrap()
        })
        .collect();
    MolLists { atoms, bonds }
}

fn observed(d: &Diagram) -> Vec<LoopEntry> {
    let mut loops: Vec<LoopEntry> = d
        .loops()
        .map(|(_, lp)| LoopEntry {
            size: lp.len(),
            dbl_bonds: lp.dbl_bonds,
            aromatic: lp.aromatic,
            convex: lp.convex,
        })
        .collect();
    loops.sort();
    loops
}

fn compare(tag: &str, entry: &FaceEntry, d: &Diagram, failures: &mut Vec<String>) {
    let mut expected = entry.loops.clone();
    expected.sort();
    let got = observed(d);
    if got != expected {
        failures.push(format!(
            "[{tag}] {}: expected loops {expected:?}, got {got:?}",
            entry.name
        ));
    }
    let components = d.components().count();
    if components != entry.components {
        failures.push(format!(
            "[{tag}] {}: expected {} components, got {components}",
            entry.name, entry.components
        ));
    }
}

// ---------------------------------------------------------------------------
// 1. Faces of loaded molecules
// ---------------------------------------------------------------------------

#[test]
fn approval_faces_loaded() {
    let data = load();
    let mut failures = Vec::new();
    for entry in &data {
        let mol = Mol::from_lists(&lists(entry)).unwrap();
        let d = Diagram::new(mol, Settings::default()).unwrap();
        compare("loaded", entry, &d, &mut failures);
    }
    assert!(failures.is_empty(), "{} failures:\n{}", failures.len(), failures.join("\n"));
}

// ---------------------------------------------------------------------------
// 2. Faces of molecules drawn one edit at a time
// ---------------------------------------------------------------------------

#[test]
fn approval_faces_drawn() {
    let data = load();
    let mut failures = Vec::new();
    for entry in &data {
        let mut d = Diagram::with_settings(Settings::default());
        let ids: Vec<_> = entry
            .atoms
            .iter()
            .map(|&(x, y)| d.add_atom(Vector2::new(x, y), AtomParams::default()).unwrap())
            .collect();
        for &(i, j, order) in &entry.bonds {
            let params = BondParams::with_order(BondOrder::try_from(order).unwrap());
            d.add_bond(ids[i], ids[j], params).unwrap();
            // refresh midway so later bonds patch existing faces
            d.update(false).unwrap();
        }
        compare("drawn", entry, &d, &mut failures);
    }
    assert!(failures.is_empty(), "{} failures:\n{}", failures.len(), failures.join("\n"));
}

// ---------------------------------------------------------------------------
// 3. Erasing every bond
// ---------------------------------------------------------------------------

#[test]
fn approval_erase_all_bonds() {
    let data = load();
    let mut failures = Vec::new();
    for entry in &data {
        let mol = Mol::from_lists(&lists(entry)).unwrap();
        let mut d = Diagram::new(mol, Settings::default()).unwrap();
        for bid in d.bond_ids() {
            d.remove_bond(bid).unwrap();
            d.update(false).unwrap();
        }
        if d.loops().count() != 0 || !d.half_bond_ids().is_empty() {
            failures.push(format!("[erase] {}: derived state left behind", entry.name));
        }
        if d.components().count() != entry.atoms.len() {
            failures.push(format!(
                "[erase] {}: expected {} singleton components, got {}",
                entry.name,
                entry.atoms.len(),
                d.components().count()
            ));
        }
    }
    assert!(failures.is_empty(), "{} failures:\n{}", failures.len(), failures.join("\n"));
}
