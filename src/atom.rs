use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use nalgebra::Vector2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::error::{Result, SketchError};
use crate::mol::SGroupId;

/// Radical state of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Radical {
    #[default]
    None,
    Singlet,
    Doublet,
    Triplet,
}

impl Radical {
    /// Unpaired electron count drawn for this radical state.
    pub fn electrons(self) -> u8 {
        match self {
            Radical::None => 0,
            Radical::Doublet => 1,
            Radical::Singlet | Radical::Triplet => 2,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Radical::None => 0,
            Radical::Singlet => 1,
            Radical::Doublet => 2,
            Radical::Triplet => 3,
        }
    }
}

impl TryFrom<u8> for Radical {
    type Error = SketchError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Radical::None),
            1 => Ok(Radical::Singlet),
            2 => Ok(Radical::Doublet),
            3 => Ok(Radical::Triplet),
            _ => Err(SketchError::invariant(format!("unknown radical code {code}"))),
        }
    }
}

/// Element list of a query atom: matches any listed element, or any element
/// not listed when `negate` is set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AtomList {
    pub negate: bool,
    pub elements: Vec<Element>,
}

impl AtomList {
    pub fn new(elements: Vec<Element>, negate: bool) -> Result<Self> {
        if elements.is_empty() {
            return Err(SketchError::invalid_argument(
                "atom list must name at least one element",
            ));
        }
        Ok(Self { negate, elements })
    }

    pub fn matches(&self, element: Element) -> bool {
        self.elements.contains(&element) != self.negate
    }
}

impl fmt::Display for AtomList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negate {
            f.write_str("!")?;
        }
        f.write_str("[")?;
        for (i, e) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(e.symbol())?;
        }
        f.write_str("]")
    }
}

/// What an atom node stands for: a concrete element, the `A` wildcard, or an
/// element list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AtomLabel {
    Element(Element),
    Wildcard,
    List(AtomList),
}

impl AtomLabel {
    pub fn is_query(&self) -> bool {
        !matches!(self, AtomLabel::Element(_))
    }

    pub fn element(&self) -> Option<Element> {
        match self {
            AtomLabel::Element(e) => Some(*e),
            _ => None,
        }
    }

    /// Whether an atom of `element` satisfies this label.
    pub fn matches(&self, element: Element) -> bool {
        match self {
            AtomLabel::Element(e) => *e == element,
            AtomLabel::Wildcard => true,
            AtomLabel::List(list) => list.matches(element),
        }
    }
}

impl From<Element> for AtomLabel {
    fn from(e: Element) -> Self {
        AtomLabel::Element(e)
    }
}

impl fmt::Display for AtomLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomLabel::Element(e) => f.write_str(e.symbol()),
            AtomLabel::Wildcard => f.write_str("A"),
            AtomLabel::List(list) => list.fmt(f),
        }
    }
}

impl FromStr for AtomLabel {
    type Err = SketchError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "A" {
            return Ok(AtomLabel::Wildcard);
        }
        let (negate, rest) = match s.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if let Some(inner) = rest.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            let elements = inner
                .split(',')
                .filter(|sym| !sym.is_empty())
                .map(|sym| {
                    Element::from_symbol(sym.trim()).ok_or_else(|| {
                        SketchError::invalid_argument(format!("unknown element '{sym}'"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(AtomLabel::List(AtomList::new(elements, negate)?));
        }
        if negate {
            return Err(SketchError::invalid_argument(format!(
                "negation requires an element list: '{s}'"
            )));
        }
        Element::from_symbol(s)
            .map(AtomLabel::Element)
            .ok_or_else(|| SketchError::invalid_argument(format!("unknown atom label '{s}'")))
    }
}

/// Construction fields for an [`Atom`]. Only `label` is required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomParams {
    pub label: Option<AtomLabel>,
    pub charge: Option<i32>,
    pub isotope: Option<u32>,
    pub radical: Option<Radical>,
    pub valence: Option<u8>,
    pub explicit_valence: Option<u8>,
    pub implicit_h: Option<u8>,
    pub ring_bond_count: Option<u8>,
    pub substitution_count: Option<u8>,
    pub unsaturated: Option<bool>,
    pub pos: Option<Vector2<f64>>,
}

impl AtomParams {
    pub fn with_label(label: impl Into<AtomLabel>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }
}

/// A node of the molecule graph.
///
/// `pos` is the model position (y axis up). `pp` is the working position the
/// editor draws and measures with (y axis down); [`Mol::set_atom_pos`] keeps
/// the two mirrored.
///
/// [`Mol::set_atom_pos`]: crate::Mol::set_atom_pos
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Atom {
    pub label: AtomLabel,
    pub charge: i32,
    /// Mass number, `0` for natural abundance.
    pub isotope: u32,
    pub radical: Radical,
    pub valence: u8,
    pub explicit_valence: u8,
    pub implicit_h: u8,
    // query constraints, `None` when unconstrained
    pub ring_bond_count: Option<u8>,
    pub substitution_count: Option<u8>,
    pub unsaturated: Option<bool>,
    pub pos: Vector2<f64>,
    pub pp: Vector2<f64>,
    /// Ids of the substructure groups this atom belongs to.
    pub sgroups: BTreeSet<SGroupId>,
}

impl Atom {
    pub fn new(params: AtomParams) -> Result<Self> {
        let label = params
            .label
            .ok_or_else(|| SketchError::invalid_argument("atom label must be specified"))?;
        let pos = params.pos.unwrap_or_else(Vector2::zeros);
        Ok(Self {
            label,
            charge: params.charge.unwrap_or(0),
            isotope: params.isotope.unwrap_or(0),
            radical: params.radical.unwrap_or_default(),
            valence: params.valence.unwrap_or(0),
            explicit_valence: params.explicit_valence.unwrap_or(0),
            implicit_h: params.implicit_h.unwrap_or(0),
            ring_bond_count: params.ring_bond_count,
            substitution_count: params.substitution_count,
            unsaturated: params.unsaturated,
            pos,
            pp: Vector2::new(pos.x, -pos.y),
            sgroups: BTreeSet::new(),
        })
    }

    /// A plain element atom at the model origin.
    pub fn element(element: Element) -> Self {
        Self {
            label: AtomLabel::Element(element),
            charge: 0,
            isotope: 0,
            radical: Radical::None,
            valence: 0,
            explicit_valence: 0,
            implicit_h: 0,
            ring_bond_count: None,
            substitution_count: None,
            unsaturated: None,
            pos: Vector2::zeros(),
            pp: Vector2::zeros(),
            sgroups: BTreeSet::new(),
        }
    }

    pub fn is_query(&self) -> bool {
        self.label.is_query()
    }

    pub fn is_pure_hydrogen(&self) -> bool {
        self.label == AtomLabel::Element(Element::H) && self.isotope == 0
    }

    pub fn is_plain_carbon(&self) -> bool {
        self.label == AtomLabel::Element(Element::C)
            && self.isotope == 0
            && self.radical == Radical::None
            && self.charge == 0
            && self.explicit_valence == 0
            && self.ring_bond_count.is_none()
            && self.substitution_count.is_none()
            && self.unsaturated.is_none()
    }
}
