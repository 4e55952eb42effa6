#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, SketchError};
use crate::mol::AtomId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
    SingleOrDouble,
    SingleOrAromatic,
    DoubleOrAromatic,
    Any,
}

impl BondOrder {
    pub fn is_query(self) -> bool {
        matches!(
            self,
            BondOrder::SingleOrDouble
                | BondOrder::SingleOrAromatic
                | BondOrder::DoubleOrAromatic
                | BondOrder::Any
        )
    }

    pub fn code(self) -> u8 {
        match self {
            BondOrder::Single => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Aromatic => 4,
            BondOrder::SingleOrDouble => 5,
            BondOrder::SingleOrAromatic => 6,
            BondOrder::DoubleOrAromatic => 7,
            BondOrder::Any => 8,
        }
    }
}

impl TryFrom<u8> for BondOrder {
    type Error = SketchError;

    fn try_from(code: u8) -> Result<Self> {
        Ok(match code {
            1 => BondOrder::Single,
            2 => BondOrder::Double,
            3 => BondOrder::Triple,
            4 => BondOrder::Aromatic,
            5 => BondOrder::SingleOrDouble,
            6 => BondOrder::SingleOrAromatic,
            7 => BondOrder::DoubleOrAromatic,
            8 => BondOrder::Any,
            _ => return Err(SketchError::invariant(format!("unknown bond order {code}"))),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BondStereo {
    #[default]
    None,
    Up,
    Either,
    Down,
    CisTrans,
}

impl BondStereo {
    pub fn code(self) -> u8 {
        match self {
            BondStereo::None => 0,
            BondStereo::Up => 1,
            BondStereo::CisTrans => 3,
            BondStereo::Either => 4,
            BondStereo::Down => 6,
        }
    }
}

impl TryFrom<u8> for BondStereo {
    type Error = SketchError;

    fn try_from(code: u8) -> Result<Self> {
        Ok(match code {
            0 => BondStereo::None,
            1 => BondStereo::Up,
            3 => BondStereo::CisTrans,
            4 => BondStereo::Either,
            6 => BondStereo::Down,
            _ => return Err(SketchError::invariant(format!("unknown bond stereo {code}"))),
        })
    }
}

/// Query constraint on whether a bond lies in a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BondTopology {
    #[default]
    Either,
    Ring,
    Chain,
}

impl BondTopology {
    pub fn code(self) -> u8 {
        match self {
            BondTopology::Either => 0,
            BondTopology::Ring => 1,
            BondTopology::Chain => 2,
        }
    }
}

impl TryFrom<u8> for BondTopology {
    type Error = SketchError;

    fn try_from(code: u8) -> Result<Self> {
        Ok(match code {
            0 => BondTopology::Either,
            1 => BondTopology::Ring,
            2 => BondTopology::Chain,
            _ => return Err(SketchError::invariant(format!("unknown bond topology {code}"))),
        })
    }
}

/// Construction fields for a [`Bond`]. `begin`, `end` and `order` are required.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BondParams {
    pub begin: Option<AtomId>,
    pub end: Option<AtomId>,
    pub order: Option<BondOrder>,
    pub stereo: Option<BondStereo>,
    pub topology: Option<BondTopology>,
    pub reacting_center: Option<i32>,
}

impl BondParams {
    pub fn with_order(order: BondOrder) -> Self {
        Self {
            order: Some(order),
            ..Self::default()
        }
    }
}

impl From<&Bond> for BondParams {
    fn from(bond: &Bond) -> Self {
        Self {
            begin: Some(bond.begin),
            end: Some(bond.end),
            order: Some(bond.order),
            stereo: Some(bond.stereo),
            topology: Some(bond.topology),
            reacting_center: Some(bond.reacting_center),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bond {
    pub begin: AtomId,
    pub end: AtomId,
    pub order: BondOrder,
    pub stereo: BondStereo,
    pub topology: BondTopology,
    pub reacting_center: i32,
}

impl Bond {
    pub fn new(params: BondParams) -> Result<Self> {
        let (Some(begin), Some(end), Some(order)) = (params.begin, params.end, params.order)
        else {
            return Err(SketchError::invalid_argument(
                "bond begin, end and order must be specified",
            ));
        };
        Ok(Self {
            begin,
            end,
            order,
            stereo: params.stereo.unwrap_or_default(),
            topology: params.topology.unwrap_or_default(),
            reacting_center: params.reacting_center.unwrap_or(0),
        })
    }

    pub fn find_other_end(&self, atom: AtomId) -> Result<AtomId> {
        if atom == self.begin {
            Ok(self.end)
        } else if atom == self.end {
            Ok(self.begin)
        } else {
            Err(SketchError::invalid_argument(format!(
                "atom {} is not an end of the bond",
                atom.index()
            )))
        }
    }

    /// The same bond drawn in the opposite direction.
    pub fn flipped(&self) -> Self {
        Self {
            begin: self.end,
            end: self.begin,
            ..self.clone()
        }
    }
}
