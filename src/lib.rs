pub mod atom;
pub mod bond;
pub mod components;
pub mod diagram;
pub mod element;
pub mod error;
pub mod geometry;
pub mod half_bond;
pub mod loops;
pub mod mol;
pub mod pool;
pub mod settings;

pub use atom::{Atom, AtomLabel, AtomList, AtomParams, Radical};
pub use bond::{Bond, BondOrder, BondParams, BondStereo, BondTopology};
pub use components::ComponentId;
pub use diagram::{AtomTopology, Change, Diagram};
pub use element::Element;
pub use error::{Result, SketchError};
pub use geometry::BBox;
pub use half_bond::{Face, HalfBond, HalfBondId};
pub use loops::{Loop, LoopId};
pub use mol::{AtomId, BondId, Mol, MolLists, SGroup, SGroupId};
pub use pool::Pool;
pub use settings::Settings;
