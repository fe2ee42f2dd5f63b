pub mod biome;
pub mod config;
pub mod distance;
pub mod error;
pub mod grid;
pub mod heightmap;
pub mod render;
pub mod rivers;
pub mod world;

pub use biome::{Biome, QuantileThresholds};
pub use config::GenerationParams;
pub use error::{MapError, Result};
pub use grid::{Coord, HexGrid};
pub use rivers::{RiverNetwork, Segment};
pub use world::{World, WorldSummary, generate_world, generate_worlds};
