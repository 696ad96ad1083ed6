pub mod grid_state;
pub mod serialization;
pub mod world;

pub use grid_state::{CollisionRule, GridState, Outcome};
pub use serialization::GridSnapshot;
pub use world::{GridWorld, OpponentPolicy, WorldState};
