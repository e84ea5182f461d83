pub mod collapser;

pub use collapser::{CollapsedRow, Collapser, DayEffects};
