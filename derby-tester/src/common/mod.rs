pub mod util;

pub use util::{OutputTarget, resolve_seeds, split_csv};
