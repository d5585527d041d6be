mod instantiate;
mod load;
mod validate;
mod xml;

pub use self::load::{PackageResolver, TreeParser};
