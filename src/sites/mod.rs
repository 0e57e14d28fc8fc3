//! Built-in retailer scrapers.

mod babil;
mod bkm;
mod catalog;
mod dr;
mod kitapsec;

pub use babil::Babil;
pub use bkm::BkmKitap;
pub use dr::Dr;
pub use kitapsec::Kitapsec;

use crate::registry::ScraperRegistry;
use crate::Result;

/// Registers the built-in retailers in their try order.
pub fn register_defaults(registry: &mut ScraperRegistry) -> Result<()> {
    registry.register("Babil", || Box::new(Babil::new()))?;
    registry.register("D&R", || Box::new(Dr::new()))?;
    registry.register("Kitapsec", || Box::new(Kitapsec::new()))?;
    registry.register("BKM Kitap", || Box::new(BkmKitap::new()))?;
    Ok(())
}

/// A registry holding only the built-in retailers.
pub fn default_registry() -> ScraperRegistry {
    let mut registry = ScraperRegistry::new();
    // the registry is empty, so names cannot collide
    let _ = register_defaults(&mut registry);
    registry
}
