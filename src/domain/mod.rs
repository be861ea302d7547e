//! Domain layer: aggregates, value objects, events and the pricing rules.

pub mod aggregates;
pub mod events;
pub mod pricing;
pub mod shipping;
pub mod value_objects;

/// Collection name shared by every jewelry product.
pub const JEWELRY_COLLECTION: &str = "Украшения";

/// Whether a collection belongs to the jewelry side of the catalog.
pub fn is_jewelry(collection: &str) -> bool {
    collection == JEWELRY_COLLECTION
}
