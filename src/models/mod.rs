pub mod catalog;
pub mod document;
pub mod inventory;

pub use catalog::{CatalogItem, Project};
pub use document::{Document, DocumentLine, DocumentRef};
pub use inventory::{InventoryMovement, PriceRecord};
