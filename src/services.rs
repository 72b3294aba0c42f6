// src/services.rs

pub mod identity_service;
pub use identity_service::IdentityService;
pub mod rbac_service;
pub use rbac_service::RbacService;
pub mod custody_service;
pub use custody_service::CustodyService;
pub mod sorting_service;
pub use sorting_service::SortingService;
pub mod inventory_service;
pub use inventory_service::InventoryService;
