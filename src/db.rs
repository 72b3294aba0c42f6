// src/db.rs

pub mod user_repo;
pub use user_repo::UserRepository;
pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod custody_repo;
pub use custody_repo::CustodyRepository;
pub mod sorting_repo;
pub use sorting_repo::SortingRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
