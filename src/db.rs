pub mod code_repo;
pub use code_repo::CodeRepository;
pub mod license_repo;
pub use license_repo::LicenseRepository;
pub mod finder_fee_repo;
pub use finder_fee_repo::FinderFeeRepository;
pub mod promo_repo;
pub use promo_repo::PromoRepository;
pub mod trial_repo;
pub use trial_repo::TrialRepository;

pub mod store;
pub use store::LedgerStore;
pub mod postgres;
pub use postgres::PgLedgerStore;
pub mod memory;
pub use memory::MemoryLedgerStore;
