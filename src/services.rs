pub mod auth;
pub mod code_generator;
pub mod commission;
pub mod email_service;
pub mod finder_fee_service;
pub mod ledger_service;
pub mod organization_service;
pub mod promo_service;
pub mod purchase_service;
pub mod stripe;
pub mod trial_service;
