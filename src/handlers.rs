pub mod auth;
pub mod codes;
pub mod finder_fees;
pub mod health;
pub mod organizations;
pub mod pricing;
pub mod promos;
pub mod trials;
pub mod webhooks;
