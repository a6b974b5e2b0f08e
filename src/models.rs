pub mod auth;
pub mod codes;
pub mod finder_fees;
pub mod licenses;
pub mod pricing;
pub mod promos;
pub mod purchases;
pub mod trials;
