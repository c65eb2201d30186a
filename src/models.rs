pub mod referrals;
pub mod referrers;
