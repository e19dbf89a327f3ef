pub mod affiliate;
pub mod commission;
pub mod jobs;
pub mod order;
pub mod payout;
pub mod pricing;
pub mod referral;
pub mod stats;
#[cfg(test)]
pub mod test_utils;

pub use affiliate::{Affiliate, RegisterAffiliate};
pub use commission::{Commission, CommissionFilter, CommissionStats};
pub use jobs::{DrainReport, Jobs};
pub use order::{NewOrder, NewOrderItem, Order};
pub use payout::{ExternalSettlement, Payout, PayoutAllocation};
pub use pricing::{PriceQuote, Pricing};
pub use referral::{Referral, ReferralMeta};
pub use stats::{AffiliateStats, Stats};
