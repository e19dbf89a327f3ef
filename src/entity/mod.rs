pub mod affiliate;
pub mod affiliate_payout;
pub mod affiliate_product;
pub mod affiliate_referral;
pub mod commission;
pub mod commission_job;
pub mod order;
pub mod order_item;
pub mod product;

pub use affiliate::{AffiliateStatus, CommissionMode};
pub use affiliate_payout::{PaymentDetails, PaymentMethod, PayoutStatus};
pub use affiliate_referral::ReferralSource;
pub use commission::{CommissionStatus, CommissionType};
pub use commission_job::JobStatus;
