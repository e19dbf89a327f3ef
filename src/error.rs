use sea_orm::DbErr;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification the callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  Conflict,
  InvalidState,
  InsufficientFunds,
  Validation,
  Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("database error: {0}")]
  Db(#[from] DbErr),

  #[error("affiliate not found")]
  AffiliateNotFound,
  #[error("order not found")]
  OrderNotFound,
  #[error("payout not found")]
  PayoutNotFound,
  #[error("product not found")]
  ProductNotFound,
  #[error("referral not found")]
  ReferralNotFound,
  #[error("commission job not found")]
  JobNotFound,

  #[error("user {0} is already registered as an affiliate")]
  AlreadyAffiliated(i64),
  #[error("no unique affiliate code after {0} attempts")]
  CodeGeneration(u32),
  #[error("affiliate {0} was modified concurrently")]
  Contended(i32),

  #[error("affiliate is not active")]
  AffiliateInactive,
  #[error("order is not attributed to this affiliate")]
  NotAttributed,
  #[error("product does not allow affiliate markup")]
  MarkupNotAllowed,
  #[error("invalid state: {0}")]
  InvalidState(String),

  #[error("requested {requested} exceeds pending earnings {available}")]
  InsufficientFunds { requested: i64, available: i64 },

  #[error("invalid arguments: {0}")]
  InvalidArgs(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::AffiliateNotFound
      | Self::OrderNotFound
      | Self::PayoutNotFound
      | Self::ProductNotFound
      | Self::ReferralNotFound
      | Self::JobNotFound => ErrorKind::NotFound,
      Self::AlreadyAffiliated(_)
      | Self::CodeGeneration(_)
      | Self::Contended(_) => ErrorKind::Conflict,
      Self::AffiliateInactive
      | Self::NotAttributed
      | Self::MarkupNotAllowed
      | Self::InvalidState(_) => ErrorKind::InvalidState,
      Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
      Self::InvalidArgs(_) => ErrorKind::Validation,
      Self::Db(_) | Self::Internal(_) => ErrorKind::Internal,
    }
  }

  /// Text that is safe to hand back to an API client.
  pub fn user_message(&self) -> String {
    match self.kind() {
      ErrorKind::Internal => "Internal error, try again later".into(),
      _ => self.to_string(),
    }
  }
}
