// Accounting and redistribution engine
pub mod models;
pub mod planner;
pub mod queue;
pub mod reconciler;
pub mod registry;
pub mod returns;
pub mod sweeper;

pub use models::User;
pub use planner::{DistributionConfig, DistributionPlanner};
pub use queue::PayoutQueue;
pub use reconciler::BalanceReconciler;
pub use registry::UserRegistry;
pub use returns::ReturnScheduler;
pub use sweeper::DepositSweeper;
