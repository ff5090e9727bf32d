pub mod attribution;
pub mod dashboard;
pub mod views;

pub use attribution::{attribute, Attribution, AttributionShare, DomainPower};
pub use dashboard::Dashboard;
pub use views::TargetStanding;
