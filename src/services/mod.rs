pub mod bridge;
pub mod claim;
pub mod printing;
pub mod session;
pub mod shipping;
