pub mod guild;
pub mod license;
pub mod licensed_member;
pub mod licensed_role;
pub mod packet;
pub mod packet_role;
pub mod reminder;
pub mod role;
pub mod schedule;

pub use schedule::Activations;
