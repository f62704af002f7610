mod announce;
mod effects;

pub mod grant;
pub mod guild;
pub mod events;
pub mod license;
pub mod packet;
pub mod redeem;
pub mod role;
pub mod schedule;
pub mod sweep;

pub use events::Events;
pub use grant::Grant;
pub use guild::Guild;
pub use license::License;
pub use packet::Packet;
pub use redeem::Redeem;
pub use role::Role;
pub use schedule::Schedule;
pub use sweep::Sweep;
