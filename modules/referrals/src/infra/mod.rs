pub mod clock;
pub mod events;
pub mod ids;
pub mod storage;
