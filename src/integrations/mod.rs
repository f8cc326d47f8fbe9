pub mod alchemy;
pub mod ao;
pub mod irys;
