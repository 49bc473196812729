pub mod cli;
pub mod crc;
pub mod telemint;
pub mod tvm;
pub mod utils;
