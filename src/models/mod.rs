pub mod solidification;
