pub mod embed;
pub mod evaluate;
pub mod train;
