pub use kwscrape_core as core;
pub use kwscrape_local as local;

pub mod proxy;
pub mod render;
