pub mod cloth;
pub mod view;
