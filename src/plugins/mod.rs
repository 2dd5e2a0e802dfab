pub mod ai;
pub mod combat;
pub mod core;
pub mod dungeon;
pub mod inventory;
pub mod items;
pub mod pool;
pub mod screen;
pub mod settings;
pub mod shop;
pub mod stats;
pub mod ui;
